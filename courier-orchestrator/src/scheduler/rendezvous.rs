//! Rendezvous engine
//!
//! Polls the result queue until the completion signal for one job shows up.
//!
//! The queue delivers at least once and every poll uses a zero visibility
//! timeout, so the same bodies come back on every cycle until someone deletes
//! them. The engine only ever deletes its own completion message; completions
//! for other jobs are left for their owners and remembered in a [`DedupSet`]
//! so they are classified once.

use courier_core::domain::CorrelationKey;
use courier_core::message::Message;
use courier_core::repository::{MessageQueue, QueueRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, MAX_RECEIVE_BATCH};
use crate::error::{OrchestratorError, Phase, Result};
use crate::retry::Deadline;
use crate::scheduler::dedup::DedupSet;

/// Where the engine stands for its job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendezvousState {
    /// No completion seen yet
    Waiting,
    /// Completion received
    Done,
    /// The wait budget ran out first
    TimedOut,
}

/// Polling parameters
#[derive(Debug, Clone)]
pub struct RendezvousSettings {
    pub poll_interval: Duration,
    pub batch_size: usize,
    /// `None` waits until the completion arrives
    pub deadline: Option<Duration>,
    pub dedup_capacity: usize,
}

impl From<&Config> for RendezvousSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            batch_size: config.receive_batch,
            deadline: config.rendezvous_timeout,
            dedup_capacity: config.dedup_capacity,
        }
    }
}

impl Default for RendezvousSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Summary of a finished wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub key: CorrelationKey,
    /// Poll cycles run, including the one that saw the completion
    pub polls: u32,
    pub waited: Duration,
}

/// How a received body relates to the awaited job
enum Signal {
    Ours,
    Foreign,
    Other,
}

fn classify(body: &str, key: &CorrelationKey) -> Signal {
    let Ok(message) = body.parse::<Message>() else {
        return Signal::Other;
    };
    if !message.is_terminal() {
        return Signal::Other;
    }
    if message.key() == Some(key) {
        Signal::Ours
    } else {
        Signal::Foreign
    }
}

/// Completion waiter for one job
pub struct Rendezvous {
    queue: Arc<dyn MessageQueue>,
    results: QueueRef,
    key: CorrelationKey,
    settings: RendezvousSettings,
    seen: DedupSet,
    state: RendezvousState,
    polls: u32,
}

impl Rendezvous {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        results: QueueRef,
        key: CorrelationKey,
        settings: RendezvousSettings,
    ) -> Self {
        let seen = DedupSet::new(settings.dedup_capacity);
        Self {
            queue,
            results,
            key,
            settings,
            seen,
            state: RendezvousState::Waiting,
            polls: 0,
        }
    }

    pub fn state(&self) -> RendezvousState {
        self.state
    }

    /// Foreign completion bodies remembered so far
    pub fn seen(&self) -> &DedupSet {
        &self.seen
    }

    /// Runs one poll cycle
    ///
    /// A failed receive counts as an empty poll. Once `Done`, further calls
    /// return `Done` without touching the queue.
    pub async fn poll_once(&mut self) -> RendezvousState {
        if self.state != RendezvousState::Waiting {
            return self.state;
        }
        self.polls += 1;

        let batch_size = self.settings.batch_size.clamp(1, MAX_RECEIVE_BATCH);
        let messages = match self
            .queue
            .receive(&self.results, batch_size, Duration::ZERO)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                warn!(
                    "Failed to poll {} for job {}: {}",
                    self.results, self.key, e
                );
                return self.state;
            }
        };

        if messages.is_empty() {
            debug!("No messages on {}", self.results);
            return self.state;
        }

        for message in messages {
            match classify(&message.body, &self.key) {
                Signal::Ours => {
                    // A failed delete only means the message is delivered again
                    // later, to a consumer that no longer waits on this key.
                    if let Err(e) = self.queue.delete(&self.results, &message.receipt).await {
                        warn!(
                            "Could not delete completion message for job {}: {}",
                            self.key, e
                        );
                    }
                    info!("Job {} is done", self.key);
                    self.state = RendezvousState::Done;
                    return self.state;
                }
                Signal::Foreign => {
                    if self.seen.insert(&message.body) {
                        debug!(
                            "Still waiting for job {}; ignoring {}",
                            self.key, message.body
                        );
                    }
                }
                Signal::Other => {}
            }
        }

        self.state
    }

    /// Polls until the completion arrives or the deadline passes
    pub async fn wait(&mut self) -> Result<Completion> {
        info!(
            "Waiting for job {} on {} (interval: {:?}, deadline: {:?})",
            self.key, self.results, self.settings.poll_interval, self.settings.deadline
        );

        let deadline = Deadline::new(self.settings.deadline);
        let mut ticker = time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if self.poll_once().await == RendezvousState::Done {
                return Ok(Completion {
                    key: self.key.clone(),
                    polls: self.polls,
                    waited: deadline.elapsed(),
                });
            }

            if deadline.expired() {
                self.state = RendezvousState::TimedOut;
                return Err(OrchestratorError::Timeout {
                    phase: Phase::Rendezvous,
                    key: Some(self.key.clone()),
                    waited: deadline.elapsed(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, RESULTS};
    use courier_core::memory::Call;

    fn key(raw: &str) -> CorrelationKey {
        CorrelationKey::parse(raw).unwrap()
    }

    fn settings() -> RendezvousSettings {
        RendezvousSettings {
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            deadline: Some(Duration::from_secs(60)),
            dedup_capacity: 64,
        }
    }

    fn engine(cloud: &FakeCloud, raw: &str) -> Rendezvous {
        Rendezvous::new(
            cloud.collaborators().queue,
            cloud.channels().results,
            key(raw),
            settings(),
        )
    }

    fn deletes(cloud: &FakeCloud) -> usize {
        cloud
            .journal
            .count(|c| matches!(c, Call::DeleteMessage { .. }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_interleaved_duplicates_end_after_first_match() {
        let cloud = FakeCloud::new();
        for body in ["17|DONE", "42|DONE", "42|DONE", "17|DONE"] {
            cloud.queue.push(RESULTS, body);
        }

        let mut rendezvous = engine(&cloud, "42");
        let completion = rendezvous.wait().await.unwrap();

        assert_eq!(completion.polls, 1);
        assert_eq!(rendezvous.state(), RendezvousState::Done);
        assert_eq!(deletes(&cloud), 1);
        // Only the first "42|DONE" was consumed; both "17" messages are untouched.
        assert_eq!(
            cloud.queue.bodies(RESULTS),
            vec!["17|DONE", "42|DONE", "17|DONE"]
        );
        assert_eq!(rendezvous.seen().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_completes_on_foreign_key() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "17|DONE");
        cloud.queue.push(RESULTS, "4217|DONE");
        cloud.queue.push(RESULTS, "42");

        let mut rendezvous = engine(&cloud, "42");
        for _ in 0..5 {
            assert_eq!(rendezvous.poll_once().await, RendezvousState::Waiting);
        }
        assert_eq!(deletes(&cloud), 0);
        assert_eq!(rendezvous.seen().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_is_terminal_and_idempotent() {
        let cloud = FakeCloud::new();
        for _ in 0..3 {
            cloud.queue.push(RESULTS, "42|DONE");
        }

        let mut rendezvous = engine(&cloud, "42");
        assert_eq!(rendezvous.poll_once().await, RendezvousState::Done);
        assert_eq!(rendezvous.poll_once().await, RendezvousState::Done);
        assert_eq!(rendezvous.poll_once().await, RendezvousState::Done);

        assert_eq!(deletes(&cloud), 1);
        assert_eq!(cloud.journal.count(|c| matches!(c, Call::Receive { .. })), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_across_polls_until_completion_arrives() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "17|DONE");
        cloud.queue.push(RESULTS, "18|DONE");

        let late = cloud.queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            late.push(RESULTS, "17|DONE");
            late.push(RESULTS, "42|DONE");
        });

        let mut rendezvous = engine(&cloud, "42");
        let completion = rendezvous.wait().await.unwrap();

        // Polls at t = 0, 1, 2, 3, 4 see nothing for us; t = 5 does.
        assert_eq!(completion.polls, 6);
        assert_eq!(rendezvous.seen().len(), 2);
        assert_eq!(deletes(&cloud), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_completion() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "17|DONE");

        let mut rendezvous = Rendezvous::new(
            cloud.collaborators().queue,
            cloud.channels().results,
            key("42"),
            RendezvousSettings {
                deadline: Some(Duration::from_secs(10)),
                ..settings()
            },
        );

        let err = rendezvous.wait().await.unwrap_err();
        match err {
            OrchestratorError::Timeout { phase, key, waited } => {
                assert_eq!(phase, Phase::Rendezvous);
                assert_eq!(key.unwrap().as_str(), "42");
                assert!(waited >= Duration::from_secs(10));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(rendezvous.state(), RendezvousState::TimedOut);
        assert_eq!(rendezvous.seen().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_is_tolerated() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "42|DONE");
        cloud.queue.fail_deletes(true);

        let mut rendezvous = engine(&cloud, "42");
        assert!(rendezvous.wait().await.is_ok());
        assert_eq!(deletes(&cloud), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_failures_are_transient() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "42|DONE");
        cloud.queue.fail_receives(true);

        let flaky = cloud.queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            flaky.fail_receives(false);
        });

        let mut rendezvous = engine(&cloud, "42");
        let completion = rendezvous.wait().await.unwrap();
        assert_eq!(completion.polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_bounded_by_distinct_foreign_messages() {
        let cloud = FakeCloud::new();
        let foreign = ["1|DONE", "2|DONE", "3|DONE"];
        for _ in 0..3 {
            for body in foreign {
                cloud.queue.push(RESULTS, body);
            }
        }

        let mut rendezvous = Rendezvous::new(
            cloud.collaborators().queue,
            cloud.channels().results,
            key("42"),
            RendezvousSettings {
                batch_size: 10,
                ..settings()
            },
        );
        for _ in 0..10 {
            rendezvous.poll_once().await;
        }
        assert!(rendezvous.seen().len() <= foreign.len());
        assert_eq!(rendezvous.seen().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_request_zero_visibility() {
        let cloud = FakeCloud::new();
        cloud.queue.push(RESULTS, "17|DONE");
        let late = cloud.queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            late.push(RESULTS, "42|DONE");
        });

        let mut rendezvous = engine(&cloud, "42");
        rendezvous.wait().await.unwrap();

        let receives: Vec<Duration> = cloud
            .journal
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Receive {
                    visibility_timeout, ..
                } => Some(visibility_timeout),
                _ => None,
            })
            .collect();
        assert_eq!(receives, vec![Duration::ZERO; 4]);
        // The foreign completion stays visible to its owner.
        assert_eq!(cloud.queue.bodies(RESULTS), vec!["17|DONE"]);
    }
}
