//! In-memory message queue

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::{Call, Journal, poisoned};
use crate::error::{BackendError, Result};
use crate::repository::{MessageQueue, QueueRef, ReceivedMessage};

#[derive(Debug)]
struct StoredMessage {
    id: u64,
    body: String,
    hidden_until: Option<Instant>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    /// receipt -> (queue, message id)
    receipts: HashMap<String, (String, u64)>,
    next_id: u64,
    next_receipt: u64,
}

impl State {
    fn push(&mut self, queue: &str, body: &str) {
        self.next_id += 1;
        let id = self.next_id;
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_back(StoredMessage {
                id,
                body: body.to_string(),
                hidden_until: None,
            });
    }
}

/// In-memory at-least-once queue for testing
///
/// Messages stay queued until deleted through one of their receipts.
/// Sending to a queue that was never resolved creates it.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<State>>,
    journal: Journal,
    fail_deletes: Arc<AtomicBool>,
    fail_receives: Arc<AtomicBool>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records calls into a shared journal
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Enqueues a message without recording a call
    pub fn push(&self, queue: &str, body: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.push(queue, body);
        }
    }

    /// Bodies currently queued, in order
    pub fn bodies(&self, queue: &str) -> Vec<String> {
        self.state
            .lock()
            .ok()
            .and_then(|state| {
                state
                    .queues
                    .get(queue)
                    .map(|q| q.iter().map(|m| m.body.clone()).collect())
            })
            .unwrap_or_default()
    }

    /// Makes every subsequent delete fail with a transport error
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent receive fail with a transport error
    pub fn fail_receives(&self, fail: bool) {
        self.fail_receives.store(fail, Ordering::SeqCst);
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn resolve_queue(&self, name: &str) -> Result<QueueRef> {
        self.journal.record(Call::ResolveQueue {
            name: name.to_string(),
        });
        let mut state = self.state.lock().map_err(poisoned)?;
        state.queues.entry(name.to_string()).or_default();
        Ok(QueueRef::new(name))
    }

    async fn send(&self, queue: &QueueRef, body: &str) -> Result<()> {
        self.journal.record(Call::Send {
            queue: queue.to_string(),
            body: body.to_string(),
        });
        self.state.lock().map_err(poisoned)?.push(queue.as_str(), body);
        Ok(())
    }

    async fn receive(
        &self,
        queue: &QueueRef,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        self.journal.record(Call::Receive {
            queue: queue.to_string(),
            visibility_timeout,
        });
        if self.fail_receives.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("receive failed".to_string()));
        }

        let now = Instant::now();
        let mut state = self.state.lock().map_err(poisoned)?;
        let State {
            queues,
            receipts,
            next_receipt,
            ..
        } = &mut *state;

        let Some(messages) = queues.get_mut(queue.as_str()) else {
            return Err(BackendError::NotFound(format!("queue {}", queue)));
        };

        let mut delivered = Vec::new();
        for message in messages.iter_mut() {
            if delivered.len() >= max_batch {
                break;
            }
            if message.hidden_until.is_some_and(|until| until > now) {
                continue;
            }
            if !visibility_timeout.is_zero() {
                message.hidden_until = Some(now + visibility_timeout);
            }

            *next_receipt += 1;
            let receipt = format!("{}-{}-{}", queue, message.id, next_receipt);
            receipts.insert(receipt.clone(), (queue.to_string(), message.id));
            delivered.push(ReceivedMessage {
                body: message.body.clone(),
                receipt,
            });
        }

        Ok(delivered)
    }

    async fn delete(&self, queue: &QueueRef, receipt: &str) -> Result<()> {
        self.journal.record(Call::DeleteMessage {
            queue: queue.to_string(),
            receipt: receipt.to_string(),
        });
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("delete failed".to_string()));
        }

        let mut state = self.state.lock().map_err(poisoned)?;
        let Some((owner, id)) = state.receipts.get(receipt).cloned() else {
            return Err(BackendError::NotFound(format!("receipt {}", receipt)));
        };
        if owner != queue.as_str() {
            return Err(BackendError::NotFound(format!("receipt {}", receipt)));
        }
        if let Some(messages) = state.queues.get_mut(&owner) {
            messages.retain(|m| m.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_visibility_redelivers_until_deleted() {
        let queue = MemoryQueue::new();
        let q = queue.resolve_queue("results").await.unwrap();
        queue.send(&q, "42|DONE").await.unwrap();

        let first = queue.receive(&q, 10, Duration::ZERO).await.unwrap();
        let second = queue.receive(&q, 10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_ne!(first[0].receipt, second[0].receipt);

        queue.delete(&q, &first[0].receipt).await.unwrap();
        assert!(queue.receive(&q, 10, Duration::ZERO).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receive_respects_batch_size() {
        let queue = MemoryQueue::new();
        let q = queue.resolve_queue("results").await.unwrap();
        for i in 0..15 {
            queue.push("results", &format!("{}|DONE", i));
        }
        let batch = queue.receive(&q, 10, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 10);
        assert_eq!(batch[0].body, "0|DONE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_timeout_hides_message() {
        let queue = MemoryQueue::new();
        let q = queue.resolve_queue("intake").await.unwrap();
        queue.push("intake", "42");

        let batch = queue.receive(&q, 10, Duration::from_secs(30)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert!(queue
            .receive(&q, 10, Duration::from_secs(30))
            .await
            .unwrap()
            .is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(queue.receive(&q, 10, Duration::ZERO).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_receipt() {
        let queue = MemoryQueue::new();
        let q = queue.resolve_queue("results").await.unwrap();
        assert!(queue.delete(&q, "nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let queue = MemoryQueue::new();
        let q = queue.resolve_queue("results").await.unwrap();
        queue.fail_receives(true);
        assert!(queue.receive(&q, 10, Duration::ZERO).await.is_err());
        queue.fail_receives(false);
        queue.fail_deletes(true);
        assert!(matches!(
            queue.delete(&q, "any").await,
            Err(BackendError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_journal_records_visibility_timeout() {
        let journal = Journal::new();
        let queue = MemoryQueue::new().with_journal(journal.clone());
        let q = queue.resolve_queue("results").await.unwrap();

        queue.receive(&q, 10, Duration::from_secs(30)).await.unwrap();

        assert_eq!(
            journal.calls().last(),
            Some(&Call::Receive {
                queue: "results".to_string(),
                visibility_timeout: Duration::from_secs(30),
            })
        );
    }
}
