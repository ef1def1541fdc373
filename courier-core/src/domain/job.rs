//! Job domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::message::{DELIMITER, Message, MessageError, TERMINATE};

/// Suffix of the completion signal body (`<key>|DONE`)
pub const DONE_SUFFIX: &str = "DONE";

/// Suffix of the stats blob key (`<key>|STATS`)
pub const STATS_SUFFIX: &str = "STATS";

/// Opaque token identifying one submitted job across every queue and blob interaction
///
/// Keys are never empty and never contain the wire delimiter, so every body
/// built from a key parses back to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Draws a fresh key from a 122-bit random space
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validates an existing token as a correlation key
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        if raw.is_empty() {
            return Err(MessageError::EmptyKey);
        }
        if raw.contains(DELIMITER) {
            return Err(MessageError::InvalidKey(raw.to_string()));
        }
        if raw == TERMINATE {
            return Err(MessageError::ReservedKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Queue body the coordinator sends when this job is finished
    pub fn done_body(&self) -> String {
        Message::Done(self.clone()).to_string()
    }

    /// Blob key under which the coordinator publishes run statistics
    pub fn stats_key(&self) -> String {
        format!("{}{}{}", self.0, DELIMITER, STATS_SUFFIX)
    }

    /// Blob key of the archived summary copy
    pub fn archive_key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.0)
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CorrelationKey {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CorrelationKey {
    type Error = MessageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CorrelationKey> for String {
    fn from(key: CorrelationKey) -> Self {
        key.0
    }
}

/// A job submitted by one orchestrator run
///
/// Created once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: CorrelationKey,
    pub input_ref: PathBuf,
    pub terminate: bool,
}

impl Job {
    pub fn new(key: CorrelationKey, input_ref: PathBuf, terminate: bool) -> Self {
        Self {
            key,
            input_ref,
            terminate,
        }
    }

    /// The intake message announcing this job
    pub fn submit_message(&self) -> Message {
        if self.terminate {
            Message::SubmitAndTerminate(self.key.clone())
        } else {
            Message::Submit(self.key.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_valid_and_distinct() {
        let a = CorrelationKey::generate();
        let b = CorrelationKey::generate();
        assert_ne!(a, b);
        assert!(CorrelationKey::parse(a.as_str()).is_ok());
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!(matches!(
            CorrelationKey::parse(""),
            Err(MessageError::EmptyKey)
        ));
        assert!(matches!(
            CorrelationKey::parse("a|b"),
            Err(MessageError::InvalidKey(_))
        ));
        assert!(matches!(
            CorrelationKey::parse("TERMINATE"),
            Err(MessageError::ReservedKey(_))
        ));
    }

    #[test]
    fn test_derived_keys() {
        let key = CorrelationKey::parse("42").unwrap();
        assert_eq!(key.done_body(), "42|DONE");
        assert_eq!(key.stats_key(), "42|STATS");
        assert_eq!(key.archive_key("ZZZ_oldSummaries/"), "ZZZ_oldSummaries/42");
    }

    #[test]
    fn test_submit_message_follows_terminate_flag() {
        let key = CorrelationKey::parse("7").unwrap();
        let job = Job::new(key.clone(), PathBuf::from("tweets.txt"), false);
        assert_eq!(job.submit_message(), Message::Submit(key.clone()));

        let job = Job::new(key.clone(), PathBuf::from("tweets.txt"), true);
        assert_eq!(job.submit_message(), Message::SubmitAndTerminate(key));
    }

    #[test]
    fn test_try_from_string_validates() {
        assert!(CorrelationKey::try_from("abc".to_string()).is_ok());
        assert!(CorrelationKey::try_from("abc|DONE".to_string()).is_err());
    }
}
