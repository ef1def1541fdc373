//! Queue wire codec
//!
//! Bodies exchanged with the coordinator are plain text with `|`-joined
//! fields and no further encoding:
//!
//! ```text
//! <key>              submit
//! TERMINATE|<key>    submit, terminate the coordinator once finished
//! <key>|DONE         completion
//! TERMINATE          bare shutdown sentinel
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::job::{CorrelationKey, DONE_SUFFIX};

/// Field delimiter of every queue body and derived blob key
pub const DELIMITER: char = '|';

/// Literal used for the shutdown sentinel and the terminate-on-completion prefix
pub const TERMINATE: &str = "TERMINATE";

/// Errors produced while parsing queue bodies or correlation keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Correlation key cannot be empty")]
    EmptyKey,

    #[error("Correlation key contains the '|' delimiter: {0}")]
    InvalidKey(String),

    #[error("Correlation key is reserved by the wire format: {0}")]
    ReservedKey(String),

    #[error("Unrecognized message body: {0}")]
    Unrecognized(String),
}

/// A message carried on the intake or result queue
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Message {
    /// A new job is available under this key
    Submit(CorrelationKey),
    /// A new job is available; terminate the coordinator after it completes
    SubmitAndTerminate(CorrelationKey),
    /// The job under this key is complete and its summary is published
    Done(CorrelationKey),
    /// Bare shutdown sentinel for the coordinator
    Terminate,
}

impl Message {
    /// Correlation key referenced by the message, if any
    pub fn key(&self) -> Option<&CorrelationKey> {
        match self {
            Message::Submit(key) | Message::SubmitAndTerminate(key) | Message::Done(key) => {
                Some(key)
            }
            Message::Terminate => None,
        }
    }

    /// Whether the message signals completion of some job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Message::Done(_))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Submit(key) => write!(f, "{}", key),
            Message::SubmitAndTerminate(key) => write!(f, "{}{}{}", TERMINATE, DELIMITER, key),
            Message::Done(key) => write!(f, "{}{}{}", key, DELIMITER, DONE_SUFFIX),
            Message::Terminate => f.write_str(TERMINATE),
        }
    }
}

impl FromStr for Message {
    type Err = MessageError;

    fn from_str(body: &str) -> Result<Self, Self::Err> {
        if body == TERMINATE {
            return Ok(Message::Terminate);
        }

        match body.split_once(DELIMITER) {
            Some((TERMINATE, key)) => Ok(Message::SubmitAndTerminate(CorrelationKey::parse(key)?)),
            Some((key, DONE_SUFFIX)) => Ok(Message::Done(CorrelationKey::parse(key)?)),
            Some(_) => Err(MessageError::Unrecognized(body.to_string())),
            None => Ok(Message::Submit(CorrelationKey::parse(body)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(raw: &str) -> CorrelationKey {
        CorrelationKey::parse(raw).unwrap()
    }

    #[test]
    fn test_serialize_wire_format() {
        assert_eq!(Message::Submit(key("42")).to_string(), "42");
        assert_eq!(
            Message::SubmitAndTerminate(key("42")).to_string(),
            "TERMINATE|42"
        );
        assert_eq!(Message::Done(key("42")).to_string(), "42|DONE");
        assert_eq!(Message::Terminate.to_string(), "TERMINATE");
    }

    #[test]
    fn test_parse_wire_format() {
        assert_eq!("42".parse::<Message>(), Ok(Message::Submit(key("42"))));
        assert_eq!(
            "TERMINATE|42".parse::<Message>(),
            Ok(Message::SubmitAndTerminate(key("42")))
        );
        assert_eq!("42|DONE".parse::<Message>(), Ok(Message::Done(key("42"))));
        assert_eq!("TERMINATE".parse::<Message>(), Ok(Message::Terminate));
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        assert_eq!("".parse::<Message>(), Err(MessageError::EmptyKey));
        assert!(matches!(
            "42|PENDING".parse::<Message>(),
            Err(MessageError::Unrecognized(_))
        ));
        assert!(matches!(
            "42|DONE|DONE".parse::<Message>(),
            Err(MessageError::Unrecognized(_))
        ));
        assert_eq!("|DONE".parse::<Message>(), Err(MessageError::EmptyKey));
        assert!(matches!(
            "TERMINATE|DONE|x".parse::<Message>(),
            Err(MessageError::InvalidKey(_))
        ));
        assert!(matches!(
            "TERMINATE|TERMINATE".parse::<Message>(),
            Err(MessageError::ReservedKey(_))
        ));
    }

    #[test]
    fn test_only_done_is_terminal() {
        assert!(Message::Done(key("1")).is_terminal());
        assert!(!Message::Submit(key("1")).is_terminal());
        assert!(!Message::Terminate.is_terminal());
        assert_eq!(Message::Terminate.key(), None);
        assert_eq!(Message::Done(key("1")).key(), Some(&key("1")));
    }

    fn arb_key() -> impl Strategy<Value = CorrelationKey> {
        "[A-Za-z0-9_./-]{1,40}"
            .prop_filter("reserved literal", |s| s.as_str() != TERMINATE)
            .prop_map(|s| CorrelationKey::parse(&s).unwrap())
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        prop_oneof![
            arb_key().prop_map(Message::Submit),
            arb_key().prop_map(Message::SubmitAndTerminate),
            arb_key().prop_map(Message::Done),
            Just(Message::Terminate),
        ]
    }

    proptest! {
        #[test]
        fn prop_message_round_trips(message in arb_message()) {
            let body = message.to_string();
            prop_assert_eq!(body.parse::<Message>(), Ok(message));
        }
    }
}
