//! Summary result records
//!
//! The coordinator publishes one line per processed item:
//! `<key>|<sentiment 1..5>|<entities>|<text>`. There is no escaping, so
//! a `|` inside the entities field shifts the remaining fields.

use crate::message::DELIMITER;

/// Lowest sentiment level the coordinator reports
pub const MIN_SENTIMENT: u8 = 1;

/// Highest sentiment level the coordinator reports
pub const MAX_SENTIMENT: u8 = 5;

/// One processed item of a summary blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub key: String,
    pub sentiment: u8,
    pub entities: String,
    pub text: String,
}

impl SummaryRecord {
    /// Parses one summary line, returning `None` for malformed lines
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.splitn(4, DELIMITER);
        let key = fields.next()?;
        let sentiment = fields.next()?.trim().parse::<u8>().ok()?;
        let entities = fields.next()?;
        let text = fields.next()?;

        if !(MIN_SENTIMENT..=MAX_SENTIMENT).contains(&sentiment) {
            return None;
        }

        Some(Self {
            key: key.to_string(),
            sentiment,
            entities: entities.to_string(),
            text: text.to_string(),
        })
    }
}
