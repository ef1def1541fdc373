//! Summary rendering
//!
//! Turns summary lines into a standalone HTML page, one paragraph per
//! record, colored by sentiment level.

use courier_core::domain::SummaryRecord;
use std::path::Path;
use tracing::warn;

use crate::error::{OrchestratorError, Phase, Result};

const STYLE: &str = concat!(
    ".sentiment-level-1 { color: darkred; }",
    ".sentiment-level-2 { color: red; }",
    ".sentiment-level-3 { color: black; }",
    ".sentiment-level-4 { color: lightgreen; }",
    ".sentiment-level-5 { color: darkgreen; }",
);

/// A rendered results page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub html: String,
    /// Records rendered
    pub records: usize,
    /// Malformed lines left out
    pub skipped: usize,
}

/// Renders summary lines, skipping malformed ones
pub fn render<S: AsRef<str>>(lines: &[S]) -> Document {
    let mut body = String::new();
    let mut records = 0;
    let mut skipped = 0;

    for line in lines {
        let line = line.as_ref();
        let Some(record) = SummaryRecord::parse_line(line) else {
            warn!("Skipping malformed summary line: {}", line);
            skipped += 1;
            continue;
        };
        body.push_str(&format!(
            "<p><div class=\"sentiment-level-{}\">{}</div>{}</p>",
            record.sentiment,
            escape(&record.text),
            escape(&record.entities)
        ));
        records += 1;
    }

    let html = format!(
        "<html><head><style type=\"text/css\">{}</style></head><body>{}</body></html>",
        STYLE, body
    );
    Document {
        html,
        records,
        skipped,
    }
}

/// Writes the page, replacing any existing file
pub async fn write_document(path: &Path, document: &Document) -> Result<()> {
    tokio::fs::write(path, document.html.as_bytes())
        .await
        .map_err(|e| OrchestratorError::io(Phase::Render, path, e))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
