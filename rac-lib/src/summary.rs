use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorCount {
    pub message: String,
    pub count: usize,
}

/// Tracks stats on decoded records.
///
/// # Example
/// ```
/// use rac::summary::Summary;
/// use rac::pipeline::extract_records;
///
/// let mut summary = Summary::default();
/// extract_records(Vec::default(), |record| summary.add(&record)).unwrap();
/// assert_eq!(summary.records, 0);
/// ```
#[derive(Debug, Default, Clone, Serialize)]
pub struct Summary {
    pub records: usize,
    pub errors: usize,
    pub warnings: usize,
    /// Successfully decoded records per record family
    pub families: BTreeMap<&'static str, usize>,

    #[serde(skip)]
    messages: HashMap<String, usize>,
}

impl Summary {
    pub fn add(&mut self, record: &Record) {
        self.records += 1;
        self.warnings += record.warnings.len();

        if let Some(ref err) = record.error {
            self.errors += 1;
            *self.messages.entry(err.to_string()).or_default() += 1;
        } else if let Some(ref payload) = record.payload {
            *self.families.entry(payload.family()).or_default() += 1;
        }
    }

    /// Error messages, most frequent first. Equally frequent messages are sorted by message.
    #[must_use]
    pub fn error_counts(&self) -> Vec<ErrorCount> {
        let mut counts: Vec<ErrorCount> = self
            .messages
            .iter()
            .map(|(message, count)| ErrorCount {
                message: message.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.message.cmp(&b.message)));
        counts
    }
}
