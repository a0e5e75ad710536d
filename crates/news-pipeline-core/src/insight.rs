//! Insight selection for the output knowledge base.

use chrono::NaiveDate;

use crate::models::{AnalysisRecord, Importance, ItemDigest};

/// Items of one date worth keeping as a note.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightNote {
    pub date: NaiveDate,
    pub threshold: Importance,
    pub items: Vec<ItemDigest>,
}

impl InsightNote {
    /// Sectors across the note's items, most items first.
    pub fn hot_sectors(&self) -> Vec<String> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for item in &self.items {
            for s in &item.sectors {
                match counts.iter_mut().find(|(name, _)| name == s) {
                    Some(entry) => entry.1 += 1,
                    None => counts.push((s.as_str(), 1)),
                }
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.into_iter().take(5).map(|(s, _)| s.to_string()).collect()
    }
}

/// Items at or above `threshold`, or `None` when nothing qualifies.
pub fn select(record: &AnalysisRecord, threshold: Importance) -> Option<InsightNote> {
    let items: Vec<ItemDigest> = record
        .items
        .iter()
        .filter(|i| i.importance.at_least(threshold))
        .cloned()
        .collect();
    if items.is_empty() {
        return None;
    }
    Some(InsightNote {
        date: record.date,
        threshold,
        items,
    })
}
