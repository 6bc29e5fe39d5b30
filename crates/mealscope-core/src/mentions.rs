//! Open-text mention counts behind a narrow interface.
//!
//! Mention extraction from survey free text is an external capability —
//! often an LLM-based extractor — and its implementation must not leak into
//! the scoring core. The engine only ever sees `entity_id -> mention_count`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One externally-produced mention record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionRecord {
    pub entity_id: String,
    pub mention_count: u64,
    /// Which extraction produced this record (e.g. `"survey_q7_llm"`).
    pub source_tag: String,
}

/// The contract every mention extractor satisfies.
pub trait MentionSource {
    /// Total mention count per entity, summed across this source's records.
    fn mention_counts(&self) -> HashMap<String, u64>;
}

/// Pre-extracted mention records held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticMentions {
    records: Vec<MentionRecord>,
}

impl StaticMentions {
    pub fn new(records: Vec<MentionRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[MentionRecord] {
        &self.records
    }
}

impl MentionSource for StaticMentions {
    fn mention_counts(&self) -> HashMap<String, u64> {
        let mut out: HashMap<String, u64> = HashMap::new();
        for record in &self.records {
            *out.entry(record.entity_id.clone()).or_insert(0) += record.mention_count;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sum_across_source_tags() {
        let mentions = StaticMentions::new(vec![
            MentionRecord {
                entity_id: "dish:birria_tacos".to_string(),
                mention_count: 11,
                source_tag: "survey_q7_llm".to_string(),
            },
            MentionRecord {
                entity_id: "dish:birria_tacos".to_string(),
                mention_count: 7,
                source_tag: "support_tickets".to_string(),
            },
            MentionRecord {
                entity_id: "dish:hotpot".to_string(),
                mention_count: 3,
                source_tag: "survey_q7_llm".to_string(),
            },
        ]);
        let counts = mentions.mention_counts();
        assert_eq!(counts.get("dish:birria_tacos"), Some(&18));
        assert_eq!(counts.get("dish:hotpot"), Some(&3));
        assert_eq!(counts.get("dish:unmentioned"), None);
    }
}
