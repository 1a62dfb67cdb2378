//! 実行レポート（進捗カウントとラベル分布）。
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{AnnotatedRecord, CategoryLabel, PolarityLabel};

use super::topic::UNKNOWN_TOPIC;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub loaded: usize,
    pub kept: usize,
    pub category_distribution: BTreeMap<CategoryLabel, usize>,
    pub sentiment_distribution: BTreeMap<PolarityLabel, usize>,
    /// 出現順の重複なしトピックラベル
    pub topic_labels: Vec<String>,
    pub unknown_topics: usize,
    pub seed: u64,
}

impl RunReport {
    #[must_use]
    pub fn from_records(
        run_id: Uuid,
        source: String,
        started_at: DateTime<Utc>,
        loaded: usize,
        records: &[AnnotatedRecord],
        seed: u64,
    ) -> Self {
        let mut category_distribution = BTreeMap::new();
        let mut sentiment_distribution = BTreeMap::new();
        let mut topic_labels: Vec<String> = Vec::new();
        let mut unknown_topics = 0;

        for record in records {
            *category_distribution.entry(record.category).or_insert(0) += 1;
            *sentiment_distribution.entry(record.sentiment).or_insert(0) += 1;
            if record.topic == UNKNOWN_TOPIC {
                unknown_topics += 1;
            }
            if !topic_labels.contains(&record.topic) {
                topic_labels.push(record.topic.clone());
            }
        }

        Self {
            run_id,
            source,
            started_at,
            finished_at: Utc::now(),
            loaded,
            kept: records.len(),
            category_distribution,
            sentiment_distribution,
            topic_labels,
            unknown_topics,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(category: CategoryLabel, sentiment: PolarityLabel, topic: &str) -> AnnotatedRecord {
        AnnotatedRecord {
            text: "dream".to_string(),
            category,
            sentiment,
            entities: vec![],
            topic: topic.to_string(),
        }
    }

    #[test]
    fn summarises_distributions_and_topics() {
        let records = vec![
            record(CategoryLabel::Happy, PolarityLabel::Positive, "sea sand waves"),
            record(CategoryLabel::Fear, PolarityLabel::Negative, UNKNOWN_TOPIC),
            record(CategoryLabel::Happy, PolarityLabel::Neutral, "sea sand waves"),
        ];
        let report = RunReport::from_records(
            Uuid::now_v7(),
            "dreams.csv".to_string(),
            Utc::now(),
            5,
            &records,
            42,
        );

        assert_eq!(report.loaded, 5);
        assert_eq!(report.kept, 3);
        assert_eq!(report.category_distribution[&CategoryLabel::Happy], 2);
        assert_eq!(report.sentiment_distribution.get(&PolarityLabel::Positive), Some(&1));
        assert_eq!(report.topic_labels, vec!["sea sand waves", UNKNOWN_TOPIC]);
        assert_eq!(report.unknown_topics, 1);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn serialises_labels_as_lowercase_keys() {
        let report = RunReport::from_records(
            Uuid::now_v7(),
            "huggingface".to_string(),
            Utc::now(),
            1,
            &[record(CategoryLabel::Stress, PolarityLabel::Negative, "monster dark forest")],
            7,
        );
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["category_distribution"]["stress"], 1);
        assert_eq!(json["sentiment_distribution"]["negative"], 1);
    }
}
