/// Prometheusメトリクス定義。
use prometheus::{
    HistogramVec, IntCounter, IntCounterVec, Registry, register_histogram_vec_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
};
use std::sync::Arc;

use crate::schema::{AnnotatedRecord, CategoryLabel, PolarityLabel};

/// メトリクスコレクター。実行ごとに専用のレジストリへ登録する。
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // カウンター
    pub texts_loaded: IntCounter,
    pub texts_filtered_out: IntCounter,
    pub records_persisted: IntCounter,
    pub category_assigned: IntCounterVec,
    pub sentiment_assigned: IntCounterVec,
    pub entity_fallbacks: IntCounter,
    pub topic_unknown: IntCounter,

    // ヒストグラム
    pub stage_duration: HistogramVec,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同名のメトリクスが既にレジストリに登録されている場合。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            texts_loaded: register_int_counter_with_registry!(
                "dream_texts_loaded_total",
                "Total number of texts returned by the loader",
                registry
            )?,
            texts_filtered_out: register_int_counter_with_registry!(
                "dream_texts_filtered_out_total",
                "Total number of texts removed by the length filter",
                registry
            )?,
            records_persisted: register_int_counter_with_registry!(
                "dream_records_persisted_total",
                "Total number of annotated records written",
                registry
            )?,
            category_assigned: register_int_counter_vec_with_registry!(
                "dream_category_assigned_total",
                "Number of records per emotional category",
                &["category"],
                registry
            )?,
            sentiment_assigned: register_int_counter_vec_with_registry!(
                "dream_sentiment_assigned_total",
                "Number of records per sentiment label",
                &["sentiment"],
                registry
            )?,
            entity_fallbacks: register_int_counter_with_registry!(
                "dream_entity_fallbacks_total",
                "Texts whose entity list fell back to empty after a recognizer failure",
                registry
            )?,
            topic_unknown: register_int_counter_with_registry!(
                "dream_topic_unknown_total",
                "Records labelled with the unknown topic",
                registry
            )?,
            stage_duration: register_histogram_vec_with_registry!(
                "dream_stage_duration_seconds",
                "Duration of each pipeline state",
                &["stage"],
                registry
            )?,
            registry,
        })
    }

    /// テスト・ベンチ用に独立したレジストリで作成する。
    ///
    /// # Errors
    /// [`Metrics::new`] と同じ。
    pub fn standalone() -> Result<Self, prometheus::Error> {
        Self::new(Arc::new(Registry::new()))
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// ラベル分布をカウンターへ反映する。
    pub fn record_labels(&self, records: &[AnnotatedRecord]) {
        for record in records {
            self.category_assigned
                .with_label_values(&[record.category.as_str()])
                .inc();
            self.sentiment_assigned
                .with_label_values(&[record.sentiment.as_str()])
                .inc();
        }
    }

    #[must_use]
    pub fn category_count(&self, category: CategoryLabel) -> u64 {
        self.category_assigned
            .with_label_values(&[category.as_str()])
            .get()
    }

    #[must_use]
    pub fn sentiment_count(&self, sentiment: PolarityLabel) -> u64 {
        self.sentiment_assigned
            .with_label_values(&[sentiment.as_str()])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        let _first = Metrics::new(Arc::clone(&registry)).expect("first registration");
        assert!(Metrics::new(registry).is_err());
    }

    #[test]
    fn record_labels_counts_per_label() {
        let metrics = Metrics::standalone().expect("metrics");
        let record = |category, sentiment| AnnotatedRecord {
            text: "t".to_string(),
            category,
            sentiment,
            entities: vec![],
            topic: "unknown".to_string(),
        };
        metrics.record_labels(&[
            record(CategoryLabel::Happy, PolarityLabel::Positive),
            record(CategoryLabel::Happy, PolarityLabel::Neutral),
            record(CategoryLabel::Fear, PolarityLabel::Negative),
        ]);

        assert_eq!(metrics.category_count(CategoryLabel::Happy), 2);
        assert_eq!(metrics.category_count(CategoryLabel::Fear), 1);
        assert_eq!(metrics.category_count(CategoryLabel::Stress), 0);
        assert_eq!(metrics.sentiment_count(PolarityLabel::Negative), 1);
    }
}
