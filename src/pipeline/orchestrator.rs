//! Pipeline orchestrator and builder for the annotation run.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::observability::metrics::Metrics;
use crate::schema::AnnotatedRecord;

use super::annotate::AnnotateStage;
use super::filter::LengthFilter;
use super::load::{LoadStage, SourceDescriptor};
use super::persist::{PersistResult, PersistStage, merge_records};
use super::report::RunReport;
use super::topic::UNKNOWN_TOPIC;

/// States of one run, entered strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Loading,
    Filtering,
    Annotating,
    Merging,
    Persisted,
}

impl PipelineState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Filtering => "filtering",
            Self::Annotating => "annotating",
            Self::Merging => "merging",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub records: Arc<[AnnotatedRecord]>,
    pub persisted: PersistResult,
    pub report: RunReport,
}

/// Container for all pipeline stages.
struct PipelineStages {
    load: Arc<dyn LoadStage>,
    annotate: Arc<dyn AnnotateStage>,
    persist: Arc<dyn PersistStage>,
}

/// Runs Loading → Filtering → Annotating → Merging → Persisted once per call.
///
/// Any stage error aborts the run before anything is written.
pub struct AnnotationPipeline {
    stages: PipelineStages,
    filter: LengthFilter,
    metrics: Arc<Metrics>,
    seed: u64,
}

/// Builder pattern for constructing [`AnnotationPipeline`].
pub struct PipelineBuilder {
    metrics: Arc<Metrics>,
    filter: LengthFilter,
    seed: u64,
    load: Option<Arc<dyn LoadStage>>,
    annotate: Option<Arc<dyn AnnotateStage>>,
    persist: Option<Arc<dyn PersistStage>>,
}

impl AnnotationPipeline {
    /// Executes one full run against `source`.
    ///
    /// # Errors
    /// Propagates the first stage failure, including misaligned annotator output.
    pub async fn execute(&self, source: &SourceDescriptor) -> Result<PipelineOutcome> {
        let run_id = Uuid::now_v7();
        let span = info_span!("annotation_run", %run_id, source = %source);
        self.run(run_id, source).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, source: &SourceDescriptor) -> Result<PipelineOutcome> {
        let started_at = Utc::now();

        // Loading
        let timer = self.stage_timer(PipelineState::Loading);
        info!(%run_id, state = %PipelineState::Loading, source = %source, "loading texts");
        let texts = self
            .stages
            .load
            .load(source)
            .await
            .with_context(|| format!("failed to load texts from {source}"))?;
        timer.observe_duration();
        let loaded = texts.len();
        self.metrics.texts_loaded.inc_by(as_count(loaded));

        // Filtering
        let timer = self.stage_timer(PipelineState::Filtering);
        let kept = self.filter.apply(texts);
        timer.observe_duration();
        self.metrics
            .texts_filtered_out
            .inc_by(as_count(loaded - kept.len()));
        info!(
            %run_id,
            state = %PipelineState::Filtering,
            before = loaded,
            after = kept.len(),
            "filtered texts by length"
        );

        // Annotating
        let corpus: Arc<[String]> = kept.into();
        let timer = self.stage_timer(PipelineState::Annotating);
        info!(%run_id, state = %PipelineState::Annotating, texts = corpus.len(), "annotating texts");
        let annotations = self
            .stages
            .annotate
            .annotate(Arc::clone(&corpus))
            .await
            .context("annotation failed")?;
        timer.observe_duration();
        self.metrics
            .entity_fallbacks
            .inc_by(as_count(annotations.entity_fallbacks));

        // Merging
        let timer = self.stage_timer(PipelineState::Merging);
        let records: Arc<[AnnotatedRecord]> = merge_records(&corpus, annotations)
            .context("annotator outputs are not aligned with the corpus")?
            .into();
        timer.observe_duration();
        let unknown_topics = records
            .iter()
            .filter(|record| record.topic == UNKNOWN_TOPIC)
            .count();
        self.metrics.record_labels(&records);
        self.metrics.topic_unknown.inc_by(as_count(unknown_topics));
        info!(
            %run_id,
            state = %PipelineState::Merging,
            records = records.len(),
            unknown_topics,
            "merged annotations into records"
        );

        // Persisted
        let timer = self.stage_timer(PipelineState::Persisted);
        let persisted = self
            .stages
            .persist
            .persist(run_id, Arc::clone(&records))
            .await
            .context("failed to persist annotated records")?;
        timer.observe_duration();
        self.metrics
            .records_persisted
            .inc_by(as_count(persisted.records));
        info!(
            %run_id,
            state = %PipelineState::Persisted,
            records = persisted.records,
            path = %persisted.path.display(),
            "run completed"
        );

        let report = RunReport::from_records(
            run_id,
            source.to_string(),
            started_at,
            loaded,
            &records,
            self.seed,
        );

        Ok(PipelineOutcome {
            run_id,
            records,
            persisted,
            report,
        })
    }

    fn stage_timer(&self, state: PipelineState) -> prometheus::HistogramTimer {
        self.metrics
            .stage_duration
            .with_label_values(&[state.as_str()])
            .start_timer()
    }
}

fn as_count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            filter: LengthFilter::default(),
            seed: 0,
            load: None,
            annotate: None,
            persist: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: LengthFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Topic model seed, recorded in the run report.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_load_stage(mut self, stage: Arc<dyn LoadStage>) -> Self {
        self.load = Some(stage);
        self
    }

    #[must_use]
    pub fn with_annotate_stage(mut self, stage: Arc<dyn AnnotateStage>) -> Self {
        self.annotate = Some(stage);
        self
    }

    #[must_use]
    pub fn with_persist_stage(mut self, stage: Arc<dyn PersistStage>) -> Self {
        self.persist = Some(stage);
        self
    }

    /// # Errors
    /// A stage was not configured.
    pub fn build(self) -> Result<AnnotationPipeline> {
        let stages = PipelineStages {
            load: self
                .load
                .ok_or_else(|| anyhow!("load stage must be configured before build"))?,
            annotate: self
                .annotate
                .ok_or_else(|| anyhow!("annotate stage must be configured before build"))?,
            persist: self
                .persist
                .ok_or_else(|| anyhow!("persist stage must be configured before build"))?,
        };

        Ok(AnnotationPipeline {
            stages,
            filter: self.filter,
            metrics: self.metrics,
            seed: self.seed,
        })
    }
}
