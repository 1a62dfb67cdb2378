use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AnnotateConfig;
use crate::observability::{Telemetry, metrics::Metrics};
use crate::pipeline::annotate::ParallelAnnotateStage;
use crate::pipeline::category::KeywordClassifier;
use crate::pipeline::entities::{BertEntityRecognizer, EntityExtractor, EntityRecognizer};
use crate::pipeline::lexicon::Lexicon;
use crate::pipeline::load::{
    LocalSourceOptions, RemoteCorpusClient, RemoteCorpusSettings, SourceDescriptor, SourceLoadStage,
};
use crate::pipeline::persist::{JsonFilePersistStage, write_json_atomic};
use crate::pipeline::sentiment::SentimentLabeler;
use crate::pipeline::topic::TopicModeler;
use crate::pipeline::{AnnotationPipeline, PipelineBuilder, PipelineOutcome};

/// 設定からレキシコンを用意する。指定がなければ組み込みのもの。
///
/// # Errors
/// レキシコンファイルが読めない、または検証に失敗した場合。
pub fn load_lexicon(config: &AnnotateConfig) -> Result<Lexicon> {
    match &config.lexicon {
        Some(path) => Lexicon::from_yaml_file(path)
            .with_context(|| format!("failed to load lexicon from {}", path.display())),
        None => Ok(Lexicon::builtin()),
    }
}

/// 各ステージを組み立てる。固有表現認識器は呼び出し側で用意する。
///
/// # Errors
/// 分類器、HTTPクライアント、スレッドプールのいずれかを構築できない場合。
pub fn build_pipeline(
    config: &AnnotateConfig,
    recognizer: Arc<dyn EntityRecognizer>,
    metrics: Arc<Metrics>,
) -> Result<AnnotationPipeline> {
    let classifier =
        KeywordClassifier::new(load_lexicon(config)?).context("failed to build keyword matcher")?;

    let remote = RemoteCorpusClient::new(RemoteCorpusSettings {
        endpoint: config.hf_endpoint.clone(),
        config_name: config.hf_config.clone(),
        token: config.hf_token.clone(),
        text_columns: config.hf_text_columns.clone(),
        timeout: config.http_timeout(),
        max_attempts: config.http_max_retries,
        backoff_base_ms: config.http_backoff_base_ms,
        backoff_cap_ms: config.http_backoff_cap_ms,
    })?;
    let load = SourceLoadStage::new(
        LocalSourceOptions {
            text_columns: config.text_columns.clone(),
            json_field: config.json_field.clone(),
        },
        remote,
    );

    let annotate = ParallelAnnotateStage::new(
        classifier,
        SentimentLabeler::default(),
        EntityExtractor::new(recognizer, config.ner_batch_size),
        TopicModeler::new(config.topic_config()),
        config.worker_threads(),
    )?;

    PipelineBuilder::new(metrics)
        .with_filter(config.length_filter())
        .with_seed(config.seed)
        .with_load_stage(Arc::new(load))
        .with_annotate_stage(Arc::new(annotate))
        .with_persist_stage(Arc::new(JsonFilePersistStage::new(config.output.clone())))
        .build()
}

/// `annotate` サブコマンドの本体。
///
/// 設定・ソース指定・レキシコン・NERモデルをすべて検証してからデータを読み始める。
///
/// # Errors
/// 設定エラー、モデルの読み込み失敗、またはパイプラインのいずれかのステージの失敗。
pub async fn run_annotate(config: &AnnotateConfig, telemetry: &Telemetry) -> Result<PipelineOutcome> {
    config.validate()?;
    let source = SourceDescriptor::parse(&config.input)?;

    let backend = config.ner_backend;
    let model_dir = config.ner_model_dir.clone();
    let recognizer =
        tokio::task::spawn_blocking(move || BertEntityRecognizer::load(backend, model_dir.as_deref()))
            .await
            .context("NER model loading task panicked")?
            .context("failed to initialise the entity recognizer")?;

    let pipeline = build_pipeline(config, Arc::new(recognizer), telemetry.metrics())?;
    let outcome = pipeline.execute(&source).await?;

    if let Some(path) = &config.report {
        write_json_atomic(path, &outcome.report)
            .with_context(|| format!("failed to write run report to {}", path.display()))?;
        info!(path = %path.display(), "wrote run report");
    }
    if let Some(path) = &config.metrics_file {
        telemetry.write_prometheus(path)?;
    }

    Ok(outcome)
}
