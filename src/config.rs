//! CLI / 環境変数からの設定読み込み。
//!
//! 全フラグは `DREAM_*` 環境変数でも指定できる。
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::filter::LengthFilter;
use crate::pipeline::topic::TopicConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("length bounds must satisfy min < max (got min={min}, max={max})")]
    InvalidLengthBounds { min: usize, max: usize },
    #[error("{0} must be at least 1")]
    Zero(&'static str),
    #[error(
        "the local NER backend requires --ner-model-dir (or DREAM_NER_MODEL_DIR); \
         pass --ner-backend remote to opt into downloading the default weights"
    )]
    MissingNerModelDir,
    #[error("merge needs at least two input files (got {0})")]
    TooFewMergeInputs(usize),
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Annotate dream texts and write the labeled corpus as JSON
    Annotate(AnnotateConfig),
    /// Concatenate several annotated corpora into one file
    Merge(MergeConfig),
}

/// 固有表現抽出モデルの取得方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerBackend {
    /// Load weights from --ner-model-dir only
    #[default]
    Local,
    /// Use the published default weights (downloaded into the rust-bert cache)
    Remote,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct AnnotateConfig {
    /// Source descriptor: a .csv/.tsv/.json path, `huggingface`, or hf://owner/name[@split]
    #[arg(long, env = "DREAM_INPUT")]
    pub input: String,

    /// Output JSON file
    #[arg(long, env = "DREAM_OUTPUT", default_value = "dream_training_data.json")]
    pub output: PathBuf,

    /// Exclusive lower bound on text length (characters)
    #[arg(long, env = "DREAM_MIN_LENGTH", default_value = "20")]
    pub min_length: usize,

    /// Exclusive upper bound on text length (characters)
    #[arg(long, env = "DREAM_MAX_LENGTH", default_value = "500")]
    pub max_length: usize,

    /// Number of LDA topics
    #[arg(long, env = "DREAM_NUM_TOPICS", default_value = "5")]
    pub num_topics: usize,

    /// Number of full passes over the corpus while fitting LDA
    #[arg(long, env = "DREAM_PASSES", default_value = "10")]
    pub passes: usize,

    /// Terms used to render a topic label
    #[arg(long, env = "DREAM_TOPIC_TERMS", default_value = "3")]
    pub topic_terms: usize,

    /// Maximum variational iterations per document
    #[arg(long, env = "DREAM_LDA_ITERATIONS", default_value = "50")]
    pub lda_iterations: usize,

    /// Seed for the topic model initialisation
    #[arg(long, env = "DREAM_SEED", default_value = "42")]
    pub seed: u64,

    /// Candidate text columns for tabular files, in priority order
    #[arg(
        long,
        env = "DREAM_TEXT_COLUMNS",
        value_delimiter = ',',
        default_value = "dreams_text,text"
    )]
    pub text_columns: Vec<String>,

    /// Candidate text columns for remote corpora, in priority order
    #[arg(
        long,
        env = "DREAM_HF_TEXT_COLUMNS",
        value_delimiter = ',',
        default_value = "report,text"
    )]
    pub hf_text_columns: Vec<String>,

    /// Text field of JSON objects
    #[arg(long, env = "DREAM_JSON_FIELD", default_value = "text")]
    pub json_field: String,

    /// Base URL of the dataset rows API
    #[arg(
        long,
        env = "DREAM_HF_ENDPOINT",
        default_value = "https://datasets-server.huggingface.co"
    )]
    pub hf_endpoint: String,

    /// Dataset configuration name for remote corpora
    #[arg(long, env = "DREAM_HF_CONFIG", default_value = "default")]
    pub hf_config: String,

    /// Access token for gated remote corpora
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[arg(long, env = "DREAM_HTTP_MAX_RETRIES", default_value = "3")]
    pub http_max_retries: usize,

    #[arg(long, env = "DREAM_HTTP_BACKOFF_BASE_MS", default_value = "250")]
    pub http_backoff_base_ms: u64,

    #[arg(long, env = "DREAM_HTTP_BACKOFF_CAP_MS", default_value = "10000")]
    pub http_backoff_cap_ms: u64,

    #[arg(long, env = "DREAM_HTTP_TIMEOUT_SECS", default_value = "30")]
    pub http_timeout_secs: u64,

    /// YAML lexicon overriding the built-in keyword lists
    #[arg(long, env = "DREAM_LEXICON")]
    pub lexicon: Option<PathBuf>,

    #[arg(long, env = "DREAM_NER_BACKEND", value_enum, default_value = "local")]
    pub ner_backend: NerBackend,

    /// Directory holding rust_model.ot, config.json and vocab.txt
    #[arg(long, env = "DREAM_NER_MODEL_DIR")]
    pub ner_model_dir: Option<PathBuf>,

    #[arg(long, env = "DREAM_NER_BATCH_SIZE", default_value = "16")]
    pub ner_batch_size: usize,

    /// Worker threads for the annotators (defaults to the CPU count)
    #[arg(long, env = "DREAM_THREADS")]
    pub threads: Option<usize>,

    /// Write a JSON run report to this path
    #[arg(long, env = "DREAM_REPORT")]
    pub report: Option<PathBuf>,

    /// Write Prometheus metrics in text format to this path
    #[arg(long, env = "DREAM_METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

impl AnnotateConfig {
    /// フラグ同士の整合性を検証する。
    ///
    /// # Errors
    /// 長さの境界が逆転している、0が許されない値が0、
    /// またはローカルNERでモデルディレクトリ未指定の場合。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length >= self.max_length {
            return Err(ConfigError::InvalidLengthBounds {
                min: self.min_length,
                max: self.max_length,
            });
        }

        for (name, value) in [
            ("num_topics", self.num_topics),
            ("passes", self.passes),
            ("topic_terms", self.topic_terms),
            ("lda_iterations", self.lda_iterations),
            ("ner_batch_size", self.ner_batch_size),
            ("http_max_retries", self.http_max_retries),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        if self.threads == Some(0) {
            return Err(ConfigError::Zero("threads"));
        }

        if self.ner_backend == NerBackend::Local && self.ner_model_dir.is_none() {
            return Err(ConfigError::MissingNerModelDir);
        }

        Ok(())
    }

    #[must_use]
    pub fn length_filter(&self) -> LengthFilter {
        LengthFilter::new(self.min_length, self.max_length)
    }

    #[must_use]
    pub fn topic_config(&self) -> TopicConfig {
        TopicConfig {
            num_topics: self.num_topics,
            passes: self.passes,
            iterations: self.lda_iterations,
            top_terms: self.topic_terms,
            seed: self.seed,
            ..TopicConfig::default()
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Annotated corpora to concatenate, in order
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Merged output file
    #[arg(long, env = "DREAM_MERGE_OUTPUT", default_value = "dream_training_data.json")]
    pub output: PathBuf,
}

impl MergeConfig {
    /// # Errors
    /// 入力ファイルが2つ未満の場合。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inputs.len() < 2 {
            return Err(ConfigError::TooFewMergeInputs(self.inputs.len()));
        }
        Ok(())
    }
}
