use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::ner::NERModel;
use rust_bert::pipelines::token_classification::{LabelAggregationOption, TokenClassificationConfig};
use rust_bert::resources::LocalResource;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NerBackend;

const MODEL_WEIGHTS: &str = "rust_model.ot";
const MODEL_CONFIG: &str = "config.json";
const MODEL_VOCAB: &str = "vocab.txt";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("NER model artifact not found: {0}")]
    MissingArtifact(PathBuf),
    #[error("failed to build NER model: {0}")]
    Build(#[from] rust_bert::RustBertError),
    #[error("NER model initialisation thread panicked")]
    InitPanicked,
}

/// Named-entity recognizer over a batch of texts.
///
/// Implementations return one entity list per input, in input order, each
/// list holding entity surface strings in order of appearance.
pub trait EntityRecognizer: Send + Sync {
    fn recognize_batch(&self, texts: &[String]) -> Result<Vec<Vec<String>>>;
}

/// rust-bert token classification model.
pub struct BertEntityRecognizer {
    model: Mutex<NERModel>,
}

impl std::fmt::Debug for BertEntityRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertEntityRecognizer")
            .field("model", &"<NERModel>")
            .finish()
    }
}

impl BertEntityRecognizer {
    /// Loads the model for the selected backend.
    ///
    /// `Local` reads `rust_model.ot`, `config.json` and `vocab.txt` from
    /// `model_dir` and fails before touching libtorch if any is missing.
    /// `Remote` uses the published default weights.
    ///
    /// # Errors
    /// Missing artifacts or a model that cannot be constructed.
    pub fn load(backend: NerBackend, model_dir: Option<&Path>) -> Result<Self, ModelError> {
        let config = match backend {
            NerBackend::Local => {
                let dir = model_dir.ok_or_else(|| ModelError::MissingArtifact(PathBuf::new()))?;
                local_config(dir)?
            }
            NerBackend::Remote => TokenClassificationConfig::default(),
        };

        // rust-bert performs blocking IO; keep it off the async runtime threads
        let model = std::thread::spawn(move || NERModel::new(config))
            .join()
            .map_err(|_| ModelError::InitPanicked)??;

        info!(backend = ?backend, "loaded NER model");
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

fn local_config(dir: &Path) -> Result<TokenClassificationConfig, ModelError> {
    let weights = dir.join(MODEL_WEIGHTS);
    let config = dir.join(MODEL_CONFIG);
    let vocab = dir.join(MODEL_VOCAB);
    for artifact in [&weights, &config, &vocab] {
        if !artifact.is_file() {
            return Err(ModelError::MissingArtifact(artifact.clone()));
        }
    }

    Ok(TokenClassificationConfig::new(
        ModelType::Bert,
        ModelResource::Torch(Box::new(LocalResource::from(weights))),
        LocalResource::from(config),
        LocalResource::from(vocab),
        None,
        false,
        false,
        None,
        LabelAggregationOption::Mode,
    ))
}

impl EntityRecognizer for BertEntityRecognizer {
    fn recognize_batch(&self, texts: &[String]) -> Result<Vec<Vec<String>>> {
        let model = self
            .model
            .lock()
            .map_err(|_| anyhow!("NER model mutex poisoned"))?;
        let predictions = model.predict_full_entities(texts);
        Ok(predictions
            .into_iter()
            .map(|entities| entities.into_iter().map(|entity| entity.word).collect())
            .collect())
    }
}

/// Entity lists aligned with the input plus the number of texts that fell
/// back to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityExtraction {
    pub entities: Vec<Vec<String>>,
    pub fallbacks: usize,
}

/// Runs a recognizer in fixed-size batches.
///
/// A failed batch, or one returning the wrong number of results, yields
/// empty lists for its texts instead of failing the run.
#[derive(Clone)]
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    batch_size: usize,
}

impl std::fmt::Debug for EntityExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExtractor")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl EntityExtractor {
    #[must_use]
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, batch_size: usize) -> Self {
        Self {
            recognizer,
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn extract_all(&self, texts: &[String]) -> EntityExtraction {
        let mut extraction = EntityExtraction {
            entities: Vec::with_capacity(texts.len()),
            fallbacks: 0,
        };

        for (batch_idx, batch) in texts.chunks(self.batch_size).enumerate() {
            match self.recognizer.recognize_batch(batch) {
                Ok(results) if results.len() == batch.len() => {
                    extraction.entities.extend(results);
                }
                Ok(results) => {
                    warn!(
                        batch = batch_idx,
                        expected = batch.len(),
                        actual = results.len(),
                        "entity recognizer returned a misaligned batch; using empty entity lists"
                    );
                    extraction.entities.extend(std::iter::repeat_n(Vec::new(), batch.len()));
                    extraction.fallbacks += batch.len();
                }
                Err(error) => {
                    warn!(
                        batch = batch_idx,
                        size = batch.len(),
                        error = %error,
                        "entity recognition failed; using empty entity lists"
                    );
                    extraction.entities.extend(std::iter::repeat_n(Vec::new(), batch.len()));
                    extraction.fallbacks += batch.len();
                }
            }
        }

        extraction
    }
}
