//! コーパス全体で1回だけLDAを学習し、各テキストに代表トピックのラベルを付ける。
//!
//! ラベルはこの実行内でのみ意味を持つ。コーパスやフィルタが変わると
//! トピック語彙も変わるため、実行をまたいだ比較はできない。
pub mod dictionary;
pub mod lda;

use rayon::prelude::*;
use tracing::debug;

use crate::util::text::topic_tokens;

use dictionary::{BagOfWords, Dictionary};
use lda::{LdaModel, LdaParams};

/// トピック分布が得られないテキストに付けるラベル。
pub const UNKNOWN_TOPIC: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicConfig {
    pub num_topics: usize,
    pub passes: usize,
    /// 文書ごとの変分推論の最大反復回数
    pub iterations: usize,
    /// ラベルに使う上位語の数
    pub top_terms: usize,
    pub seed: u64,
    /// これ未満の確率のトピックは文書分布から除く
    pub minimum_probability: f64,
    pub gamma_threshold: f64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            num_topics: 5,
            passes: 10,
            iterations: 50,
            top_terms: 3,
            seed: 42,
            minimum_probability: 0.01,
            gamma_threshold: 0.001,
        }
    }
}

impl TopicConfig {
    fn lda_params(&self) -> LdaParams {
        LdaParams {
            num_topics: self.num_topics,
            passes: self.passes,
            iterations: self.iterations,
            gamma_threshold: self.gamma_threshold,
            seed: self.seed,
        }
    }
}

/// 学習済みモデルと語彙。
#[derive(Debug, Clone)]
pub struct FittedTopics {
    dictionary: Dictionary,
    model: LdaModel,
    /// 学習に使ったBoW（入力順）
    corpus: Vec<BagOfWords>,
    /// トピックID -> ラベル
    topic_labels: Vec<String>,
}

impl FittedTopics {
    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    #[must_use]
    pub fn topic_labels(&self) -> &[String] {
        &self.topic_labels
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopicModeler {
    config: TopicConfig,
}

impl TopicModeler {
    #[must_use]
    pub fn new(config: TopicConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    /// コーパス全体でモデルを学習する。語彙が空なら `None`。
    #[must_use]
    pub fn fit(&self, texts: &[String]) -> Option<FittedTopics> {
        let documents: Vec<Vec<String>> = texts.iter().map(|text| topic_tokens(text)).collect();
        let dictionary = Dictionary::from_documents(&documents);
        if dictionary.is_empty() {
            debug!(documents = texts.len(), "empty vocabulary, skipping topic model fit");
            return None;
        }

        let corpus: Vec<_> = documents
            .iter()
            .map(|document| dictionary.doc2bow(document))
            .collect();
        let model = LdaModel::fit(&corpus, dictionary.len(), &self.config.lda_params());
        debug!(
            documents = texts.len(),
            vocabulary = dictionary.len(),
            topics = model.num_topics(),
            "fitted topic model"
        );

        let topic_labels = (0..model.num_topics())
            .map(|topic| {
                let terms: Vec<&str> = model
                    .top_terms(topic, self.config.top_terms)
                    .into_iter()
                    .filter_map(|(id, _)| dictionary.token(id))
                    .collect();
                if terms.is_empty() {
                    UNKNOWN_TOPIC.to_string()
                } else {
                    terms.join(" ")
                }
            })
            .collect();

        Some(FittedTopics {
            dictionary,
            model,
            corpus,
            topic_labels,
        })
    }

    /// 各テキストに最も確率の高いトピックのラベルを付ける（入力と同じ順・同じ長さ）。
    #[must_use]
    pub fn assign(&self, texts: &[String]) -> Vec<String> {
        let Some(fitted) = self.fit(texts) else {
            return vec![UNKNOWN_TOPIC.to_string(); texts.len()];
        };

        fitted
            .corpus
            .par_iter()
            .map(|bow| self.label_for(&fitted, bow))
            .collect()
    }

    fn label_for(&self, fitted: &FittedTopics, bow: &BagOfWords) -> String {
        let topics = fitted
            .model
            .document_topics(bow, self.config.minimum_probability);

        let mut best: Option<(usize, f64)> = None;
        for (topic, probability) in topics {
            if best.is_none_or(|(_, best_probability)| probability > best_probability) {
                best = Some((topic, probability));
            }
        }

        best.and_then(|(topic, _)| fitted.topic_labels.get(topic))
            .map_or_else(|| UNKNOWN_TOPIC.to_string(), Clone::clone)
    }
}
