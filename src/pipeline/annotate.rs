use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;
use tracing::debug;

use crate::schema::{CategoryLabel, PolarityLabel};

use super::category::KeywordClassifier;
use super::entities::EntityExtractor;
use super::sentiment::SentimentLabeler;
use super::topic::TopicModeler;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{annotator} produced {actual} results for {expected} texts")]
pub struct AlignmentError {
    pub annotator: &'static str,
    pub expected: usize,
    pub actual: usize,
}

/// 4つのアノテータの出力。各列のi番目は入力のi番目のテキストに対応する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub categories: Vec<CategoryLabel>,
    pub sentiments: Vec<PolarityLabel>,
    pub entities: Vec<Vec<String>>,
    pub topics: Vec<String>,
    /// 認識失敗で空リストになったテキスト数
    pub entity_fallbacks: usize,
}

impl Annotations {
    /// すべての列の長さが `expected` と一致することを確認する。
    ///
    /// # Errors
    /// 長さが異なる列があれば最初の1つを返す。
    pub fn check_alignment(&self, expected: usize) -> Result<(), AlignmentError> {
        for (annotator, actual) in [
            ("keyword classifier", self.categories.len()),
            ("polarity scorer", self.sentiments.len()),
            ("entity extractor", self.entities.len()),
            ("topic modeler", self.topics.len()),
        ] {
            if actual != expected {
                return Err(AlignmentError {
                    annotator,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
pub trait AnnotateStage: Send + Sync {
    async fn annotate(&self, corpus: Arc<[String]>) -> Result<Annotations>;
}

/// 4つのアノテータを専用スレッドプール上で並列に走らせるステージ。
///
/// アノテータ間で共有するのは読み取り専用のコーパスだけ。
pub struct ParallelAnnotateStage {
    classifier: Arc<KeywordClassifier>,
    sentiment: SentimentLabeler,
    entities: EntityExtractor,
    topics: TopicModeler,
    pool: Arc<ThreadPool>,
}

impl std::fmt::Debug for ParallelAnnotateStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelAnnotateStage")
            .field("threads", &self.pool.current_num_threads())
            .field("topics", self.topics.config())
            .finish_non_exhaustive()
    }
}

impl ParallelAnnotateStage {
    /// # Errors
    /// スレッドプールを作成できない場合。
    pub fn new(
        classifier: KeywordClassifier,
        sentiment: SentimentLabeler,
        entities: EntityExtractor,
        topics: TopicModeler,
        threads: usize,
    ) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|idx| format!("annotate-{idx}"))
            .build()
            .context("failed to build annotator thread pool")?;

        Ok(Self {
            classifier: Arc::new(classifier),
            sentiment,
            entities,
            topics,
            pool: Arc::new(pool),
        })
    }

    fn run(&self, corpus: &[String]) -> Annotations {
        let ((categories, sentiments), (extraction, topics)) = self.pool.install(|| {
            rayon::join(
                || {
                    rayon::join(
                        || self.classifier.classify_all(corpus),
                        || self.sentiment.label_all(corpus),
                    )
                },
                || {
                    rayon::join(
                        || self.entities.extract_all(corpus),
                        || self.topics.assign(corpus),
                    )
                },
            )
        });

        Annotations {
            categories,
            sentiments,
            entities: extraction.entities,
            topics,
            entity_fallbacks: extraction.fallbacks,
        }
    }
}

#[async_trait]
impl AnnotateStage for ParallelAnnotateStage {
    async fn annotate(&self, corpus: Arc<[String]>) -> Result<Annotations> {
        let stage = Self {
            classifier: Arc::clone(&self.classifier),
            sentiment: self.sentiment.clone(),
            entities: self.entities.clone(),
            topics: self.topics.clone(),
            pool: Arc::clone(&self.pool),
        };
        let expected = corpus.len();

        // CPU負荷が高いのでブロッキングスレッドへ逃がす
        let annotations = tokio::task::spawn_blocking(move || stage.run(&corpus))
            .await
            .context("annotation task panicked")?;

        annotations.check_alignment(expected)?;
        debug!(
            texts = expected,
            entity_fallbacks = annotations.entity_fallbacks,
            "annotators finished"
        );
        Ok(annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entities::EntityRecognizer;
    use crate::pipeline::lexicon::Lexicon;
    use crate::pipeline::topic::UNKNOWN_TOPIC;

    struct NoEntities;

    impl EntityRecognizer for NoEntities {
        fn recognize_batch(&self, texts: &[String]) -> Result<Vec<Vec<String>>> {
            Ok(vec![Vec::new(); texts.len()])
        }
    }

    fn stage(threads: usize) -> ParallelAnnotateStage {
        ParallelAnnotateStage::new(
            KeywordClassifier::new(Lexicon::builtin()).expect("matcher"),
            SentimentLabeler::default(),
            EntityExtractor::new(Arc::new(NoEntities), 8),
            TopicModeler::default(),
            threads,
        )
        .expect("stage")
    }

    #[tokio::test]
    async fn outputs_are_aligned_with_the_corpus() {
        let corpus: Arc<[String]> = vec![
            "I had a wonderful dream about my wedding, everyone was laughing and happy.".to_string(),
            "I saw a monster chasing me in a dark forest, I was terrified.".to_string(),
            "We walked along the beach and talked for hours.".to_string(),
        ]
        .into();

        let annotations = stage(2).annotate(Arc::clone(&corpus)).await.expect("annotate");

        assert!(annotations.check_alignment(3).is_ok());
        assert_eq!(
            annotations.categories,
            vec![CategoryLabel::Happy, CategoryLabel::Fear, CategoryLabel::Neutral]
        );
        assert_eq!(annotations.sentiments[0], PolarityLabel::Positive);
        assert_eq!(annotations.sentiments[1], PolarityLabel::Negative);
        assert_eq!(annotations.entity_fallbacks, 0);
    }

    #[tokio::test]
    async fn empty_corpus_yields_empty_columns() {
        let annotations = stage(1)
            .annotate(Arc::from(Vec::<String>::new()))
            .await
            .expect("annotate");
        assert_eq!(annotations, Annotations::default());
    }

    #[tokio::test]
    async fn single_thread_pool_matches_wider_pool() {
        let corpus: Arc<[String]> = vec![
            "flying over a bright city at night".to_string(),
            "an alien spaceship landed in my garden".to_string(),
        ]
        .into();

        let narrow = stage(1).annotate(Arc::clone(&corpus)).await.expect("annotate");
        let wide = stage(4).annotate(corpus).await.expect("annotate");
        assert_eq!(narrow, wide);
        assert!(narrow.topics.iter().all(|topic| topic != UNKNOWN_TOPIC));
    }

    #[test]
    fn misaligned_column_is_reported() {
        let annotations = Annotations {
            categories: vec![CategoryLabel::Happy],
            sentiments: vec![PolarityLabel::Neutral],
            entities: vec![],
            topics: vec![UNKNOWN_TOPIC.to_string()],
            entity_fallbacks: 0,
        };
        assert_eq!(
            annotations.check_alignment(1),
            Err(AlignmentError {
                annotator: "entity extractor",
                expected: 1,
                actual: 0,
            })
        );
    }
}
