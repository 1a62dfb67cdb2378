//! 極性スコアによる感情ラベル付け。
use std::sync::Arc;

use rayon::prelude::*;

use crate::schema::PolarityLabel;
use crate::util::text::lowercase_words;

use super::polarity_lexicon::{intensity, is_negator, prior_polarity};

/// `score > POSITIVE_THRESHOLD` で positive。
pub const POSITIVE_THRESHOLD: f64 = 0.1;
/// `score < NEGATIVE_THRESHOLD` で negative。
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// 否定語を見る直前のトークン数。
const NEGATION_WINDOW: usize = 2;
/// 否定された極性語に掛ける係数。
const NEGATION_FACTOR: f64 = -0.5;

/// テキストの極性を [-1, 1] の実数で返すスコアラー。
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// 辞書ベースの極性スコアラー。
///
/// 極性語ごとに事前極性を取り、直前の強調語で増幅、直前2語以内の否定語で
/// 符号反転と減衰を行い、寄与の平均をスコアとする。極性語がなければ0。
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconPolarityScorer;

impl PolarityScorer for LexiconPolarityScorer {
    fn polarity(&self, text: &str) -> f64 {
        let words = lowercase_words(text);
        let mut total = 0.0;
        let mut count = 0usize;

        for (idx, word) in words.iter().enumerate() {
            let Some(prior) = prior_polarity(word) else {
                continue;
            };

            let mut value = prior;
            if let Some(multiplier) = idx
                .checked_sub(1)
                .and_then(|prev| intensity(&words[prev]))
            {
                value *= multiplier;
            }

            let window_start = idx.saturating_sub(NEGATION_WINDOW);
            if words[window_start..idx].iter().any(|w| is_negator(w)) {
                value *= NEGATION_FACTOR;
            }

            total += value.clamp(-1.0, 1.0);
            count += 1;
        }

        if count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = total / count as f64;
        mean.clamp(-1.0, 1.0)
    }
}

/// スコアをラベルに変換する。境界値 ±0.1 ちょうどは neutral。
#[must_use]
pub fn sentiment_label(score: f64) -> PolarityLabel {
    if score > POSITIVE_THRESHOLD {
        PolarityLabel::Positive
    } else if score < NEGATIVE_THRESHOLD {
        PolarityLabel::Negative
    } else {
        PolarityLabel::Neutral
    }
}

/// スコアラーを差し替え可能な感情ラベラー。
#[derive(Clone)]
pub struct SentimentLabeler {
    scorer: Arc<dyn PolarityScorer>,
}

impl std::fmt::Debug for SentimentLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentLabeler").finish_non_exhaustive()
    }
}

impl Default for SentimentLabeler {
    fn default() -> Self {
        Self::new(Arc::new(LexiconPolarityScorer))
    }
}

impl SentimentLabeler {
    #[must_use]
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    #[must_use]
    pub fn label(&self, text: &str) -> PolarityLabel {
        sentiment_label(self.scorer.polarity(text))
    }

    /// 入力順を保ったまま並列にラベル付けする。
    #[must_use]
    pub fn label_all(&self, texts: &[String]) -> Vec<PolarityLabel> {
        texts.par_iter().map(|text| self.label(text)).collect()
    }
}
