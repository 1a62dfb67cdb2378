//! 出力レコードとラベル型の定義。
//!
//! 下流の学習ジョブは `text` と `category` のみを読むが、
//! 残りのフィールドも常に型付きで出力する。
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 夢テキストの感情カテゴリ（7種の閉集合）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryLabel {
    Happy,
    Sadness,
    Fear,
    Neutral,
    Anxiety,
    Stress,
    Confusion,
}

impl CategoryLabel {
    /// 組み込みレキシコンの走査順。同点時のタイブレークもこの順序に従う。
    pub const ALL: [Self; 7] = [
        Self::Happy,
        Self::Sadness,
        Self::Fear,
        Self::Neutral,
        Self::Anxiety,
        Self::Stress,
        Self::Confusion,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sadness => "sadness",
            Self::Fear => "fear",
            Self::Neutral => "neutral",
            Self::Anxiety => "anxiety",
            Self::Stress => "stress",
            Self::Confusion => "confusion",
        }
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知のラベル文字列。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for CategoryLabel {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == normalized)
            .ok_or_else(|| UnknownLabel(value.to_string()))
    }
}

/// 極性ラベル。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolarityLabel {
    Positive,
    Negative,
    Neutral,
}

impl PolarityLabel {
    pub const ALL: [Self; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for PolarityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 永続化される1件分の注釈結果。
///
/// フィールド順はそのままJSONのキー順になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub text: String,
    pub category: CategoryLabel,
    pub sentiment: PolarityLabel,
    pub entities: Vec<String>,
    pub topic: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for label in CategoryLabel::ALL {
            assert_eq!(label.as_str().parse::<CategoryLabel>(), Ok(label));
        }
        assert_eq!(" Fear ".parse::<CategoryLabel>(), Ok(CategoryLabel::Fear));
        assert!("joy".parse::<CategoryLabel>().is_err());
    }

    #[test]
    fn record_serializes_with_expected_keys() {
        let record = AnnotatedRecord {
            text: "Tôi mơ thấy biển".to_string(),
            category: CategoryLabel::Neutral,
            sentiment: PolarityLabel::Neutral,
            entities: vec![],
            topic: "unknown".to_string(),
        };

        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            json,
            r#"{"text":"Tôi mơ thấy biển","category":"neutral","sentiment":"neutral","entities":[],"topic":"unknown"}"#
        );
    }
}
