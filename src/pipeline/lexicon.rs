/// 感情カテゴリ分類用キーワードレキシコン。
///
/// カテゴリの並び順はそのまま同点時の優先順位になるため、
/// マップではなく順序付きリストで保持する。
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::CategoryLabel;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("category '{0}' appears more than once in the lexicon")]
    DuplicateCategory(CategoryLabel),
    #[error("the lexicon must define the 'neutral' category")]
    MissingNeutral,
    #[error("category '{0}' contains an empty keyword")]
    EmptyKeyword(CategoryLabel),
    #[error("failed to read lexicon file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse lexicon YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// 1カテゴリ分のキーワード集合。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: CategoryLabel,
    pub keywords: Vec<String>,
}

impl CategoryKeywords {
    fn new(category: CategoryLabel, keywords: &[&str]) -> Self {
        Self {
            category,
            keywords: keywords.iter().map(|keyword| (*keyword).to_string()).collect(),
        }
    }
}

/// 読み取り専用のレキシコン。構築後は変更しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    entries: Vec<CategoryKeywords>,
}

impl Lexicon {
    /// 検証済みのレキシコンを構築する。キーワードは小文字化して保持する。
    ///
    /// # Errors
    /// カテゴリの重複、`neutral` の欠落、空キーワードがある場合。
    pub fn new(entries: Vec<CategoryKeywords>) -> Result<Self, LexiconError> {
        let mut seen = Vec::with_capacity(entries.len());
        let mut normalized = Vec::with_capacity(entries.len());

        for entry in entries {
            if seen.contains(&entry.category) {
                return Err(LexiconError::DuplicateCategory(entry.category));
            }
            seen.push(entry.category);

            if entry.keywords.iter().any(|keyword| keyword.is_empty()) {
                return Err(LexiconError::EmptyKeyword(entry.category));
            }

            normalized.push(CategoryKeywords {
                category: entry.category,
                keywords: entry
                    .keywords
                    .into_iter()
                    .map(|keyword| keyword.to_lowercase())
                    .collect(),
            });
        }

        if !seen.contains(&CategoryLabel::Neutral) {
            return Err(LexiconError::MissingNeutral);
        }

        Ok(Self {
            entries: normalized,
        })
    }

    /// 組み込みのレキシコン。
    ///
    /// 走査順: happy, sadness, fear, neutral, anxiety, stress, confusion。
    #[must_use]
    pub fn builtin() -> Self {
        let entries = vec![
            CategoryKeywords::new(
                CategoryLabel::Happy,
                &[
                    "happy",
                    "joy",
                    "excited",
                    "wonderful",
                    "celebration",
                    "laugh",
                    "smile",
                    "fun",
                    "pleasure",
                    "delight",
                    "cheerful",
                    "playful",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Sadness,
                &[
                    "sad",
                    "cry",
                    "depressed",
                    "lonely",
                    "miss",
                    "grief",
                    "sorrow",
                    "miserable",
                    "unhappy",
                    "melancholy",
                    "tears",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Fear,
                &[
                    "scared",
                    "afraid",
                    "terrified",
                    "panic",
                    "danger",
                    "threat",
                    "fear",
                    "frighten",
                    "alarm",
                    "horror",
                    "dread",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Neutral,
                &[
                    "normal",
                    "daily",
                    "routine",
                    "usual",
                    "ordinary",
                    "regular",
                    "common",
                    "typical",
                    "everyday",
                    "mundane",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Anxiety,
                &[
                    "nervous",
                    "anxious",
                    "worried",
                    "tense",
                    "restless",
                    "uneasy",
                    "concern",
                    "anticipation",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Stress,
                &[
                    "nightmare",
                    "death",
                    "killed",
                    "murder",
                    "attack",
                    "chased",
                    "trapped",
                    "monster",
                    "blood",
                    "scream",
                    "escape",
                ],
            ),
            CategoryKeywords::new(
                CategoryLabel::Confusion,
                &[
                    "weird",
                    "strange",
                    "surreal",
                    "bizarre",
                    "unusual",
                    "odd",
                    "peculiar",
                    "mysterious",
                    "supernatural",
                    "alien",
                ],
            ),
        ];

        Self { entries }
    }

    /// YAML（`[{category, keywords}]` のリスト）から読み込む。
    ///
    /// # Errors
    /// YAMLの構文エラー、未知のカテゴリ名、または [`Lexicon::new`] の検証エラー。
    pub fn from_yaml_str(yaml: &str) -> Result<Self, LexiconError> {
        let entries: Vec<CategoryKeywords> = serde_yaml::from_str(yaml)?;
        Self::new(entries)
    }

    /// # Errors
    /// ファイルが読めない場合、または [`Lexicon::from_yaml_str`] のエラー。
    pub fn from_yaml_file(path: &Path) -> Result<Self, LexiconError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| LexiconError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    #[must_use]
    pub fn entries(&self) -> &[CategoryKeywords] {
        &self.entries
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryLabel> + '_ {
        self.entries.iter().map(|entry| entry.category)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}
