//! キーワード出現数による感情カテゴリ分類。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use rayon::prelude::*;

use crate::schema::CategoryLabel;

use super::lexicon::Lexicon;

/// レキシコンの全キーワードを1つのオートマトンにまとめた分類器。
///
/// スコアは「テキスト（小文字化）に部分文字列として含まれるキーワードの種類数」。
/// 単語境界は見ないため、より長い単語の一部に含まれる場合も数える。
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicon: Lexicon,
    matcher: AhoCorasick,
    /// パターン番号 -> レキシコン内のカテゴリ位置
    pattern_entry: Vec<usize>,
}

impl KeywordClassifier {
    /// # Errors
    /// オートマトンの構築に失敗した場合（パターン数が上限を超えた場合など）。
    pub fn new(lexicon: Lexicon) -> Result<Self, aho_corasick::BuildError> {
        let mut patterns = Vec::new();
        let mut pattern_entry = Vec::new();
        for (entry_idx, entry) in lexicon.entries().iter().enumerate() {
            for keyword in &entry.keywords {
                patterns.push(keyword.as_str());
                pattern_entry.push(entry_idx);
            }
        }

        // overlapping 検索は Standard のみ対応
        let matcher = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&patterns)?;

        Ok(Self {
            lexicon,
            matcher,
            pattern_entry,
        })
    }

    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// レキシコン順のカテゴリ別スコア。
    #[must_use]
    pub fn scores(&self, text: &str) -> Vec<(CategoryLabel, usize)> {
        let lowered = text.to_lowercase();
        let mut hit = vec![false; self.pattern_entry.len()];
        for mat in self.matcher.find_overlapping_iter(&lowered) {
            hit[mat.pattern().as_usize()] = true;
        }

        let mut totals = vec![0usize; self.lexicon.entries().len()];
        for (pattern_idx, matched) in hit.into_iter().enumerate() {
            if matched {
                totals[self.pattern_entry[pattern_idx]] += 1;
            }
        }

        self.lexicon.categories().zip(totals).collect()
    }

    /// 最高スコアのカテゴリを返す。
    ///
    /// 全スコアが0なら `neutral`。同点ならレキシコン順で先のカテゴリ。
    #[must_use]
    pub fn classify(&self, text: &str) -> CategoryLabel {
        let mut best: Option<(CategoryLabel, usize)> = None;
        for (category, score) in self.scores(text) {
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((category, score));
            }
        }

        match best {
            Some((category, score)) if score > 0 => category,
            _ => CategoryLabel::Neutral,
        }
    }

    /// 入力順を保ったまま並列に分類する。
    #[must_use]
    pub fn classify_all(&self, texts: &[String]) -> Vec<CategoryLabel> {
        texts.par_iter().map(|text| self.classify(text)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::lexicon::CategoryKeywords;
    use rstest::rstest;

    fn builtin() -> KeywordClassifier {
        KeywordClassifier::new(Lexicon::builtin()).expect("matcher builds")
    }

    #[rstest]
    #[case(
        "I had a wonderful dream about my wedding, everyone was laughing and happy.",
        CategoryLabel::Happy
    )]
    // fear(terrified) と stress(monster) が1点で同点 -> レキシコン順で fear
    #[case(
        "I saw a monster chasing me in a dark forest, I was terrified.",
        CategoryLabel::Fear
    )]
    #[case("We walked along the beach and talked for hours.", CategoryLabel::Neutral)]
    #[case("A nightmare: I was trapped and chased by a monster.", CategoryLabel::Stress)]
    fn classifies_builtin_examples(#[case] text: &str, #[case] expected: CategoryLabel) {
        assert_eq!(builtin().classify(text), expected);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let classifier = builtin();
        // "miss" は "mission" の一部としても数える
        let scores = classifier.scores("The MISSION failed");
        assert!(scores.contains(&(CategoryLabel::Sadness, 1)));
        assert_eq!(classifier.classify("The MISSION failed"), CategoryLabel::Sadness);
    }

    #[test]
    fn each_keyword_counts_once_per_text() {
        let classifier = builtin();
        let scores = classifier.scores("happy happy happy joy");
        assert!(scores.contains(&(CategoryLabel::Happy, 2)));
    }

    #[test]
    fn overlapping_keywords_all_count() {
        let classifier = builtin();
        // "unhappy" は sadness の unhappy と happy の happy の両方に当たる
        let scores = classifier.scores("unhappy");
        assert!(scores.contains(&(CategoryLabel::Sadness, 1)));
        assert!(scores.contains(&(CategoryLabel::Happy, 1)));
        assert_eq!(classifier.classify("unhappy"), CategoryLabel::Happy);
    }

    #[test]
    fn zero_scores_fall_back_to_neutral_even_if_neutral_is_not_first() {
        let lexicon = Lexicon::new(vec![
            CategoryKeywords {
                category: CategoryLabel::Stress,
                keywords: vec!["monster".into()],
            },
            CategoryKeywords {
                category: CategoryLabel::Neutral,
                keywords: vec![],
            },
        ])
        .expect("valid lexicon");
        let classifier = KeywordClassifier::new(lexicon).expect("matcher builds");

        assert_eq!(classifier.classify("nothing here"), CategoryLabel::Neutral);
        assert_eq!(classifier.classify("a Monster"), CategoryLabel::Stress);
    }

    #[test]
    fn injected_order_controls_ties() {
        let lexicon = Lexicon::new(vec![
            CategoryKeywords {
                category: CategoryLabel::Stress,
                keywords: vec!["monster".into()],
            },
            CategoryKeywords {
                category: CategoryLabel::Fear,
                keywords: vec!["terrified".into()],
            },
            CategoryKeywords {
                category: CategoryLabel::Neutral,
                keywords: vec![],
            },
        ])
        .expect("valid lexicon");
        let classifier = KeywordClassifier::new(lexicon).expect("matcher builds");

        assert_eq!(
            classifier.classify("a monster, I was terrified"),
            CategoryLabel::Stress
        );
    }

    #[test]
    fn classify_all_preserves_order() {
        let texts = vec![
            "so much fun".to_string(),
            "pure horror".to_string(),
            "plain text".to_string(),
        ];
        assert_eq!(
            builtin().classify_all(&texts),
            vec![
                CategoryLabel::Happy,
                CategoryLabel::Fear,
                CategoryLabel::Neutral
            ]
        );
    }
}
