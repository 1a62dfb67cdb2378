/// 文字数による長さフィルタ。
///
/// 短すぎる（ノイズ）・長すぎる（外れ値）テキストを注釈前に一度だけ除外する。
use crate::util::text::char_length;

pub const DEFAULT_MIN_LENGTH: usize = 20;
pub const DEFAULT_MAX_LENGTH: usize = 500;

/// `min < len(t) < max` を満たすテキストだけを残す（両端とも開区間）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthFilter {
    min_exclusive: usize,
    max_exclusive: usize,
}

impl Default for LengthFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH)
    }
}

impl LengthFilter {
    #[must_use]
    pub const fn new(min_exclusive: usize, max_exclusive: usize) -> Self {
        Self {
            min_exclusive,
            max_exclusive,
        }
    }

    #[must_use]
    pub fn accepts(&self, text: &str) -> bool {
        let length = char_length(text);
        self.min_exclusive < length && length < self.max_exclusive
    }

    /// 入力順を保ったまま条件を満たすテキストを返す。
    #[must_use]
    pub fn apply(&self, texts: Vec<String>) -> Vec<String> {
        texts.into_iter().filter(|text| self.accepts(text)).collect()
    }
}
