/// テキスト処理ユーティリティ。
///
/// 長さ計測、トピックモデル用の正規化、極性判定用の単語分割を提供する。
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid non-alphanumeric pattern"));

/// トピック語彙に残す最小の文字数（この値以下は捨てる）。
pub const MIN_TOPIC_TOKEN_CHARS: usize = 2;

/// 文字数（Unicodeスカラー値の数）を返す。バイト長ではない。
#[must_use]
pub fn char_length(text: &str) -> usize {
    text.chars().count()
}

/// ASCII英数字と空白以外を取り除き、小文字化する。
#[must_use]
pub fn strip_non_alphanumeric(text: &str) -> String {
    NON_ALPHANUMERIC.replace_all(text, "").to_lowercase()
}

/// トピックモデル用のトークン列を作る。
///
/// 正規化後に空白で分割し、2文字以下のトークンを捨てる。
#[must_use]
pub fn topic_tokens(text: &str) -> Vec<String> {
    strip_non_alphanumeric(text)
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOPIC_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// UAX#29の単語境界で分割し、小文字化した単語列を返す。
#[must_use]
pub fn lowercase_words(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}
