/// 汎用英語極性辞書。
///
/// 値は [-1, 1] の事前極性。形容詞中心で、夢の記述に頻出する語を優先している。
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

const POLARITY_ENTRIES: &[(&str, f64)] = &[
    // positive
    ("happy", 0.8),
    ("happier", 0.8),
    ("happiest", 0.8),
    ("wonderful", 1.0),
    ("beautiful", 0.85),
    ("good", 0.7),
    ("better", 0.5),
    ("best", 1.0),
    ("great", 0.8),
    ("nice", 0.6),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("excellent", 1.0),
    ("perfect", 1.0),
    ("lovely", 0.5),
    ("pleasant", 0.733),
    ("fun", 0.3),
    ("funny", 0.25),
    ("glad", 0.5),
    ("joyful", 0.8),
    ("cheerful", 0.8),
    ("delightful", 1.0),
    ("delighted", 0.7),
    ("fantastic", 0.4),
    ("incredible", 0.9),
    ("magical", 0.5),
    ("peaceful", 0.25),
    ("calm", 0.3),
    ("safe", 0.5),
    ("warm", 0.6),
    ("bright", 0.7),
    ("sweet", 0.35),
    ("kind", 0.6),
    ("friendly", 0.375),
    ("gentle", 0.35),
    ("proud", 0.8),
    ("excited", 0.375),
    ("exciting", 0.3),
    ("relaxed", 0.3),
    ("comfortable", 0.4),
    ("free", 0.4),
    ("successful", 0.75),
    ("lucky", 0.333),
    ("brilliant", 0.9),
    ("gorgeous", 0.7),
    ("pretty", 0.25),
    ("cute", 0.5),
    ("love", 0.5),
    ("loved", 0.7),
    ("loving", 0.6),
    ("enjoy", 0.4),
    ("enjoyed", 0.4),
    ("laughing", 0.3),
    ("smiling", 0.3),
    ("fine", 0.417),
    ("interesting", 0.5),
    ("special", 0.357),
    ("clean", 0.367),
    ("healthy", 0.5),
    ("rich", 0.375),
    ("strong", 0.433),
    ("easy", 0.433),
    ("fresh", 0.3),
    ("hopeful", 0.5),
    ("grateful", 0.6),
    ("thankful", 0.5),
    ("wise", 0.7),
    ("positive", 0.227),
    ("true", 0.35),
    ("welcome", 0.8),
    ("cool", 0.35),
    ("soft", 0.1),
    ("quiet", 0.1),
    ("heavenly", 0.7),
    ("blessed", 0.5),
    ("romantic", 0.3),
    // negative
    ("sad", -0.5),
    ("sadder", -0.5),
    ("unhappy", -0.6),
    ("terrible", -1.0),
    ("horrible", -1.0),
    ("awful", -1.0),
    ("bad", -0.7),
    ("worse", -0.4),
    ("worst", -1.0),
    ("dark", -0.15),
    ("darker", -0.15),
    ("scary", -0.5),
    ("scared", -0.6),
    ("terrified", -1.0),
    ("terrifying", -1.0),
    ("afraid", -0.6),
    ("frightened", -0.7),
    ("frightening", -0.7),
    ("fearful", -0.6),
    ("angry", -0.5),
    ("mad", -0.625),
    ("furious", -0.8),
    ("upset", -0.4),
    ("ugly", -0.7),
    ("evil", -1.0),
    ("dead", -0.2),
    ("dying", -0.4),
    ("creepy", -0.5),
    ("weird", -0.5),
    ("strange", -0.05),
    ("lonely", -0.3),
    ("alone", -0.1),
    ("lost", -0.1),
    ("miserable", -1.0),
    ("depressed", -0.6),
    ("anxious", -0.25),
    ("nervous", -0.3),
    ("worried", -0.4),
    ("stressed", -0.5),
    ("tired", -0.4),
    ("sick", -0.714),
    ("hurt", -0.4),
    ("painful", -0.7),
    ("cruel", -1.0),
    ("violent", -0.8),
    ("bloody", -0.8),
    ("disgusting", -1.0),
    ("horrified", -0.8),
    ("panicked", -0.6),
    ("desperate", -0.6),
    ("helpless", -0.5),
    ("hopeless", -0.7),
    ("guilty", -0.5),
    ("ashamed", -0.6),
    ("embarrassed", -0.4),
    ("confused", -0.4),
    ("broken", -0.4),
    ("cold", -0.6),
    ("wrong", -0.5),
    ("poor", -0.4),
    ("dangerous", -0.6),
    ("hostile", -0.4),
    ("nasty", -1.0),
    ("stupid", -0.8),
    ("boring", -1.0),
    ("annoying", -0.8),
    ("annoyed", -0.4),
    ("difficult", -0.5),
    ("hard", -0.292),
    ("strict", -0.2),
    ("empty", -0.1),
    ("crazy", -0.6),
    ("insane", -1.0),
    ("hate", -0.8),
    ("hated", -0.8),
    ("cry", -0.3),
    ("crying", -0.4),
    ("screaming", -0.5),
    ("killed", -0.6),
    ("negative", -0.3),
    ("grim", -0.5),
    ("gloomy", -0.6),
    ("eerie", -0.5),
    ("haunted", -0.4),
    ("sinister", -0.6),
    ("threatening", -0.6),
    ("disturbing", -0.6),
];

/// 直後の極性語を強める副詞と倍率。
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("so", 1.3),
    ("too", 1.3),
    ("super", 1.3),
    ("truly", 1.3),
    ("quite", 1.1),
    ("pretty", 1.1),
    ("totally", 1.3),
    ("absolutely", 1.5),
];

/// 否定語。アポストロフィはU+0027とU+2019の両方を受ける。
const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "cannot", "without",
];

static POLARITY: Lazy<FxHashMap<&'static str, f64>> =
    Lazy::new(|| POLARITY_ENTRIES.iter().copied().collect());

static INTENSITY: Lazy<FxHashMap<&'static str, f64>> =
    Lazy::new(|| INTENSIFIERS.iter().copied().collect());

#[must_use]
pub(crate) fn prior_polarity(word: &str) -> Option<f64> {
    POLARITY.get(word).copied()
}

#[must_use]
pub(crate) fn intensity(word: &str) -> Option<f64> {
    INTENSITY.get(word).copied()
}

#[must_use]
pub(crate) fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't") || word.ends_with("n\u{2019}t")
}
