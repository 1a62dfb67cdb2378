//! Token vocabulary and bag-of-words encoding.
use rustc_hash::FxHashMap;

/// `(term_id, count)` pairs sorted by `term_id`.
pub type BagOfWords = Vec<(usize, u32)>;

/// Maps tokens to dense integer ids.
///
/// Ids are handed out in first-seen document order; inside one document the
/// new tokens are numbered in sorted order.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    token_to_id: FxHashMap<String, usize>,
    id_to_token: Vec<String>,
}

impl Dictionary {
    #[must_use]
    pub fn from_documents(documents: &[Vec<String>]) -> Self {
        let mut dictionary = Self::default();
        for document in documents {
            let mut unique: Vec<&str> = document.iter().map(String::as_str).collect();
            unique.sort_unstable();
            unique.dedup();
            for token in unique {
                if !dictionary.token_to_id.contains_key(token) {
                    let id = dictionary.id_to_token.len();
                    dictionary.token_to_id.insert(token.to_string(), id);
                    dictionary.id_to_token.push(token.to_string());
                }
            }
        }
        dictionary
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    #[must_use]
    pub fn token(&self, id: usize) -> Option<&str> {
        self.id_to_token.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn id(&self, token: &str) -> Option<usize> {
        self.token_to_id.get(token).copied()
    }

    /// Counts known tokens. Unknown tokens are ignored.
    #[must_use]
    pub fn doc2bow(&self, document: &[String]) -> BagOfWords {
        let mut counts: FxHashMap<usize, u32> = FxHashMap::default();
        for token in document {
            if let Some(id) = self.id(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: BagOfWords = counts.into_iter().collect();
        bow.sort_unstable_by_key(|(id, _)| *id);
        bow
    }
}
