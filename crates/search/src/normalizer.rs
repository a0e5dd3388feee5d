use std::fmt;
use std::sync::Arc;

use crate::lexicon::Lexicon;

/// Ordered, normalized words of one input string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenSequence(Vec<String>);

impl TokenSequence {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Space-joined form used as a vectorizer document.
    pub fn to_document(&self) -> String {
        self.0.join(" ")
    }
}

impl fmt::Display for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Turns raw text into a [`TokenSequence`].
///
/// Pipeline: split on whitespace and `_`, lowercase, keep purely alphabetic
/// pieces, drop stopwords, lemmatize. The lexicon is shared and never mutated,
/// so one normalizer can serve any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct Normalizer {
    lexicon: Arc<Lexicon>,
}

impl Normalizer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn english() -> Self {
        Self::new(Arc::new(Lexicon::english()))
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn normalize(&self, text: &str) -> TokenSequence {
        text.split(|c: char| c.is_whitespace() || c == '_')
            .map(str::to_lowercase)
            .filter(|piece| !piece.is_empty() && piece.chars().all(char::is_alphabetic))
            .filter(|piece| !self.lexicon.is_stopword(piece))
            .map(|piece| self.lexicon.lemmatize(&piece))
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::english()
    }
}
