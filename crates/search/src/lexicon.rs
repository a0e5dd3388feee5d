//! Language resources used by the normalizer: the English stopword set and a
//! noun lemmatizer. Both are built once and never mutated afterwards.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SearchError};

/// NLTK English stopword list.
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Irregular plural -> singular forms that suffix rules get wrong.
const IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("children", "child"),
    ("people", "person"),
    ("men", "man"),
    ("women", "woman"),
    ("salesmen", "salesman"),
    ("workmen", "workman"),
    ("foremen", "foreman"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("mice", "mouse"),
    ("oxen", "ox"),
    ("analyses", "analysis"),
    ("crises", "crisis"),
    ("diagnoses", "diagnosis"),
    ("hypotheses", "hypothesis"),
    ("theses", "thesis"),
    ("criteria", "criterion"),
    ("phenomena", "phenomenon"),
    ("indices", "index"),
    ("matrices", "matrix"),
    ("appendices", "appendix"),
    ("vertices", "vertex"),
    ("buses", "bus"),
    ("gases", "gas"),
    ("statuses", "status"),
    ("quizzes", "quiz"),
    ("shelves", "shelf"),
    ("halves", "half"),
    ("calves", "calf"),
    ("knives", "knife"),
    ("lives", "life"),
    ("wives", "wife"),
    ("leaves", "leaf"),
    ("loaves", "loaf"),
    ("thieves", "thief"),
    ("wolves", "wolf"),
    ("caches", "cache"),
    ("niches", "niche"),
    ("headaches", "headache"),
    ("movies", "movie"),
    ("cookies", "cookie"),
];

/// Words ending in `s` that are already in base form.
const INVARIANT_WORDS: &[&str] = &[
    "always", "afterwards", "analytics", "besides", "economics", "electronics", "ethics",
    "lens", "logistics", "mathematics", "means", "news", "perhaps", "physics", "series",
    "sometimes", "species", "towards", "whereas",
];

/// Endings that mark a base form even though the word ends in `s`.
const PROTECTED_ENDINGS: &[&str] = &["ss", "us", "is"];

/// Resource file layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
struct RawLexicon {
    #[serde(default)]
    stopwords: Option<Vec<String>>,
    #[serde(default)]
    lemmas: Option<HashMap<String, String>>,
    #[serde(default)]
    invariant: Option<Vec<String>>,
}

/// Rule-based English noun lemmatizer backed by an exception table.
#[derive(Debug, Clone)]
pub struct Lemmatizer {
    exceptions: HashMap<String, String>,
    invariant: HashSet<String>,
}

impl Lemmatizer {
    pub fn english() -> Self {
        Self {
            exceptions: IRREGULAR_NOUNS
                .iter()
                .map(|(form, base)| (form.to_string(), base.to_string()))
                .collect(),
            invariant: INVARIANT_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Reduce a lowercase alphabetic word to its noun base form.
    pub fn lemmatize(&self, word: &str) -> String {
        if let Some(base) = self.exceptions.get(word) {
            return base.clone();
        }
        if word.chars().count() <= 3 || self.invariant.contains(word) {
            return word.to_string();
        }
        if PROTECTED_ENDINGS.iter().any(|ending| word.ends_with(ending)) {
            return word.to_string();
        }

        if let Some(stem) = word.strip_suffix("ies") {
            if stem.chars().count() >= 2 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = word.strip_suffix("es") {
            if ["ss", "sh", "x", "zz"]
                .iter()
                .any(|ending| stem.ends_with(ending))
            {
                return stem.to_string();
            }
            if stem.ends_with("ch") && ch_takes_es(stem) {
                return stem.to_string();
            }
        }
        match word.strip_suffix('s') {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => word.to_string(),
        }
    }
}

/// `batches`, `branches`, `approaches` take `-es`; `caches`-style words are
/// `-che` nouns that only take `-s`.
fn ch_takes_es(stem: &str) -> bool {
    let head = &stem[..stem.len() - 2];
    if head.ends_with('t') || head.ends_with("oa") || head.ends_with("ea") || head.ends_with("ou") {
        return true;
    }
    head.chars()
        .last()
        .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'))
}

/// Stopwords plus lemmatizer, shared read-only by every normalizer call.
#[derive(Debug, Clone)]
pub struct Lexicon {
    stopwords: HashSet<String>,
    lemmatizer: Lemmatizer,
}

impl Lexicon {
    pub fn english() -> Self {
        Self {
            stopwords: ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            lemmatizer: Lemmatizer::english(),
        }
    }

    /// Parse a JSON lexicon resource. A `stopwords` list replaces the built-in
    /// set; `lemmas` and `invariant` extend the built-in lemmatizer tables.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let raw: RawLexicon = serde_json::from_str(raw)
            .map_err(|err| SearchError::InvalidLexicon(err.to_string()))?;
        let mut lexicon = Self::english();

        if let Some(stopwords) = raw.stopwords {
            lexicon.stopwords = stopwords.into_iter().map(|w| w.to_lowercase()).collect();
        }
        if let Some(lemmas) = raw.lemmas {
            for (form, base) in lemmas {
                if form.trim().is_empty() || base.trim().is_empty() {
                    return Err(SearchError::InvalidLexicon(format!(
                        "empty lemma entry: {form:?} -> {base:?}"
                    )));
                }
                lexicon
                    .lemmatizer
                    .exceptions
                    .insert(form.to_lowercase(), base.to_lowercase());
            }
        }
        if let Some(invariant) = raw.invariant {
            lexicon
                .lemmatizer
                .invariant
                .extend(invariant.into_iter().map(|w| w.to_lowercase()));
        }

        Ok(lexicon)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let lexicon = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded lexicon from {} ({} stopwords)",
            path.display(),
            lexicon.stopwords.len()
        );
        Ok(lexicon)
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn lemmatize(&self, word: &str) -> String {
        self.lemmatizer.lemmatize(word)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("orders"), "order");
        assert_eq!(lem.lemmatize("levels"), "level");
        assert_eq!(lem.lemmatize("warehouses"), "warehouse");
        assert_eq!(lem.lemmatize("deliveries"), "delivery");
        assert_eq!(lem.lemmatize("supplies"), "supply");
        assert_eq!(lem.lemmatize("processes"), "process");
        assert_eq!(lem.lemmatize("boxes"), "box");
        assert_eq!(lem.lemmatize("batches"), "batch");
        assert_eq!(lem.lemmatize("approaches"), "approach");
        assert_eq!(lem.lemmatize("sizes"), "size");
        assert_eq!(lem.lemmatize("ties"), "tie");
    }

    #[test]
    fn test_ics_plurals_reduce_but_ics_fields_stay() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("metrics"), "metric");
        assert_eq!(lem.lemmatize("topics"), "topic");
        assert_eq!(lem.lemmatize("statistics"), "statistic");
        assert_eq!(lem.lemmatize("characteristics"), "characteristic");
        for word in ["logistics", "analytics", "electronics", "economics", "physics"] {
            assert_eq!(lem.lemmatize(word), word);
        }
    }

    #[test]
    fn test_base_forms_are_kept() {
        let lem = Lemmatizer::english();
        for word in [
            "inventory",
            "shipping",
            "management",
            "logistics",
            "status",
            "analysis",
            "process",
            "news",
            "gas",
            "data",
        ] {
            assert_eq!(lem.lemmatize(word), word, "{word} should be unchanged");
        }
    }

    #[test]
    fn test_irregular_forms() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("children"), "child");
        assert_eq!(lem.lemmatize("shelves"), "shelf");
        assert_eq!(lem.lemmatize("analyses"), "analysis");
        assert_eq!(lem.lemmatize("caches"), "cache");
    }

    #[test]
    fn test_english_stopwords() {
        let lexicon = Lexicon::english();
        assert!(lexicon.is_stopword("the"));
        assert!(lexicon.is_stopword("about"));
        assert!(!lexicon.is_stopword("inventory"));
    }

    #[test]
    fn test_resource_overrides_stopwords_and_extends_lemmas() {
        let lexicon = Lexicon::from_json_str(
            r#"{"stopwords": ["Please", "show"], "lemmas": {"pallets": "skid"}}"#,
        )
        .unwrap();
        assert!(lexicon.is_stopword("please"));
        assert!(!lexicon.is_stopword("the"));
        assert_eq!(lexicon.lemmatize("pallets"), "skid");
        assert_eq!(lexicon.lemmatize("children"), "child");
    }

    #[test]
    fn test_resource_missing_keys_fall_back() {
        let lexicon = Lexicon::from_json_str("{}").unwrap();
        assert!(lexicon.is_stopword("the"));
        assert_eq!(lexicon.lemmatize("orders"), "order");
    }

    #[test]
    fn test_resource_rejects_garbage() {
        assert!(matches!(
            Lexicon::from_json_str("[1, 2]"),
            Err(SearchError::InvalidLexicon(_))
        ));
        assert!(Lexicon::from_json_str(r#"{"lemmas": {"x": ""}}"#).is_err());
    }
}
