//! Query resolution engine for supply-chain activity lookups.
//!
//! A free-text query is normalized, compared against the labels of an ordered
//! mapping table with a two-document TF-IDF cosine score, and the first entry
//! whose dataset loads successfully is returned.

mod dataset;
mod error;
mod lexicon;
mod mapping;
mod normalizer;
mod resolver;
pub mod similarity;

pub use dataset::{load, DatasetStore};
pub use error::{DatasetError, Result, SearchError};
pub use lexicon::{Lemmatizer, Lexicon};
pub use mapping::{
    load_or_empty, refresh, FileMappingSource, MappingSource, MappingTable, SharedMappingTable,
};
pub use normalizer::{Normalizer, TokenSequence};
pub use resolver::{
    candidates, find_candidate, Candidate, EntryScore, Explanation, QueryResolver,
    MATCH_THRESHOLD,
};
pub use similarity::score;
pub use supply_protocol::{Document, MappingEntry, RetrievalResult};
