use std::sync::Arc;

use serde::Serialize;
use supply_protocol::{MappingEntry, RetrievalResult};

use crate::dataset::DatasetStore;
use crate::mapping::{MappingTable, SharedMappingTable};
use crate::normalizer::{Normalizer, TokenSequence};
use crate::similarity;

/// Minimum similarity for a mapping entry to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.3;

/// A mapping entry that cleared [`MATCH_THRESHOLD`], with its score.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub entry: &'a MappingEntry,
    pub score: f64,
}

/// Qualifying entries in table order, lazily.
///
/// Labels are normalized and scored one at a time as the iterator advances,
/// so a caller that stops at the first usable candidate never scores the rest.
pub fn candidates<'a, 'q>(
    query: &'q TokenSequence,
    table: &'a MappingTable,
    normalizer: &'q Normalizer,
) -> impl Iterator<Item = Candidate<'a>> + 'q
where
    'a: 'q,
{
    table.iter().filter_map(move |entry| {
        let label = normalizer.normalize(&entry.label);
        let score = similarity::score(query, &label);
        log::debug!(
            "Activity {:?} tokens {label} score {score:.4} against query {query}",
            entry.label
        );
        (score >= MATCH_THRESHOLD).then_some(Candidate { entry, score })
    })
}

/// First entry, in table order, whose label scores at least
/// [`MATCH_THRESHOLD`] against `query`.
///
/// Table order is a priority order: an earlier qualifying entry wins even when
/// a later one would score higher.
pub fn find_candidate<'a>(
    query: &TokenSequence,
    table: &'a MappingTable,
    normalizer: &Normalizer,
) -> Option<&'a MappingEntry> {
    candidates(query, table, normalizer)
        .next()
        .map(|candidate| candidate.entry)
}

/// Per-entry score report produced by [`QueryResolver::explain`].
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub query: String,
    pub tokens: Vec<String>,
    pub threshold: f64,
    pub entries: Vec<EntryScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryScore {
    pub label: String,
    pub dataset: String,
    pub tokens: Vec<String>,
    pub score: f64,
    pub qualifies: bool,
}

/// Orchestrates normalize -> scan -> load for one query at a time.
///
/// All state is shared read-only, so one resolver can be cloned across
/// threads and called concurrently.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    normalizer: Arc<Normalizer>,
    mapping: Arc<SharedMappingTable>,
    store: DatasetStore,
}

impl QueryResolver {
    pub fn new(
        normalizer: Arc<Normalizer>,
        mapping: Arc<SharedMappingTable>,
        store: DatasetStore,
    ) -> Self {
        Self {
            normalizer,
            mapping,
            store,
        }
    }

    pub fn mapping(&self) -> &Arc<SharedMappingTable> {
        &self.mapping
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub fn resolve(&self, query: &str) -> RetrievalResult {
        log::info!("Received query: {query}");
        let tokens = self.normalizer.normalize(query);
        let table = self.mapping.snapshot();

        for candidate in candidates(&tokens, &table, &self.normalizer) {
            let dataset = &candidate.entry.dataset;
            match self.store.load(dataset) {
                Ok(payload) => {
                    log::info!(
                        "Matched activity {:?} (score {:.4}); serving {}",
                        candidate.entry.label,
                        candidate.score,
                        self.store.root().join(dataset).display()
                    );
                    return RetrievalResult::Found(payload);
                }
                Err(err) => {
                    log::warn!(
                        "Skipping activity {:?}: {err}",
                        candidate.entry.label
                    );
                }
            }
        }

        log::warn!("No data found for query: {query}");
        RetrievalResult::not_found()
    }

    /// Score every entry of the current table against `query`. Never loads
    /// datasets.
    pub fn explain(&self, query: &str) -> Explanation {
        let tokens = self.normalizer.normalize(query);
        let table = self.mapping.snapshot();

        let entries = table
            .iter()
            .map(|entry| {
                let label = self.normalizer.normalize(&entry.label);
                let score = similarity::score(&tokens, &label);
                EntryScore {
                    label: entry.label.clone(),
                    dataset: entry.dataset.clone(),
                    tokens: label.as_slice().to_vec(),
                    score,
                    qualifies: score >= MATCH_THRESHOLD,
                }
            })
            .collect();

        Explanation {
            query: query.to_string(),
            tokens: tokens.as_slice().to_vec(),
            threshold: MATCH_THRESHOLD,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn table(pairs: &[(&str, &str)]) -> MappingTable {
        pairs
            .iter()
            .map(|(label, dataset)| MappingEntry::new(*label, *dataset))
            .collect()
    }

    fn write_json(dir: &Path, name: &str, value: &serde_json::Value) {
        fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn resolver(pairs: &[(&str, &str)], dir: &TempDir) -> QueryResolver {
        QueryResolver::new(
            Arc::new(Normalizer::english()),
            Arc::new(SharedMappingTable::new(table(pairs))),
            DatasetStore::new(dir.path()),
        )
    }

    fn inventory_fixture() -> (TempDir, QueryResolver) {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "inventory.json", &json!({"inventory_level": 87}));
        write_json(dir.path(), "orders.json", &json!({"fulfillment_rate": 0.93}));
        let resolver = resolver(
            &[
                ("inventory management", "inventory.json"),
                ("order fulfillment", "orders.json"),
            ],
            &dir,
        );
        (dir, resolver)
    }

    #[test]
    fn test_resolves_matching_activity() {
        let (_dir, resolver) = inventory_fixture();
        assert_eq!(
            resolver.resolve("inventory management levels"),
            RetrievalResult::Found(json!({"inventory_level": 87}))
        );
        assert_eq!(
            resolver.resolve("How is our order fulfillment going?"),
            RetrievalResult::Found(json!({"fulfillment_rate": 0.93}))
        );
    }

    #[test]
    fn test_unrelated_query_is_not_found() {
        let (_dir, resolver) = inventory_fixture();
        assert_eq!(
            resolver.resolve("zzz unrelated nonsense"),
            RetrievalResult::not_found()
        );
    }

    #[test]
    fn test_empty_query_is_not_found() {
        let (_dir, resolver) = inventory_fixture();
        assert_eq!(resolver.resolve(""), RetrievalResult::not_found());
        assert_eq!(resolver.resolve("the of and"), RetrievalResult::not_found());
    }

    #[test]
    fn test_empty_table_is_not_found() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "inventory.json", &json!({}));
        let resolver = resolver(&[], &dir);
        assert_eq!(
            resolver.resolve("inventory management"),
            RetrievalResult::not_found()
        );
    }

    #[test]
    fn test_missing_file_falls_through_to_next_candidate() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "delays.json", &json!({"delayed_shipments": 4}));
        let resolver = resolver(
            &[("shipping", "missing.json"), ("shipping delay", "delays.json")],
            &dir,
        );
        assert_eq!(
            resolver.resolve("shipping delay issue"),
            RetrievalResult::Found(json!({"delayed_shipments": 4}))
        );
    }

    #[test]
    fn test_missing_file_without_other_match_is_not_found() {
        let dir = tempdir().unwrap();
        let resolver = resolver(
            &[("shipping", "missing.json"), ("order fulfillment", "orders.json")],
            &dir,
        );
        assert_eq!(resolver.resolve("shipping"), RetrievalResult::not_found());
    }

    #[test]
    fn test_malformed_file_falls_through_to_next_candidate() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("corrupt.json"), "{oops").unwrap();
        write_json(dir.path(), "good.json", &json!(["ok"]));
        let resolver = resolver(
            &[("supplier delivery", "corrupt.json"), ("supplier", "good.json")],
            &dir,
        );
        assert_eq!(
            resolver.resolve("supplier delivery"),
            RetrievalResult::Found(json!(["ok"]))
        );
    }

    #[test]
    fn test_first_qualifying_entry_wins_over_higher_score() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "general.json", &json!({"source": "general"}));
        write_json(dir.path(), "exact.json", &json!({"source": "exact"}));
        let resolver = resolver(
            &[
                ("warehouse", "general.json"),
                ("warehouse capacity planning", "exact.json"),
            ],
            &dir,
        );

        let explanation = resolver.explain("warehouse capacity planning");
        assert!(explanation.entries[0].qualifies);
        assert!(explanation.entries[1].score > explanation.entries[0].score);

        assert_eq!(
            resolver.resolve("warehouse capacity planning"),
            RetrievalResult::Found(json!({"source": "general"}))
        );
    }

    #[test]
    fn test_find_candidate_respects_table_order() {
        let normalizer = Normalizer::english();
        let table = table(&[
            ("order fulfillment", "orders.json"),
            ("transport efficiency", "transport.json"),
            ("transport", "transport-general.json"),
        ]);

        let query = normalizer.normalize("transport efficiency report");
        let found = find_candidate(&query, &table, &normalizer).unwrap();
        assert_eq!(found.dataset, "transport.json");

        let all: Vec<&str> = candidates(&query, &table, &normalizer)
            .map(|c| c.entry.dataset.as_str())
            .collect();
        assert_eq!(all, vec!["transport.json", "transport-general.json"]);

        let unrelated = normalizer.normalize("quarterly tax filing");
        assert!(find_candidate(&unrelated, &table, &normalizer).is_none());
    }

    #[test]
    fn test_singular_query_matches_plural_label() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "kpi.json", &json!({"on_time_rate": 0.97}));
        let resolver = resolver(&[("supplier metrics", "kpi.json")], &dir);

        assert_eq!(
            resolver.resolve("metric"),
            RetrievalResult::Found(json!({"on_time_rate": 0.97}))
        );
        let explanation = resolver.explain("which supplier metric");
        assert!((explanation.entries[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_label_scores_one() {
        let (_dir, resolver) = inventory_fixture();
        let explanation = resolver.explain("Order_Fulfillment");
        assert_eq!(explanation.tokens, vec!["order", "fulfillment"]);
        let entry = &explanation.entries[1];
        assert!((entry.score - 1.0).abs() < 1e-9);
        assert!(!explanation.entries[0].qualifies);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let (_dir, resolver) = inventory_fixture();
        let first = resolver.resolve("inventory management levels");
        let second = resolver.resolve("inventory management levels");
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_sees_swapped_table() {
        let (_dir, resolver) = inventory_fixture();
        resolver.mapping().replace(MappingTable::empty());
        assert_eq!(
            resolver.resolve("inventory management"),
            RetrievalResult::not_found()
        );
    }
}
