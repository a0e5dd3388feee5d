use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Reason attached to every unsuccessful resolution.
pub const NOT_FOUND_REASON: &str = "No data found for the given query";

/// Name under which the retrieval operation is exposed to tool-calling LLMs.
pub const TOOL_NAME: &str = "get_supply_chain_data";

/// Opaque structured payload read from the dataset store. Never inspected.
pub type Document = serde_json::Value;

/// One (activity label -> dataset file) pair of the mapping table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct MappingEntry {
    pub label: String,
    pub dataset: String,
}

impl MappingEntry {
    pub fn new(label: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            dataset: dataset.into(),
        }
    }
}

/// Outcome of a single resolution call.
///
/// On the wire a `Found` result is the raw document and a `NotFound` result is
/// `{"error": reason}`, so callers that only render JSON never need to know
/// about the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalResult {
    Found(Document),
    NotFound { reason: String },
}

impl RetrievalResult {
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound {
            reason: NOT_FOUND_REASON.to_string(),
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Document> {
        match self {
            Self::Found(payload) => Some(payload),
            Self::NotFound { .. } => None,
        }
    }

    /// Wire representation as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Found(payload) => payload.clone(),
            Self::NotFound { reason } => serde_json::json!({ "error": reason }),
        }
    }
}

impl Serialize for RetrievalResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Found(payload) => payload.serialize(serializer),
            Self::NotFound { reason } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", reason)?;
                map.end()
            }
        }
    }
}

/// Arguments of the `get_supply_chain_data` tool call.
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct SupplyChainQuery {
    /// The query related to a supply chain activity
    pub query: String,
}

/// Function definition handed to the LLM host so it can call the retrieval
/// operation.
pub fn tool_definition() -> serde_json::Result<serde_json::Value> {
    let mut parameters = serde_json::to_value(schemars::schema_for!(SupplyChainQuery))?;
    if let Some(obj) = parameters.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }

    Ok(serde_json::json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Get the supply chain data for a given query",
            "parameters": parameters,
        }
    }))
}

pub fn serialize_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value)
}
