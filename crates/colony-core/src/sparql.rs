// SPDX-License-Identifier: AGPL-3.0
// Colony Core - SPARQL search result parsing
//
// The pod datastore answers metadata searches with SPARQL JSON results.
// These parsers flatten the bindings into one row per subject for the
// search and browse tables. Malformed input yields an empty result set,
// never an error.

use crate::format::format_file_size;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const SCHEMA_PREFIX: &str = "http://schema.org/";
const RDF_SYNTAX_PREFIX: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const ANT_SCHEME: &str = "ant://";

const NAME_PREDICATE: &str = "http://schema.org/name";
const DESCRIPTION_PREDICATE: &str = "http://schema.org/description";
const SIZE_PREDICATE: &str = "http://schema.org/contentSize";
const TYPE_PREDICATE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// One aggregated search result, keyed by subject address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based ordinal of the row where the subject first appeared
    pub id: usize,
    /// Pod (graph) address, `ant://` scheme stripped
    pub pod: String,
    /// Subject address, `ant://` scheme stripped
    pub address: String,
    pub depth: Option<String>,
    pub name: String,
    pub description: String,
    /// Formatted size label, "Unknown" when the pod reported none
    pub size: String,
    pub bytes: u64,
    /// rdf type of the subject
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining predicate or variable values, keyed by shortened name
    pub extra: BTreeMap<String, String>,
}

impl SearchHit {
    fn seed(id: usize, graph: &str, subject: &str, depth: Option<&str>) -> Self {
        Self {
            id,
            pod: strip_ant_scheme(graph).to_string(),
            address: strip_ant_scheme(subject).to_string(),
            depth: depth.map(str::to_string),
            name: String::new(),
            description: String::new(),
            size: "Unknown".to_string(),
            bytes: 0,
            kind: String::new(),
            extra: BTreeMap::new(),
        }
    }

    fn set_bytes(&mut self, raw: &str) {
        if let Ok(n) = raw.parse::<f64>() {
            if n.is_finite() && n >= 0.0 {
                let bytes = n as u64;
                self.size = format_file_size(bytes);
                self.bytes = bytes;
            }
        }
    }

    fn apply_predicate(&mut self, predicate: &str, object: &str) {
        self.extra
            .insert(shorten_predicate(predicate).to_string(), object.to_string());
        match predicate {
            NAME_PREDICATE => self.name = object.to_string(),
            DESCRIPTION_PREDICATE => self.description = object.to_string(),
            SIZE_PREDICATE => self.set_bytes(object),
            TYPE_PREDICATE => self.kind = object.to_string(),
            _ => {}
        }
    }
}

fn strip_ant_scheme(value: &str) -> &str {
    value.strip_prefix(ANT_SCHEME).unwrap_or(value)
}

/// Shorten a predicate IRI to its local name
fn shorten_predicate(predicate: &str) -> &str {
    if let Some(rest) = predicate.strip_prefix(SCHEMA_PREFIX) {
        rest
    } else if let Some(rest) = predicate.strip_prefix(RDF_SYNTAX_PREFIX) {
        rest
    } else {
        match predicate.rfind(['/', '#']) {
            Some(i) => &predicate[i + 1..],
            None => predicate,
        }
    }
}

fn binding_value<'a>(row: &'a Value, var: &str) -> Option<&'a str> {
    row.get(var)?.get("value")?.as_str()
}

/// The bindings array, provided the result envelope is well-formed
fn bindings(results: &Value) -> Option<&Vec<Value>> {
    let sparql = results.get("sparql_results")?;
    sparql.get("head")?.get("vars")?.as_array()?;
    sparql.get("results")?.get("bindings")?.as_array()
}

/// Parse text-search results: subject/graph/predicate/object rows,
/// aggregated into one hit per subject in first-appearance order.
pub fn parse_text_results(results: &Value) -> Vec<SearchHit> {
    let Some(rows) = bindings(results) else {
        tracing::debug!("malformed text search results, returning empty set");
        return Vec::new();
    };

    let mut hits: Vec<SearchHit> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let (Some(subject), Some(graph), Some(predicate)) = (
            binding_value(row, "subject"),
            binding_value(row, "graph"),
            binding_value(row, "predicate"),
        ) else {
            continue;
        };

        let slot = *index.entry(subject.to_string()).or_insert_with(|| {
            hits.push(SearchHit::seed(
                i + 1,
                graph,
                subject,
                binding_value(row, "depth"),
            ));
            hits.len() - 1
        });

        if let Some(object) = binding_value(row, "object") {
            hits[slot].apply_predicate(predicate, object);
        }
    }
    hits
}

/// Parse browse results: named-variable rows (`name`, `description`,
/// `size`, `type`, `depth`), also honoring predicate/object rows when the
/// pod mixes both shapes.
pub fn parse_browse_results(results: &Value) -> Vec<SearchHit> {
    let Some(rows) = bindings(results) else {
        tracing::debug!("malformed browse results, returning empty set");
        return Vec::new();
    };

    let mut hits: Vec<SearchHit> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
        let (Some(subject), Some(graph)) =
            (binding_value(row, "subject"), binding_value(row, "graph"))
        else {
            continue;
        };

        let slot = *index.entry(subject.to_string()).or_insert_with(|| {
            hits.push(SearchHit::seed(
                i + 1,
                graph,
                subject,
                binding_value(row, "depth"),
            ));
            hits.len() - 1
        });

        if let Some(cells) = row.as_object() {
            for (var, cell) in cells {
                let Some(value) = cell.get("value").and_then(Value::as_str) else {
                    continue;
                };
                let hit = &mut hits[slot];
                match var.as_str() {
                    "subject" | "graph" | "predicate" | "object" => {}
                    "name" => hit.name = value.to_string(),
                    "description" => hit.description = value.to_string(),
                    "size" => hit.set_bytes(value),
                    "type" => hit.kind = value.to_string(),
                    "depth" => hit.depth = Some(value.to_string()),
                    other => {
                        hit.extra.insert(other.to_string(), value.to_string());
                    }
                }
            }
        }

        if let (Some(predicate), Some(object)) =
            (binding_value(row, "predicate"), binding_value(row, "object"))
        {
            hits[slot].apply_predicate(predicate, object);
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(vars: Vec<&str>, bindings: Value) -> Value {
        json!({
            "pods_found": 1,
            "result_count": 1,
            "search_timestamp": "2025-05-01T12:00:00Z",
            "sparql_results": {
                "head": { "vars": vars },
                "results": { "bindings": bindings },
            },
        })
    }

    fn cell(value: &str) -> Value {
        json!({ "type": "literal", "value": value })
    }

    #[test]
    fn test_text_results_aggregate_per_subject() {
        let results = envelope(
            vec!["subject", "graph", "predicate", "object"],
            json!([
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://schema.org/name"),
                    "object": cell("holiday.jpg"),
                },
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://schema.org/contentSize"),
                    "object": cell("2621440"),
                },
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
                    "object": cell("http://schema.org/ImageObject"),
                },
                {
                    "subject": cell("ant://subj2"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://example.org/vocab#custom"),
                    "object": cell("other"),
                },
            ]),
        );

        let hits = parse_text_results(&results);
        assert_eq!(hits.len(), 2);

        let first = &hits[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.address, "subj1");
        assert_eq!(first.pod, "pod1");
        assert_eq!(first.name, "holiday.jpg");
        assert_eq!(first.size, "2.50 MB");
        assert_eq!(first.bytes, 2_621_440);
        assert_eq!(first.kind, "http://schema.org/ImageObject");
        assert_eq!(first.extra["name"], "holiday.jpg");
        assert_eq!(first.extra["contentSize"], "2621440");

        let second = &hits[1];
        assert_eq!(second.id, 4);
        assert_eq!(second.address, "subj2");
        assert_eq!(second.size, "Unknown");
        // Unrecognized predicate shortened past the last '#'
        assert_eq!(second.extra["custom"], "other");
    }

    #[test]
    fn test_text_results_skip_incomplete_rows() {
        let results = envelope(
            vec!["subject", "graph", "predicate", "object"],
            json!([
                { "subject": cell("ant://subj1"), "graph": cell("ant://pod1") },
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://schema.org/name"),
                    "object": cell("kept.bin"),
                },
            ]),
        );
        let hits = parse_text_results(&results);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "kept.bin");
    }

    #[test]
    fn test_browse_results_named_variables() {
        let results = envelope(
            vec!["subject", "graph", "name", "size", "depth"],
            json!([
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "name": cell("notes.txt"),
                    "description": cell("meeting notes"),
                    "size": cell("1048576"),
                    "type": cell("http://schema.org/TextDigitalDocument"),
                    "depth": cell("2"),
                    "license": cell("CC0"),
                },
            ]),
        );

        let hits = parse_browse_results(&results);
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.name, "notes.txt");
        assert_eq!(hit.description, "meeting notes");
        assert_eq!(hit.size, "1.00 MB");
        assert_eq!(hit.bytes, 1_048_576);
        assert_eq!(hit.kind, "http://schema.org/TextDigitalDocument");
        assert_eq!(hit.depth.as_deref(), Some("2"));
        assert_eq!(hit.extra["license"], "CC0");
    }

    #[test]
    fn test_browse_results_mixed_predicate_rows() {
        let results = envelope(
            vec!["subject", "graph", "predicate", "object"],
            json!([
                {
                    "subject": cell("ant://subj1"),
                    "graph": cell("ant://pod1"),
                    "predicate": cell("http://schema.org/description"),
                    "object": cell("from a predicate row"),
                },
            ]),
        );
        let hits = parse_browse_results(&results);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "from a predicate row");
    }

    #[test]
    fn test_malformed_input_yields_empty() {
        assert!(parse_text_results(&json!(null)).is_empty());
        assert!(parse_text_results(&json!({})).is_empty());
        assert!(parse_text_results(&json!({ "sparql_results": {} })).is_empty());
        let no_bindings = json!({
            "sparql_results": {
                "head": { "vars": ["subject"] },
                "results": { "bindings": "not-an-array" },
            },
        });
        assert!(parse_text_results(&no_bindings).is_empty());
        assert!(parse_browse_results(&no_bindings).is_empty());
    }

    #[test]
    fn test_shorten_predicate() {
        assert_eq!(shorten_predicate("http://schema.org/name"), "name");
        assert_eq!(
            shorten_predicate("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            "type"
        );
        assert_eq!(shorten_predicate("http://example.org/a/b"), "b");
        assert_eq!(shorten_predicate("bare"), "bare");
    }
}
