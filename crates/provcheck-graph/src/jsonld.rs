//! JSON-LD documents, parsed with Sophia's JSON-LD parser.
//!
//! Loading never touches the network. Before parsing, every reference to a
//! well-known RO-Crate (or schema.org) remote context is replaced by the bundled
//! `contexts/ro-crate-1.1.jsonld`; any other remote context is dropped with a
//! warning, so its terms are ignored like any undefined JSON-LD term.

use std::sync::Arc;

use serde_json::{Map, Value};
use sophia::api::parser::QuadParser;
use sophia::inmem::dataset::FastDataset;
use sophia::iri::Iri;
use sophia::jsonld::{JsonLdOptions, JsonLdParser};

use crate::rdf::collect;

const RO_CRATE_CONTEXT: &str = include_str!("../contexts/ro-crate-1.1.jsonld");

fn is_bundled_context(url: &str) -> bool {
    let url = url.trim_end_matches('/');
    url.starts_with("https://w3id.org/ro/crate/")
        || url.starts_with("http://w3id.org/ro/crate/")
        || url == "http://schema.org"
        || url == "https://schema.org"
        || url.ends_with("schema.org/docs/jsonldcontext.json")
}

fn bundled_context() -> Result<Value, String> {
    let doc: Value = serde_json::from_str(RO_CRATE_CONTEXT)
        .map_err(|e| format!("bundled RO-Crate context is not JSON: {e}"))?;
    doc.get("@context")
        .cloned()
        .ok_or_else(|| "bundled RO-Crate context has no @context".to_string())
}

/// `None` removes the entry from a context array.
fn offline_context(entry: Value, bundled: &Value) -> Option<Value> {
    match entry {
        Value::String(url) if is_bundled_context(&url) => Some(bundled.clone()),
        Value::String(url) => {
            tracing::warn!(context = %url, "skipping remote JSON-LD context");
            None
        }
        Value::Array(items) => Some(Value::Array(
            items
                .into_iter()
                .filter_map(|item| offline_context(item, bundled))
                .collect(),
        )),
        other => Some(other),
    }
}

fn inline_contexts(value: &mut Value, bundled: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(ctx) = map.remove("@context") {
                let ctx = offline_context(ctx, bundled).unwrap_or_else(|| Value::Object(Map::new()));
                map.insert("@context".to_string(), ctx);
            }
            for (key, child) in map.iter_mut() {
                if key != "@context" {
                    inline_contexts(child, bundled);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| inline_contexts(v, bundled)),
        _ => {}
    }
}

/// Parse a JSON-LD document; relative `@id`s resolve against `document_iri`.
pub(crate) fn parse_jsonld(bytes: &[u8], document_iri: &str) -> Result<FastDataset, String> {
    let mut doc: Value =
        serde_json::from_slice(bytes).map_err(|e| format!("invalid JSON: {e}"))?;
    inline_contexts(&mut doc, &bundled_context()?);

    let base = Iri::new(document_iri.to_string())
        .map_err(|e| format!("document IRI <{document_iri}> is invalid: {e}"))?;
    let options = JsonLdOptions::new().with_base(base.map_unchecked(Arc::from));
    let parser = JsonLdParser::new_with_options(options);
    collect(parser.parse_str(&doc.to_string())).map_err(|e| format!("invalid JSON-LD: {e}"))
}
