//! Field alias resolution for AI responses.
//!
//! Providers name the same field differently (`sellingPoint`,
//! `selling_point`, `coreSellingPoints`). Each canonical field lists its
//! candidate keys in priority order; the first non-empty one wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) struct FieldAliases {
    pub canonical: &'static str,
    pub keys: &'static [&'static str],
}

const fn field(canonical: &'static str, keys: &'static [&'static str]) -> FieldAliases {
    FieldAliases { canonical, keys }
}

/// Plan fields, keyed by their `DraftInput` name.
pub(crate) const PLAN_FIELDS: &[FieldAliases] = &[
    field("positioning", &["positioning", "product_positioning"]),
    field("selling_point", &["sellingPoint", "selling_point", "coreSellingPoints"]),
    field("ingredients", &["ingredients", "mainIngredients"]),
    field("efficacy", &["efficacy", "mainEfficacy", "claims"]),
    field("volume", &["volume", "volumeMl"]),
    field("scent", &["scent", "fragrance"]),
    field("texture_color", &["color", "textureColor", "texture_color"]),
    field("pricing", &["pricing", "price"]),
    field("title", &["title", "productTitle"]),
    field("keywords", &["keywords", "seoKeywords"]),
    field("packaging_requirements", &["packaging", "packagingRequirements"]),
];

pub(crate) const COMPETITOR_FIELDS: &[FieldAliases] = &[
    field("name", &["name", "productName", "title"]),
    field("price", &["price", "pricing"]),
    field("ingredients", &["ingredients", "mainIngredients"]),
    field("benefits", &["benefits", "claims", "efficacy"]),
    field("source_url", &["source_url", "sourceUrl", "url"]),
];

/// Flatten a JSON value into text. Arrays of scalars are joined with ", ".
fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text_of)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn resolve_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| obj.get(*k).and_then(text_of))
}

/// Like [`resolve_text`] but keeps list structure: arrays stay lists, a
/// comma-separated string is split.
pub(crate) fn resolve_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        let items: Vec<String> = match obj.get(*key) {
            Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
            Some(Value::String(s)) => s
                .split([',', '，', ';'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => continue,
        };
        if !items.is_empty() {
            return items;
        }
    }
    Vec::new()
}

/// Per-field metadata a provider returns alongside a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub note: String,
    pub confidence: Option<f64>,
    pub reason: String,
}

fn first_str(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Look up the explanation for a field under any of its aliases, also trying
/// the lowercase form of each key.
pub(crate) fn resolve_explanation(
    explanations: &Map<String, Value>,
    keys: &[&str],
) -> Option<Explanation> {
    let candidate = keys.iter().find_map(|k| {
        explanations
            .get(*k)
            .or_else(|| explanations.get(&k.to_lowercase()))
            .and_then(Value::as_object)
    })?;
    Some(Explanation {
        note: first_str(candidate, &["note", "desc", "summary"]),
        confidence: candidate
            .get("confidence")
            .or_else(|| candidate.get("score"))
            .and_then(Value::as_f64),
        reason: first_str(candidate, &["reason", "why"]),
    })
}

/// Unwrap the common `{ "plan": ... }` / `{ "data": ... }` envelopes.
pub(crate) fn unwrap_envelope<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> &'a Map<String, Value> {
    obj.get(key).and_then(Value::as_object).unwrap_or(obj)
}
