//! AI provider boundary.
//!
//! Providers return free text. Nothing from it is trusted until it parses as
//! a JSON object and has been run through the alias table.

mod alias;
mod http;

pub use alias::Explanation;
pub use http::HttpProvider;

use crate::draft::DraftInput;
use crate::error::{PipelineError, Result};
use crate::product::non_blank;
use alias::{
    resolve_explanation, resolve_list, resolve_text, unwrap_envelope, COMPETITOR_FIELDS,
    PLAN_FIELDS,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// An image passed to an extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub trait AiProvider: Send + Sync {
    /// Normalized provider name, recorded on drafts.
    fn name(&self) -> &str;

    fn extract(&self, prompt: &str, images: &[ImageInput]) -> Result<String>;

    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Parse a provider reply as a JSON object, tolerating Markdown code fences.
pub fn parse_json_response(raw: &str) -> Result<Map<String, Value>> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.trim().strip_suffix("```").unwrap_or(body).trim();

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PipelineError::AiFormat {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
            raw: raw.to_string(),
        }),
        Err(e) => Err(PipelineError::AiFormat {
            reason: e.to_string(),
            raw: raw.to_string(),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Competitor extraction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorInfo {
    pub name: String,
    pub price: String,
    pub ingredients: String,
    pub benefits: Vec<String>,
    pub source_url: String,
}

/// Where competitor details come from: a listing URL or screenshots.
#[derive(Debug, Clone)]
pub enum CompetitorSource {
    Url(String),
    Images {
        images: Vec<ImageInput>,
        hint: Option<String>,
    },
}

const SCREENSHOT_SOURCE: &str = "截图提取";

const COMPETITOR_SHAPE: &str =
    r#"{"name": string, "price": string, "ingredients": string, "benefits": string[], "source_url": string}"#;

pub fn extract_competitor(
    provider: &dyn AiProvider,
    source: &CompetitorSource,
) -> Result<CompetitorInfo> {
    let (raw, fallback_url) = match source {
        CompetitorSource::Url(url) => {
            let Some(url) = non_blank(Some(url)) else {
                return Err(PipelineError::Validation("competitor URL is required".to_string()));
            };
            let prompt = format!(
                "Extract the competitor product at this listing. Reply with JSON only, shaped {COMPETITOR_SHAPE}.\n{}",
                json!({ "url": url })
            );
            (provider.extract(&prompt, &[])?, url)
        }
        CompetitorSource::Images { images, hint } => {
            if images.is_empty() {
                return Err(PipelineError::Validation(
                    "at least one competitor screenshot is required".to_string(),
                ));
            }
            let prompt = format!(
                "Extract the competitor product shown in these {} screenshots. Reply with JSON only, shaped {COMPETITOR_SHAPE}.\n{}",
                images.len(),
                json!({ "hint": hint })
            );
            (provider.extract(&prompt, images)?, SCREENSHOT_SOURCE.to_string())
        }
    };

    let parsed = parse_json_response(&raw)?;
    let obj = unwrap_envelope(&parsed, "data");
    let text = |name: &str| {
        COMPETITOR_FIELDS
            .iter()
            .find(|f| f.canonical == name)
            .and_then(|f| resolve_text(obj, f.keys))
    };
    let benefits = COMPETITOR_FIELDS
        .iter()
        .find(|f| f.canonical == "benefits")
        .map(|f| resolve_list(obj, f.keys))
        .unwrap_or_default();

    let info = CompetitorInfo {
        name: text("name").unwrap_or_default(),
        price: text("price").unwrap_or_default(),
        ingredients: text("ingredients").unwrap_or_default(),
        benefits,
        source_url: match source {
            CompetitorSource::Url(_) => text("source_url").unwrap_or(fallback_url),
            CompetitorSource::Images { .. } => fallback_url,
        },
    };
    tracing::info!(provider = provider.name(), name = %info.name, "competitor extracted");
    Ok(info)
}

// ---------------------------------------------------------------------------
// Plan generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRequest {
    pub category: String,
    pub market: String,
    pub platform: String,
    pub competitors: Vec<CompetitorInfo>,
}

/// Competitors beyond this many are not sent to the provider.
pub const MAX_COMPETITORS: usize = 3;

const PLAN_SHAPE: &str = r#"{"plan": {"positioning", "sellingPoint", "ingredients", "efficacy", "volume", "scent", "color", "pricing", "title", "keywords": string[], "packaging"}, "explanations": {<field>: {"note", "confidence": 0..1, "reason"}}}"#;

/// Ask the generate provider for a product plan and turn it into an unsaved
/// draft input.
pub fn generate_draft(provider: &dyn AiProvider, request: &PlanRequest) -> Result<DraftInput> {
    let mut missing = Vec::new();
    for (name, value) in [
        ("category", &request.category),
        ("market", &request.market),
        ("platform", &request.platform),
    ] {
        if value.trim().is_empty() {
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::Validation(format!(
            "plan generation needs {}",
            missing.join(", ")
        )));
    }
    if request.competitors.is_empty() {
        return Err(PipelineError::Validation(
            "plan generation needs at least one extracted competitor".to_string(),
        ));
    }

    let competitors: Vec<&CompetitorInfo> =
        request.competitors.iter().take(MAX_COMPETITORS).collect();
    let prompt = format!(
        "Generate a new product plan for this category, market and platform from the competitors. Reply with JSON only, shaped {PLAN_SHAPE}.\n{}",
        json!({
            "category": request.category,
            "market": request.market,
            "platform": request.platform,
            "competitors": competitors,
        })
    );
    let raw = provider.generate(&prompt)?;
    let parsed = parse_json_response(&raw)?;
    let top = unwrap_envelope(&parsed, "data");
    let plan = unwrap_envelope(top, "plan");
    let explanations = top
        .get("explanations")
        .or_else(|| top.get("ai_explanations"))
        .and_then(Value::as_object);

    let mut fields = Map::new();
    let mut notes: BTreeMap<&str, Explanation> = BTreeMap::new();
    for f in PLAN_FIELDS {
        if let Some(text) = resolve_text(plan, f.keys) {
            fields.insert(f.canonical.to_string(), Value::String(text));
        }
        if let Some(ex) = explanations.and_then(|e| resolve_explanation(e, f.keys)) {
            notes.insert(f.canonical, ex);
        }
    }
    if fields.is_empty() {
        return Err(PipelineError::AiFormat {
            reason: "response contains no plan fields".to_string(),
            raw,
        });
    }

    let resolved = fields.len();
    let mut input: DraftInput = serde_json::from_value(Value::Object(fields))?;
    input.category = Some(request.category.trim().to_string());
    input.market = Some(request.market.trim().to_string());
    input.platform = Some(request.platform.trim().to_string());
    input.generate_provider = Some(provider.name().to_string());
    input.competitors_data = Some(serde_json::to_value(&competitors)?);
    input.ai_explanations = (!notes.is_empty())
        .then(|| serde_json::to_value(&notes))
        .transpose()?;

    tracing::info!(
        provider = provider.name(),
        fields = resolved,
        explained = notes.len(),
        "plan generated"
    );
    Ok(input)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned replies and records prompts.
    pub(crate) struct ScriptedProvider {
        pub reply: String,
        pub prompts: Mutex<Vec<String>>,
        pub images_seen: Mutex<usize>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
                images_seen: Mutex::new(0),
            }
        }
    }

    impl AiProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn extract(&self, prompt: &str, images: &[ImageInput]) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            *self.images_seen.lock().unwrap() += images.len();
            Ok(self.reply.clone())
        }

        fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn request() -> PlanRequest {
        PlanRequest {
            category: "Shampoo".to_string(),
            market: "Indonesia".to_string(),
            platform: "Shopee".to_string(),
            competitors: vec![CompetitorInfo {
                name: "Clear Men".to_string(),
                price: "IDR 49,900".to_string(),
                ..CompetitorInfo::default()
            }],
        }
    }

    #[test]
    fn parse_strips_code_fences() {
        let map = parse_json_response("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map["a"], json!(1));
        let map = parse_json_response("  {\"b\": true}  ").unwrap();
        assert_eq!(map["b"], json!(true));
    }

    #[test]
    fn non_object_or_garbage_is_ai_format_with_raw() {
        for raw in ["[1, 2]", "Sure! Here is your plan:", ""] {
            let err = parse_json_response(raw).unwrap_err();
            let PipelineError::AiFormat { raw: kept, .. } = err else {
                panic!("expected AiFormat for {raw:?}");
            };
            assert_eq!(kept, raw);
        }
    }

    #[test]
    fn generate_resolves_aliases_into_draft_input() {
        let provider = ScriptedProvider::new(
            r#"```json
            {"plan": {"positioning": "scalp care", "coreSellingPoints": "cooling",
                      "mainEfficacy": "anti-dandruff", "volumeMl": 250, "textureColor": "clear gel",
                      "price": "IDR 59,000", "productTitle": "Cool Scalp Shampoo",
                      "keywords": ["shampoo", "dandruff"], "packagingRequirements": "matte bottle"},
             "explanations": {"sellingPoint": {"note": "core", "confidence": 0.9, "reason": "gap"}}}
            ```"#,
        );
        let input = generate_draft(&provider, &request()).unwrap();

        assert_eq!(input.category.as_deref(), Some("Shampoo"));
        assert_eq!(input.selling_point.as_deref(), Some("cooling"));
        assert_eq!(input.efficacy.as_deref(), Some("anti-dandruff"));
        assert_eq!(input.volume.as_deref(), Some("250"));
        assert_eq!(input.texture_color.as_deref(), Some("clear gel"));
        assert_eq!(input.pricing.as_deref(), Some("IDR 59,000"));
        assert_eq!(input.title.as_deref(), Some("Cool Scalp Shampoo"));
        assert_eq!(input.keywords.as_deref(), Some("shampoo, dandruff"));
        assert_eq!(input.packaging_requirements.as_deref(), Some("matte bottle"));
        assert_eq!(input.generate_provider.as_deref(), Some("scripted"));
        assert_eq!(
            input.ai_explanations.as_ref().unwrap()["selling_point"]["confidence"],
            json!(0.9)
        );
        assert!(input.check_required().is_ok());
        assert!(provider.prompts.lock().unwrap()[0].contains("Clear Men"));
    }

    #[test]
    fn generate_validates_before_calling_provider() {
        let provider = ScriptedProvider::new("{}");
        let mut req = request();
        req.market = " ".to_string();
        assert!(matches!(
            generate_draft(&provider, &req),
            Err(PipelineError::Validation(_))
        ));
        let mut req = request();
        req.competitors.clear();
        assert!(generate_draft(&provider, &req).is_err());
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn generate_with_no_plan_fields_is_ai_format() {
        let provider = ScriptedProvider::new(r#"{"message": "I cannot help with that"}"#);
        assert!(matches!(
            generate_draft(&provider, &request()),
            Err(PipelineError::AiFormat { .. })
        ));
    }

    #[test]
    fn extract_from_url_falls_back_to_input_url() {
        let provider = ScriptedProvider::new(
            r#"{"productName": "Clear Men", "price": "IDR 49,900",
                "mainIngredients": ["Menthol", "Zinc"], "benefits": "cooling, anti-dandruff"}"#,
        );
        let info = extract_competitor(
            &provider,
            &CompetitorSource::Url("https://shop.test/item/1".to_string()),
        )
        .unwrap();
        assert_eq!(info.name, "Clear Men");
        assert_eq!(info.ingredients, "Menthol, Zinc");
        assert_eq!(info.benefits, vec!["cooling", "anti-dandruff"]);
        assert_eq!(info.source_url, "https://shop.test/item/1");
    }

    #[test]
    fn extract_from_images_marks_screenshot_source() {
        let provider =
            ScriptedProvider::new(r#"{"data": {"name": "Serum X", "source_url": "ignored"}}"#);
        let source = CompetitorSource::Images {
            images: vec![ImageInput {
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            }],
            hint: Some("detail page".to_string()),
        };
        let info = extract_competitor(&provider, &source).unwrap();
        assert_eq!(info.name, "Serum X");
        assert_eq!(info.source_url, SCREENSHOT_SOURCE);
        assert_eq!(*provider.images_seen.lock().unwrap(), 1);
    }

    #[test]
    fn extract_requires_input() {
        let provider = ScriptedProvider::new("{}");
        let no_images = CompetitorSource::Images {
            images: Vec::new(),
            hint: None,
        };
        assert!(matches!(
            extract_competitor(&provider, &no_images),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            extract_competitor(&provider, &CompetitorSource::Url(String::new())),
            Err(PipelineError::Validation(_))
        ));
    }
}
