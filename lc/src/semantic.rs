//! Semantic alternative search
//!
//! When a required function is missing, ask a language model whether an
//! existing function already covers the requirement. The exchange is advisory:
//! every failure collapses to an empty list.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::SemanticConfig;
use crate::domain::{AlternativeMatch, FunctionRequirement};
use crate::inventory::FunctionInfo;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::PromptRenderer;

const SYSTEM_PROMPT: &str = "You compare code requirements with existing functions and answer in JSON only.";

/// Lowest confidence an alternative may carry, whatever the config says
pub const MIN_CONFIDENCE_FLOOR: f64 = 0.6;

/// Upper bound on tokens for the answer
const RESPONSE_MAX_TOKENS: u32 = 2048;

/// Candidate as shown to the model
#[derive(Debug, Serialize)]
struct Candidate<'a> {
    file: &'a str,
    name: &'a str,
    signature: &'a str,
    docstring: String,
    source_preview: String,
}

#[derive(Debug, Serialize)]
struct PromptContext<'a> {
    name: &'a str,
    signature: &'a str,
    file: &'a str,
    logic: &'a str,
    candidates: String,
    min_confidence: f64,
}

/// Raw answer entry; every field is optional because models omit things
#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default)]
    file: String,
    #[serde(default)]
    function_name: String,
    #[serde(default)]
    signature: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Candidates worth sending: no test code, no dunder or constructor names
pub fn filter_candidates<'a>(inventory: &'a [FunctionInfo], max: usize) -> Vec<&'a FunctionInfo> {
    inventory
        .iter()
        .filter(|f| {
            !f.file.starts_with("tests/") && !f.name.starts_with("test_") && f.name != "__init__" && !f.name.starts_with("__")
        })
        .take(max)
        .collect()
}

/// Render the request prompt for one missing function
pub fn build_prompt(
    requirement: &FunctionRequirement,
    candidates: &[&FunctionInfo],
    config: &SemanticConfig,
    renderer: &PromptRenderer,
) -> Result<String, handlebars::RenderError> {
    let shown: Vec<Candidate<'_>> = candidates
        .iter()
        .map(|f| Candidate {
            file: &f.file,
            name: &f.name,
            signature: &f.signature,
            docstring: truncate_chars(&f.docstring, config.doc_chars),
            source_preview: truncate_chars(&f.source_preview, config.preview_chars),
        })
        .collect();

    let context = PromptContext {
        name: &requirement.name,
        signature: &requirement.expected_signature,
        file: &requirement.file,
        logic: &requirement.logic,
        candidates: serde_json::to_string_pretty(&shown).unwrap_or_else(|_| "[]".to_string()),
        min_confidence: config.min_confidence.max(MIN_CONFIDENCE_FLOOR),
    };
    renderer.render("alternatives", &context)
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    // drop the opening fence line, including any language tag
    let body = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return "",
    };
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parse a model answer into filtered, sorted alternatives
///
/// Anything that is not a JSON array yields an empty list. Non-object entries
/// and entries below `min_confidence` (never lower than
/// [`MIN_CONFIDENCE_FLOOR`]) are dropped.
pub fn parse_alternatives(response: &str, min_confidence: f64) -> Vec<AlternativeMatch> {
    let min_confidence = min_confidence.max(MIN_CONFIDENCE_FLOOR);
    let payload = strip_code_fences(response);
    let entries = match serde_json::from_str::<Value>(payload) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            debug!("parse_alternatives: answer is not an array");
            return Vec::new();
        }
        Err(e) => {
            debug!(error = %e, "parse_alternatives: answer is not JSON");
            return Vec::new();
        }
    };

    let mut matches: Vec<AlternativeMatch> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawMatch>(entry).ok())
        .filter(|m| m.confidence.is_finite() && m.confidence >= min_confidence)
        .map(|m| AlternativeMatch {
            file: m.file,
            function_name: m.function_name,
            signature: m.signature,
            confidence: m.confidence.min(1.0),
            reasoning: m.reasoning,
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

/// Ask the model for existing functions that might fulfill `requirement`
pub async fn find_alternatives(
    requirement: &FunctionRequirement,
    inventory: &[FunctionInfo],
    llm: &dyn LlmClient,
    config: &SemanticConfig,
) -> Vec<AlternativeMatch> {
    debug!(name = %requirement.name, inventory = inventory.len(), "find_alternatives: called");
    let candidates = filter_candidates(inventory, config.max_candidates);
    if candidates.is_empty() {
        debug!("find_alternatives: no candidates");
        return Vec::new();
    }

    let prompt = match build_prompt(requirement, &candidates, config, &PromptRenderer::new()) {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "find_alternatives: prompt rendering failed");
            return Vec::new();
        }
    };

    debug!(candidates = candidates.len(), "find_alternatives: querying model");
    let request = CompletionRequest {
        system_prompt: SYSTEM_PROMPT.to_string(),
        messages: vec![Message::user(prompt)],
        max_tokens: RESPONSE_MAX_TOKENS,
    };

    match llm.complete(request).await {
        Ok(response) => {
            let matches = parse_alternatives(response.content.as_deref().unwrap_or(""), config.min_confidence);
            debug!(matches = matches.len(), "find_alternatives: parsed answer");
            matches
        }
        Err(e) => {
            debug!(error = %e, "find_alternatives: LLM call failed");
            Vec::new()
        }
    }
}
