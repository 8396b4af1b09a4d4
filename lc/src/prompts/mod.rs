//! Prompt templates
//!
//! `.pmt` files under `prompts/` are embedded at build time and rendered with
//! Handlebars. Output is plain text, so HTML escaping is disabled.

pub mod embedded;

use handlebars::{Handlebars, RenderError};
use serde::Serialize;
use tracing::debug;

/// Renders embedded prompt templates
pub struct PromptRenderer {
    hbs: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    pub fn new() -> Self {
        debug!("PromptRenderer::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        Self { hbs }
    }

    /// Render the named embedded template with the given context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, RenderError> {
        debug!(%name, "PromptRenderer::render: called");
        let template = embedded::get_embedded(name)
            .ok_or_else(|| RenderError::from(handlebars::RenderErrorReason::TemplateNotFound(name.to_string())))?;
        self.hbs.render_template(template, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_alternatives() {
        let renderer = PromptRenderer::new();
        let out = renderer
            .render(
                "alternatives",
                &json!({
                    "name": "track_referral",
                    "signature": "track_referral(user_id: str) -> None",
                    "file": "src/referrals.py",
                    "logic": "",
                    "candidates": "[{\"name\": \"record_invite\"}]",
                    "min_confidence": 0.6,
                }),
            )
            .unwrap();

        assert!(out.contains("- Name: track_referral"));
        assert!(out.contains("track_referral(user_id: str) -> None"));
        assert!(out.contains("(not described)"));
        // quotes and arrows must survive unescaped
        assert!(out.contains("[{\"name\": \"record_invite\"}]"));
        assert!(out.contains(">= 0.6"));
    }

    #[test]
    fn test_render_unknown_template() {
        assert!(PromptRenderer::new().render("nope", &json!({})).is_err());
    }
}
