use tracing::{info, instrument, warn};

use crate::error::GenerationError;
use crate::gemini::{GenerateResponse, LanguageModel};
use crate::model::BriefingContent;

/// Try each model in priority order and return the first successful briefing.
///
/// Only transport faults and error statuses fall through to the next model.
/// A success status carrying unusable content ends generation immediately.
#[instrument(skip_all, fields(models = models.len()))]
pub async fn generate_briefing(
    llm: &dyn LanguageModel,
    models: &[String],
    prompt: &str,
) -> Result<BriefingContent, GenerationError> {
    let mut attempts = Vec::with_capacity(models.len());
    for model in models {
        match llm.generate(model, prompt).await {
            Ok(body) => {
                let content = parse_envelope(model, &body)?;
                content.validate()?;
                info!(
                    model = %model,
                    research = content.research.len(),
                    tools = content.tools.len(),
                    "briefing generated"
                );
                return Ok(content);
            }
            Err(err) => {
                warn!("Failed on {}: {}", model, err);
                attempts.push((model.clone(), err));
            }
        }
    }
    Err(GenerationError::GenerationExhausted { attempts })
}

/// Decode the provider envelope and the JSON document nested in its text part.
pub fn parse_envelope(model: &str, body: &str) -> Result<BriefingContent, GenerationError> {
    let malformed = |reason: String| GenerationError::MalformedResponse {
        model: model.to_string(),
        reason,
    };
    let envelope: GenerateResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("envelope: {e}")))?;
    let text = envelope
        .first_text()
        .ok_or_else(|| malformed("no text part in first candidate".into()))?;
    serde_json::from_str(text).map_err(|e| malformed(format!("content: {e}")))
}
