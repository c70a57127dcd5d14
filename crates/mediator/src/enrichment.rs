//! Model-backed "deeper understanding" enrichment.

use async_trait::async_trait;
use calmwire_core::context::{EnrichmentInput, Enricher, Understanding};
use calmwire_core::error::EnrichmentError;
use calmwire_core::inference::{InferenceClient, InferenceRequest};
use std::sync::Arc;

use crate::interpreter::{extract_json_object, first_json_object};

const SYSTEM: &str = "You help a co-parenting mediator understand what is happening beneath a message. \
Describe needs and dynamics in plain language. Never diagnose or label either person. JSON only.";

/// Asks the inference service for an [`Understanding`] of one message.
pub struct ModelEnricher {
    client: Arc<dyn InferenceClient>,
    model: String,
    max_tokens: u32,
}

impl ModelEnricher {
    pub fn new(client: Arc<dyn InferenceClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens: 600,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn user_prompt(input: &EnrichmentInput) -> String {
        let mut prompt = format!(
            "{} is about to send this message to {}: \"{}\"\n",
            input.sender_name,
            input.receiver_name,
            input.text.trim()
        );
        if let Some(relationships) = &input.relationship_context {
            prompt.push_str(&format!("\nRelationships:\n{relationships}\n"));
        }
        if !input.history.is_empty() {
            prompt.push_str(&format!("\nRecent conversation:\n{}\n", input.history.join("\n")));
        }
        prompt.push_str(
            "\nRespond with JSON only:\n\
{\"humanNature\": \"...\", \"relationalDynamics\": \"...\", \"underlyingNeeds\": \"...\", \
\"contextFactors\": \"...\", \"communicationBreakdown\": \"...\", \"pathForward\": \"...\"}",
        );
        prompt
    }
}

#[async_trait]
impl Enricher for ModelEnricher {
    async fn understand(&self, input: &EnrichmentInput) -> Result<Understanding, EnrichmentError> {
        let response = self
            .client
            .complete(InferenceRequest {
                model: self.model.clone(),
                system: SYSTEM.to_string(),
                user: Self::user_prompt(input),
                max_tokens: self.max_tokens,
                temperature: 0.3,
            })
            .await?;

        if let Some(understanding) = first_json_object(&response.text, |u: &Understanding| {
            u.to_prompt_section().is_some()
        }) {
            return Ok(understanding);
        }

        let json = extract_json_object(&response.text)
            .ok_or_else(|| EnrichmentError::Malformed("no JSON object in response".into()))?;
        match serde_json::from_str::<Understanding>(json) {
            Ok(_) => Err(EnrichmentError::Malformed("all fields empty".into())),
            Err(e) => Err(EnrichmentError::Malformed(e.to_string())),
        }
    }
}
