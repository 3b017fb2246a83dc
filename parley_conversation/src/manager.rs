//! One request/response cycle against the completion API.

use std::sync::Arc;

use parley_core::{Conversation, ConversationError, LLMProvider, Role, Usage};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that abort a single turn. The conversation's earlier turns are
/// untouched; only the new user turn may remain, awaiting a reply.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("LLM provider error: {0}")]
    Provider(anyhow::Error),

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error(transparent)]
    Conversation(#[from] ConversationError),
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Assistant's response
    pub text: String,
    /// Token usage, when the API reports it
    pub usage: Option<Usage>,
    /// 1-based number of the exchange just completed
    pub turn_number: usize,
}

/// Runs turns against one model at one temperature.
pub struct TurnTaker<P = Arc<dyn LLMProvider>>
where
    P: Send + Sync,
{
    provider: P,
    model: String,
    temperature: f32,
}

impl<P> TurnTaker<P>
where
    P: LLMProvider + Send + Sync,
{
    /// `temperature` is clamped to `0.0..=1.0`.
    pub fn new(provider: P, model: impl Into<String>, temperature: f32) -> Self {
        let clamped = temperature.clamp(0.0, 1.0);
        if (clamped - temperature).abs() > f32::EPSILON {
            warn!("Temperature {temperature} out of range, using {clamped}");
        }
        Self {
            provider,
            model: model.into(),
            temperature: clamped,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Append `user_message`, ask the model, append its reply.
    ///
    /// On any failure the assistant turn is not appended and the user turn
    /// stays in place; the next call folds its message into that pending
    /// turn and carries on.
    pub async fn take_turn(
        &self,
        conversation: &mut Conversation,
        user_message: &str,
    ) -> Result<TurnReply, TurnError> {
        let turn_number = conversation.turn_count() + 1;
        info!("Processing turn {turn_number} with model {}", self.model);

        conversation.push_user_message(user_message)?;
        let messages = conversation.to_message_list();

        for (i, msg) in messages.iter().enumerate() {
            debug!(
                "Message {i}: role={}, content_len={}",
                msg.role,
                msg.content.len()
            );
        }

        let response = self
            .provider
            .chat(&messages, &self.model, self.temperature)
            .await
            .map_err(TurnError::Provider)?;

        if response.content.trim().is_empty() {
            return Err(TurnError::EmptyResponse);
        }

        conversation.add_turn(Role::Assistant, response.content.clone())?;

        if let Some(usage) = response.usage {
            debug!(
                "Tokens: {} prompt + {} completion = {} total",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        debug!("Turn {turn_number} completed successfully");

        Ok(TurnReply {
            text: response.content,
            usage: response.usage,
            turn_number,
        })
    }
}
