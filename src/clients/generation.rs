//! Client for the answer-generation (chat completion) provider.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProviderConfig;
use crate::types::{RagError, RankedChunk};

const SERVICE: &str = "generation";

/// Separator between rendered chunks in the prompt context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Low temperature favors determinism and faithfulness over creativity.
const TEMPERATURE: f32 = 0.3;
const MAX_ANSWER_TOKENS: u32 = 2048;

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions based on the provided document context.
Always cite the source document and page number when referencing information.
If the answer cannot be found in the context, say so clearly.
Be concise but thorough.";

/// Stateless wrapper over the chat/completions API.
///
/// Builds a single grounded prompt from the reranked chunks in rank order.
/// Callers must not invoke this with an empty chunk set; the query pipeline
/// short-circuits to a canned answer before generation when retrieval found
/// nothing.
#[derive(Clone, Debug)]
pub struct GenerationClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl GenerationClient {
    pub fn new(config: ProviderConfig) -> Result<Self, RagError> {
        let http = super::build_http_client(config.timeout)?;
        Ok(Self { http, config })
    }

    /// Generates a grounded, cited answer to `query` from `chunks`.
    pub async fn generate(&self, query: &str, chunks: &[RankedChunk]) -> Result<String, RagError> {
        info!(chunks = chunks.len(), "generating answer");

        let context = build_context(chunks);
        let user_prompt = format!(
            "Context from documents:\n{context}\n\nQuestion: {query}\n\n\
             Please answer the question based on the provided context. Include source citations."
        );

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_ANSWER_TOKENS,
        };

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?
            .error_for_status()
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        let answer = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RagError::Upstream {
                service: SERVICE,
                message: "response contained no choices".to_string(),
            })?;

        info!(preview = %answer.chars().take(100).collect::<String>(), "generated answer");
        Ok(answer)
    }
}

/// Renders the prompt context from chunks in rank order.
fn build_context(chunks: &[RankedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Document: {}\nSource: {}, Page {}\n{}",
                chunk.title, chunk.source, chunk.page, chunk.text
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
