use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ragdb_core::error::GenerationError;
use ragdb_core::traits::{GenerateOptions, Generator};

/// Blocking client for an Ollama server's `/api/generate` endpoint.
///
/// The timeout comes from `GenerateOptions` on every call.
#[derive(Clone)]
pub struct OllamaGenerator {
    client: HttpClient,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str) -> Result<Self, GenerationError> {
        let client = HttpClient::builder()
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str { &self.base_url }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateBody { model: &options.model_id, prompt, stream: false };
        debug!(url = %url, model = %options.model_id, prompt_chars = prompt.len(), "calling generation service");

        let classify = |e: reqwest::Error| {
            if e.is_timeout() { GenerationError::Timeout(options.timeout) } else { GenerationError::Transport(e.to_string()) }
        };
        let response = self.client.post(&url).timeout(options.timeout).json(&body).send().map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = describe_body(response.text());
            return Err(GenerationError::Status { code: status.as_u16(), body });
        }
        let text = response.text().map_err(classify)?;
        let reply: GenerateReply =
            serde_json::from_str(&text).map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        Ok(reply.response)
    }
}

fn describe_body<E: std::fmt::Display>(body: Result<String, E>) -> String {
    body.unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

#[cfg(test)]
mod tests {
    use super::describe_body;

    #[test]
    fn unreadable_error_body_is_described() {
        let failed: Result<String, std::io::Error> = Err(std::io::Error::other("connection reset"));
        assert_eq!(describe_body(failed), "<unreadable body: connection reset>");
        assert_eq!(describe_body::<std::io::Error>(Ok("model not found".into())), "model not found");
    }
}
