//! Minimal client for the Gemini `generateContent` endpoint, restricted to
//! schema-constrained JSON responses.

use crate::tiles::loader::HTTP_CLIENT;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// API key and model for Gemini requests
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Reads the API key from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> crate::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| crate::Error::Generation("GEMINI_API_KEY is not set".to_string()))?;
        Ok(Self::new(api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.config.model, self.config.api_key
        )
    }

    /// Sends a prompt with a JSON response schema and returns the raw JSON
    /// text the model produced
    pub async fn generate_json(
        &self,
        prompt: &str,
        schema: serde_json::Value,
    ) -> crate::Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        let body = HTTP_CLIENT
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: GenerateResponse = serde_json::from_str(&body)?;
        extract_text(response)
    }
}

fn extract_text(response: GenerateResponse) -> crate::Result<String> {
    let text = response
        .candidates
        .into_iter()
        .flatten()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .map(|part| part.text);

    text.ok_or_else(|| crate::Error::Generation("model returned no candidates".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_model_and_key() {
        let client = GeminiClient::new(GeminiConfig::new("test-key"));
        let endpoint = client.endpoint();

        assert!(endpoint.starts_with("https://generativelanguage.googleapis.com/"));
        assert!(endpoint.contains("/gemini-1.5-flash:generateContent"));
        assert!(endpoint.ends_with("key=test-key"));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "prompt".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: serde_json::json!({"type": "OBJECT"}),
            },
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_extracts_first_candidate_text() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {
                        "content": {
                            "parts": [{"text": "{\"type\": \"FeatureCollection\"}"}],
                            "role": "model"
                        },
                        "finishReason": "STOP"
                    }
                ]
            }"#,
        )
        .unwrap();

        let text = extract_text(response).unwrap();
        assert_eq!(text, "{\"type\": \"FeatureCollection\"}");
    }

    #[test]
    fn test_empty_candidates_is_an_error() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(extract_text(response).is_err());

        let response: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(extract_text(response).is_err());
    }

    #[test]
    fn test_model_override() {
        let config = GeminiConfig::new("k").with_model("gemini-2.0-flash");
        assert_eq!(config.model, "gemini-2.0-flash");
    }
}
