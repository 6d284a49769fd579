//! Gemini `generateContent` wire types.

use serde::{Deserialize, Serialize};

use snapfind_core::{OraclePrompt, PromptPart};

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Map a prompt onto a single user turn, keeping part order.
    pub fn from_prompt(prompt: &OraclePrompt) -> Self {
        let system_instruction = if prompt.instruction.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(prompt.instruction.clone())],
            })
        };

        let parts = prompt
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(text) => Part::text(text.clone()),
                PromptPart::Image(image) => Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type.clone(),
                        data: image.data_b64.clone(),
                    }),
                },
            })
            .collect();

        let generation_config = prompt.json_response.then(|| GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            temperature: Some(0.0),
        });

        Self {
            system_instruction,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-image part. Exactly one field is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 image bytes.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Response body from `generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCandidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapfind_core::EncodedImage;

    fn image(data: &str) -> EncodedImage {
        EncodedImage {
            mime_type: "image/png".into(),
            data_b64: data.into(),
        }
    }

    #[test]
    fn test_request_serialization_interleaves_parts() {
        let prompt = OraclePrompt::new("find matches")
            .image(image("REF"))
            .text("ID: p1")
            .image(image("P1"))
            .with_json_response();

        let json = serde_json::to_value(GenerateContentRequest::from_prompt(&prompt)).unwrap();

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "find matches"
        );
        let parts = &json["contents"][0]["parts"];
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["data"], "REF");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["text"], "ID: p1");
        assert!(parts[1].get("inlineData").is_none());
        assert_eq!(parts[2]["inlineData"]["data"], "P1");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_request_without_json_omits_generation_config() {
        let prompt = OraclePrompt::new("").text("hi");
        let json = serde_json::to_value(GenerateContentRequest::from_prompt(&prompt)).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"matchedIds\":"}, {"text": " []}"}]},
                "finishReason": "STOP"
            }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().unwrap(), r#"{"matchedIds": []}"#);
        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.text().is_none());

        let blocked = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(blocked).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_error_envelope_deserialization() {
        let json = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.message, "Quota exceeded");
        assert_eq!(envelope.error.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }
}
