//! OpenAI chat completion and Whisper transcription client.

use std::time::Duration;

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::openai::OpenAiConfig;
use crate::error::{AppError, Result};
use crate::models::enums::{ChatContext, Role};

/// One chat turn sent to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// What the system prompt is tailored to
#[derive(Debug, Clone, Copy)]
pub struct PromptContext {
    pub user_role: Role,
    pub context: ChatContext,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub tokens_used: Option<i64>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Audio upload to transcribe
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<i64>,
}

#[derive(Clone)]
pub struct OpenAiService {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiService {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::ServiceUnavailable("AI service is not configured".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Ask the chat model to continue `messages`, prefixed with a system prompt
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        prompt: PromptContext,
    ) -> Result<ChatCompletion> {
        let api_key = self.api_key()?;

        let mut all = Vec::with_capacity(messages.len() + 1);
        all.push(json!({ "role": "system", "content": build_system_prompt(prompt) }));
        all.extend(
            messages
                .iter()
                .map(|m| json!({ "role": m.role, "content": m.content })),
        );

        let payload = json!({
            "model": self.config.model,
            "messages": all,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": 0.9,
            "frequency_penalty": 0.3,
            "presence_penalty": 0.3,
        });

        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI API error ({}): {}", status, body);
            return Err(AppError::Internal("Failed to get AI response".to_string()));
        }

        let data: CompletionResponse = response.json().await?;
        let first = data.choices.into_iter().next();

        Ok(ChatCompletion {
            content: first
                .as_ref()
                .and_then(|c| c.message.as_ref())
                .map(|m| m.content.clone())
                .unwrap_or_default(),
            model: data.model.unwrap_or_else(|| self.config.model.clone()),
            tokens_used: data.usage.and_then(|u| u.total_tokens),
            finish_reason: first.and_then(|c| c.finish_reason),
        })
    }

    /// Generate writing suggestions; prompts that fail are skipped
    pub async fn suggestions(
        &self,
        request: &SuggestionRequest<'_>,
        prompt: PromptContext,
    ) -> Result<Vec<String>> {
        self.api_key()?;

        let mut suggestions = Vec::new();
        for text in build_suggestion_prompts(request, prompt.user_role) {
            match self.chat_completion(&[ChatMessage::user(text)], prompt).await {
                Ok(completion) => {
                    let trimmed = completion.content.trim();
                    if !trimmed.is_empty() {
                        suggestions.push(trimmed.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to generate suggestion: {}", e);
                }
            }
        }

        Ok(suggestions)
    }

    /// Transcribe audio with Whisper
    pub async fn transcribe(&self, audio: AudioFile, language: &str) -> Result<Transcription> {
        let api_key = self.api_key()?;

        let mut part = multipart::Part::bytes(audio.bytes).file_name(audio.file_name);
        if let Some(content_type) = audio.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| AppError::BadRequest(format!("Invalid audio content type: {}", e)))?;
        }

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", "whisper-1")
            .text("language", language.to_string())
            .text("response_format", "json")
            .text("temperature", "0");

        let response = self
            .client
            .post(self.url("/audio/transcriptions"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI Whisper API error ({}): {}", status, body);
            return Err(AppError::Internal("Failed to transcribe audio".to_string()));
        }

        Ok(response.json().await?)
    }
}

/// Inputs of a suggestion request
#[derive(Debug, Clone)]
pub struct SuggestionRequest<'a> {
    pub context: &'a str,
    pub suggestion_type: &'a str,
    pub existing_text: &'a str,
    pub tone: &'a str,
}

pub fn build_system_prompt(prompt: PromptContext) -> String {
    let base = "You are StudentLink Assistant, an AI helper for Bestlink College of the \
                Philippines student support system. ";

    let role = match prompt.user_role {
        Role::Student => {
            "You're helping a student with their concerns and questions. Be empathetic, \
             helpful, and guide them to appropriate resources."
        }
        Role::Faculty => {
            "You're assisting a faculty member. Provide professional guidance and help them \
             manage student concerns effectively."
        }
        Role::Staff => {
            "You're helping a staff member. Focus on efficient concern resolution and \
             administrative assistance."
        }
        Role::DepartmentHead => {
            "You're assisting a department head. Provide strategic insights and management \
             guidance."
        }
        Role::Admin => {
            "You're helping an administrator. Provide system-level insights and comprehensive \
             support."
        }
    };

    let context = match prompt.context {
        ChatContext::Concern => {
            "Focus on helping with student concern management, resolution strategies, and \
             communication."
        }
        ChatContext::Assistance => {
            "Provide general assistance and guidance on using the StudentLink system."
        }
        ChatContext::General => {
            "Provide general support and information about the StudentLink system."
        }
    };

    format!(
        "{}{} {} Always be professional, concise, and helpful. If you don't know something, \
         suggest appropriate next steps or contacts.",
        base, role, context
    )
}

pub fn build_suggestion_prompts(request: &SuggestionRequest<'_>, user_role: Role) -> [String; 3] {
    let base = format!("Generate helpful, {} suggestions for ", request.tone);
    let existing = request.existing_text;

    match request.suggestion_type {
        "concern_reply" => [
            format!(
                "{} replying to a student concern. Existing text: '{}'. Provide 3 different \
                 response approaches.",
                base, existing
            ),
            format!(
                "Create empathetic responses for a {} addressing a student concern. Keep \
                 responses professional and solution-focused.",
                user_role
            ),
            "Suggest follow-up questions and next steps for resolving this concern efficiently."
                .to_string(),
        ],
        "announcement" => [
            format!(
                "{} creating an announcement for {}. Make it clear, engaging, and informative.",
                base, request.context
            ),
            "Generate announcement templates that are appropriate for the college environment."
                .to_string(),
            "Create compelling subject lines and content structures for this announcement."
                .to_string(),
        ],
        "message_completion" => [
            format!(
                "{} completing this message: '{}'. Maintain the same tone and intent.",
                base, existing
            ),
            "Provide natural completions that flow well with the existing text.".to_string(),
            "Suggest professional endings and call-to-action phrases.".to_string(),
        ],
        _ => [
            format!(
                "{} general communication in the StudentLink system. Be helpful and appropriate.",
                base
            ),
            "Generate professional templates for common StudentLink interactions.".to_string(),
            "Provide guidance on effective communication in an educational setting.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_by_role_and_context() {
        let prompt = build_system_prompt(PromptContext {
            user_role: Role::Student,
            context: ChatContext::Concern,
        });
        assert!(prompt.starts_with("You are StudentLink Assistant"));
        assert!(prompt.contains("helping a student"));
        assert!(prompt.contains("student concern management"));

        let prompt = build_system_prompt(PromptContext {
            user_role: Role::Admin,
            context: ChatContext::General,
        });
        assert!(prompt.contains("administrator"));
    }

    #[test]
    fn test_suggestion_prompts_include_existing_text() {
        let request = SuggestionRequest {
            context: "enrollment",
            suggestion_type: "message_completion",
            existing_text: "Dear students,",
            tone: "friendly",
        };
        let prompts = build_suggestion_prompts(&request, Role::Staff);
        assert!(prompts[0].contains("Dear students,"));
        assert!(prompts[0].starts_with("Generate helpful, friendly suggestions"));
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_unavailable() {
        let service = OpenAiService::new(OpenAiConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 100,
            temperature: 0.7,
            timeout_secs: 1,
        });

        let result = service
            .chat_completion(
                &[ChatMessage::user("hi")],
                PromptContext {
                    user_role: Role::Student,
                    context: ChatContext::General,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::ServiceUnavailable(_))));
    }
}
