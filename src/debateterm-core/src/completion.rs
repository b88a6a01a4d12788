//! Completion client.
//!
//! Adapts "give me the next line for speaker X" to whichever upstream backend
//! that speaker is bound to. Every backend speaks the OpenAI chat-completions
//! wire format; only the base URL, model and credential differ.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::config::{BackendConfig, BackendsConfig};
use crate::error::DebateError;
use crate::identity::{BackendKind, Identity};
use crate::message::Message;
use crate::prompt::PromptComposer;

/// A single generation call, already composed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub instruction: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// An upstream text-generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name used in error messages.
    fn name(&self) -> &str;

    /// Return the raw completion text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, DebateError>;
}

/// Whether `key` is absent in practice: blank, or the `your_..._here`
/// template value from a sample `.env`.
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || (key.starts_with("your_") && key.ends_with("_here"))
}

/// Backend for any OpenAI-compatible chat-completions endpoint.
///
/// Does not derive Debug so the API key never ends up in logs.
pub struct OpenAiCompatBackend {
    name: String,
    api_base: String,
    model: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(
        name: impl Into<String>,
        config: &BackendConfig,
        api_key: Option<String>,
    ) -> Result<Self, DebateError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DebateError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            name: name.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            http,
        })
    }

    fn credential(&self) -> Result<&str, DebateError> {
        match self.api_key.as_deref() {
            Some(key) if !is_placeholder_key(key) => Ok(key),
            _ => Err(DebateError::CredentialMissing {
                backend: self.name.clone(),
            }),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, DebateError> {
        let api_key = self.credential()?;
        let body = chat_request(&self.model, request)?;

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(DebateError::Upstream {
                backend: self.name.clone(),
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: CreateChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| DebateError::MalformedResponse {
                backend: self.name.clone(),
                reason: e.to_string(),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DebateError::MalformedResponse {
                backend: self.name.clone(),
                reason: "no message content in response".to_string(),
            })
    }
}

/// Build the chat-completions body for `request`.
///
/// Uses `max_tokens` rather than `max_completion_tokens`: DeepSeek, xAI and
/// Anthropic's compatibility layer only honour the former.
#[allow(deprecated)]
fn chat_request(
    model: &str,
    request: &CompletionRequest,
) -> Result<CreateChatCompletionRequest, DebateError> {
    let messages = vec![
        ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: request.system.clone().into(),
            name: None,
        }),
        ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: request.instruction.clone().into(),
            name: None,
        }),
    ];

    Ok(CreateChatCompletionRequestArgs::default()
        .model(model)
        .max_tokens(request.max_tokens)
        .temperature(request.temperature)
        .messages(messages)
        .build()?)
}

/// Routes each identity to its backend and cleans up the result.
pub struct CompletionClient {
    composer: PromptComposer,
    backends: HashMap<BackendKind, Arc<dyn CompletionBackend>>,
}

impl CompletionClient {
    /// A client with no backends bound; every call fails as unconfigured.
    pub fn new(composer: PromptComposer) -> Self {
        Self {
            composer,
            backends: HashMap::new(),
        }
    }

    /// Bind `kind` to `backend`.
    pub fn with_backend(mut self, kind: BackendKind, backend: Arc<dyn CompletionBackend>) -> Self {
        self.backends.insert(kind, backend);
        self
    }

    /// Build one [`OpenAiCompatBackend`] per backend kind, reading each
    /// credential through `lookup_key` (normally the process environment).
    pub fn from_config(
        composer: PromptComposer,
        config: &BackendsConfig,
        lookup_key: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, DebateError> {
        let mut client = Self::new(composer);
        for kind in BackendKind::ALL {
            let backend_config = config.get(kind);
            let api_key = lookup_key(&backend_config.api_key_env);
            let backend = OpenAiCompatBackend::new(kind.display_name(), backend_config, api_key)?;
            client = client.with_backend(kind, Arc::new(backend));
        }
        Ok(client)
    }

    /// Produce the next line for `identity`.
    ///
    /// `history` must already exclude typing placeholders.
    pub async fn generate(
        &self,
        identity: Identity,
        topic: &str,
        history: &[Message],
        is_user_response: bool,
    ) -> Result<String, DebateError> {
        let profile = identity.profile();
        let backend = self.backends.get(&profile.backend).ok_or_else(|| {
            DebateError::CredentialMissing {
                backend: profile.backend.display_name().to_string(),
            }
        })?;

        let prompt = self
            .composer
            .compose(topic, identity, history, is_user_response);
        let request = CompletionRequest {
            system: prompt.system,
            instruction: prompt.instruction,
            max_tokens: profile.max_tokens,
            temperature: profile.temperature,
        };

        let raw = backend.complete(&request).await?;
        let cleaned = clean_completion(&raw);
        if cleaned.trim().is_empty() {
            return Err(DebateError::MalformedResponse {
                backend: backend.name().to_string(),
                reason: "empty completion".to_string(),
            });
        }

        debug!(speaker = %identity, response = %cleaned, "Completion received");
        Ok(cleaned)
    }
}

static WRAPPING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^["']|["']$"#).expect("quote pattern is valid"));

/// Trim whitespace and drop one leading and one trailing quotation mark.
fn clean_completion(raw: &str) -> String {
    WRAPPING_QUOTES.replace_all(raw.trim(), "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendsConfig;
    use crate::prompt::DEFAULT_CONTEXT_WINDOW;
    use crate::random::FixedRandom;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct Recording {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl CompletionBackend for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, DebateError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.reply.clone())
        }
    }

    fn composer() -> PromptComposer {
        PromptComposer::new(DEFAULT_CONTEXT_WINDOW, Arc::new(FixedRandom(0.99)))
    }

    /// Serve exactly one HTTP response on a local port, returning its base URL.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/v1")
    }

    fn backend_config(api_base: String) -> BackendConfig {
        BackendConfig {
            api_base,
            model: "test-model".to_string(),
            api_key_env: "TEST_KEY".to_string(),
            timeout_secs: 5,
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "system".to_string(),
            instruction: "instruction".to_string(),
            max_tokens: 120,
            temperature: 0.9,
        }
    }

    #[test]
    fn test_clean_completion_strips_outer_quotes() {
        assert_eq!(clean_completion("  \"Hello there\"\n"), "Hello there");
        assert_eq!(clean_completion("'single'"), "single");
        assert_eq!(clean_completion("He said \"no\" twice"), "He said \"no\" twice");
        assert_eq!(clean_completion("\"\"double\"\""), "\"double\"");
    }

    #[test]
    fn test_request_body_carries_max_tokens() {
        let body = serde_json::to_value(chat_request("deepseek-chat", &request()).unwrap()).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["max_tokens"], 120);
        assert!(body.get("max_completion_tokens").is_none());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "instruction");
    }

    #[test]
    fn test_placeholder_keys() {
        assert!(is_placeholder_key(""));
        assert!(is_placeholder_key("   "));
        assert!(is_placeholder_key("your_openai_api_key_here"));
        assert!(!is_placeholder_key("sk-live-123"));
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        // Nothing listens on this port; a network attempt would be an Http error.
        let config = backend_config("http://127.0.0.1:9/v1".to_string());
        let backend = OpenAiCompatBackend::new("OpenAI", &config, None).unwrap();
        let err = backend.complete(&request()).await.unwrap_err();
        assert!(matches!(err, DebateError::CredentialMissing { ref backend } if backend == "OpenAI"));

        let placeholder =
            OpenAiCompatBackend::new("OpenAI", &config, Some("your_openai_api_key_here".into()))
                .unwrap();
        assert!(matches!(
            placeholder.complete(&request()).await,
            Err(DebateError::CredentialMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let base = serve_once("503 Service Unavailable", "overloaded".to_string()).await;
        let backend =
            OpenAiCompatBackend::new("DeepSeek", &backend_config(base), Some("sk-test".into()))
                .unwrap();
        match backend.complete(&request()).await {
            Err(DebateError::Upstream {
                backend,
                status,
                message,
            }) => {
                assert_eq!(backend, "DeepSeek");
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_returns_first_choice() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Pineapple belongs everywhere."},
                "finish_reason": "stop"
            }]
        })
        .to_string();
        let base = serve_once("200 OK", body).await;
        let backend =
            OpenAiCompatBackend::new("Grok", &backend_config(base), Some("sk-test".into()))
                .unwrap();
        let text = backend.complete(&request()).await.unwrap();
        assert_eq!(text, "Pineapple belongs everywhere.");
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let base = serve_once("200 OK", "not json".to_string()).await;
        let backend =
            OpenAiCompatBackend::new("Grok", &backend_config(base), Some("sk-test".into()))
                .unwrap();
        assert!(matches!(
            backend.complete(&request()).await,
            Err(DebateError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_uses_identity_profile() {
        let recording = Arc::new(Recording {
            reply: "  'Deep thoughts.'  ".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let client = CompletionClient::new(composer())
            .with_backend(BackendKind::Xai, recording.clone());

        let text = client
            .generate(Identity::Grok, "Is AI good?", &[], false)
            .await
            .unwrap();
        assert_eq!(text, "Deep thoughts.");

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].temperature, 1.0);
        assert_eq!(seen[0].max_tokens, 120);
        assert_eq!(seen[0].system, Identity::Grok.profile().system_persona);
        assert!(seen[0].instruction.starts_with("Topic: Is AI good?"));
    }

    #[tokio::test]
    async fn test_client_without_binding_reports_missing_credential() {
        let client = CompletionClient::new(composer());
        let err = client
            .generate(Identity::Claude, "t", &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::CredentialMissing { ref backend } if backend == "Anthropic"));
    }

    #[tokio::test]
    async fn test_blank_completion_is_an_error() {
        let client = CompletionClient::new(composer()).with_backend(
            BackendKind::OpenAi,
            Arc::new(Recording {
                reply: " \"\" ".to_string(),
                seen: Mutex::new(Vec::new()),
            }),
        );
        assert!(matches!(
            client.generate(Identity::ChatGpt, "t", &[], false).await,
            Err(DebateError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_from_config_reads_keys_through_lookup() {
        let client = CompletionClient::from_config(composer(), &BackendsConfig::default(), |_| None)
            .unwrap();
        let err = client
            .generate(Identity::DeepSeek, "t", &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, DebateError::CredentialMissing { ref backend } if backend == "DeepSeek"));
    }
}
