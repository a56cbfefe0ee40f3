//! Optional AI-backed query understanding layered around the deterministic
//! parser. The provider is asked to rewrite a free-text message into the
//! JSON shape of [`QueryFilters`]; any failure (disabled, network error,
//! malformed output) falls through to the regex parser unconditionally.
//! The AI path is an enhancement, never a dependency.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::filters::{self, QueryFilters};

/// Low-level provider: one remote call, `None` on any failure.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<QueryFilters>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn Provider>;

/// Composite parser handed to the request path: tries the provider first,
/// then always lands on the deterministic extraction rules.
pub struct QueryParser {
    provider: DynProvider,
}

impl QueryParser {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }

    pub fn deterministic() -> Self {
        Self::new(Arc::new(DisabledProvider))
    }

    pub async fn parse(&self, raw: &str) -> QueryFilters {
        if let Some(parsed) = self.provider.fetch(raw).await {
            // A provider answer that extracted nothing is treated as a miss;
            // the regex chain usually does better on structured messages.
            if !parsed.is_unconstrained() || !parsed.keywords.is_empty() {
                debug!(provider = self.provider.name(), "query parsed by provider");
                return parsed;
            }
        }
        filters::parse(raw)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Factory: build the parser from config and environment.
///
/// * `AI_TEST_MODE=mock` wires a deterministic mock provider.
/// * Disabled config or a missing API key wires the regex-only parser.
pub fn build_parser(cfg: &AiConfig) -> QueryParser {
    if std::env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return QueryParser::new(Arc::new(MockProvider::default()));
    }
    if !cfg.enabled {
        return QueryParser::deterministic();
    }
    match cfg.provider.as_deref() {
        Some("openai") => {
            let provider = OpenAiProvider::new(&cfg.model);
            if provider.api_key.is_empty() {
                warn!("AI parser enabled but OPENAI_API_KEY is unset, using regex parser");
                return QueryParser::deterministic();
            }
            QueryParser::new(Arc::new(provider))
        }
        other => {
            if let Some(name) = other {
                warn!(provider = name, "unknown AI provider, using regex parser");
            }
            QueryParser::deterministic()
        }
    }
}

/// OpenAI chat-completions provider. Requires `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(model: &str) -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("uni-finder/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key,
            model: model.to_string(),
        }
    }
}

const SYSTEM_PROMPT: &str = "Ты извлекаешь фильтры поиска вузов из сообщения. \
Ответь ТОЛЬКО JSON-объектом с полями: city, min_score, dorm, level, form, \
required_exams, direction, keywords, budget, year. Неупомянутые поля — null \
или пустой список. Никакого текста вне JSON.";

impl Provider for OpenAiProvider {
    fn fetch<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<QueryFilters>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: SYSTEM_PROMPT,
                    },
                    Msg {
                        role: "user",
                        content: input,
                    },
                ],
                temperature: 0.0,
                max_tokens: 200,
            };

            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .ok()?;
            if !resp.status().is_success() {
                return None;
            }
            let body: Resp = resp.json().await.ok()?;
            let content = body.choices.first().map(|c| c.message.content.as_str())?;
            extract_filters_json(content)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Pull the first JSON object out of the model reply and decode it. Models
/// sometimes wrap the object in code fences or prose.
fn extract_filters_json(content: &str) -> Option<QueryFilters> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

/// Always misses; wires the composite down to the regex parser alone.
pub struct DisabledProvider;

impl Provider for DisabledProvider {
    fn fetch<'a>(
        &'a self,
        _input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<QueryFilters>> + Send + 'a>> {
        Box::pin(async { None })
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests: returns a fixed filter set.
#[derive(Default)]
pub struct MockProvider {
    pub fixed: Option<QueryFilters>,
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<QueryFilters>> + Send + 'a>> {
        Box::pin(async move { self.fixed.clone() })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
