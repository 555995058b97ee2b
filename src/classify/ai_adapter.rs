// src/classify/ai_adapter.rs
//! AI text-generation seam. The classifier and the digest builder only see
//! the `TextGenerator` trait, so the remote provider can be swapped for a
//! mock in tests and disabled entirely by configuration.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::AiConfig;

const ZHIPU_CHAT_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// One prompt in, free text out. Callers own their fallback paths; an
/// error from `generate` must never abort a batch.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
    fn name(&self) -> &'static str;
}

pub type DynGenerator = Arc<dyn TextGenerator>;

/// Zhipu GLM chat-completions provider.
pub struct ZhipuGenerator {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ZhipuGenerator {
    pub fn new(cfg: &AiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("auto-hr-monitor/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("building ai http client")?;

        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for ZhipuGenerator {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
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
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let resp = self
            .http
            .post(ZHIPU_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("calling zhipu chat completions")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("zhipu returned HTTP {status}");
        }

        let body: Resp = resp.json().await.context("decoding zhipu reply")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            bail!("zhipu reply had no content");
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "zhipu"
    }
}

/// Strip surrounding markdown code fences from a model reply, tolerating a
/// language tag and prose around the fenced block.
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let mut inner = &trimmed[start + 3..];
    if let Some(rest) = inner.strip_prefix("json") {
        inner = rest;
    }
    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

/// Scripted generator for tests: replies are handed out in order and the
/// queue running dry is an error, so tests notice unexpected extra calls.
pub struct MockGenerator {
    replies: Mutex<VecDeque<String>>,
}

impl MockGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        match self.replies.lock().expect("mock replies mutex").pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("mock generator ran out of scripted replies"),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Always fails; simulates an unreachable AI service.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
        bail!("simulated ai service failure")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
