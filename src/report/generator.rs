// SPDX-License-Identifier: MIT
//! Report generation against the OpenAI Responses API.
//!
//! One request per run: the assembled activity prompt goes in as `input`,
//! instructions come either from a stored prompt id or the local
//! system-role template. `store: false` keeps daily reports out of the
//! provider's request history.

use anyhow::{bail, Context as _, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::config::OpenAiConfig;

/// Timeout for the generation request. Generation is slower than the data
/// fetches, so this is double the source timeout.
const GENERATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

const DEFAULT_INSTRUCTIONS: &str =
    "You are an assistant that writes concise, structured daily productivity reports in Ukrainian.";

pub struct ReportGenerator {
    http: reqwest::Client,
    cfg: OpenAiConfig,
}

impl ReportGenerator {
    pub fn new(cfg: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .context("failed to build openai http client")?;
        Ok(Self { http, cfg })
    }

    /// Generate the report text for an assembled user prompt.
    ///
    /// `system_role` is the local instructions template; it is ignored when a
    /// stored prompt id is configured and falls back to a built-in
    /// instruction when empty.
    pub async fn generate(&self, user_prompt: &str, system_role: &str) -> Result<String> {
        let mut body = json!({
            "model": self.cfg.model,
            "input": user_prompt,
            "store": false,
        });

        if let Some(prompt_id) = &self.cfg.prompt_id {
            info!(%prompt_id, "using stored prompt");
            body["prompt"] = json!({ "id": prompt_id });
        } else {
            let instructions = if system_role.is_empty() {
                DEFAULT_INSTRUCTIONS
            } else {
                system_role
            };
            body["instructions"] = json!(instructions);
        }

        info!(model = %self.cfg.model, "sending data for report generation");

        let resp = self
            .http
            .post(format!("{}/responses", self.cfg.base_url))
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .context("openai request failed")?
            .error_for_status()
            .context("openai returned an error status")?;

        let payload: Value = resp.json().await.context("invalid openai response body")?;

        let Some(report) = extract_response_text(&payload) else {
            bail!("empty response from model");
        };

        info!("report generated successfully");
        Ok(format!("{report}{}", self.disclaimer()))
    }

    fn disclaimer(&self) -> String {
        format!(
            "\n\n---\n*This report was generated using AI based on task statistics and monitoring metrics.*\nModel used: OpenAI {}\n",
            self.cfg.model
        )
    }
}

/// Pull the generated text out of a Responses API payload.
///
/// Tries, in order: the `output_text` convenience field, the first text
/// block inside `output[].content[]`, and finally the chat-completions
/// `choices[0].message.content` shape for older models.
pub fn extract_response_text(payload: &Value) -> Option<String> {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return Some(text.trim().to_string());
        }
    }

    if let Some(output) = payload.get("output").and_then(Value::as_array) {
        for block in output {
            if let Some(content) = block.get("content").and_then(Value::as_array) {
                for item in content {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        if !text.trim().is_empty() {
                            return Some(text.trim().to_string());
                        }
                    }
                }
            }
        }
    }

    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
