// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! OpenAI-compatible provider implementation.
//!
//! Talks to the Chat Completions API. Streaming responses are decoded
//! incrementally from the HTTP body so text deltas reach the caller as soon
//! as each server-sent event line is complete.
//!
//! See [OpenAI Chat Completions API](https://platform.openai.com/docs/api-reference/chat)

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use crate::error::ProviderError;
use crate::types::{
    ContentBlockType, Message, MessageContent, Provider, ProviderConfig, ProviderResponse, Role,
    StopReason, StreamEvent, TokenUsage, ToolCall, ToolDefinition,
};

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default max tokens if not specified.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature. Tool use works best deterministic.
const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// OpenAI-compatible provider.
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    provider_name: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider.
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        config: ProviderConfig,
    ) -> Result<Self, ProviderError> {
        let timeout = config
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        let provider_name = Self::detect_provider_name(&base_url);

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url,
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            provider_name,
        })
    }

    /// Create a provider for api.openai.com.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            Some(api_key.into()),
            model,
            OPENAI_BASE_URL,
            ProviderConfig::default(),
        )
    }

    fn detect_provider_name(base_url: &str) -> String {
        if base_url.contains("openai.com") {
            "OpenAI".to_string()
        } else if base_url.contains("azure") {
            "Azure OpenAI".to_string()
        } else if base_url.contains("localhost:11434") || base_url.contains("ollama") {
            "Ollama".to_string()
        } else {
            "OpenAI-Compatible".to_string()
        }
    }

    /// Build the request body for the Chat Completions API.
    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
        stream: bool,
    ) -> ChatRequest {
        let mut api_messages: Vec<ChatMessage> = Vec::new();

        if let Some(system) = system_prompt {
            api_messages.push(ChatMessage::text("system", system));
        }

        for msg in messages {
            api_messages.extend(to_chat_messages(msg));
        }

        let tools_json: Option<Vec<ChatTool>> = tools
            .filter(|t| !t.is_empty())
            .map(|t| t.iter().map(|t| t.into()).collect());

        ChatRequest {
            model: self.model.clone(),
            messages: api_messages,
            tools: tools_json,
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            stream: Some(stream),
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    fn get_context_window(model: &str) -> u32 {
        if model.contains("gpt-4o") || model.contains("gpt-4-turbo") || model.contains("gpt-4.1") {
            128_000
        } else if model.contains("gpt-4-32k") {
            32_768
        } else if model.contains("gpt-4") {
            8_192
        } else if model.contains("gpt-3.5") {
            16_384
        } else if model.contains("o1") || model.contains("o3") {
            200_000
        } else {
            8_192
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ProviderError> {
        let mut req = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("content-type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.header("authorization", format!("Bearer {}", api_key));
        }

        let response = req.json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(handle_error_response(status.as_u16(), &error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(messages, tools, system_prompt, false);
        let start = Instant::now();

        debug!(model = %self.model, messages = messages.len(), "Sending chat request");

        let response = self.send(&request).await?;
        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let provider_response: ProviderResponse = api_response.into();

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation("openai.chat", start.elapsed());
            if let Some(ref usage) = provider_response.usage {
                GLOBAL_METRICS.record_tokens(usage.input_tokens as u64, usage.output_tokens as u64);
            }
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(provider_response)
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        system_prompt: Option<&str>,
        on_event: Box<dyn Fn(StreamEvent) + Send + Sync>,
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(messages, tools, system_prompt, true);
        let start = Instant::now();

        debug!(model = %self.model, messages = messages.len(), "Sending streaming chat request");

        let response = self.send(&request).await?;

        let mut decoder = SseLineDecoder::default();
        let mut state = StreamState::default();
        let mut body = response.bytes_stream();

        let mut saw_done = false;
        'read: while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    on_event(StreamEvent::Error(e.to_string()));
                    return Err(ProviderError::StreamError(e.to_string()));
                }
            };

            for data in decoder.push(&bytes) {
                if !state.apply_payload(&data, on_event.as_ref()) {
                    saw_done = true;
                    break 'read;
                }
            }
        }
        // The body may end without a final newline.
        if !saw_done {
            if let Some(data) = decoder.finish() {
                state.apply_payload(&data, on_event.as_ref());
            }
        }

        let response = state.finish(on_event.as_ref());

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_operation("openai.stream_chat", start.elapsed());
            if let Some(ref usage) = response.usage {
                GLOBAL_METRICS.record_tokens(usage.input_tokens as u64, usage.output_tokens as u64);
            }
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(response)
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn context_window(&self) -> u32 {
        Self::get_context_window(&self.model)
    }
}

/// Map an error response from the API to a provider error.
fn handle_error_response(status_code: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ApiError>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let error_type = parsed.and_then(|e| e.error.error_type);

    match (status_code, error_type.as_deref()) {
        (401, _) | (_, Some("authentication_error")) | (_, Some("invalid_api_key")) => {
            ProviderError::AuthError(message)
        }
        (429, _) | (_, Some("rate_limit_exceeded")) => ProviderError::RateLimited(message),
        (404, _) | (_, Some("model_not_found")) => ProviderError::ModelNotFound(message),
        _ => ProviderError::api(message, status_code),
    }
}

// ============================================================================
// SSE decoding
// ============================================================================

/// Some OpenAI-compatible servers omit tool call ids. Results are matched
/// to calls by id, so they must be unique across the whole conversation.
fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Splits a byte stream into complete `data:` payloads.
///
/// Chunks may end mid-line or mid-codepoint, so bytes are held until a
/// newline arrives.
#[derive(Default)]
struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            out.extend(data_payload(&line));
        }
        out
    }

    /// Drain a trailing line that never got its newline.
    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\r', '\n']);
    line.strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}

// ============================================================================
// Stream State
// ============================================================================

#[derive(Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// State accumulated during streaming.
#[derive(Default)]
struct StreamState {
    text_content: String,
    /// Tool calls keyed by their index in the choice
    tool_calls: BTreeMap<u32, PendingToolCall>,
    open_tool: Option<u32>,
    stop_reason: Option<StopReason>,
    usage: Option<TokenUsage>,
}

impl StreamState {
    /// Apply one `data:` payload. Returns false on the `[DONE]` sentinel.
    fn apply_payload(&mut self, data: &str, on_event: &(dyn Fn(StreamEvent) + Send + Sync)) -> bool {
        if data == "[DONE]" {
            return false;
        }
        match serde_json::from_str::<ChatStreamChunk>(data) {
            Ok(chunk) => self.apply(&chunk, on_event),
            Err(e) => debug!(error = %e, "Skipping unparseable stream chunk"),
        }
        true
    }

    fn apply(&mut self, chunk: &ChatStreamChunk, on_event: &(dyn Fn(StreamEvent) + Send + Sync)) {
        if let Some(usage) = &chunk.usage {
            self.usage = Some(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        for choice in &chunk.choices {
            if let Some(ref finish_reason) = choice.finish_reason {
                self.stop_reason = Some(map_finish_reason(Some(finish_reason)));
            }

            let delta = &choice.delta;

            if let Some(ref content) = delta.content {
                if !content.is_empty() {
                    self.text_content.push_str(content);
                    on_event(StreamEvent::TextDelta(content.clone()));
                }
            }

            for tc in delta.tool_calls.iter().flatten() {
                let index = tc.index.unwrap_or(0);
                if !self.tool_calls.contains_key(&index) {
                    if self.open_tool.take().is_some() {
                        on_event(StreamEvent::ToolUseEnd);
                    }
                    let name = tc
                        .function
                        .as_ref()
                        .and_then(|f| f.name.clone())
                        .unwrap_or_default();
                    let id = tc.id.clone().unwrap_or_else(generate_call_id);
                    on_event(StreamEvent::ToolUseStart {
                        id: id.clone(),
                        name: name.clone(),
                    });
                    self.tool_calls.insert(
                        index,
                        PendingToolCall {
                            id,
                            name,
                            arguments: String::new(),
                        },
                    );
                    self.open_tool = Some(index);
                }

                if let Some(args) = tc.function.as_ref().and_then(|f| f.arguments.as_ref()) {
                    if let Some(pending) = self.tool_calls.get_mut(&index) {
                        pending.arguments.push_str(args);
                    }
                    on_event(StreamEvent::ToolInputDelta(args.clone()));
                }
            }
        }
    }

    fn finish(mut self, on_event: &(dyn Fn(StreamEvent) + Send + Sync)) -> ProviderResponse {
        if self.open_tool.take().is_some() {
            on_event(StreamEvent::ToolUseEnd);
        }

        let tool_calls: Vec<ToolCall> = std::mem::take(&mut self.tool_calls)
            .into_values()
            .map(|p| ToolCall {
                id: p.id,
                name: p.name,
                input: parse_arguments_json(&p.arguments),
            })
            .collect();

        let stop_reason = if !tool_calls.is_empty() {
            StopReason::ToolUse
        } else {
            self.stop_reason.unwrap_or(StopReason::EndTurn)
        };

        if let Some(ref usage) = self.usage {
            on_event(StreamEvent::Usage(usage.clone()));
        }
        on_event(StreamEvent::Done(stop_reason));

        ProviderResponse {
            content: self.text_content,
            tool_calls,
            stop_reason,
            usage: self.usage,
        }
    }
}

fn parse_arguments_json(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or(serde_json::Value::Object(Default::default()))
}

fn map_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        Some("length") => StopReason::MaxTokens,
        _ => StopReason::EndTurn,
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    /// Position of the call in a streamed delta
    #[serde(default, skip_serializing)]
    index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    call_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function: Option<ChatFunction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunction {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ChatToolFunction,
}

#[derive(Debug, Serialize)]
struct ChatToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

// ============================================================================
// Type Conversions
// ============================================================================

/// Convert one conversation message into Chat API messages.
///
/// Each tool result becomes its own `tool` message because the API pairs
/// them with tool calls one to one.
fn to_chat_messages(msg: &Message) -> Vec<ChatMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    let blocks = match &msg.content {
        MessageContent::Text(s) => return vec![ChatMessage::text(role, s.clone())],
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut out = Vec::new();
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block.block_type {
            ContentBlockType::Text => {
                if let Some(ref t) = block.text {
                    text.push_str(t);
                }
            }
            ContentBlockType::ToolUse => tool_calls.push(ChatToolCall {
                index: None,
                id: block.id.clone(),
                call_type: Some("function".to_string()),
                function: Some(ChatFunction {
                    name: block.name.clone(),
                    arguments: Some(
                        block
                            .input
                            .as_ref()
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "{}".to_string()),
                    ),
                }),
            }),
            ContentBlockType::ToolResult => out.push(ChatMessage {
                role: "tool".to_string(),
                content: Some(block.content.clone().unwrap_or_default()),
                tool_calls: None,
                tool_call_id: block.tool_use_id.clone(),
            }),
        }
    }

    if !text.is_empty() || !tool_calls.is_empty() {
        out.insert(
            0,
            ChatMessage {
                role: role.to_string(),
                content: (!text.is_empty()).then_some(text),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            },
        );
    }
    out
}

impl From<&ToolDefinition> for ChatTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: ChatToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: serde_json::to_value(&tool.input_schema).unwrap_or_default(),
            },
        }
    }
}

impl From<ChatResponse> for ProviderResponse {
    fn from(response: ChatResponse) -> Self {
        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        let Some(choice) = response.choices.into_iter().next() else {
            return ProviderResponse { usage, ..ProviderResponse::text("") };
        };

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| {
                let id = tc.id.unwrap_or_else(generate_call_id);
                let func = tc.function?;
                let name = func.name?;
                let input = parse_arguments_json(func.arguments.as_deref().unwrap_or(""));
                Some(ToolCall { id, name, input })
            })
            .collect();

        Self {
            content: choice.message.content.unwrap_or_default(),
            stop_reason: if tool_calls.is_empty() {
                map_finish_reason(choice.finish_reason.as_deref())
            } else {
                StopReason::ToolUse
            },
            tool_calls,
            usage,
        }
    }
}
