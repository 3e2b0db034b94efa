//! `OpenAI`-compatible chat-completions provider

use super::stream::sse_fragments;
use super::types::{FinishReason, LlmRequest, LlmResponse, Usage};
use super::{FragmentStream, LlmConfig, LlmError, LlmService};
use crate::conversation::{Message, ToolArguments, ToolCall};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat-completions service for `OpenAI`-compatible servers
pub struct OpenAIService {
    client: Client,
    api_key: Option<String>,
    url: String,
    model_id: String,
}

impl OpenAIService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.completions_url(),
            model_id: config.model.clone(),
        })
    }

    fn translate_request(&self, request: &LlmRequest, stream: bool) -> OpenAIRequest {
        let messages = request.messages.iter().map(translate_message).collect();

        let (tools, tool_choice, parallel_tool_calls) = if request.tools.is_empty() {
            (None, None, None)
        } else {
            let tools = request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    r#type: "function".to_string(),
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.input_schema(),
                    },
                })
                .collect();
            // Tool calls are executed one at a time
            (Some(tools), Some("auto".to_string()), Some(false))
        };

        OpenAIRequest {
            model: self.model_id.clone(),
            messages,
            tools,
            tool_choice,
            parallel_tool_calls,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream,
        }
    }

    fn post(&self, body: &OpenAIRequest) -> RequestBuilder {
        let builder = self.client.post(&self.url).json(body);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, body: &OpenAIRequest) -> Result<reqwest::Response, LlmError> {
        let response = self.post(body).send().await.map_err(map_send_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
        let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(LlmError::from_status(status.as_u16(), &message))
    }
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        LlmError::network(format!("Connection failed: {e}"))
    } else {
        LlmError::unknown(format!("Request failed: {e}"))
    }
}

fn translate_message(msg: &Message) -> OpenAIMessage {
    match msg {
        Message::System { content } | Message::User { content } => OpenAIMessage {
            role: msg.role().as_str().to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        },
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let tool_calls: Vec<OpenAIToolCall> = tool_calls
                .iter()
                .map(|tc| OpenAIToolCall {
                    id: Some(tc.id.clone()),
                    r#type: Some("function".to_string()),
                    function: OpenAIFunctionCall {
                        name: tc.name.clone(),
                        arguments: Value::String(tc.arguments.to_wire_string()),
                    },
                })
                .collect();
            // An assistant message needs content when it carries no calls
            let content = match content {
                Some(text) => Some(text.clone()),
                None if tool_calls.is_empty() => Some(String::new()),
                None => None,
            };
            OpenAIMessage {
                role: "assistant".to_string(),
                content,
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
                name: None,
            }
        }
        Message::Tool {
            tool_call_id,
            name,
            content,
        } => OpenAIMessage {
            role: "tool".to_string(),
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.clone()),
            name: Some(name.clone()),
        },
    }
}

fn normalize_response(resp: OpenAIResponse) -> Result<LlmResponse, LlmError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::invalid_response("No choices in response"))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .filter(|tc| !tc.function.name.is_empty())
        .map(|tc| {
            let arguments = match tc.function.arguments {
                Value::Object(map) => ToolArguments::Structured(map),
                Value::String(raw) => ToolArguments::Raw(raw),
                Value::Null => ToolArguments::Raw(String::new()),
                other => ToolArguments::Raw(other.to_string()),
            };
            let id = tc
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
            ToolCall::native(id, tc.function.name, arguments)
        })
        .collect();

    let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_tokens),
        output_tokens: u64::from(u.completion_tokens),
    });

    Ok(LlmResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason: FinishReason::parse(choice.finish_reason.as_deref()),
        usage,
    })
}

#[async_trait]
impl LlmService for OpenAIService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.translate_request(request, false);
        let response = self.send(&body).await?;

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
        let parsed: OpenAIResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::invalid_response(format!("Failed to parse response: {e} - body: {text}"))
        })?;

        normalize_response(parsed)
    }

    async fn stream(&self, request: &LlmRequest) -> Result<FragmentStream, LlmError> {
        let body = self.translate_request(request, true);
        let response = self.send(&body).await?;
        Ok(sse_fragments(response.bytes_stream()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r#type: Option<String>,
    function: OpenAIFunctionCall,
}

/// `arguments` is a JSON string per the API, but some servers send an object
#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}
