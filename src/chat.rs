//! The chat relay: bridges a user message plus the current transaction
//! snapshot to a remote chat-completion endpoint and surfaces the response
//! as it arrives.
//!
//! The relay performs no transformation, filtering, or reordering of the
//! streamed text: each fragment the upstream service produces is forwarded
//! in arrival order, and the caller concatenates fragments into the full
//! reply via a [MessageAccumulator] it owns.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{Error, tools::ToolRegistry, transaction::Transaction};

/// The fixed instruction sent as the system message of every request.
const SYSTEM_INSTRUCTION: &str = "You are Zenith, a helpful personal finance assistant. \
    Answer questions about the user's finances using the transaction history provided below. \
    Be concise and concrete, and do not invent transactions that are not in the data.";

/// The maximum number of prior conversation turns included in a request.
const HISTORY_TURN_LIMIT: usize = 5;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The model answering.
    Assistant,
}

/// One turn of the chat conversation.
///
/// Messages are session-scoped and never persisted; an assistant message's
/// content grows while its stream is live and is immutable once the stream
/// ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Opaque unique identifier.
    pub id: String,
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            role,
            content: content.into(),
        }
    }
}

/// Collects streamed fragments into the displayed message content.
///
/// The accumulator is owned by the call site of the relay and is the only
/// thing a stream's fragments are applied to. Abandoning it (user navigated
/// away or started a new message) detaches it: late fragments of the
/// abandoned stream are dropped instead of corrupting whatever is displayed
/// next.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    content: String,
    detached: bool,
}

impl MessageAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fragment` to the content, preserving arrival order.
    ///
    /// Returns whether the fragment was applied; fragments pushed after
    /// [MessageAccumulator::abandon] are dropped.
    pub fn push(&mut self, fragment: &str) -> bool {
        if self.detached {
            return false;
        }

        self.content.push_str(fragment);
        true
    }

    /// Detach the accumulator from further fragment delivery.
    pub fn abandon(&mut self) {
        self.detached = true;
    }

    /// The content accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Consume the accumulator and return the full reply.
    pub fn into_content(self) -> String {
        self.content
    }
}

/// The upstream connection settings for the chat relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// The chat-completions endpoint URL.
    pub endpoint: String,
    /// The bearer token for the endpoint.
    pub api_key: String,
    /// The model to request.
    pub model: String,
}

/// A chat request from the browser: the new message plus the transaction
/// snapshot serialized with ISO date strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's free-text message.
    pub message: String,
    /// The transaction history to give the model as context.
    pub transactions: Vec<Transaction>,
}

/// Forwards chat requests to the upstream completion endpoint and exposes
/// the token-streamed response as a [CompletionStream].
pub struct ChatRelay {
    client: reqwest::Client,
    config: RelayConfig,
    tools: ToolRegistry,
}

impl ChatRelay {
    /// Create a relay with no tools declared, the steady-state
    /// configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_tools(config, ToolRegistry::new())
    }

    /// Create a relay that declares `tools` to the model.
    pub fn with_tools(config: RelayConfig, tools: ToolRegistry) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            tools,
        }
    }

    /// The relay's tool registry.
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Submit `request` upstream and return the fragment stream.
    ///
    /// `history` is the prior conversation; at most the last
    /// [HISTORY_TURN_LIMIT] turns are forwarded.
    ///
    /// # Errors
    /// This function will return an [Error::Transport] if the upstream call
    /// could not be established or answered with a non-success status. No
    /// fragments are delivered in that case.
    pub async fn begin_stream(
        &self,
        request: &ChatRequest,
        history: &[ChatMessage],
    ) -> Result<CompletionStream, Error> {
        let payload = self.build_payload(request, history);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| Error::Transport(format!("request failed: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "upstream returned {status}: {body}"
            )));
        }

        Ok(CompletionStream::new(response.bytes_stream()))
    }

    fn build_payload(&self, request: &ChatRequest, history: &[ChatMessage]) -> Value {
        let mut payload = json!({
            "model": self.config.model,
            "messages": self.build_messages(request, history),
            "stream": true,
        });

        // The model is only offered tools when some have been declared.
        if !self.tools.is_empty() {
            let definitions: Vec<Value> = self
                .tools
                .definitions()
                .into_iter()
                .map(|definition| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": definition.name,
                            "description": definition.description,
                            "parameters": definition.parameters,
                        },
                    })
                })
                .collect();

            payload["tools"] = Value::Array(definitions);
            payload["tool_choice"] = Value::String("auto".to_owned());
        }

        payload
    }

    fn build_messages(&self, request: &ChatRequest, history: &[ChatMessage]) -> Vec<Value> {
        let transaction_data = serde_json::to_string(&request.transactions)
            .unwrap_or_else(|_| "[]".to_owned());
        let system = format!(
            "{SYSTEM_INSTRUCTION}\n\nTransaction history (JSON):\n{transaction_data}"
        );

        let mut messages = vec![json!({ "role": "system", "content": system })];

        let recent_turns = &history[history.len().saturating_sub(HISTORY_TURN_LIMIT)..];
        for message in recent_turns {
            messages.push(json!({ "role": message.role, "content": message.content }));
        }

        messages.push(json!({ "role": "user", "content": request.message }));

        messages
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// An established token stream from the upstream completion endpoint.
///
/// Call [CompletionStream::next_fragment] until it returns `Ok(None)`. The
/// upstream speaks server-sent events; this type decodes them incrementally
/// and yields only the text fragments, in arrival order, without assuming
/// transport chunk boundaries align with events or UTF-8 sequences.
pub struct CompletionStream {
    bytes: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    finished: bool,
}

impl fmt::Debug for CompletionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionStream")
            .field("buffered_bytes", &self.buffer.len())
            .field("pending_fragments", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl CompletionStream {
    fn new(bytes: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            bytes: Box::pin(bytes),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// The next text fragment, or `None` when the stream has ended.
    ///
    /// # Errors
    /// This function will return an [Error::Transport] if the upstream
    /// connection fails mid-stream. Fragments delivered before the failure
    /// remain valid; the caller should display them followed by an error
    /// notice rather than discarding them.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Ok(Some(fragment));
            }

            if self.finished {
                return Ok(None);
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.extend_from_slice(&chunk);
                    self.drain_complete_lines();
                }
                Some(Err(error)) => {
                    self.finished = true;
                    return Err(Error::Transport(format!("stream failed: {error}")));
                }
                None => {
                    self.finished = true;
                }
            }
        }
    }

    /// Decode every complete line in the buffer into pending fragments.
    ///
    /// Only complete lines are taken, so a transport chunk that splits an
    /// event, or even a multi-byte UTF-8 sequence, is handled once the rest
    /// arrives.
    fn drain_complete_lines(&mut self) {
        while let Some(newline) = self.buffer.iter().position(|&byte| byte == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim_start();

            // End-of-stream is terminal: anything after the marker is dropped.
            if data == "[DONE]" {
                self.finished = true;
                break;
            }

            if let Some(fragment) = extract_delta_content(data) {
                self.pending.push_back(fragment);
            }
        }
    }
}

/// Pull the `choices[0].delta.content` text out of one SSE data payload.
///
/// Events without text content (role announcements, tool-call deltas,
/// finish markers) produce no fragment.
fn extract_delta_content(data: &str) -> Option<String> {
    let event: Value = serde_json::from_str(data).ok()?;
    let content = event["choices"][0]["delta"]["content"].as_str()?;

    if content.is_empty() {
        None
    } else {
        Some(content.to_owned())
    }
}
