//! Anthropic Messages API client with server-sent event streaming

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::{ApiKey, LlmConfig};
use crate::error::{Error, Result};
use crate::types::ConversationTurn;

use super::llm::{ChatModel, TextStream};

/// Client for the hosted Messages API
pub struct AnthropicClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
    /// Credential sent as `x-api-key`
    api_key: ApiKey,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Server-sent events we care about
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamPayload {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

impl AnthropicClient {
    /// Create a new client
    pub fn new(config: &LlmConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(
        &'a self,
        system: &'a str,
        history: &'a [ConversationTurn],
        user_content: &'a str,
    ) -> MessagesRequest<'a> {
        let mut messages: Vec<Message<'a>> = history
            .iter()
            .map(|turn| Message {
                role: turn.role.as_str(),
                content: turn.content.as_str(),
            })
            .collect();
        messages.push(Message {
            role: "user",
            content: user_content,
        });

        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages,
            stream: true,
        }
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn stream_completion(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user_content: &str,
    ) -> Result<TextStream> {
        let request = self.build_request(system, history, user_content);

        tracing::info!(
            "Requesting completion from {} ({} prior turns)",
            self.config.model,
            history.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", &self.config.api_version)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Request to model API failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(describe_http_error(status, &body)));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|b| b.to_vec())
                    .map_err(|e| Error::llm(format!("Stream error: {}", e)))
            })
            .boxed();

        Ok(text_stream(bytes))
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

fn describe_http_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "Model API returned {}: {}: {}",
            status, envelope.error.kind, envelope.error.message
        ),
        Err(_) if body.trim().is_empty() => format!("Model API returned {}", status),
        Err(_) => format!("Model API returned {}: {}", status, body.trim()),
    }
}

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental server-sent event decoder.
///
/// Network chunks can split events, lines and even UTF-8 sequences, so bytes
/// are buffered until a blank line closes an event.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every event completed by them
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut events = Vec::new();
        while let Some(pos) = find_blank_line(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Some(event) = parse_frame(&frame[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Option<SseEvent> {
        let frame = std::mem::take(&mut self.buffer);
        parse_frame(&frame)
    }
}

fn find_blank_line(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(frame: &[u8]) -> Option<SseEvent> {
    let text = String::from_utf8_lossy(frame);
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }

    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data.join("\n"),
    })
}

/// What a single event means for the reply
#[derive(Debug, PartialEq, Eq)]
enum Signal {
    Text(String),
    Stop,
    Failed(String),
    Nothing,
}

fn interpret(event: &SseEvent) -> Signal {
    if event.data.is_empty() {
        return Signal::Nothing;
    }
    match serde_json::from_str::<StreamPayload>(&event.data) {
        Ok(StreamPayload::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        }) => Signal::Text(text),
        Ok(StreamPayload::MessageStop) => Signal::Stop,
        Ok(StreamPayload::Error { error }) => {
            Signal::Failed(format!("{}: {}", error.kind, error.message))
        }
        Ok(_) => Signal::Nothing,
        Err(e) => {
            tracing::debug!("Skipping undecodable event {:?}: {}", event.event, e);
            Signal::Nothing
        }
    }
}

struct StreamState {
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl StreamState {
    fn apply(&mut self, events: impl IntoIterator<Item = SseEvent>) {
        for event in events {
            match interpret(&event) {
                Signal::Text(text) => self.pending.push_back(Ok(text)),
                Signal::Stop => {
                    self.finished = true;
                    return;
                }
                Signal::Failed(message) => {
                    tracing::warn!("Model stream reported an error: {}", message);
                    self.pending.push_back(Err(Error::llm(message)));
                    self.finished = true;
                    return;
                }
                Signal::Nothing => {}
            }
        }
    }
}

/// Turn a raw SSE byte stream into reply fragments.
///
/// Ends after `message_stop`. A transport error, an `error` event or a
/// connection that closes before `message_stop` yields one final `Err`.
pub fn text_stream<S>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    let state = StreamState {
        bytes: bytes.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(&chunk);
                    state.apply(events);
                }
                Some(Err(e)) => {
                    state.pending.push_back(Err(e));
                    state.finished = true;
                }
                None => {
                    let trailing = state.decoder.finish();
                    state.apply(trailing);
                    if !state.finished {
                        state
                            .pending
                            .push_back(Err(Error::llm("Stream ended before the reply was complete")));
                        state.finished = true;
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSource;

    fn delta(text: &str) -> String {
        format!(
            "event: content_block_delta\ndata: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":{}}}}}\n\n",
            serde_json::to_string(text).unwrap()
        )
    }

    const STOP: &str = "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n";

    fn collect(chunks: Vec<Result<Vec<u8>>>) -> Vec<Result<String>> {
        tokio_test::block_on(text_stream(stream::iter(chunks)).collect::<Vec<_>>())
    }

    #[test]
    fn test_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: ping\r\ndata: {\"type\"").is_empty());
        let events = decoder.push(b":\"ping\"}\r\n\r\n: comment\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("ping".to_string()),
                data: "{\"type\":\"ping\"}".to_string(),
            }]
        );
    }

    #[test]
    fn test_fragments_in_order() {
        let body = format!(
            "event: message_start\ndata: {{\"type\":\"message_start\"}}\n\n{}{}{}",
            delta("Lead with "),
            delta("the answer."),
            STOP
        );
        // split mid-event to exercise buffering
        let (a, b) = body.as_bytes().split_at(body.len() / 2);
        let items = collect(vec![Ok(a.to_vec()), Ok(b.to_vec())]);

        let texts: Vec<String> = items.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["Lead with ", "the answer."]);
    }

    #[test]
    fn test_error_event_is_terminal() {
        let body = format!(
            "{}event: error\ndata: {{\"type\":\"error\",\"error\":{{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}}}\n\n{}",
            delta("partial"),
            delta("never seen")
        );
        let items = collect(vec![Ok(body.into_bytes())]);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("overloaded_error"));
    }

    #[test]
    fn test_truncated_stream_reports_error() {
        let items = collect(vec![Ok(delta("half").into_bytes())]);
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[test]
    fn test_transport_error_is_terminal() {
        let items = collect(vec![
            Ok(delta("a").into_bytes()),
            Err(Error::llm("connection reset")),
            Ok(delta("b").into_bytes()),
        ]);
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap_err().to_string().contains("connection reset"));
    }

    #[test]
    fn test_request_shape() {
        let config = LlmConfig::default();
        let client = AnthropicClient::new(
            &config,
            ApiKey::new("k", CredentialSource::Environment),
        )
        .unwrap();
        let history = vec![
            ConversationTurn::user("q1"),
            ConversationTurn::assistant("a1"),
        ];

        let request = client.build_request("sys", &history, "q2 + context");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["stream"], true);
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"].as_array().unwrap().len(), 3);
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "q2 + context");
        assert_eq!(client.endpoint(), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_http_error_description() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        let msg = describe_http_error(reqwest::StatusCode::UNAUTHORIZED, body);
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid x-api-key"));
    }
}
