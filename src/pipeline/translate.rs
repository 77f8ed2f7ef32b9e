//! Translation client: streaming chat requests, stream decoding, retries,
//! and chunked translation of a page's text.
//!
//! ## Wire protocol
//!
//! One HTTP POST per chunk with a bearer token and a JSON body carrying the
//! translator persona, the instruction embedding the text, the sampling
//! parameters and `"stream": true`. The response is line-oriented:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"你"}}]}
//! data: {"choices":[{"delta":{"content":"好"}}]}
//! data: [DONE]
//! ```
//!
//! Lines that are empty, the `[DONE]` sentinel, or not a JSON object are
//! skipped; a line that looks like JSON but fails to parse is logged and
//! skipped. None of these fail the call.
//!
//! ## Retry policy
//!
//! Only timeouts are retried, immediately, up to `max_attempts` attempts in
//! total. A non-success status or any other transport/stream error fails the
//! chunk at once. Spacing between chunks is applied by
//! [`TranslationClient::translate_in_chunks`], and the [`RateLimiter`] spaces
//! successive `translate` calls.

use crate::config::{ApiConfig, TargetLanguage};
use crate::error::{Pdf2DocxError, TranslateError};
use crate::pipeline::chunk::split_into_chunks;
use crate::pipeline::postprocess::clean_translation;
use crate::pipeline::rate_limit::RateLimiter;
use crate::prompts::{translation_instruction, TRANSLATOR_SYSTEM_PROMPT, TRANSLATION_FAILED_PLACEHOLDER};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Prefix stripped from stream event lines.
const DATA_PREFIX: &str = "data:";

/// Terminal stream sentinel.
const DONE_SENTINEL: &str = "[DONE]";

// ── Request body ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// JSON body of one translation request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    pub n: u32,
}

impl ChatRequest {
    pub fn new(api: &ApiConfig, text: &str, language: TargetLanguage) -> Self {
        Self {
            model: api.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: TRANSLATOR_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: translation_instruction(text, language.prompt_name()),
                },
            ],
            stream: true,
            max_tokens: api.max_tokens,
            temperature: api.temperature,
            top_p: api.top_p,
            top_k: api.top_k,
            frequency_penalty: api.frequency_penalty,
            n: 1,
        }
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

/// Why a single request attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Status(u16),
    /// The response body could not be read.
    Stream(String),
    Other(String),
}

impl TransportError {
    /// The chunk-level error after `attempts` attempts ended with `self`.
    fn into_translate_error(self, attempts: u32) -> TranslateError {
        match self {
            TransportError::Timeout => TranslateError::Timeout { attempts },
            TransportError::Status(code) => TranslateError::Status { code },
            TransportError::Stream(detail) => TranslateError::Stream(detail),
            TransportError::Other(detail) => TranslateError::Transport(detail),
        }
    }
}

/// Sends one request and hands back the response body as a line stream.
pub trait ChatTransport: Send {
    fn send(&self, request: &ChatRequest) -> Result<Box<dyn BufRead + Send>, TransportError>;
}

/// [`ChatTransport`] over blocking reqwest.
///
/// `timeout_secs` bounds the wait for the response head and then each read
/// of the body separately, so a reply that keeps streaming tokens is never
/// cut off; only a stall that long counts as a timeout.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
}

impl HttpTransport {
    pub fn new(api: &ApiConfig) -> Result<Self, Pdf2DocxError> {
        let client = Client::builder()
            .timeout(api.timeout())
            .build()
            .map_err(|e| Pdf2DocxError::ClientBuild(e.to_string()))?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api.key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| Pdf2DocxError::ClientBuild("API key is not a valid header value".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            endpoint: api.endpoint.clone(),
            headers,
        })
    }
}

impl ChatTransport for HttpTransport {
    fn send(&self, request: &ChatRequest) -> Result<Box<dyn BufRead + Send>, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(Box::new(BufReader::new(response)))
    }
}

// ── Stream decoding ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

/// Concatenate the `choices[0].delta.content` fields of a response stream.
///
/// Malformed lines are skipped. A read error fails the whole stream; a read
/// timeout is reported as [`TransportError::Timeout`] so it is retried like a
/// request timeout, and the partial text of that attempt is dropped.
pub fn aggregate_stream(mut reader: impl BufRead) -> Result<String, TransportError> {
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|e| {
            if is_read_timeout(&e) {
                TransportError::Timeout
            } else {
                TransportError::Stream(e.to_string())
            }
        })?;
        if n == 0 {
            break;
        }

        let raw = String::from_utf8_lossy(&buf);
        let line = raw.trim();
        if line.is_empty() || line == DONE_SENTINEL {
            continue;
        }
        let payload = line.strip_prefix(DATA_PREFIX).map(str::trim).unwrap_or(line);
        if payload == DONE_SENTINEL {
            continue;
        }
        if !payload.starts_with('{') {
            warn!("Skipping malformed stream line: {}", payload);
            continue;
        }

        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => {
                if let Some(content) = event.choices.into_iter().next().and_then(|c| c.delta.content) {
                    text.push_str(&content);
                }
            }
            Err(e) => error!("Cannot parse stream event: {}", e),
        }
    }

    Ok(text)
}

/// A body read that stalled past the client timeout.
///
/// reqwest's blocking body reader reports its deadline as an `Other` I/O
/// error wrapping a `reqwest::Error`, so the kind alone is not enough.
fn is_read_timeout(e: &std::io::Error) -> bool {
    match e.kind() {
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => true,
        _ => e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout),
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Result of translating one page's text chunk by chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkedTranslation {
    /// Chunk results joined with `\n`, failed chunks replaced by the
    /// failure placeholder.
    pub text: String,
    pub chunks: usize,
    /// 0-based indices of chunks that failed.
    pub failed: Vec<usize>,
}

impl ChunkedTranslation {
    pub fn all_failed(&self) -> bool {
        self.chunks > 0 && self.failed.len() == self.chunks
    }
}

/// Translation client: request building, retries, chunking and spacing.
pub struct TranslationClient {
    transport: Box<dyn ChatTransport>,
    limiter: RateLimiter,
    api: ApiConfig,
}

impl TranslationClient {
    /// Client talking HTTP to `api.endpoint`.
    pub fn new(api: &ApiConfig) -> Result<Self, Pdf2DocxError> {
        let transport = HttpTransport::new(api)?;
        Ok(Self::with_transport(api, Box::new(transport)))
    }

    /// Client over any transport.
    pub fn with_transport(api: &ApiConfig, transport: Box<dyn ChatTransport>) -> Self {
        let limiter = RateLimiter::new(api.calls_per_minute);
        debug!(
            model = %api.model,
            spacing = ?limiter.interval(),
            max_attempts = api.max_attempts,
            "Translation client ready"
        );
        Self {
            transport,
            limiter,
            api: api.clone(),
        }
    }

    /// Translate one piece of text.
    pub fn translate(&self, text: &str, language: TargetLanguage) -> Result<String, TranslateError> {
        let request = ChatRequest::new(&self.api, text, language);
        let max_attempts = self.api.max_attempts.max(1);

        self.limiter.wait();

        for attempt in 1..=max_attempts {
            let err = match self.transport.send(&request).and_then(aggregate_stream) {
                Ok(raw) => {
                    debug!(attempt, chars = raw.chars().count(), "translation received");
                    return Ok(clean_translation(&raw));
                }
                Err(e) => e.into_translate_error(attempt),
            };

            if err.is_retryable() && attempt < max_attempts {
                warn!("Translation timed out, retrying ({}/{})", attempt, max_attempts);
                continue;
            }
            error!(attempt, "Translation failed: {}", err);
            return Err(err);
        }

        Err(TranslateError::Timeout { attempts: max_attempts })
    }

    /// Split `text` into chunks and translate each in order, sleeping the
    /// configured delay before every chunk. A failed chunk is replaced by the
    /// failure placeholder and does not stop the remaining chunks.
    pub fn translate_in_chunks(&self, text: &str, language: TargetLanguage) -> ChunkedTranslation {
        self.translate_chunks_with(text, |chunk| self.translate(chunk, language))
    }

    fn translate_chunks_with(
        &self,
        text: &str,
        mut translate: impl FnMut(&str) -> Result<String, TranslateError>,
    ) -> ChunkedTranslation {
        let chunks = split_into_chunks(text, self.api.max_chunk_chars);
        let delay = self.api.chunk_delay();
        let mut parts = Vec::with_capacity(chunks.len());
        let mut failed = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            pause(delay);
            match translate(chunk) {
                Ok(translated) => parts.push(translated),
                Err(e) => {
                    warn!(chunk = i + 1, of = chunks.len(), "Chunk translation failed: {}", e);
                    failed.push(i);
                    parts.push(TRANSLATION_FAILED_PLACEHOLDER.to_string());
                }
            }
        }

        ChunkedTranslation {
            text: parts.join("\n"),
            chunks: chunks.len(),
            failed,
        }
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn api() -> ApiConfig {
        let mut api = ApiConfig::new("http://localhost:0/v1/chat/completions", "sk-test");
        api.calls_per_minute = 0;
        api.chunk_delay_ms = 0;
        api
    }

    fn delta_line(content: &str) -> String {
        format!("data: {}\n", serde_json::json!({"choices": [{"delta": {"content": content}}]}))
    }

    /// Replays scripted outcomes in order; the last one repeats.
    struct Scripted {
        outcomes: Mutex<Vec<Result<String, TransportError>>>,
        calls: Arc<AtomicUsize>,
        requests: Arc<Mutex<Vec<ChatRequest>>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<String, TransportError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Arc::new(AtomicUsize::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl ChatTransport for Scripted {
        fn send(&self, request: &ChatRequest) -> Result<Box<dyn BufRead + Send>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let mut outcomes = self.outcomes.lock().unwrap();
            let next = if outcomes.len() > 1 {
                outcomes.remove(0)
            } else {
                outcomes[0].clone()
            };
            next.map(|body| Box::new(Cursor::new(body.into_bytes())) as Box<dyn BufRead + Send>)
        }
    }

    #[test]
    fn aggregates_deltas_and_skips_noise() {
        let stream = [
            r#"data: {"choices":[{"delta":{"content":"A"}}]}"#,
            "garbage",
            "data:",
            "",
            r#"data: {"choices":[{"delta":{"content":"B"}}]}"#,
            "data: [DONE]",
        ]
        .join("\n");
        assert_eq!(aggregate_stream(Cursor::new(stream)).unwrap(), "AB");
    }

    #[test]
    fn unparseable_json_and_missing_content_are_skipped() {
        let stream = [
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices": [broken"#,
            r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
            r#"data: {"choices":[]}"#,
            "[DONE]",
        ]
        .join("\r\n");
        assert_eq!(aggregate_stream(Cursor::new(stream)).unwrap(), "ok");
    }

    #[test]
    fn request_body_carries_sampling_parameters() {
        let request = ChatRequest::new(&api(), "Hello.", TargetLanguage::Chinese);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["n"], 1);
        assert_eq!(json["top_k"], 50);
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["model"], "deepseek-ai/DeepSeek-V3");
        assert_eq!(json["messages"][0]["role"], "system");
        let user = json["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("中文"));
        assert!(user.ends_with("Hello."));
    }

    #[test]
    fn translate_returns_cleaned_stream_text() {
        let body = format!("{}{}data: [DONE]\n", delta_line("你好"), delta_line("。  "));
        let client = TranslationClient::with_transport(&api(), Box::new(Scripted::new(vec![Ok(body)])));
        assert_eq!(client.translate("Hello.", TargetLanguage::Chinese).unwrap(), "你好。");
    }

    #[test]
    fn always_timing_out_makes_exactly_three_attempts() {
        let transport = Scripted::new(vec![Err(TransportError::Timeout)]);
        let calls = transport.calls.clone();
        let client = TranslationClient::with_transport(&api(), Box::new(transport));

        let err = client.translate("Hello.", TargetLanguage::English).unwrap_err();

        assert_eq!(err, TranslateError::Timeout { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn timeout_then_success_recovers() {
        let transport = Scripted::new(vec![
            Err(TransportError::Timeout),
            Ok(delta_line("ok")),
        ]);
        let calls = transport.calls.clone();
        let client = TranslationClient::with_transport(&api(), Box::new(transport));
        assert_eq!(client.translate("x", TargetLanguage::English).unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn status_error_is_not_retried() {
        let transport = Scripted::new(vec![Err(TransportError::Status(429))]);
        let calls = transport.calls.clone();
        let client = TranslationClient::with_transport(&api(), Box::new(transport));
        let err = client.translate("x", TargetLanguage::English).unwrap_err();
        assert_eq!(err, TranslateError::Status { code: 429 });
        assert!(!err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transport_error_is_not_retried() {
        let transport = Scripted::new(vec![Err(TransportError::Other("connection reset".into()))]);
        let calls = transport.calls.clone();
        let client = TranslationClient::with_transport(&api(), Box::new(transport));
        assert!(matches!(
            client.translate("x", TargetLanguage::English),
            Err(TranslateError::Transport(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_chunk_keeps_its_position() {
        let mut cfg = api();
        cfg.max_chunk_chars = 6;
        let client = TranslationClient::with_transport(&cfg, Box::new(Scripted::new(vec![Ok(String::new())])));

        let result = client.translate_chunks_with("One. Two. Three.", |chunk| {
            if chunk == "Two." {
                Err(TranslateError::Status { code: 500 })
            } else {
                Ok(format!("<{chunk}>"))
            }
        });

        assert_eq!(result.chunks, 3);
        assert_eq!(result.failed, [1]);
        assert_eq!(
            result.text,
            format!("<One.>\n{TRANSLATION_FAILED_PLACEHOLDER}\n<Three.>")
        );
        assert!(!result.all_failed());
    }

    #[test]
    fn chunks_are_sent_in_order() {
        let mut cfg = api();
        cfg.max_chunk_chars = 6;
        let transport = Scripted::new(vec![Ok(delta_line("t"))]);
        let requests = transport.requests.clone();
        let client = TranslationClient::with_transport(&cfg, Box::new(transport));

        let result = client.translate_in_chunks("One. Two. Three.", TargetLanguage::Chinese);

        assert_eq!(result.text, "t\nt\nt");
        let sent: Vec<String> = requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.messages[1].content.rsplit('\n').next().unwrap().to_string())
            .collect();
        assert_eq!(sent, ["One.", "Two.", "Three."]);
    }

    #[test]
    fn every_chunk_failing_is_reported() {
        let mut cfg = api();
        cfg.max_chunk_chars = 5;
        let transport = Scripted::new(vec![Err(TransportError::Status(503))]);
        let client = TranslationClient::with_transport(&cfg, Box::new(transport));

        let result = client.translate_in_chunks("One. Two.", TargetLanguage::English);

        assert!(result.all_failed());
        assert_eq!(result.failed, [0, 1]);
        assert_eq!(
            result.text,
            format!("{TRANSLATION_FAILED_PLACEHOLDER}\n{TRANSLATION_FAILED_PLACEHOLDER}")
        );
    }

    #[test]
    fn empty_text_issues_no_requests() {
        let transport = Scripted::new(vec![Ok(delta_line("t"))]);
        let calls = transport.calls.clone();
        let client = TranslationClient::with_transport(&api(), Box::new(transport));
        let result = client.translate_in_chunks("   ", TargetLanguage::Chinese);
        assert_eq!(result.chunks, 0);
        assert_eq!(result.text, "");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Answers every connection with a 200 head and one delta, then goes
    /// quiet for `stall` before closing.
    fn stalling_server(stall: Duration) -> (String, Arc<AtomicUsize>) {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::spawn(move || {
                    let mut head = Vec::new();
                    let mut byte = [0u8; 1];
                    while !head.ends_with(b"\r\n\r\n") {
                        match stream.read(&mut byte) {
                            Ok(1) => head.push(byte[0]),
                            _ => return,
                        }
                    }
                    let _ = stream.write_all(
                        b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
                    );
                    let _ = stream.write_all(delta_line("A").as_bytes());
                    let _ = stream.flush();
                    std::thread::sleep(stall);
                });
            }
        });
        (format!("http://{addr}/v1/chat/completions"), hits)
    }

    #[test]
    fn stalled_body_counts_as_timeout_and_is_retried() {
        let (endpoint, hits) = stalling_server(Duration::from_secs(3));
        let mut cfg = api();
        cfg.endpoint = endpoint;
        cfg.timeout_secs = 1;
        let client = TranslationClient::new(&cfg).unwrap();

        let err = client.translate("Hello.", TargetLanguage::Chinese).unwrap_err();

        assert_eq!(err, TranslateError::Timeout { attempts: 3 });
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn read_timeout_mid_stream_maps_to_timeout() {
        struct Stalls(bool);
        impl std::io::Read for Stalls {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if std::mem::replace(&mut self.0, true) {
                    return Err(std::io::ErrorKind::TimedOut.into());
                }
                let line = delta_line("A");
                buf[..line.len()].copy_from_slice(line.as_bytes());
                Ok(line.len())
            }
        }

        let result = aggregate_stream(BufReader::new(Stalls(false)));
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[test]
    fn broken_stream_is_not_a_timeout() {
        struct Resets;
        impl std::io::Read for Resets {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::ConnectionReset.into())
            }
        }

        let result = aggregate_stream(BufReader::new(Resets));
        assert!(matches!(result, Err(TransportError::Stream(_))));
    }
}
