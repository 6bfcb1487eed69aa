//! Streaming usage observer (§4.8): a write-through wrapper around the
//! response body. Every byte reaching the client is also cloned onto an
//! unbounded channel consumed by a spawned parser task — the client's
//! bytes and their ordering are never touched, and a parser failure
//! never reaches the response (§7).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::io::StreamReader;

use crate::parsers::{anthropic::AnthropicParser, openai::OpenAiParser, ParsedUsage, ProviderFamily};
use crate::pricing;
use crate::usage::{AnthropicTracker, OpenAiCompatibleTracker, TokenMetrics, UsageEvent, UsageTracker};

/// Content-Type markers that classify a response body as streaming
/// (§4.8) — checked once, on the response headers, never on request
/// headers (§9 DESIGN NOTES: request-side streaming prediction is
/// unreliable).
pub fn is_streaming_content_type(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("text/event-stream") || ct.contains("application/x-ndjson") || ct.contains("application/stream+json")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Brotli,
    Deflate,
    /// Parsing is disabled for unrecognized encodings; the request is
    /// unaffected (§4.8).
    Unknown,
}

pub fn classify_encoding(content_encoding: Option<&str>) -> ContentEncoding {
    match content_encoding.map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("identity") => ContentEncoding::Identity,
        Some("gzip") => ContentEncoding::Gzip,
        // HTTP's "deflate" content-coding is, in near-universal practice
        // (including reqwest's own decoder), zlib-wrapped DEFLATE.
        Some("deflate") => ContentEncoding::Deflate,
        Some("br") => ContentEncoding::Brotli,
        _ => ContentEncoding::Unknown,
    }
}

/// Tees every item of `inner` onto `tx` before yielding it unchanged.
/// Dropping the stream (normal completion or cancellation) drops `tx`,
/// which closes the channel and lets the parser task exit (§5).
pub struct TeeStream<S> {
    inner: S,
    tx: Option<mpsc::UnboundedSender<Bytes>>,
}

impl<S> TeeStream<S> {
    pub fn new(inner: S, tx: mpsc::UnboundedSender<Bytes>) -> Self {
        TeeStream { inner, tx: Some(tx) }
    }
}

impl<S> Stream for TeeStream<S>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes, std::io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                if let Some(tx) = &this.tx {
                    // Client backpressure always wins; a full/closed
                    // channel never blocks or fails the downstream write.
                    let _ = tx.send(bytes.clone());
                }
                Poll::Ready(Some(Ok(bytes)))
            }
            Poll::Ready(Some(Err(e))) => {
                Poll::Ready(Some(Err(std::io::Error::new(std::io::ErrorKind::Other, e))))
            }
            Poll::Ready(None) => {
                this.tx = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

enum ParserSink {
    OpenAi(OpenAiParser),
    Anthropic(AnthropicParser),
}

impl ParserSink {
    fn new(family: ProviderFamily) -> Option<Self> {
        match family {
            ProviderFamily::OpenAiCompatible => Some(ParserSink::OpenAi(OpenAiParser::new())),
            ProviderFamily::Anthropic => Some(ParserSink::Anthropic(AnthropicParser::new())),
            ProviderFamily::None => None,
        }
    }

    fn feed(&mut self, chunk: &[u8]) -> Vec<ParsedUsage> {
        match self {
            ParserSink::OpenAi(p) => p.feed_streaming(chunk),
            ParserSink::Anthropic(p) => p.feed_streaming(chunk),
        }
    }

    fn finish(&mut self) -> Vec<ParsedUsage> {
        match self {
            ParserSink::OpenAi(p) => p.finish(),
            ParserSink::Anthropic(p) => p.finish(),
        }
    }
}

fn parse_non_streaming(family: ProviderFamily, body: &[u8]) -> Option<ParsedUsage> {
    match family {
        ProviderFamily::OpenAiCompatible => OpenAiParser::parse_non_streaming(body),
        ProviderFamily::Anthropic => AnthropicParser::parse_non_streaming(body),
        ProviderFamily::None => None,
    }
}

fn decoder_for<R>(encoding: ContentEncoding, reader: R) -> Option<Pin<Box<dyn AsyncRead + Send>>>
where
    R: AsyncRead + Send + 'static,
{
    use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder, ZlibDecoder};
    match encoding {
        ContentEncoding::Identity => Some(Box::pin(reader)),
        ContentEncoding::Gzip => Some(Box::pin(GzipDecoder::new(BufReader::new(reader)))),
        ContentEncoding::Brotli => Some(Box::pin(BrotliDecoder::new(BufReader::new(reader)))),
        ContentEncoding::Deflate => Some(Box::pin(ZlibDecoder::new(BufReader::new(reader)))),
        ContentEncoding::Unknown => None,
    }
}

/// Drives the parser task to completion: drains the tee channel
/// (decompressing the copy only), feeds the provider parser, and
/// emits `UsageEvent`s to the matching tracker. Never panics the
/// caller — all failures are logged and the task simply returns.
pub async fn run_parser_task(
    rx: mpsc::UnboundedReceiver<Bytes>,
    encoding: ContentEncoding,
    family: ProviderFamily,
    streaming: bool,
    provider: String,
    request_id: String,
) {
    let Some(mut sink) = ParserSink::new(family) else {
        return;
    };

    let byte_stream = UnboundedReceiverStream::new(rx).map(Ok::<Bytes, std::io::Error>);
    let reader = StreamReader::new(byte_stream);
    let Some(mut decoded) = decoder_for(encoding, reader) else {
        tracing::warn!(provider = %provider, "unknown content-encoding; usage observation disabled");
        return;
    };

    let mut events = Vec::new();
    if streaming {
        let mut buf = [0u8; 8192];
        loop {
            match decoded.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => events.extend(sink.feed(&buf[..n])),
                Err(e) => {
                    tracing::warn!(provider = %provider, error = %e, "decompression failed; ending observation");
                    return;
                }
            }
        }
        events.extend(sink.finish());
    } else {
        let mut body = Vec::new();
        if let Err(e) = decoded.read_to_end(&mut body).await {
            tracing::warn!(provider = %provider, error = %e, "decompression failed; ending observation");
            return;
        }
        if let Some(usage) = parse_non_streaming(family, &body) {
            events.push(usage);
        }
    }

    for usage in events {
        emit(&provider, &request_id, streaming, usage).await;
    }
}

async fn emit(provider: &str, request_id: &str, streaming: bool, usage: ParsedUsage) {
    let is_anthropic = provider.eq_ignore_ascii_case("anthropic");
    let cost = is_anthropic.then(|| {
        pricing::cost_breakdown(
            &usage.model,
            usage.tokens.input,
            usage.tokens.output,
            usage.cache_creation_tokens,
            usage.tokens.cached,
        )
    });

    let event = UsageEvent {
        request_id: request_id.to_string(),
        provider: provider.to_string(),
        model: usage.model,
        streaming,
        timestamp: Utc::now(),
        tokens: TokenMetrics::new(usage.tokens.input, usage.tokens.output, usage.tokens.cached),
        cost,
    };

    if is_anthropic {
        AnthropicTracker.consume(event).await;
    } else {
        OpenAiCompatibleTracker.consume(event).await;
    }
}
