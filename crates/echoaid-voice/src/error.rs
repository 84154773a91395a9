use echoaid_types::TurnStage;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

/// Longest provider error body kept for logging.
const MAX_ERROR_BODY_CHARS: usize = 2048;

/// Most bytes read from an error body. Enough for any char count above.
const MAX_ERROR_BODY_BYTES: usize = MAX_ERROR_BODY_CHARS * 4;

/// What went wrong talking to an upstream provider.
#[derive(Error, Debug)]
pub enum ProviderFailure {
    /// The request never produced a response (DNS, connect, TLS, timeout,
    /// or the body stream broke off).
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// Local I/O failed while persisting a provider response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// reqwest includes the request URL in its Display output. The generation
// endpoint carries its key in the query string, so the URL is dropped.
impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        ProviderFailure::Transport(err.without_url())
    }
}

impl ProviderFailure {
    /// Builds a `Status` failure from a non-success response, keeping the
    /// provider's error payload for diagnostics.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = match read_capped(resp.bytes_stream(), MAX_ERROR_BODY_BYTES).await {
            Ok((bytes, cut)) => {
                let mut text = truncate(String::from_utf8_lossy(&bytes).trim());
                if cut && !text.ends_with('…') {
                    text.push('…');
                }
                text
            }
            Err(e) => format!("<unreadable body: {}>", e.without_url()),
        };
        ProviderFailure::Status { status, body }
    }
}

/// Collects at most `limit` bytes from `stream`, stopping early instead of
/// draining the rest. The flag is true when the body went past `limit`.
async fn read_capped<S, B>(
    mut stream: S,
    limit: usize,
) -> Result<(Vec<u8>, bool), reqwest::Error>
where
    S: Stream<Item = Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        let room = limit - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            return Ok((buf, true));
        }
        buf.extend_from_slice(chunk);
    }
    Ok((buf, false))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let kept: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", kept)
    }
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("transcription failed: {0}")]
    Transcription(#[source] ProviderFailure),

    #[error("generation failed: {0}")]
    Generation(#[source] ProviderFailure),

    #[error("synthesis failed: {0}")]
    Synthesis(#[source] ProviderFailure),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VoiceError {
    /// The pipeline stage that produced this error, if any.
    pub fn stage(&self) -> Option<TurnStage> {
        match self {
            VoiceError::Transcription(_) => Some(TurnStage::Transcribing),
            VoiceError::Generation(_) => Some(TurnStage::Generating),
            VoiceError::Synthesis(_) => Some(TurnStage::Synthesizing),
            VoiceError::Config(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProviderFailure> {
        match self {
            VoiceError::Transcription(f) | VoiceError::Generation(f) | VoiceError::Synthesis(f) => {
                Some(f)
            }
            VoiceError::Config(_) => None,
        }
    }
}
