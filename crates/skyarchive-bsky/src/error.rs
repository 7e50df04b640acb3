use thiserror::Error;

/// XRPC error codes that mean the session is missing or no longer valid.
const AUTH_ERROR_CODES: &[&str] = &[
    "AuthenticationRequired",
    "AuthMissing",
    "ExpiredToken",
    "InvalidToken",
];

/// XRPC error codes that mean client and server disagree on the contract.
const PROTOCOL_ERROR_CODES: &[&str] = &["MethodNotImplemented", "InvalidLexicon"];

const RATE_LIMIT_ERROR_CODE: &str = "RateLimitExceeded";

const EXPIRED_TOKEN_CODE: &str = "ExpiredToken";

/// Errors returned by [`crate::BskyClient`].
#[derive(Debug, Error)]
pub enum BskyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429 or an explicit `RateLimitExceeded` code.
    #[error("rate limited by feed source (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401 or one of the session-invalid XRPC codes.
    #[error("authentication error {code}: {message}")]
    Auth { code: String, message: String },

    /// The server reports a method or lexicon this client cannot talk to.
    #[error("protocol mismatch {code}: {message}")]
    Protocol { code: String, message: String },

    /// Any other non-2xx XRPC response.
    #[error("XRPC error {status} {code}: {message}")]
    Xrpc {
        status: u16,
        code: String,
        message: String,
    },

    /// A 2xx body that does not match the expected schema.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid service URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Coarse failure classes that drive the fetch loop's policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimit,
    Auth,
    Protocol,
    Unexpected,
}

impl BskyError {
    /// Builds the typed error for a non-2xx XRPC response.
    ///
    /// Dispatch is on the HTTP status and the structured `error` code. The
    /// free-text message is only consulted for rate limiting, and only when
    /// neither status nor code identified the failure.
    #[must_use]
    pub fn from_xrpc(
        status: u16,
        code: Option<String>,
        message: Option<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        let code = code.unwrap_or_default();
        let message = message.unwrap_or_default();

        if status == 429 || code == RATE_LIMIT_ERROR_CODE {
            return BskyError::RateLimited { retry_after_secs };
        }
        if status == 401 || AUTH_ERROR_CODES.contains(&code.as_str()) {
            return BskyError::Auth { code, message };
        }
        if status == 501 || PROTOCOL_ERROR_CODES.contains(&code.as_str()) {
            return BskyError::Protocol { code, message };
        }
        if mentions_rate_limit(&code) || mentions_rate_limit(&message) {
            return BskyError::RateLimited { retry_after_secs };
        }
        BskyError::Xrpc {
            status,
            code,
            message,
        }
    }

    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            BskyError::RateLimited { .. } => ErrorClass::RateLimit,
            BskyError::Auth { .. } => ErrorClass::Auth,
            BskyError::Protocol { .. } | BskyError::Deserialize { .. } => ErrorClass::Protocol,
            BskyError::Http(_) | BskyError::Xrpc { .. } | BskyError::InvalidBaseUrl { .. } => {
                ErrorClass::Unexpected
            }
        }
    }

    /// True when the access token has merely expired and a refresh may
    /// restore the session.
    #[must_use]
    pub fn is_expired_token(&self) -> bool {
        matches!(self, BskyError::Auth { code, .. } if code == EXPIRED_TOKEN_CODE)
    }
}

fn mentions_rate_limit(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("ratelimit") || lowered.contains("rate limit")
}

/// Terminal outcomes of the paginated fetch loop.
///
/// Any of these discards every page fetched so far.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The session was rejected and could not be refreshed.
    #[error("session rejected during feed fetch: {0}")]
    Auth(#[source] BskyError),

    #[error("feed source contract mismatch: {0}")]
    Protocol(#[source] BskyError),

    #[error("still rate limited after {waits} cooldowns at cursor {cursor:?}")]
    RateLimitExhausted { waits: u32, cursor: Option<String> },

    #[error("unexpected feed fetch failure: {0}")]
    Unexpected(#[source] BskyError),

    #[error("pagination limit reached for {actor}: exceeded {max_pages} pages")]
    PaginationLimit { actor: String, max_pages: usize },
}
