//! HTTP client for the AT Protocol XRPC endpoints used by an archive run.
//!
//! Wraps `reqwest` with session handling, XRPC error classification, and
//! typed response decoding. Every non-2xx response is turned into a
//! [`BskyError`] by [`BskyError::from_xrpc`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::BskyError;
use crate::types::{AuthorFeedPage, ProfileViewDetailed, ResolveHandleResponse};

const DEFAULT_BASE_URL: &str = "https://bsky.social";

/// An authenticated session created by `com.atproto.server.createSession`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    #[serde(default)]
    pub refresh_jwt: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"[redacted]")
            .field("refresh_jwt", &self.refresh_jwt.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the XRPC service (PDS or entryway).
///
/// Use [`BskyClient::new`] for production or [`BskyClient::with_base_url`]
/// to point at a mock server in tests. Feed requests carry no overall
/// timeout; only connection setup is bounded.
pub struct BskyClient {
    client: Client,
    base_url: Url,
    session: Option<Session>,
}

impl BskyClient {
    /// Creates a client pointed at the default `bsky.social` entryway.
    ///
    /// # Errors
    ///
    /// Returns [`BskyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(user_agent: &str) -> Result<Self, BskyError> {
        Self::with_base_url(user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom service URL.
    ///
    /// # Errors
    ///
    /// Returns [`BskyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`BskyError::InvalidBaseUrl`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(user_agent: &str, base_url: &str) -> Result<Self, BskyError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join("xrpc/...")` appends rather than
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| BskyError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            session: None,
        })
    }

    /// The session established by [`Self::login`], if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Logs in with an identifier (handle or email) and app password. Later
    /// requests carry the resulting access token.
    ///
    /// # Errors
    ///
    /// - [`BskyError::Auth`] if the credentials are rejected.
    /// - [`BskyError::Http`] on network failure.
    /// - [`BskyError::Deserialize`] if the session payload is malformed.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<Session, BskyError> {
        let url = self.xrpc_url("com.atproto.server.createSession", &[]);
        let body = serde_json::json!({ "identifier": identifier, "password": password });
        let request = self.client.post(url).json(&body);
        let session: Session = self.send(request, "createSession").await?;
        tracing::info!(did = %session.did, handle = %session.handle, "session created");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Exchanges the refresh token for a new access token via
    /// `com.atproto.server.refreshSession` and replaces the stored session.
    ///
    /// # Errors
    ///
    /// - [`BskyError::Auth`] if there is no refreshable session or the
    ///   refresh token is rejected.
    /// - [`BskyError::Http`] on network failure.
    /// - [`BskyError::Deserialize`] if the session payload is malformed.
    pub async fn refresh_session(&mut self) -> Result<Session, BskyError> {
        let Some(refresh_jwt) = self.session.as_ref().and_then(|s| s.refresh_jwt.clone()) else {
            return Err(BskyError::Auth {
                code: "AuthenticationRequired".to_owned(),
                message: "no refresh token available".to_owned(),
            });
        };
        let url = self.xrpc_url("com.atproto.server.refreshSession", &[]);
        let request = self.client.post(url).bearer_auth(refresh_jwt);
        let session: Session = self.send(request, "refreshSession").await?;
        tracing::info!(did = %session.did, "session refreshed");
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Resolves a handle to its DID.
    ///
    /// # Errors
    ///
    /// - [`BskyError::Xrpc`] if the handle cannot be resolved.
    /// - [`BskyError::Http`] on network failure.
    pub async fn resolve_handle(&self, handle: &str) -> Result<String, BskyError> {
        let url = self.xrpc_url("com.atproto.identity.resolveHandle", &[("handle", handle)]);
        let response: ResolveHandleResponse = self
            .send(self.authorized(self.client.get(url)), &format!("resolveHandle({handle})"))
            .await?;
        Ok(response.did)
    }

    /// Fetches the detailed profile of an actor (handle or DID).
    ///
    /// # Errors
    ///
    /// - [`BskyError::Xrpc`] if the profile does not exist or is not accessible.
    /// - [`BskyError::Auth`] if the session is rejected.
    /// - [`BskyError::Http`] on network failure.
    pub async fn get_profile(&self, actor: &str) -> Result<ProfileViewDetailed, BskyError> {
        let url = self.xrpc_url("app.bsky.actor.getProfile", &[("actor", actor)]);
        self.send(self.authorized(self.client.get(url)), &format!("getProfile({actor})"))
            .await
    }

    /// Fetches one page of an actor's feed starting at `cursor`.
    ///
    /// # Errors
    ///
    /// - [`BskyError::RateLimited`] on HTTP 429 or a rate-limit code.
    /// - [`BskyError::Auth`] if the session is rejected.
    /// - [`BskyError::Deserialize`] if the page does not match the expected shape.
    /// - [`BskyError::Xrpc`] / [`BskyError::Http`] for anything else.
    pub async fn get_author_feed(
        &self,
        actor: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<AuthorFeedPage, BskyError> {
        let limit = limit.to_string();
        let mut params = vec![("actor", actor), ("limit", limit.as_str())];
        if let Some(c) = cursor {
            params.push(("cursor", c));
        }
        let url = self.xrpc_url("app.bsky.feed.getAuthorFeed", &params);
        self.send(
            self.authorized(self.client.get(url)),
            &format!("getAuthorFeed(actor={actor}, cursor={cursor:?})"),
        )
        .await
    }

    /// Builds `<base>/xrpc/<nsid>?<params>` with percent-encoded parameters.
    fn xrpc_url(&self, nsid: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}xrpc/{nsid}", self.base_url.path()));
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => request.bearer_auth(&session.access_jwt),
            None => request,
        }
    }

    /// Sends a request, classifies non-2xx responses, and decodes the body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, BskyError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let parsed: XrpcErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(BskyError::from_xrpc(
                status.as_u16(),
                parsed.error,
                parsed.message,
                retry_after_secs,
            ));
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| BskyError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}
