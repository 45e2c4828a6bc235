//! Mailgun async client implementation.

use crate::models::{ListMember, MemberResponse};
use crate::{Error, Message, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{StatusCode, Url};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::{Instrument, debug, warn};

/// Async client for the Mailgun HTTP API, bound to one sending domain.
///
/// The client holds no per-request state; clone it or share it behind an
/// `Arc` to send from several tasks at once.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    domain: String,
    api_url: Url,
    authorization: HeaderValue,
    proxy: Option<String>,
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder(api_key: impl Into<String>, domain: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key, domain)
    }

    /// Create a client with default settings.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailgun_client::Client;
    /// # fn main() -> Result<(), mailgun_client::Error> {
    /// let client = Client::new("key-3ax6xnjp29jd6fds4gc373sgvjxteol0", "samples.mailgun.org")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(api_key, domain).build()
    }

    /// Sending domain every request is scoped to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// API root, without the domain.
    pub fn api_url(&self) -> &str {
        self.api_url.as_str()
    }

    /// Get the proxy URL if one was configured.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// Send a message and resolve to the id Mailgun assigned to it.
    ///
    /// The message is serialized before this returns, so the returned future
    /// borrows neither the client nor the message. Every failure, including a
    /// part that cannot be encoded, is reported through the future.
    ///
    /// # Errors
    /// * [`Error::Transport`] when the request cannot be built or delivered.
    /// * [`Error::InvalidResponse`] when the body is not a JSON object.
    /// * [`Error::InvalidJson`] when the JSON object has no string `id`.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailgun_client::{Client, Message};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailgun_client::Error> {
    /// let client = Client::new("key-3ax6xnjp29jd6fds4gc373sgvjxteol0", "samples.mailgun.org")?;
    /// let mut message = Message::new(
    ///     "Excited User <someone@sample.org>",
    ///     "Jay Baird <jay.baird@rackspace.com>",
    ///     "Mailgun is awesome!",
    ///     "A unicode snowman for you! ☃",
    /// );
    /// message.testing = true;
    /// let id = client.send(&message).await?;
    /// println!("queued as {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn send(&self, message: &Message) -> impl Future<Output = Result<String>> + Send + use<> {
        let span = tracing::info_span!(
            "send",
            domain = %self.domain,
            recipients = message.to.len(),
            attachments = message.attachments().len() + message.inline_attachments().len(),
        );
        let form = multipart_form(message);
        let request = self
            .http
            .post(self.endpoint(&["messages"]))
            .headers(self.headers());

        async move {
            let response = request.multipart(form?).send().await?;
            let status = response.status();
            let body = response.text().await?;

            let id = parse_message_id(&body);
            match &id {
                Ok(id) => debug!(%status, id = %id, "message accepted"),
                Err(err) => warn!(%status, error = %err, "unexpected send response"),
            }
            id
        }
        .instrument(span)
    }

    /// Send a plain-text message built from its four required fields.
    ///
    /// `to` may list several recipients separated by commas.
    pub fn send_message(
        &self,
        to: &str,
        from: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<String>> + Send + use<> {
        let message = Message::new(from, to, subject, body);
        self.send(&message)
    }

    /// Look up `email` on the mailing list `list`.
    ///
    /// Returns `None` when the address is not a member.
    #[tracing::instrument(skip(self), fields(domain = %self.domain))]
    pub async fn check_subscription(&self, list: &str, email: &str) -> Result<Option<ListMember>> {
        let response = self
            .http
            .get(self.endpoint(&["lists", list, "members", email]))
            .headers(self.headers())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("address is not a list member");
            return Ok(None);
        }

        let body: MemberResponse = response.error_for_status()?.json().await?;
        Ok(Some(body.member))
    }

    /// Add `email` to `list`, or mark an existing member as subscribed again.
    #[tracing::instrument(skip(self), fields(domain = %self.domain))]
    pub async fn subscribe(&self, list: &str, email: &str) -> Result<()> {
        let form = [("address", email), ("subscribed", "yes"), ("upsert", "yes")];

        self.http
            .post(self.endpoint(&["lists", list, "members"]))
            .headers(self.headers())
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        debug!("subscribed");
        Ok(())
    }

    /// Remove `email` from `list`.
    #[tracing::instrument(skip(self), fields(domain = %self.domain))]
    pub async fn unsubscribe(&self, list: &str, email: &str) -> Result<()> {
        self.http
            .delete(self.endpoint(&["lists", list, "members", email]))
            .headers(self.headers())
            .send()
            .await?
            .error_for_status()?;

        debug!("unsubscribed");
        Ok(())
    }

    /// Domain-scoped URL. Each segment is percent-encoded on its own, so an
    /// address containing `?`, `#` or `/` stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // `build` rejects roots that cannot carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.domain).extend(segments);
        }
        url
    }

    /// Build headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }
}

/// Form fields first, then file parts.
fn multipart_form(message: &Message) -> Result<Form> {
    let mut form = Form::new();
    for (key, value) in message.to_parameters() {
        form = form.text(key, value);
    }

    for part in message.attachment_parts() {
        let file = Part::bytes(part.attachment.data.clone())
            .file_name(part.attachment.name.clone())
            .mime_str(&part.attachment.mime_type)?;
        form = form.part(part.field_name, file);
    }

    Ok(form)
}

/// Extract the message id from a send response body.
fn parse_message_id(body: &str) -> Result<String> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|_| Error::InvalidResponse)?;

    json.as_object()
        .ok_or(Error::InvalidResponse)?
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or(Error::InvalidJson)
}

const API_URL: &str = "https://api.mailgun.net/v2";
const USER_AGENT_VALUE: &str = concat!("mailgun-client/", env!("CARGO_PKG_VERSION"));

const API_KEY_VAR: &str = "MAILGUN_API_KEY";
const DOMAIN_VAR: &str = "MAILGUN_DOMAIN";
const API_URL_VAR: &str = "MAILGUN_API_URL";

/// Builder for configuring a Mailgun client.
///
/// Start with [`Client::builder`] or [`ClientBuilder::from_env`].
#[derive(Clone)]
pub struct ClientBuilder {
    api_key: String,
    domain: String,
    api_url: String,
    proxy: Option<String>,
    user_agent: String,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("domain", &self.domain)
            .field("api_url", &self.api_url)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - API root `https://api.mailgun.net/v2`
    /// - No proxy
    /// - `mailgun-client/<version>` user agent
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            domain: domain.into(),
            api_url: API_URL.to_string(),
            proxy: None,
            user_agent: USER_AGENT_VALUE.to_string(),
        }
    }

    /// Read settings from the environment.
    ///
    /// `MAILGUN_API_KEY` and `MAILGUN_DOMAIN` are required; `MAILGUN_API_URL`
    /// overrides the API root when set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| Error::MissingConfig(API_KEY_VAR))?;
        let domain = std::env::var(DOMAIN_VAR).map_err(|_| Error::MissingConfig(DOMAIN_VAR))?;

        let mut builder = Self::new(api_key, domain);
        if let Ok(api_url) = std::env::var(API_URL_VAR) {
            builder = builder.api_url(api_url);
        }
        Ok(builder)
    }

    /// Override the API root, e.g. for the EU region or a mock server.
    pub fn api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a proxy URL (e.g., "http://127.0.0.1:8080").
    ///
    /// This uses reqwest's proxy support for all requests.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client.
    ///
    /// The `Authorization` header is computed once here and reused for every
    /// request.
    pub fn build(self) -> Result<Client> {
        if self.api_key.is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let credentials = STANDARD.encode(format!("api:{}", self.api_key));
        let mut authorization = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|_| Error::InvalidApiKey)?;
        authorization.set_sensitive(true);

        let api_url = Url::parse(&self.api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::InvalidApiUrl(self.api_url.clone()))?;

        let mut builder = reqwest::Client::builder().user_agent(self.user_agent);
        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let http = builder.build()?;

        Ok(Client {
            http,
            domain: self.domain,
            api_url,
            authorization,
            proxy: self.proxy,
        })
    }
}
