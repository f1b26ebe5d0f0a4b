//! Low-level HTTP conduit that turns stateless HTTP into a session-bearing,
//! CSRF-protected, cookie-preserving, discovery-aware conduit.

pub mod addressing;
pub mod cookie;
pub mod csrf;
pub mod discovery;

use adt_domain::{Config, Error, Result};
use cookie::CookieJar;
use csrf::CsrfCache;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_ACCEPT: &str = "application/xml";
const DEFAULT_CONTENT_TYPE: &str = "application/xml";
/// Response bodies in `TransportError`/log messages are trimmed to this
/// many bytes so a giant HTML error page doesn't flood logs.
const BODY_PREFIX_LIMIT: usize = 2048;

/// A single HTTP request to issue through a [`Transport`].
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: reqwest::Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: reqwest::Method::GET,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            accept: None,
            content_type: None,
            body: None,
        }
    }

    pub fn new(method: reqwest::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            accept: None,
            content_type: None,
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        self.body = Some(body);
        self.content_type = Some(content_type.into());
        self
    }

    fn is_safe(&self) -> bool {
        matches!(
            self.method,
            reqwest::Method::GET | reqwest::Method::HEAD | reqwest::Method::OPTIONS
        )
    }
}

/// A completed HTTP response.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct Transport {
    base_url: String,
    client: reqwest::Client,
    user: String,
    password: Option<String>,
    sap_client: String,
    sap_language: String,
    request_timeout: Duration,
    jar: CookieJar,
    csrf: CsrfCache,
    discovery_done: tokio::sync::OnceCell<()>,
}

impl Transport {
    pub fn new(config: &Config, password: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        let jar = CookieJar::with_overrides(&config.cookie_overrides);
        if let Some(session_cookie) = &config.credential.session_cookie {
            if let Some((name, value)) = session_cookie.split_once('=') {
                jar.absorb_set_cookie([format!("{name}={value}")]);
            }
        }

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            user: config.user.clone(),
            password,
            sap_client: config.client.clone(),
            sap_language: config.language.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            jar,
            csrf: CsrfCache::new(),
            discovery_done: tokio::sync::OnceCell::new(),
        })
    }

    fn compose_url(&self, path: &str, extra_query: &[(String, String)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        let mut pairs: Vec<(String, String)> = vec![
            ("sap-client".to_string(), self.sap_client.clone()),
            ("sap-language".to_string(), self.sap_language.clone()),
        ];
        // Caller-supplied query wins on key conflicts.
        for (k, v) in extra_query {
            pairs.retain(|(ek, _)| ek != k);
            pairs.push((k.clone(), v.clone()));
        }
        // Query values are percent-encoded so characters with special
        // meaning in a URL (`#`, `/`, `,`, `&`, ...) survive into the
        // actual request instead of being parsed as a fragment/delimiter
        // by reqwest's URL parser.
        let qs = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", utf8_percent_encode(v, NON_ALPHANUMERIC)))
            .collect::<Vec<_>>()
            .join("&");
        url.push('?');
        url.push_str(&qs);
        url
    }

    /// Ensure the discovery endpoint has been probed once, warming cookies
    /// and (if none is cached yet) the CSRF token. Memoized per
    /// `Transport` instance; concurrent first callers are coalesced by
    /// [`tokio::sync::OnceCell`].
    async fn ensure_discovery(&self) -> Result<()> {
        self.discovery_done
            .get_or_try_init(|| async {
                let token = self.fetch_csrf_token().await?;
                self.csrf.set(token);
                Ok::<(), Error>(())
            })
            .await?;
        Ok(())
    }

    async fn fetch_csrf_token(&self) -> Result<String> {
        let url = self.compose_url(discovery::DISCOVERY_PATH, &[]);
        let mut builder = self
            .client
            .get(&url)
            .header("X-CSRF-Token", "Fetch")
            .header("Accept", DEFAULT_ACCEPT);
        builder = self.attach_auth(builder);
        let resp = builder
            .send()
            .await
            .map_err(|e| transport_io_error("GET", discovery::DISCOVERY_PATH, e))?;

        self.absorb_cookies(resp.headers());
        let token = resp
            .headers()
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        token.ok_or_else(|| {
            Error::Upstream {
                method: "GET".into(),
                path: discovery::DISCOVERY_PATH.into(),
                status: resp.status().as_u16(),
                body_prefix: "discovery response carried no X-CSRF-Token header".into(),
            }
        })
    }

    fn attach_auth(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if !self.jar.has_sap_session() {
            if let Some(password) = &self.password {
                builder = builder.basic_auth(&self.user, Some(password));
            }
        }
        if let Some(cookie_header) = self.jar.header_value() {
            builder = builder.header("Cookie", cookie_header);
        }
        builder
    }

    fn absorb_cookies(&self, headers: &reqwest::header::HeaderMap) {
        let values: Vec<String> = headers
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        self.jar.absorb_set_cookie(values);
    }

    /// Issue a single request, honoring CSRF lifecycle and retry-once,
    /// under the configured default request timeout.
    pub async fn request(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        self.request_with_timeout(spec, self.request_timeout).await
    }

    /// Same as [`Transport::request`] but with a caller-supplied timeout,
    /// for the one caller (the debug listener's long-poll) that needs a
    /// dedicated timeout distinct from the default request timeout.
    pub async fn request_with_timeout(
        &self,
        spec: RequestSpec,
        timeout: Duration,
    ) -> Result<ResponseEnvelope> {
        tokio::time::timeout(timeout, self.request_inner(spec))
            .await
            .map_err(|_| Error::Cancelled("request timed out".into()))?
    }

    async fn request_inner(&self, spec: RequestSpec) -> Result<ResponseEnvelope> {
        if !spec.is_safe() {
            self.ensure_discovery().await?;
        }

        let resp = self.send_once(&spec).await?;

        if resp.status == 403
            && resp
                .header("x-csrf-token")
                .map(|v| v.eq_ignore_ascii_case("required"))
                .unwrap_or(false)
        {
            self.csrf.clear();
            let cache = &self.csrf;
            let token = cache
                .refetch_with(|| self.fetch_csrf_token())
                .await?;
            let _ = token;
            return self.send_once(&spec).await.and_then(|r| check_status(&spec, r));
        }

        check_status(&spec, resp)
    }

    async fn send_once(&self, spec: &RequestSpec) -> Result<ResponseEnvelope> {
        let url = self.compose_url(&spec.path, &spec.query);
        let mut builder = self.client.request(spec.method.clone(), &url);
        builder = builder.header(
            "Accept",
            spec.accept.clone().unwrap_or_else(|| DEFAULT_ACCEPT.to_string()),
        );
        if let Some(body) = &spec.body {
            builder = builder.header(
                "Content-Type",
                spec.content_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            );
            builder = builder.body(body.clone());
        }
        for (k, v) in &spec.headers {
            builder = builder.header(k, v);
        }
        if !spec.is_safe() {
            if let Some(token) = self.csrf.get() {
                builder = builder.header("X-CSRF-Token", token);
            }
        }
        builder = self.attach_auth(builder);

        let resp = builder
            .send()
            .await
            .map_err(|e| transport_io_error(spec.method.as_str(), &spec.path, e))?;

        self.absorb_cookies(resp.headers());
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_io_error(spec.method.as_str(), &spec.path, e))?
            .to_vec();

        Ok(ResponseEnvelope {
            status,
            headers,
            body,
        })
    }
}

fn check_status(spec: &RequestSpec, resp: ResponseEnvelope) -> Result<ResponseEnvelope> {
    if (200..300).contains(&resp.status) {
        return Ok(resp);
    }
    let body_prefix = resp
        .text()
        .chars()
        .take(BODY_PREFIX_LIMIT)
        .collect::<String>();
    match resp.status {
        404 => Err(Error::NotFound(format!("{} {}", spec.method, spec.path))),
        409 => Err(Error::Conflict(body_prefix)),
        403 => Err(Error::Upstream {
            method: spec.method.to_string(),
            path: spec.path.clone(),
            status: resp.status,
            body_prefix,
        }),
        status => Err(Error::Upstream {
            method: spec.method.to_string(),
            path: spec.path.clone(),
            status,
            body_prefix,
        }),
    }
}

fn transport_io_error(method: &str, path: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Cancelled(format!("{method} {path} timed out: {e}"))
    } else {
        Error::Upstream {
            method: method.to_string(),
            path: path.to_string(),
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            body_prefix: e.to_string(),
        }
    }
}
