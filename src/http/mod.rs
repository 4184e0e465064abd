use crate::config::Config;
use crate::error::ProxyError;
use anyhow::Context;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub const GITHUB_JSON: &str = "application/vnd.github+json";

/// One outbound call: method, interpolated path, query pairs and optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn get(path: String) -> Self {
        Self {
            method: Method::GET,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: String, body: Value) -> Self {
        Self {
            method: Method::POST,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn patch(path: String, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            path,
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Build the shared upstream client. Credential, media type, API version and
/// user agent ride along as default headers on every call.
pub fn build_client(cfg: &Config) -> anyhow::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&cfg.user_agent).context("GITHUB_USER_AGENT is not a valid header")?,
    );
    default_headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
    default_headers.insert(
        "X-GitHub-Api-Version",
        HeaderValue::from_str(&cfg.api_version)
            .context("GITHUB_API_VERSION is not a valid header")?,
    );
    let mut auth = HeaderValue::from_str(&cfg.auth_scheme.header_value(&cfg.token))
        .context("credential contains characters not allowed in a header")?;
    auth.set_sensitive(true);
    default_headers.insert(AUTHORIZATION, auth);

    Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()
        .context("failed to build upstream HTTP client")
}

/// Percent-encode one path segment. `.` and `..` are refused: the URL parser
/// would collapse them and move the request onto a different repository.
pub fn encode_path_segment(segment: &str) -> Result<String, ProxyError> {
    if segment == "." || segment == ".." {
        return Err(ProxyError::Validation(format!(
            "path segment {:?} is not allowed",
            segment
        )));
    }
    Ok(urlencoding::encode(segment).into_owned())
}

/// Encode each segment of a slash-separated path, keeping the separators.
pub fn encode_path(path: &str) -> Result<String, ProxyError> {
    let segments = path
        .split('/')
        .map(encode_path_segment)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

fn map_send_error(err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::Timeout(err.to_string())
    } else {
        ProxyError::Transport(err.to_string())
    }
}

/// Execute one upstream call. No retries.
///
/// Status >= 400 becomes [`ProxyError::Upstream`] carrying the upstream body
/// untouched; a non-JSON error body is relayed as a JSON string.
pub async fn send(
    client: &Client,
    cfg: &Config,
    req: UpstreamRequest,
) -> Result<UpstreamResponse, ProxyError> {
    let url = format!("{}{}", cfg.api_url, req.path);
    debug!("upstream {} {} query={:?}", req.method, url, req.query);

    let mut builder = client.request(req.method.clone(), &url);
    if !req.query.is_empty() {
        builder = builder.query(&req.query);
    }
    if let Some(body) = &req.body {
        builder = builder.json(body);
    }

    let res = builder.send().await.map_err(|e| {
        warn!("upstream {} {} failed: {}", req.method, url, e);
        map_send_error(e)
    })?;
    let status = res.status();
    let bytes = res.bytes().await.map_err(map_send_error)?;

    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(v) => v,
            Err(_) if status.is_client_error() || status.is_server_error() => {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => return Err(ProxyError::InvalidUpstreamBody(e.to_string())),
        }
    };

    if status.as_u16() >= 400 {
        warn!("upstream {} {} returned {}", req.method, url, status);
        return Err(ProxyError::Upstream { status, body });
    }
    Ok(UpstreamResponse { status, body })
}
