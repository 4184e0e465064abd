use std::collections::HashSet;
use std::env;
use std::fmt;

use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_API_VERSION: &str = "2022-11-28";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GITHUB_TOKEN (or GH_TOKEN) is required")]
    MissingCredential,
    #[error("at least one of ALLOWLIST_REPOS or ALLOWLIST_OWNERS must be set")]
    EmptyAllowlist,
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),
    #[error("invalid GITHUB_AUTH_SCHEME {0:?} (expected \"bearer\" or \"token\")")]
    InvalidAuthScheme(String),
    #[error("invalid GITHUB_API_URL {0:?}")]
    InvalidApiUrl(String),
    #[error("invalid GITHUB_HTTP_TIMEOUT_SECS {0:?}")]
    InvalidTimeout(String),
}

/// Authorization header scheme used for the upstream credential.
///
/// Fine-grained tokens and GitHub Apps use `Bearer`; classic PATs
/// historically use `token`. GitHub accepts `Bearer` for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Token,
}

impl AuthScheme {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "token" => Ok(Self::Token),
            _ => Err(ConfigError::InvalidAuthScheme(raw.to_string())),
        }
    }

    pub fn header_value(self, credential: &str) -> String {
        match self {
            Self::Bearer => format!("Bearer {}", credential),
            Self::Token => format!("token {}", credential),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => f.write_str("bearer"),
            Self::Token => f.write_str("token"),
        }
    }
}

/// Process-wide configuration, built once at startup and never mutated.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub token: String,
    pub auth_scheme: AuthScheme,
    pub allowed_repos: HashSet<String>,
    pub allowed_owners: HashSet<String>,
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

// Keep the credential out of debug output and logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .field("auth_scheme", &self.auth_scheme)
            .field("allowed_repos", &self.allowed_repos)
            .field("allowed_owners", &self.allowed_owners)
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_TOKEN (or GH_TOKEN) [required]
    /// - ALLOWLIST_REPOS / ALLOWLIST_OWNERS (comma-separated; at least one non-empty)
    /// - PORT (default: 8080), HOST (default: 0.0.0.0)
    /// - GITHUB_AUTH_SCHEME (bearer | token, default: bearer)
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: github-connector/<version>)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("GITHUB_TOKEN")
            .or_else(|| lookup("GH_TOKEN"))
            .map(|raw| sanitize_credential(&raw))
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingCredential)?;

        let allowed_repos = parse_csv(lookup("ALLOWLIST_REPOS").as_deref());
        let allowed_owners = parse_csv(lookup("ALLOWLIST_OWNERS").as_deref());
        if allowed_repos.is_empty() && allowed_owners.is_empty() {
            return Err(ConfigError::EmptyAllowlist);
        }

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let auth_scheme = match lookup("GITHUB_AUTH_SCHEME") {
            Some(raw) => AuthScheme::parse(&raw)?,
            None => AuthScheme::Bearer,
        };

        let api_url = lookup("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if Url::parse(&api_url).map_or(true, |u| u.cannot_be_a_base()) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }
        let api_url = api_url.trim_end_matches('/').to_string();

        let api_version =
            lookup("GITHUB_API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let timeout_secs = match lookup("GITHUB_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        let user_agent = lookup("GITHUB_USER_AGENT")
            .unwrap_or_else(|| format!("github-connector/{}", env!("CARGO_PKG_VERSION")));

        Ok(Self {
            host,
            port,
            token,
            auth_scheme,
            allowed_repos,
            allowed_owners,
            api_url,
            api_version,
            user_agent,
            timeout_secs,
        })
    }
}

/// Trim surrounding whitespace, then strip one matching pair of outer quotes.
pub fn sanitize_credential(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_csv(value: Option<&str>) -> HashSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn credential_sanitization() {
        assert_eq!(sanitize_credential("  \"abc123\"  "), "abc123");
        assert_eq!(sanitize_credential("'abc123'"), "abc123");
        assert_eq!(sanitize_credential("abc123"), "abc123");
        assert_eq!(sanitize_credential("\"abc123'"), "\"abc123'");
        // only one layer is stripped
        assert_eq!(sanitize_credential("\"'abc'\""), "'abc'");
        assert_eq!(sanitize_credential("\""), "\"");
    }

    #[test]
    fn csv_parsing_trims_and_drops_empty() {
        let set = parse_csv(Some(" octo/widgets , ,acme/api,"));
        assert_eq!(set.len(), 2);
        assert!(set.contains("octo/widgets"));
        assert!(set.contains("acme/api"));
        assert!(parse_csv(None).is_empty());
        assert!(parse_csv(Some(" , ")).is_empty());
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = load(&[("ALLOWLIST_REPOS", "octo/widgets")]).unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
        let err = load(&[("GITHUB_TOKEN", " '' "), ("ALLOWLIST_REPOS", "octo/widgets")])
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingCredential);
    }

    #[test]
    fn empty_allowlists_are_fatal() {
        let err = load(&[("GITHUB_TOKEN", "t"), ("ALLOWLIST_REPOS", " , ")]).unwrap_err();
        assert_eq!(err, ConfigError::EmptyAllowlist);
        let err = load(&[("GITHUB_TOKEN", "t"), ("PORT", "9000")]).unwrap_err();
        assert_eq!(err, ConfigError::EmptyAllowlist);
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[("GITHUB_TOKEN", "\"secret\""), ("ALLOWLIST_OWNERS", "octo")]).unwrap();
        assert_eq!(cfg.token, "secret");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.auth_scheme, AuthScheme::Bearer);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.timeout_secs, 30);
        assert!(cfg.user_agent.starts_with("github-connector/"));
        assert!(cfg.allowed_repos.is_empty());
    }

    #[test]
    fn gh_token_fallback_and_overrides() {
        let cfg = load(&[
            ("GH_TOKEN", "fallback"),
            ("ALLOWLIST_REPOS", "octo/widgets"),
            ("PORT", "9001"),
            ("GITHUB_AUTH_SCHEME", "Token"),
            ("GITHUB_API_URL", "http://127.0.0.1:5000/"),
        ])
        .unwrap();
        assert_eq!(cfg.token, "fallback");
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.auth_scheme, AuthScheme::Token);
        assert_eq!(cfg.api_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let base = [("GITHUB_TOKEN", "t"), ("ALLOWLIST_OWNERS", "octo")];
        let with = |extra: (&'static str, &'static str)| {
            let mut pairs = base.to_vec();
            pairs.push(extra);
            load(&pairs).unwrap_err()
        };
        assert!(matches!(with(("PORT", "http")), ConfigError::InvalidPort(_)));
        assert!(matches!(
            with(("GITHUB_AUTH_SCHEME", "basic")),
            ConfigError::InvalidAuthScheme(_)
        ));
        assert!(matches!(
            with(("GITHUB_API_URL", "not a url")),
            ConfigError::InvalidApiUrl(_)
        ));
        assert!(matches!(
            with(("GITHUB_HTTP_TIMEOUT_SECS", "0")),
            ConfigError::InvalidTimeout(_)
        ));
    }

    #[test]
    fn auth_header_schemes() {
        assert_eq!(AuthScheme::Bearer.header_value("abc"), "Bearer abc");
        assert_eq!(AuthScheme::Token.header_value("abc"), "token abc");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = load(&[("GITHUB_TOKEN", "s3cr3t"), ("ALLOWLIST_OWNERS", "octo")]).unwrap();
        assert!(!format!("{:?}", cfg).contains("s3cr3t"));
    }
}
