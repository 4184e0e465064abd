use std::collections::HashMap;
use std::sync::Arc;

use github_connector::{http, server, Config, Forwarder};
use tokio::net::TcpListener;

#[allow(dead_code)]
pub const TOKEN: &str = "test-token";

/// Start the proxy on an ephemeral port, pointed at `api_url`.
/// Returns the proxy base URL.
pub async fn spawn_proxy(api_url: &str, repos: &str, owners: &str) -> String {
    spawn_proxy_with(api_url, repos, owners, &[]).await
}

pub async fn spawn_proxy_with(
    api_url: &str,
    repos: &str,
    owners: &str,
    extra: &[(&str, &str)],
) -> String {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("GITHUB_TOKEN".into(), format!("  \"{}\" ", TOKEN));
    vars.insert("GITHUB_API_URL".into(), api_url.to_string());
    vars.insert("ALLOWLIST_REPOS".into(), repos.to_string());
    vars.insert("ALLOWLIST_OWNERS".into(), owners.to_string());
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    let cfg = Arc::new(Config::from_lookup(|k| vars.get(k).cloned()).unwrap());
    let client = http::build_client(&cfg).unwrap();
    let app = server::router(Forwarder::new(cfg, client));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
