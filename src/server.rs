use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info, warn};
use serde_json::Value;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ProxyError;
use crate::forwarder::Forwarder;
use crate::http::{self, UpstreamResponse};
use crate::params::{
    CreateCommentRequest, CreateIssueRequest, ListIssuesQuery, PageQuery, RefQuery,
    UpdateIssueRequest,
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

type RepoPath = Result<Path<(String, String)>, PathRejection>;
type IssuePath = Result<Path<(String, String, u64)>, PathRejection>;
type ContentPath = Result<Path<(String, String, String)>, PathRejection>;
type Handled = Result<Response, ProxyError>;

fn relay(resp: UpstreamResponse) -> Response {
    (resp.status, Json(resp.body)).into_response()
}

fn path_err(e: PathRejection) -> ProxyError {
    ProxyError::Validation(e.body_text())
}

fn query_err(e: QueryRejection) -> ProxyError {
    ProxyError::Validation(e.body_text())
}

fn json_err(e: JsonRejection) -> ProxyError {
    ProxyError::Validation(e.body_text())
}

pub fn router(forwarder: Forwarder) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/repos/{owner}/{repo}/issues",
            get(list_issues).post(create_issue),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{issue_number}",
            get(get_issue).patch(update_issue),
        )
        .route(
            "/repos/{owner}/{repo}/issues/{issue_number}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/repos/{owner}/{repo}/contents", get(list_contents))
        .route("/repos/{owner}/{repo}/contents/{*path}", get(get_content))
        .layer(middleware::from_fn(request_log))
        .with_state(forwarder)
}

pub async fn serve(cfg: Arc<Config>) -> anyhow::Result<()> {
    let client = http::build_client(&cfg)?;
    let forwarder = Forwarder::new(cfg.clone(), client);
    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(
        "github-connector listening on {}; upstream={} auth_scheme={} allowed_repos={} allowed_owners={}",
        addr,
        cfg.api_url,
        cfg.auth_scheme,
        cfg.allowed_repos.len(),
        cfg.allowed_owners.len()
    );

    axum::serve(listener, router(forwarder))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("github-connector stopped");
    Ok(())
}

// Returns once the signal fired; a listener that failed to install parks forever
// instead of triggering shutdown.
async fn signal_or_pending<E: std::fmt::Display>(name: &str, result: Result<(), E>) {
    if let Err(e) = result {
        warn!("failed to listen for {}: {}", name, e);
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal_or_pending("ctrl-c", tokio::signal::ctrl_c().await).await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => signal_or_pending("SIGTERM", Err::<(), _>(e)).await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

// Tags each request with an id, echoed in the response and in the log line.
async fn request_log(req: Request, next: Next) -> Response {
    let id = Uuid::new_v4();
    let method = req.method().clone();
    let uri = req.uri().path().to_string();
    let started = Instant::now();
    debug!("[{}] {} {}", id, method, uri);

    let mut resp = next.run(req).await;
    if let Ok(v) = HeaderValue::from_str(&id.to_string()) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    info!(
        "[{}] {} {} -> {} ({} ms)",
        id,
        method,
        uri,
        resp.status().as_u16(),
        started.elapsed().as_millis()
    );
    resp
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_issues(
    State(fwd): State<Forwarder>,
    path: RepoPath,
    query: Result<Query<ListIssuesQuery>, QueryRejection>,
) -> Handled {
    let Path((owner, repo)) = path.map_err(path_err)?;
    let Query(query) = query.map_err(query_err)?;
    let resp = fwd.list_issues(&owner, &repo, &query).await?;
    Ok(relay(resp))
}

async fn get_issue(State(fwd): State<Forwarder>, path: IssuePath) -> Handled {
    let Path((owner, repo, number)) = path.map_err(path_err)?;
    let resp = fwd.get_issue(&owner, &repo, number).await?;
    Ok(relay(resp))
}

async fn create_issue(
    State(fwd): State<Forwarder>,
    path: RepoPath,
    body: Result<Json<CreateIssueRequest>, JsonRejection>,
) -> Handled {
    let Path((owner, repo)) = path.map_err(path_err)?;
    let Json(body) = body.map_err(json_err)?;
    let resp = fwd.create_issue(&owner, &repo, &body).await?;
    Ok(relay(resp))
}

async fn update_issue(
    State(fwd): State<Forwarder>,
    path: IssuePath,
    body: Result<Json<UpdateIssueRequest>, JsonRejection>,
) -> Handled {
    let Path((owner, repo, number)) = path.map_err(path_err)?;
    let Json(body) = body.map_err(json_err)?;
    let resp = fwd.update_issue(&owner, &repo, number, &body).await?;
    Ok(relay(resp))
}

async fn list_comments(
    State(fwd): State<Forwarder>,
    path: IssuePath,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Handled {
    let Path((owner, repo, number)) = path.map_err(path_err)?;
    let Query(query) = query.map_err(query_err)?;
    let resp = fwd.list_comments(&owner, &repo, number, &query).await?;
    Ok(relay(resp))
}

async fn add_comment(
    State(fwd): State<Forwarder>,
    path: IssuePath,
    body: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> Handled {
    let Path((owner, repo, number)) = path.map_err(path_err)?;
    let Json(body) = body.map_err(json_err)?;
    let resp = fwd.add_comment(&owner, &repo, number, &body).await?;
    Ok(relay(resp))
}

async fn list_contents(
    State(fwd): State<Forwarder>,
    path: RepoPath,
    query: Result<Query<RefQuery>, QueryRejection>,
) -> Handled {
    let Path((owner, repo)) = path.map_err(path_err)?;
    let Query(query) = query.map_err(query_err)?;
    let resp = fwd.list_contents(&owner, &repo, &query).await?;
    Ok(relay(resp))
}

async fn get_content(
    State(fwd): State<Forwarder>,
    path: ContentPath,
    query: Result<Query<RefQuery>, QueryRejection>,
) -> Handled {
    let Path((owner, repo, content_path)) = path.map_err(path_err)?;
    let Query(query) = query.map_err(query_err)?;
    let resp = fwd
        .get_content(&owner, &repo, &content_path, &query)
        .await?;
    Ok(relay(resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn failed_signal_listener_never_resolves() {
        let failed = signal_or_pending("ctrl-c", Err::<(), _>("unsupported"));
        let waited = tokio::time::timeout(Duration::from_millis(50), failed).await;
        assert!(waited.is_err());

        let fired = signal_or_pending("ctrl-c", Ok::<(), &str>(()));
        assert!(tokio::time::timeout(Duration::from_millis(50), fired)
            .await
            .is_ok());
    }
}
