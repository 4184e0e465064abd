use std::sync::Arc;

use log::warn;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::ProxyError;
use crate::gate::Gate;
use crate::http::{self, encode_path, encode_path_segment, UpstreamRequest, UpstreamResponse};
use crate::params::{
    CreateCommentRequest, CreateIssueRequest, ListIssuesQuery, PageQuery, RefQuery,
    UpdateIssueRequest,
};

/// Gate-checked forwarding of issue and contents operations to the upstream API.
///
/// Every operation validates its inputs, then consults the [`Gate`], then
/// makes exactly one upstream call. A denial or validation failure makes none.
#[derive(Clone)]
pub struct Forwarder {
    cfg: Arc<Config>,
    gate: Arc<Gate>,
    client: Client,
}

fn repo_path(owner: &str, repo: &str) -> Result<String, ProxyError> {
    Ok(format!(
        "/repos/{}/{}",
        encode_path_segment(owner)?,
        encode_path_segment(repo)?
    ))
}

fn to_body<T: Serialize>(value: &T) -> Result<Value, ProxyError> {
    serde_json::to_value(value).map_err(|e| ProxyError::Validation(e.to_string()))
}

fn created(resp: UpstreamResponse) -> UpstreamResponse {
    UpstreamResponse {
        status: StatusCode::CREATED,
        body: resp.body,
    }
}

impl Forwarder {
    pub fn new(cfg: Arc<Config>, client: Client) -> Self {
        let gate = Arc::new(Gate::from_config(&cfg));
        Self { cfg, gate, client }
    }

    pub fn ensure_allowed(&self, owner: &str, repo: &str) -> Result<(), ProxyError> {
        if self.gate.is_allowed(owner, repo) {
            return Ok(());
        }
        warn!("denied access to {}/{}", owner, repo);
        Err(ProxyError::Forbidden)
    }

    async fn send(&self, req: UpstreamRequest) -> Result<UpstreamResponse, ProxyError> {
        http::send(&self.client, &self.cfg, req).await
    }

    pub async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &ListIssuesQuery,
    ) -> Result<UpstreamResponse, ProxyError> {
        query.validate()?;
        let path = format!("{}/issues", repo_path(owner, repo)?);
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::get(path).with_query(query.to_query()))
            .await
    }

    pub async fn get_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!("{}/issues/{}", repo_path(owner, repo)?, issue_number);
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::get(path)).await
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        body: &CreateIssueRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!("{}/issues", repo_path(owner, repo)?);
        self.ensure_allowed(owner, repo)?;
        let resp = self.send(UpstreamRequest::post(path, to_body(body)?)).await?;
        Ok(created(resp))
    }

    pub async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &UpdateIssueRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!("{}/issues/{}", repo_path(owner, repo)?, issue_number);
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::patch(path, to_body(body)?)).await
    }

    pub async fn list_comments(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        query: &PageQuery,
    ) -> Result<UpstreamResponse, ProxyError> {
        query.validate()?;
        let path = format!(
            "{}/issues/{}/comments",
            repo_path(owner, repo)?,
            issue_number
        );
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::get(path).with_query(query.to_query()))
            .await
    }

    pub async fn add_comment(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        body: &CreateCommentRequest,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!(
            "{}/issues/{}/comments",
            repo_path(owner, repo)?,
            issue_number
        );
        self.ensure_allowed(owner, repo)?;
        let resp = self.send(UpstreamRequest::post(path, to_body(body)?)).await?;
        Ok(created(resp))
    }

    pub async fn list_contents(
        &self,
        owner: &str,
        repo: &str,
        query: &RefQuery,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!("{}/contents", repo_path(owner, repo)?);
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::get(path).with_query(query.to_query()))
            .await
    }

    pub async fn get_content(
        &self,
        owner: &str,
        repo: &str,
        content_path: &str,
        query: &RefQuery,
    ) -> Result<UpstreamResponse, ProxyError> {
        let path = format!(
            "{}/contents/{}",
            repo_path(owner, repo)?,
            encode_path(content_path.trim_start_matches('/'))?
        );
        self.ensure_allowed(owner, repo)?;
        self.send(UpstreamRequest::get(path).with_query(query.to_query()))
            .await
    }
}
