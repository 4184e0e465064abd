//! Typed inbound parameters for each forwarded operation.
//!
//! Query structs only emit pairs the caller actually supplied (empty strings
//! count as absent). Body structs skip unset fields when serialized, except
//! the comment body which is always sent.

use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

pub const MAX_PER_PAGE: u32 = 100;

pub type QueryPairs = Vec<(&'static str, String)>;

fn push_str(out: &mut QueryPairs, key: &'static str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        out.push((key, v.to_string()));
    }
}

fn push_num(out: &mut QueryPairs, key: &'static str, value: Option<u32>) {
    if let Some(v) = value {
        out.push((key, v.to_string()));
    }
}

fn check_paging(page: Option<u32>, per_page: Option<u32>) -> Result<(), ProxyError> {
    if page == Some(0) {
        return Err(ProxyError::Validation("page must be >= 1".into()));
    }
    if let Some(n) = per_page {
        if n == 0 || n > MAX_PER_PAGE {
            return Err(ProxyError::Validation(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListIssuesQuery {
    pub state: Option<String>,
    pub labels: Option<String>,
    pub assignee: Option<String>,
    pub creator: Option<String>,
    pub since: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListIssuesQuery {
    pub fn validate(&self) -> Result<(), ProxyError> {
        check_paging(self.page, self.per_page)
    }

    pub fn to_query(&self) -> QueryPairs {
        let mut out = QueryPairs::new();
        push_str(&mut out, "state", &self.state);
        push_str(&mut out, "labels", &self.labels);
        push_str(&mut out, "assignee", &self.assignee);
        push_str(&mut out, "creator", &self.creator);
        push_str(&mut out, "since", &self.since);
        push_num(&mut out, "page", self.page);
        push_num(&mut out, "per_page", self.per_page);
        out
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn validate(&self) -> Result<(), ProxyError> {
        check_paging(self.page, self.per_page)
    }

    pub fn to_query(&self) -> QueryPairs {
        let mut out = QueryPairs::new();
        push_num(&mut out, "page", self.page);
        push_num(&mut out, "per_page", self.per_page);
        out
    }
}

/// Branch, tag or commit SHA for contents lookups.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RefQuery {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
}

impl RefQuery {
    pub fn to_query(&self) -> QueryPairs {
        let mut out = QueryPairs::new();
        push_str(&mut out, "ref", &self.git_ref);
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
}

/// Comment payload; `body` is required and forwarded as-is, empty string included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}
