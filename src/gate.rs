use std::collections::HashSet;

use crate::config::Config;

/// Immutable allowlist of `owner/repo` pairs and bare owners.
///
/// Anything not listed is denied. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    repos: HashSet<String>,
    owners: HashSet<String>,
}

impl Gate {
    pub fn new(repos: HashSet<String>, owners: HashSet<String>) -> Self {
        Self { repos, owners }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.allowed_repos.clone(), cfg.allowed_owners.clone())
    }

    pub fn is_allowed(&self, owner: &str, repo: &str) -> bool {
        self.repos.contains(&format!("{}/{}", owner, repo)) || self.owners.contains(owner)
    }
}
