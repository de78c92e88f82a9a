//! Community watchlist loaded from YAML for the scheduled daily ingest.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::SortMode;
use crate::ConfigError;

fn default_sort() -> SortMode {
    SortMode::New
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistCommunity {
    pub name: String,
    #[serde(default = "default_sort")]
    pub sort: SortMode,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Per-community keyword override; falls back to the shared list.
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Watchlist {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub communities: Vec<WatchlistCommunity>,
}

impl Watchlist {
    /// Effective keyword list for one community.
    #[must_use]
    pub fn keywords_for(&self, community: &WatchlistCommunity) -> Vec<String> {
        community
            .keywords
            .clone()
            .unwrap_or_else(|| self.keywords.clone())
    }
}

/// Load and validate the watchlist from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_watchlist(path: &Path) -> Result<Watchlist, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::WatchlistIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let watchlist: Watchlist = serde_yaml::from_str(&content)?;
    validate_watchlist(&watchlist)?;

    Ok(watchlist)
}

fn validate_watchlist(watchlist: &Watchlist) -> Result<(), ConfigError> {
    if watchlist.communities.is_empty() {
        return Err(ConfigError::Validation(
            "watchlist must contain at least one community".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for community in &watchlist.communities {
        if community.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "community name must be non-empty".to_string(),
            ));
        }
        if community.limit == 0 {
            return Err(ConfigError::Validation(format!(
                "community '{}' has a zero item limit",
                community.name
            )));
        }
        if !seen.insert(community.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate community: '{}'",
                community.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Watchlist, ConfigError> {
        let watchlist: Watchlist = serde_yaml::from_str(yaml)?;
        validate_watchlist(&watchlist)?;
        Ok(watchlist)
    }

    #[test]
    fn parses_watchlist_with_defaults() {
        let watchlist = parse(
            "keywords: [frustrated, hate]\ncommunities:\n  - name: saas\n",
        )
        .unwrap();
        assert_eq!(watchlist.communities.len(), 1);
        assert_eq!(watchlist.communities[0].sort, SortMode::New);
        assert_eq!(watchlist.communities[0].limit, 50);
        assert_eq!(
            watchlist.keywords_for(&watchlist.communities[0]),
            vec!["frustrated".to_string(), "hate".to_string()]
        );
    }

    #[test]
    fn community_keyword_override_wins() {
        let watchlist = parse(
            "keywords: [hate]\ncommunities:\n  - name: webdev\n    keywords: [broken, bug]\n",
        )
        .unwrap();
        assert_eq!(
            watchlist.keywords_for(&watchlist.communities[0]),
            vec!["broken".to_string(), "bug".to_string()]
        );
    }

    #[test]
    fn rejects_empty_community_list() {
        let result = parse("keywords: []\ncommunities: []\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_communities() {
        let result = parse(
            "communities:\n  - name: saas\n  - name: SaaS\n",
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_zero_limit() {
        let result = parse("communities:\n  - name: saas\n    limit: 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
