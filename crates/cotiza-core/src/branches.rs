use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One physical location of a multi-branch retailer.
///
/// `seller_id` is the storefront's internal identifier used to pin a browser
/// session to this branch's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub key: String,
    pub seller_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Branch {
    #[must_use]
    pub fn new(key: impl Into<String>, seller_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            seller_id: seller_id.into(),
            name: None,
        }
    }

    /// Name shown in `available_stores` and `best_price_store`.
    ///
    /// Uses the configured `name` when present, otherwise the key with
    /// underscores turned into spaces and each word capitalized.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        self.key
            .split('_')
            .filter(|w| !w.is_empty())
            .map(title_case)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[derive(Debug, Deserialize)]
pub struct BranchesFile {
    pub branches: Vec<Branch>,
}

/// The El Salvador branch catalogue used when no branches file is present.
#[must_use]
pub fn default_branches() -> Vec<Branch> {
    [
        ("vm_rural", "walmartsvwm99991"),
        ("constitucion", "walmartsvwm4132"),
        ("bulevard_ejercito", "walmartsvwm539"),
        ("escalon", "walmartsvwm4382"),
        ("santa_ana", "walmartsvwm825"),
        ("santa_elena", "walmartsvwm775"),
        ("san_miguel", "walmartsvwm4411"),
    ]
    .into_iter()
    .map(|(key, seller_id)| Branch::new(key, seller_id))
    .collect()
}

/// Load and validate the branch catalogue from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_branches(path: &Path) -> Result<BranchesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BranchesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let branches_file: BranchesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::BranchesFileParse)?;

    validate_branches(&branches_file)?;

    Ok(branches_file)
}

/// Like [`load_branches`], but a missing file yields [`default_branches`].
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// fails validation.
pub fn load_branches_or_default(path: &Path) -> Result<Vec<Branch>, ConfigError> {
    match load_branches(path) {
        Ok(file) => Ok(file.branches),
        Err(ConfigError::BranchesFileIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Ok(default_branches())
        }
        Err(e) => Err(e),
    }
}

fn validate_branches(branches_file: &BranchesFile) -> Result<(), ConfigError> {
    if branches_file.branches.is_empty() {
        return Err(ConfigError::Validation(
            "at least one branch must be configured".to_string(),
        ));
    }

    let mut seen_keys = HashSet::new();
    let mut seen_sellers = HashSet::new();

    for branch in &branches_file.branches {
        if branch.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "branch key must be non-empty".to_string(),
            ));
        }

        if branch.seller_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "branch '{}' has an empty seller_id",
                branch.key
            )));
        }

        if !seen_keys.insert(branch.key.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate branch key: '{}'",
                branch.key
            )));
        }

        if !seen_sellers.insert(branch.seller_id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate seller_id: '{}' (from branch '{}')",
                branch.seller_id, branch.key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "branches_test.rs"]
mod tests;
