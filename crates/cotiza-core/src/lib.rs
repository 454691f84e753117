pub mod app_config;
pub mod branches;
pub mod config;
pub mod products;
pub mod stores;

use thiserror::Error;

pub use app_config::{AppConfig, BrowserDriver, Environment};
pub use branches::{default_branches, load_branches, load_branches_or_default, Branch, BranchesFile};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{BranchAvailability, ProductResult};
pub use stores::Store;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown store: {0}")]
    UnknownStore(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read branches file {path}: {source}")]
    BranchesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse branches file: {0}")]
    BranchesFileParse(#[source] serde_yaml::Error),

    #[error("invalid branches configuration: {0}")]
    Validation(String),
}
