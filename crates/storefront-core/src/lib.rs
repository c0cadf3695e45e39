pub mod app_config;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod permissions;
pub mod reviews;
pub mod tokens;
pub mod users;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    load_catalog, CatalogFile, Category, Company, NewProduct, ProductChanges, ProductDraft,
    ProductPatch, DEFAULT_COLOR, DEFAULT_IMAGE, DEFAULT_INVENTORY,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use orders::{
    generate_client_secret, order_totals, OrderDraft, OrderItemDraft, OrderLine, OrderRequest,
    OrderStatus, OrderTotals, MAX_LINE_AMOUNT,
};
pub use permissions::{check_permissions, Actor, Role};
pub use reviews::{validate_comment, validate_title, Rating, RatingSummary};
pub use tokens::{generate_token, hash_token};
pub use users::{validate_email, validate_user_name, UserChanges, UserPatch};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),
    #[error("invalid category '{0}'; expected office, kitchen, or bedroom")]
    InvalidCategory(String),
    #[error("invalid company '{0}'; expected ikea, liddy, or marcos")]
    InvalidCompany(String),
    #[error("invalid role '{0}'; expected admin or user")]
    InvalidRole(String),
    #[error("invalid order status '{0}'")]
    InvalidOrderStatus(String),
    #[error("{field} {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("not authorized to access this resource")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),
    #[error("catalog validation failed for product '{name}': {source}")]
    CatalogValidation {
        name: String,
        #[source]
        source: CoreError,
    },
}
