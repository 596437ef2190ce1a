//! Shared types, error model, and configuration for shopline-cli.
//!
//! This crate is the foundation depended on by all other shopline-cli crates.
//! It provides:
//! - [`ShoplineError`]: the unified error type
//! - Wire types ([`Page`], [`OrderSummary`], [`Order`], [`Product`], [`Customer`])
//! - Configuration ([`AppConfig`], config loading, token lookup)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, DefaultsConfig, TOKEN_ENV_VARS, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_access_token,
};
pub use error::{Result, ResultExt, ShoplineError};
pub use types::{
    Customer, Order, OrderLineItem, OrderSubtotalItem, OrderSummary, Page, Pagination, Price,
    Product,
};
