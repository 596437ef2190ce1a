//! Shopline Open API client.
//!
//! [`ShoplineApi`] is the seam the listing/enrichment engine consumes; it is
//! object-safe so commands hold an `Arc<dyn ShoplineApi>` and tests swap in
//! an in-memory implementation. [`ShoplineClient`] is the HTTP implementation.

mod client;
mod query;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use shopline_shared::{Customer, Order, OrderSummary, Page, Product, Result};

pub use client::ShoplineClient;
pub use query::Query;

/// Options for `GET /orders`.
#[derive(Debug, Clone, Default)]
pub struct OrdersListOptions {
    pub page: u32,
    pub page_size: u32,
    pub status: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub sort_by: String,
    pub sort_order: String,
}

/// Options for `GET /orders/search`.
#[derive(Debug, Clone, Default)]
pub struct OrdersSearchOptions {
    pub query: String,
    pub status: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: u32,
    pub page_size: u32,
}

/// Options for `GET /products`.
#[derive(Debug, Clone, Default)]
pub struct ProductsListOptions {
    pub page: u32,
    pub page_size: u32,
    pub status: String,
    pub vendor: String,
    pub product_type: String,
    pub sort_by: String,
    pub sort_order: String,
}

/// Options for `GET /customers`.
#[derive(Debug, Clone, Default)]
pub struct CustomersListOptions {
    pub page: u32,
    pub page_size: u32,
    pub email: String,
    pub state: String,
    pub tags: String,
    pub sort_by: String,
    pub sort_order: String,
}

/// The read operations the CLI needs from the platform.
///
/// Detail lookups take a [`CancellationToken`]; implementations should stop
/// waiting on the network and return [`shopline_shared::ShoplineError::Cancelled`]
/// once it fires.
#[async_trait]
pub trait ShoplineApi: Send + Sync {
    async fn list_orders(&self, opts: &OrdersListOptions) -> Result<Page<OrderSummary>>;
    async fn search_orders(&self, opts: &OrdersSearchOptions) -> Result<Page<OrderSummary>>;
    async fn get_order(&self, cancel: &CancellationToken, id: &str) -> Result<Order>;

    async fn list_products(&self, opts: &ProductsListOptions) -> Result<Page<Product>>;
    async fn get_product(&self, cancel: &CancellationToken, id: &str) -> Result<Product>;

    async fn list_customers(&self, opts: &CustomersListOptions) -> Result<Page<Customer>>;
    async fn get_customer(&self, cancel: &CancellationToken, id: &str) -> Result<Customer>;
}
