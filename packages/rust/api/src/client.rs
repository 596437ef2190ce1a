//! reqwest-backed [`ShoplineApi`] implementation.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use shopline_shared::{
    ApiConfig, Customer, Order, OrderSummary, Page, Product, Result, ShoplineError,
};

use crate::query::Query;
use crate::{
    CustomersListOptions, OrdersListOptions, OrdersSearchOptions, ProductsListOptions, ShoplineApi,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("shopline-cli/", env!("CARGO_PKG_VERSION"));

/// Longest error-body excerpt carried into an error message.
const ERROR_SNIPPET_CHARS: usize = 200;

/// HTTP client for the Shopline Open API.
#[derive(Clone)]
pub struct ShoplineClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl fmt::Debug for ShoplineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShoplineClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl ShoplineClient {
    /// Create a client for `base_url` authenticating with `access_token`.
    pub fn new(base_url: &str, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ShoplineError::config(format!("invalid API base URL '{base_url}': {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ShoplineError::config(format!(
                "invalid API base URL '{base_url}': expected http or https"
            )));
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ShoplineError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Create a client from the `[api]` config section.
    pub fn from_config(api: &ApiConfig, access_token: impl Into<String>) -> Result<Self> {
        Self::new(
            &api.base_url,
            access_token,
            Duration::from_secs(api.timeout_secs),
        )
    }

    /// GET `path` and decode the JSON body.
    #[instrument(skip_all, fields(path = %path))]
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .header("X-Shopline-Access-Token", &self.access_token)
            .header(ACCEPT, "application/json")
            .query(query.pairs())
            .send()
            .await
            .map_err(|e| ShoplineError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "api response"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ShoplineError::Network(format!("{url}: body read failed: {e}")))?;

        serde_json::from_slice(&body).map_err(|e| ShoplineError::Decode(format!("{url}: {e}")))
    }

    /// Like [`Self::get`], but gives up as soon as `cancel` fires.
    async fn get_cancellable<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<T> {
        let query = Query::new();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ShoplineError::Cancelled),
            result = self.get(path, &query) => result,
        }
    }
}

#[async_trait]
impl ShoplineApi for ShoplineClient {
    async fn list_orders(&self, opts: &OrdersListOptions) -> Result<Page<OrderSummary>> {
        let query = Query::new()
            .int("page", opts.page)
            .int("page_size", opts.page_size)
            .string("status", &opts.status)
            .time("created_at_min", opts.since.as_ref())
            .time("created_at_max", opts.until.as_ref())
            .string("sort_by", &opts.sort_by)
            .string("sort_order", &opts.sort_order);
        let page: Page<OrderSummary> = self.get("/orders", &query).await?;
        Ok(page.normalize())
    }

    async fn search_orders(&self, opts: &OrdersSearchOptions) -> Result<Page<OrderSummary>> {
        let query = Query::new()
            .string("query", &opts.query)
            .string("status", &opts.status)
            .time("created_at_min", opts.since.as_ref())
            .time("created_at_max", opts.until.as_ref())
            .int("page", opts.page)
            .int("page_size", opts.page_size);
        let page: Page<OrderSummary> = self.get("/orders/search", &query).await?;
        Ok(page.normalize())
    }

    async fn get_order(&self, cancel: &CancellationToken, id: &str) -> Result<Order> {
        let path = resource_path("orders", "order", id)?;
        let order: Order = self.get_cancellable(cancel, &path).await?;
        Ok(order.normalize())
    }

    async fn list_products(&self, opts: &ProductsListOptions) -> Result<Page<Product>> {
        let query = Query::new()
            .int("page", opts.page)
            .int("page_size", opts.page_size)
            .string("status", &opts.status)
            .string("vendor", &opts.vendor)
            .string("product_type", &opts.product_type)
            .string("sort_by", &opts.sort_by)
            .string("sort_order", &opts.sort_order);
        let page: Page<Product> = self.get("/products", &query).await?;
        Ok(page.normalize())
    }

    async fn get_product(&self, cancel: &CancellationToken, id: &str) -> Result<Product> {
        let path = resource_path("products", "product", id)?;
        self.get_cancellable(cancel, &path).await
    }

    async fn list_customers(&self, opts: &CustomersListOptions) -> Result<Page<Customer>> {
        let query = Query::new()
            .int("page", opts.page)
            .int("page_size", opts.page_size)
            .string("email", &opts.email)
            .string("state", &opts.state)
            .string("tags", &opts.tags)
            .string("sort_by", &opts.sort_by)
            .string("sort_order", &opts.sort_order);
        let page: Page<Customer> = self.get("/customers", &query).await?;
        Ok(page.normalize())
    }

    async fn get_customer(&self, cancel: &CancellationToken, id: &str) -> Result<Customer> {
        let path = resource_path("customers", "customer", id)?;
        self.get_cancellable(cancel, &path).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `/{collection}/{id}` with the id validated and percent-encoded.
fn resource_path(collection: &str, noun: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ShoplineError::validation(format!("{noun} id is required")));
    }
    let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
    Ok(format!("/{collection}/{encoded}"))
}

/// Build an [`ShoplineError::Api`] from a non-success response.
///
/// Prefers the JSON `message`/`error` field; otherwise the status reason plus
/// a short excerpt of a non-HTML body.
fn api_error(status: StatusCode, body: &str) -> ShoplineError {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .filter(|m| !m.trim().is_empty());

    let message = from_json.unwrap_or_else(|| {
        let mut msg = status.canonical_reason().unwrap_or("unknown status").to_string();
        let trimmed = body.trim();
        if !trimmed.is_empty() && !trimmed.to_ascii_lowercase().contains("<html") {
            msg.push_str(": ");
            if trimmed.chars().count() > ERROR_SNIPPET_CHARS {
                msg.extend(trimmed.chars().take(ERROR_SNIPPET_CHARS));
                msg.push_str("...");
            } else {
                msg.push_str(trimmed);
            }
        }
        msg
    });

    ShoplineError::Api {
        status: status.as_u16(),
        message,
    }
}
