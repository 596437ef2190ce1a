//! Order-specific enrichment: `--expand` parsing and the customer/product
//! expansions built on [`crate::enrich`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use shopline_api::ShoplineApi;
use shopline_shared::{Customer, Order, Product, Result, ShoplineError};

use crate::enrich::{Enricher, Expansion, ExpansionRun, Fetch, Secondary, fetcher};

/// Parsed `--expand` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Fetch full order details. Implied by the other two.
    pub details: bool,
    pub customer: bool,
    pub products: bool,
}

impl ExpandOptions {
    pub const VALUES: &'static [&'static str] = &["details", "customer", "products"];

    /// Parse values like `["customer", "products"]` or `["customer,products"]`.
    ///
    /// `detail` and `order` are aliases of `details`; `product` of `products`.
    ///
    /// Matching is case-insensitive and blanks are ignored; anything else is a
    /// validation error.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        let mut opts = Self::default();
        for raw in values {
            for value in raw.as_ref().split(',') {
                let value = value.trim().to_ascii_lowercase();
                match value.as_str() {
                    "" => {}
                    "details" | "detail" | "order" => opts.details = true,
                    "customer" => opts.customer = true,
                    "products" | "product" => opts.products = true,
                    other => {
                        return Err(ShoplineError::validation(format!(
                            "invalid --expand value {other:?} (expected one of: {})",
                            Self::VALUES.join(", ")
                        )));
                    }
                }
            }
        }
        if opts.customer || opts.products {
            opts.details = true;
        }
        Ok(opts)
    }

    /// Whether any enrichment was requested.
    pub fn any(&self) -> bool {
        self.details
    }
}

/// Attaches the order's customer record, memoized by customer id per run.
pub struct CustomerExpansion {
    fetch: Fetch<Customer>,
}

impl CustomerExpansion {
    pub fn new(api: Arc<dyn ShoplineApi>) -> Self {
        let fetch = fetcher(move |cancel: CancellationToken, id: String| {
            let api = Arc::clone(&api);
            async move { api.get_customer(&cancel, &id).await }
        });
        Self { fetch }
    }
}

impl Expansion<Order> for CustomerExpansion {
    fn kind(&self) -> &'static str {
        "customer"
    }

    fn begin(&self) -> Box<dyn ExpansionRun<Order>> {
        Box::new(CustomerRun {
            customers: Secondary::new("customer", Arc::clone(&self.fetch)),
        })
    }
}

struct CustomerRun {
    customers: Secondary<Customer>,
}

#[async_trait]
impl ExpansionRun<Order> for CustomerRun {
    async fn expand(&self, cancel: &CancellationToken, order: &mut Order) -> Result<()> {
        let id = order.customer_id.trim().to_string();
        if id.is_empty() || order.customer.is_some() {
            return Ok(());
        }
        order.customer = Some(self.customers.resolve(cancel, &id).await?);
        Ok(())
    }
}

/// Attaches the product record to every line item, memoized by product id per run.
pub struct ProductExpansion {
    fetch: Fetch<Product>,
}

impl ProductExpansion {
    pub fn new(api: Arc<dyn ShoplineApi>) -> Self {
        let fetch = fetcher(move |cancel: CancellationToken, id: String| {
            let api = Arc::clone(&api);
            async move { api.get_product(&cancel, &id).await }
        });
        Self { fetch }
    }
}

impl Expansion<Order> for ProductExpansion {
    fn kind(&self) -> &'static str {
        "products"
    }

    fn begin(&self) -> Box<dyn ExpansionRun<Order>> {
        Box::new(ProductRun {
            products: Secondary::new("products", Arc::clone(&self.fetch)),
        })
    }
}

struct ProductRun {
    products: Secondary<Product>,
}

#[async_trait]
impl ExpansionRun<Order> for ProductRun {
    async fn expand(&self, cancel: &CancellationToken, order: &mut Order) -> Result<()> {
        for item in &mut order.line_items {
            let id = item.product_id.trim().to_string();
            if id.is_empty() || item.product.is_some() {
                continue;
            }
            item.product = Some(self.products.resolve(cancel, &id).await?);
        }
        Ok(())
    }
}

/// Build the order enricher for the given `--expand` selection.
pub fn order_enricher(
    api: Arc<dyn ShoplineApi>,
    expand: &ExpandOptions,
    jobs: usize,
) -> Enricher<Order> {
    let detail_api = Arc::clone(&api);
    let fetch_detail = fetcher(move |cancel: CancellationToken, id: String| {
        let api = Arc::clone(&detail_api);
        async move { api.get_order(&cancel, &id).await }
    });

    let mut enricher = Enricher::new("order", fetch_detail).with_concurrency(jobs);
    if expand.customer {
        enricher = enricher.with_expansion(Arc::new(CustomerExpansion::new(Arc::clone(&api))));
    }
    if expand.products {
        enricher = enricher.with_expansion(Arc::new(ProductExpansion::new(Arc::clone(&api))));
    }
    debug!(
        customer = expand.customer,
        products = expand.products,
        concurrency = enricher.concurrency(),
        "order enricher ready"
    );
    enricher
}
