//! In-memory [`ShoplineApi`] used by this crate's tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use shopline_api::{
    CustomersListOptions, OrdersListOptions, OrdersSearchOptions, ProductsListOptions, ShoplineApi,
};
use shopline_shared::{Customer, Order, OrderSummary, Page, Product, Result, ShoplineError};

#[derive(Default)]
pub struct MockApi {
    orders: HashMap<String, Order>,
    customers: HashMap<String, Customer>,
    products: HashMap<String, Product>,
    summaries: Vec<OrderSummary>,
    calls: Mutex<HashMap<String, usize>>,
    list_requests: Mutex<Vec<(u32, u32)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.insert(order.id.clone(), order);
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customers.insert(customer.id.clone(), customer);
        self
    }

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.insert(product.id.clone(), product);
        self
    }

    /// Orders served by `list_orders`, paged by the requested page/page_size.
    pub fn with_summaries(mut self, count: usize) -> Self {
        self.summaries = (1..=count)
            .map(|i| OrderSummary {
                id: format!("o{i}"),
                ..OrderSummary::default()
            })
            .collect();
        self
    }

    pub fn order_calls(&self) -> usize {
        self.count_of("order:")
    }

    pub fn customer_calls(&self, id: &str) -> usize {
        self.count_of(&format!("customer:{id}"))
    }

    pub fn product_calls(&self, id: &str) -> usize {
        self.count_of(&format!("product:{id}"))
    }

    pub fn list_requests(&self) -> Vec<(u32, u32)> {
        self.list_requests.lock().unwrap().clone()
    }

    fn count_of(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }

    async fn lookup<T: Clone>(
        &self,
        cancel: &CancellationToken,
        kind: &str,
        map: &HashMap<String, T>,
        id: &str,
    ) -> Result<T> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(format!("{kind}:{id}"))
            .or_default() += 1;
        tokio::task::yield_now().await;
        if cancel.is_cancelled() {
            return Err(ShoplineError::Cancelled);
        }
        map.get(id).cloned().ok_or_else(|| ShoplineError::Api {
            status: 404,
            message: format!("{kind} not found"),
        })
    }
}

#[async_trait]
impl ShoplineApi for MockApi {
    async fn list_orders(&self, opts: &OrdersListOptions) -> Result<Page<OrderSummary>> {
        self.list_requests
            .lock()
            .unwrap()
            .push((opts.page, opts.page_size));
        let page = opts.page.max(1) as usize;
        let size = if opts.page_size == 0 { 20 } else { opts.page_size as usize };
        let start = (page - 1) * size;
        let items: Vec<OrderSummary> = self.summaries.iter().skip(start).take(size).cloned().collect();
        Ok(Page {
            has_more: start + items.len() < self.summaries.len(),
            total_count: self.summaries.len() as u64,
            page: page as u32,
            page_size: size as u32,
            items,
            ..Page::default()
        })
    }

    async fn search_orders(&self, opts: &OrdersSearchOptions) -> Result<Page<OrderSummary>> {
        self.list_requests
            .lock()
            .unwrap()
            .push((opts.page, opts.page_size));
        if opts.query.trim().is_empty() {
            return Err(ShoplineError::Api {
                status: 422,
                message: "query is required".into(),
            });
        }
        let matching: Vec<OrderSummary> = self
            .summaries
            .iter()
            .filter(|o| o.id.contains(opts.query.trim()))
            .cloned()
            .collect();
        let page = opts.page.max(1) as usize;
        let size = if opts.page_size == 0 { 20 } else { opts.page_size as usize };
        let start = (page - 1) * size;
        let items: Vec<OrderSummary> = matching.iter().skip(start).take(size).cloned().collect();
        Ok(Page {
            has_more: start + items.len() < matching.len(),
            total_count: matching.len() as u64,
            items,
            ..Page::default()
        })
    }

    async fn get_order(&self, cancel: &CancellationToken, id: &str) -> Result<Order> {
        self.lookup(cancel, "order", &self.orders, id).await
    }

    async fn list_products(&self, _opts: &ProductsListOptions) -> Result<Page<Product>> {
        Ok(Page {
            items: self.products.values().cloned().collect(),
            ..Page::default()
        })
    }

    async fn get_product(&self, cancel: &CancellationToken, id: &str) -> Result<Product> {
        self.lookup(cancel, "product", &self.products, id).await
    }

    async fn list_customers(&self, _opts: &CustomersListOptions) -> Result<Page<Customer>> {
        Err(ShoplineError::Api {
            status: 503,
            message: "customers unavailable".into(),
        })
    }

    async fn get_customer(&self, cancel: &CancellationToken, id: &str) -> Result<Customer> {
        self.lookup(cancel, "customer", &self.customers, id).await
    }
}
