//! Resource listings routed through [`fetch_list`].

use shopline_api::{
    CustomersListOptions, OrdersListOptions, OrdersSearchOptions, ProductsListOptions, ShoplineApi,
};
use shopline_shared::{Customer, OrderSummary, Page, Product, Result};

use crate::pagination::fetch_list;

/// List orders; `limit == 0` means "one page as requested".
pub async fn list_orders(
    api: &dyn ShoplineApi,
    opts: &OrdersListOptions,
    limit: usize,
) -> Result<Page<OrderSummary>> {
    fetch_list(
        limit,
        opts.page,
        opts.page_size,
        || api.list_orders(opts),
        |page, page_size| {
            let opts = OrdersListOptions {
                page,
                page_size,
                ..opts.clone()
            };
            async move { api.list_orders(&opts).await }
        },
        "failed to list orders",
    )
    .await
}

/// Search orders by keyword, paged the same way as [`list_orders`].
pub async fn search_orders(
    api: &dyn ShoplineApi,
    opts: &OrdersSearchOptions,
    limit: usize,
) -> Result<Page<OrderSummary>> {
    fetch_list(
        limit,
        opts.page,
        opts.page_size,
        || api.search_orders(opts),
        |page, page_size| {
            let opts = OrdersSearchOptions {
                page,
                page_size,
                ..opts.clone()
            };
            async move { api.search_orders(&opts).await }
        },
        "failed to search orders",
    )
    .await
}

pub async fn list_products(
    api: &dyn ShoplineApi,
    opts: &ProductsListOptions,
    limit: usize,
) -> Result<Page<Product>> {
    fetch_list(
        limit,
        opts.page,
        opts.page_size,
        || api.list_products(opts),
        |page, page_size| {
            let opts = ProductsListOptions {
                page,
                page_size,
                ..opts.clone()
            };
            async move { api.list_products(&opts).await }
        },
        "failed to list products",
    )
    .await
}

pub async fn list_customers(
    api: &dyn ShoplineApi,
    opts: &CustomersListOptions,
    limit: usize,
) -> Result<Page<Customer>> {
    fetch_list(
        limit,
        opts.page,
        opts.page_size,
        || api.list_customers(opts),
        |page, page_size| {
            let opts = CustomersListOptions {
                page,
                page_size,
                ..opts.clone()
            };
            async move { api.list_customers(&opts).await }
        },
        "failed to list customers",
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;

    #[tokio::test]
    async fn list_orders_single_page_when_no_limit() {
        let api = MockApi::new().with_summaries(7);
        let opts = OrdersListOptions {
            page: 2,
            page_size: 3,
            ..OrdersListOptions::default()
        };
        let page = list_orders(&api, &opts, 0).await.unwrap();

        assert_eq!(api.list_requests(), vec![(2, 3)]);
        let ids: Vec<&str> = page.items.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["o4", "o5", "o6"]);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn list_orders_aggregates_up_to_limit() {
        let api = MockApi::new().with_summaries(7);
        let opts = OrdersListOptions {
            page_size: 2,
            ..OrdersListOptions::default()
        };
        let page = list_orders(&api, &opts, 5).await.unwrap();

        assert_eq!(api.list_requests(), vec![(1, 2), (2, 2), (3, 2)]);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_count, 7);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn list_orders_exhausts_short_listing() {
        let api = MockApi::new().with_summaries(3);
        let opts = OrdersListOptions {
            page_size: 2,
            ..OrdersListOptions::default()
        };
        let page = list_orders(&api, &opts, 10).await.unwrap();

        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn search_orders_aggregates_matches() {
        // o1, o10, o11, o12 match "o1".
        let api = MockApi::new().with_summaries(12);
        let opts = OrdersSearchOptions {
            query: "o1".into(),
            page_size: 2,
            ..OrdersSearchOptions::default()
        };
        let page = search_orders(&api, &opts, 3).await.unwrap();

        assert_eq!(api.list_requests(), vec![(1, 2), (2, 2)]);
        let ids: Vec<&str> = page.items.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["o1", "o10", "o11"]);
        assert_eq!(page.total_count, 4);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn search_errors_carry_search_context() {
        let api = MockApi::new().with_summaries(3);
        let err = search_orders(&api, &OrdersSearchOptions::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to search orders: API error (HTTP 422): query is required"
        );
    }

    #[tokio::test]
    async fn list_errors_carry_resource_context() {
        let api = MockApi::new();
        let err = list_customers(&api, &CustomersListOptions::default(), 0)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to list customers: API error (HTTP 503): customers unavailable"
        );
    }
}
