//! Listing and enrichment engine for the `spl` CLI.
//!
//! [`pagination`] stitches listing pages into one bounded result,
//! [`enrich`] fans detail lookups out over a bounded worker pool, and
//! [`orders`] wires the order-specific expansions on top.

pub mod enrich;
pub mod listing;
pub mod orders;
pub mod pagination;

#[cfg(test)]
mod testing;

pub use enrich::{
    DEFAULT_CONCURRENCY, EnrichProgress, Enricher, Expansion, ExpansionRun, Fetch,
    FirstErrorWins, Keyed, MemoCache, Secondary, SilentProgress, fetcher,
};
pub use listing::{list_customers, list_orders, list_products, search_orders};
pub use orders::{CustomerExpansion, ExpandOptions, ProductExpansion, order_enricher};
pub use pagination::{aggregate, fetch_list};
