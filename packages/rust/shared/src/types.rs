//! Wire and domain types for the Shopline Open API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Pagination block returned alongside every listing response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: u32,
}

/// One listing response, or several pages stitched together.
///
/// The aggregated form keeps the first page's `pagination` and `total_count`
/// and reports `has_more = true` whenever items were cut off by a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub page: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub page_size: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub has_more: bool,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::default(),
            page: 0,
            page_size: 0,
            total_count: 0,
            has_more: false,
        }
    }
}

impl<T> Page<T> {
    /// Fill `total_count` / `has_more` from the pagination block when the
    /// endpoint only reports them there.
    pub fn normalize(mut self) -> Self {
        if self.total_count == 0 {
            self.total_count = self.pagination.total_count;
        }
        let p = &self.pagination;
        if !self.has_more && p.current_page > 0 && p.current_page < p.total_pages {
            self.has_more = true;
        }
        self
    }

    /// Same listing metadata, different items (used after enrichment).
    pub fn with_items<U>(&self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            pagination: self.pagination.clone(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            has_more: self.has_more,
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// A Shopline price object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Price {
    #[serde(default)]
    pub cents: i64,
    #[serde(default)]
    pub currency_symbol: String,
    #[serde(default)]
    pub currency_iso: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub dollars: f64,
}

/// A Shopline product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub title_translations: std::collections::BTreeMap<String, String>,
}

impl Product {
    /// Plain title, falling back to the first usable translation.
    pub fn display_title(&self) -> &str {
        if !self.title.trim().is_empty() {
            return &self.title;
        }
        for key in ["en", "en-US", "zh-hant", "zh-tw", "zh-cn"] {
            if let Some(v) = self.title_translations.get(key) {
                if !v.trim().is_empty() {
                    return v.trim();
                }
            }
        }
        self.title_translations
            .values()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// A Shopline customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub accepts_marketing: bool,
    #[serde(default)]
    pub orders_count: u64,
    #[serde(default)]
    pub total_spent: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// The fields returned by order list/search endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub fulfill_status: String,
    #[serde(default)]
    pub total_price: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Order detail, optionally carrying an expanded customer and products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub fulfill_status: String,
    #[serde(default)]
    pub total_price: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub customer_id: String,
    /// Populated by the API or by `--expand customer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,
    /// API-native item representation on some endpoints.
    #[serde(default, skip_serializing)]
    pub subtotal_items: Vec<OrderSubtotalItem>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Derive `line_items` from `subtotal_items` when the endpoint only
    /// returned the latter.
    pub fn normalize(mut self) -> Self {
        if self.line_items.is_empty() && !self.subtotal_items.is_empty() {
            self.line_items = self
                .subtotal_items
                .iter()
                .map(|si| OrderLineItem {
                    id: si.id.trim().to_string(),
                    product_id: si.item_id.trim().to_string(),
                    variant_id: if si.item_variation_key.is_empty() {
                        si.item_variation_id.trim().to_string()
                    } else {
                        si.item_variation_key.trim().to_string()
                    },
                    quantity: si.quantity,
                    price: si.item_price.clone().or_else(|| si.price.clone()),
                    total: si.total_price.clone(),
                    ..OrderLineItem::default()
                })
                .collect();
        }
        self
    }
}

/// An entry of the `subtotal_items` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSubtotalItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub item_variation_id: String,
    #[serde(default)]
    pub item_variation_key: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub item_price: Option<serde_json::Value>,
    #[serde(default)]
    pub price: Option<serde_json::Value>,
    #[serde(default)]
    pub total_price: Option<serde_json::Value>,
}

/// A line item on an order. Price fields vary in shape, so they stay raw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sku: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<serde_json::Value>,
    /// Populated by `--expand products`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_deserializes_with_defaults() {
        let json = r#"{"items":[{"id":"ord_1"}]}"#;
        let page: Page<OrderSummary> = serde_json::from_str(json).expect("deserialize");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_count, 0);
        assert!(!page.has_more);
    }

    #[test]
    fn page_normalize_reads_pagination() {
        let json = r#"{
            "items": [{"id": "p1"}, {"id": "p2"}],
            "pagination": {"current_page": 1, "per_page": 2, "total_count": 7, "total_pages": 4}
        }"#;
        let page: Page<Product> = serde_json::from_str(json).expect("deserialize");
        let page = page.normalize();
        assert_eq!(page.total_count, 7);
        assert!(page.has_more);
    }

    #[test]
    fn page_normalize_last_page_has_no_more() {
        let json = r#"{
            "items": [{"id": "p7"}],
            "pagination": {"current_page": 4, "per_page": 2, "total_count": 7, "total_pages": 4}
        }"#;
        let page: Page<Product> = serde_json::from_str::<Page<Product>>(json)
            .expect("deserialize")
            .normalize();
        assert!(!page.has_more);
    }

    #[test]
    fn order_derives_line_items_from_subtotal_items() {
        let json = r#"{
            "id": "ord_1",
            "customer_id": "cus_1",
            "subtotal_items": [
                {"id": " li_1 ", "item_id": "prod_1", "item_variation_key": "var_a", "quantity": 2},
                {"id": "li_2", "item_id": "prod_2", "item_variation_id": "var_b", "quantity": 1}
            ]
        }"#;
        let order: Order = serde_json::from_str::<Order>(json)
            .expect("deserialize")
            .normalize();
        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].id, "li_1");
        assert_eq!(order.line_items[0].product_id, "prod_1");
        assert_eq!(order.line_items[0].variant_id, "var_a");
        assert_eq!(order.line_items[1].variant_id, "var_b");
    }

    #[test]
    fn product_title_falls_back_to_translations() {
        let mut product = Product {
            id: "p1".into(),
            ..Product::default()
        };
        product
            .title_translations
            .insert("zh-hant".into(), "茶壺".into());
        assert_eq!(product.display_title(), "茶壺");

        product.title_translations.insert("en".into(), "Teapot".into());
        assert_eq!(product.display_title(), "Teapot");
    }

    #[test]
    fn expanded_order_serializes_embedded_records() {
        let order = Order {
            id: "ord_1".into(),
            customer: Some(Customer {
                id: "cus_1".into(),
                ..Customer::default()
            }),
            line_items: vec![OrderLineItem {
                product_id: "prod_1".into(),
                product: Some(Product {
                    id: "prod_1".into(),
                    ..Product::default()
                }),
                ..OrderLineItem::default()
            }],
            ..Order::default()
        };
        let value = serde_json::to_value(&order).expect("serialize");
        assert_eq!(value["customer"]["id"], "cus_1");
        assert_eq!(value["line_items"][0]["product"]["id"], "prod_1");
        assert!(value.get("subtotal_items").is_none());
    }
}
