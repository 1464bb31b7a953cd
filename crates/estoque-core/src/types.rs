//! # Domain Types
//!
//! Shapes exchanged with the REST API and rendered by the front end.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │──►│    Category     │   │    Supplier     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  sku, name      │   │  name           │   │  name, cnpj     │       │
//! │  │  price, cost    │   └─────────────────┘   │  contact        │       │
//! │  │  stock          │──────────────────────►  └─────────────────┘       │
//! │  │  min_stock      │                                                    │
//! │  └────────┬────────┘                                                    │
//! │           │ stock <= min_stock ?                                        │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockStatus    │   │      Sale       │   │    Session      │       │
//! │  │  InStock / Low  │   │  items, total   │   │  user, admin,   │       │
//! │  │  / Out          │   │  payment method │   │  onboarding     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! JSON field names are camelCase to match the API; money travels as
//! decimal reais and is converted with [`crate::money::as_decimal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Stock Status
// =============================================================================

/// Stock level classification shown as a badge next to each product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    /// At or below the product's minimum stock.
    Low,
    /// Nothing left to sell.
    Out,
}

impl StockStatus {
    /// Classifies a stock level against its minimum.
    ///
    /// ```rust
    /// use estoque_core::types::StockStatus;
    ///
    /// assert_eq!(StockStatus::classify(10, 5), StockStatus::InStock);
    /// assert_eq!(StockStatus::classify(5, 5), StockStatus::Low);
    /// assert_eq!(StockStatus::classify(0, 5), StockStatus::Out);
    /// ```
    pub const fn classify(stock: i64, min_stock: i64) -> StockStatus {
        if stock <= 0 {
            StockStatus::Out
        } else if stock <= min_stock {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Sale price.
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub price: Money,

    /// Purchase cost, when known.
    #[serde(default, with = "optional_decimal")]
    #[ts(type = "number | null")]
    pub cost: Option<Money>,

    /// Units currently in stock.
    pub stock: i64,

    /// Threshold at or below which the product is flagged as low stock.
    pub min_stock: i64,

    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<String>,

    /// Display unit (`un`, `kg`, `cx`).
    #[serde(default = "default_unit")]
    pub unit: String,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_unit() -> String {
    "un".to_string()
}

fn default_true() -> bool {
    true
}

impl Product {
    /// `stock <= min_stock`, the rule behind the low-stock alerts.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    #[inline]
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::classify(self.stock, self.min_stock)
    }

    /// Value of the units on hand at sale price (negative stock counts as zero).
    pub fn inventory_value(&self) -> Money {
        self.price.multiply_quantity(self.stock.max(0))
    }

    /// Whether `quantity` units can be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.active && self.stock >= quantity
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    /// CNPJ / tax document, digits only.
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// The account's company, filled during onboarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

/// A postal address, as resolved by the CEP lookup or typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// 8 digits, no separator.
    pub postal_code: String,
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    /// Two-letter state (UF).
    pub state: String,
    #[serde(default)]
    pub ibge_code: Option<String>,
}

// =============================================================================
// Sales
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Pix,
    DebitCard,
    CreditCard,
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub items: Vec<SaleItem>,
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub total: Money,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of a sale, with the unit price frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: i64,
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub unit_price: Money,
}

impl SaleItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

impl Sale {
    /// Sum of the line totals.
    pub fn items_total(&self) -> Money {
        self.items.iter().map(SaleItem::line_total).sum()
    }
}

/// Request body for recording a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub items: Vec<NewSaleItem>,
    pub customer_name: Option<String>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
}

// =============================================================================
// Dashboard
// =============================================================================

/// Aggregate numbers shown on the dashboard cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_products: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub inventory_value: Money,
    pub sales_today: i64,
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub revenue_today: Money,
    #[serde(with = "crate::money::as_decimal")]
    #[ts(type = "number")]
    pub revenue_month: Money,
}

// =============================================================================
// Session
// =============================================================================

/// The authenticated user as seen by the route guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Tenant the user belongs to; absent until onboarding creates it.
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub onboarding_complete: bool,
}

/// Login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

mod optional_decimal {
    use crate::money::Money;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(money: &Option<Money>, serializer: S) -> Result<S::Ok, S::Error> {
        match money {
            Some(m) => serializer.serialize_some(&m.to_decimal()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Money>, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.map(Money::from_decimal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Café 500g".to_string(),
            sku: "CAF-500".to_string(),
            description: None,
            price: Money::from_cents(1890),
            cost: None,
            stock,
            min_stock,
            category_id: None,
            supplier_id: None,
            unit: "un".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(4, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }

    #[test]
    fn test_stock_status() {
        assert_eq!(product(0, 5).stock_status(), StockStatus::Out);
        assert_eq!(product(-2, 5).stock_status(), StockStatus::Out);
        assert_eq!(product(3, 5).stock_status(), StockStatus::Low);
        assert_eq!(product(30, 5).stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_inventory_value() {
        assert_eq!(product(10, 2).inventory_value().cents(), 18900);
        assert_eq!(product(-3, 2).inventory_value(), Money::zero());
    }

    #[test]
    fn test_product_from_api_json() {
        let json = r#"{
            "id": "p9",
            "name": "Arroz 5kg",
            "sku": "ARR-5",
            "price": 27.9,
            "cost": 21.45,
            "stock": 12,
            "minStock": 10,
            "categoryId": "c1"
        }"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.price.cents(), 2790);
        assert_eq!(p.cost, Some(Money::from_cents(2145)));
        assert_eq!(p.unit, "un");
        assert!(p.active);
        assert_eq!(p.stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_sale_totals() {
        let sale = Sale {
            id: "s1".to_string(),
            items: vec![
                SaleItem {
                    product_id: "p1".to_string(),
                    product_name: None,
                    quantity: 2,
                    unit_price: Money::from_cents(1000),
                },
                SaleItem {
                    product_id: "p2".to_string(),
                    product_name: None,
                    quantity: 1,
                    unit_price: Money::from_cents(250),
                },
            ],
            total: Money::from_cents(2250),
            customer_name: None,
            payment_method: PaymentMethod::Pix,
            created_at: Utc::now(),
        };
        assert_eq!(sale.items_total(), sale.total);
    }

    #[test]
    fn test_session_defaults() {
        let s: Session =
            serde_json::from_str(r#"{"userId":"u1","name":"Ana","email":"ana@loja.com"}"#).unwrap();
        assert!(!s.is_admin);
        assert!(!s.onboarding_complete);
        assert_eq!(s.company_id, None);
    }
}
