//! # Dashboard Aggregation
//!
//! Computes the dashboard cards from catalog and sales data. Used when the
//! API's `/api/dashboard` endpoint is unavailable and by the reports view.

use chrono::{Datelike, NaiveDate};

use crate::money::Money;
use crate::types::{DashboardMetrics, Product, Sale, StockStatus};

/// Aggregates products and sales into dashboard metrics.
///
/// Inactive products are ignored. "Today" and "this month" are evaluated on
/// the UTC date of each sale.
pub fn compute_metrics(products: &[Product], sales: &[Sale], today: NaiveDate) -> DashboardMetrics {
    let active: Vec<&Product> = products.iter().filter(|p| p.active).collect();

    let mut metrics = DashboardMetrics {
        total_products: active.len() as i64,
        ..Default::default()
    };

    for product in &active {
        match product.stock_status() {
            StockStatus::Out => metrics.out_of_stock_count += 1,
            StockStatus::Low => metrics.low_stock_count += 1,
            StockStatus::InStock => {}
        }
        metrics.inventory_value += product.inventory_value();
    }

    for sale in sales {
        let day = sale.created_at.date_naive();
        if day == today {
            metrics.sales_today += 1;
            metrics.revenue_today += sale.total;
        }
        if day.year() == today.year() && day.month() == today.month() {
            metrics.revenue_month += sale.total;
        }
    }

    metrics
}

/// Products at or below their minimum stock, emptiest first.
pub fn low_stock_products(products: &[Product]) -> Vec<&Product> {
    let mut low: Vec<&Product> = products
        .iter()
        .filter(|p| p.active && p.is_low_stock())
        .collect();
    low.sort_by(|a, b| {
        (a.stock - a.min_stock)
            .cmp(&(b.stock - b.min_stock))
            .then_with(|| a.name.cmp(&b.name))
    });
    low
}

/// Total value of the given products' stock.
pub fn inventory_value(products: &[Product]) -> Money {
    products.iter().map(Product::inventory_value).sum()
}
