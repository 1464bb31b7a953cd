//! # REST API
//!
//! Typed access to the `/api/*` backend. Reads go through the query cache;
//! writes invalidate the keys they affect.
//!
//! ## Invalidation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Mutation                     │ Dirty keys (prefix)                     │
//! │  ──────────────────────────── │ ─────────────────────────────────────── │
//! │  create/update/delete_product │ /api/products   /api/dashboard          │
//! │  create_category              │ /api/categories                         │
//! │  create_supplier              │ /api/suppliers                          │
//! │  create_sale                  │ /api/sales  /api/products  /api/dashboard│
//! │  update_company               │ /api/company                            │
//! │  complete_onboarding          │ /api/company    /api/dashboard          │
//! │  logout                       │ everything (cache cleared)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use estoque_core::validation::{validate_new_sale, validate_product};
use estoque_core::{
    Category, Company, Credentials, DashboardMetrics, NewSale, Product, RegisterRequest, Sale,
    Session, Supplier,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::query::{CachedQuery, QueryCache, QueryKey, QueryOptions};
use crate::session::AuthBackend;
use crate::transport::JsonTransport;

pub const DASHBOARD_PATH: &str = "/api/dashboard";
pub const COMPANY_PATH: &str = "/api/company";
pub const PRODUCTS_PATH: &str = "/api/products";
pub const CATEGORIES_PATH: &str = "/api/categories";
pub const SUPPLIERS_PATH: &str = "/api/suppliers";
pub const SALES_PATH: &str = "/api/sales";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ME_PATH: &str = "/api/auth/me";
pub const ONBOARDING_PATH: &str = "/api/onboarding/complete";

/// Filters for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category_id: Option<String>,
    pub low_stock_only: bool,
}

impl ProductQuery {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search".to_string(), search.to_string()));
        }
        if let Some(category) = &self.category_id {
            params.push(("categoryId".to_string(), category.clone()));
        }
        if self.low_stock_only {
            params.push(("lowStock".to_string(), "true".to_string()));
        }
        params
    }
}

/// Body of login / register responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    user: Session,
}

/// Client for the REST backend.
pub struct Api {
    transport: Arc<dyn JsonTransport>,
    cache: QueryCache<Value>,
    options: QueryOptions,
}

impl Api {
    pub fn new(transport: Arc<dyn JsonTransport>, options: QueryOptions) -> Self {
        Api {
            transport,
            cache: QueryCache::new(),
            options,
        }
    }

    /// The cache behind typed reads, for consumers that want status and
    /// staleness rather than just data.
    pub fn cache(&self) -> &QueryCache<Value> {
        &self.cache
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Raw cached entry for `path` with `params`.
    pub async fn query(&self, path: &str, params: Vec<(String, String)>) -> CachedQuery<Value> {
        let key = QueryKey::with_params(path, params.iter().map(|(k, v)| (k.clone(), v.clone())));
        let transport = Arc::clone(&self.transport);
        let path = path.to_string();
        self.cache
            .get(&key, &self.options, move || async move {
                transport.get(&path, &params).await
            })
            .await
    }

    async fn read<T: DeserializeOwned>(&self, path: &str, params: Vec<(String, String)>) -> ClientResult<T> {
        let value = self.query(path, params).await.into_result()?;
        Ok(serde_json::from_value(Value::clone(&value))?)
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardMetrics> {
        self.read(DASHBOARD_PATH, Vec::new()).await
    }

    pub async fn company(&self) -> ClientResult<Company> {
        self.read(COMPANY_PATH, Vec::new()).await
    }

    pub async fn products(&self, query: &ProductQuery) -> ClientResult<Vec<Product>> {
        self.read(PRODUCTS_PATH, query.params()).await
    }

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        self.read(CATEGORIES_PATH, Vec::new()).await
    }

    pub async fn suppliers(&self) -> ClientResult<Vec<Supplier>> {
        self.read(SUPPLIERS_PATH, Vec::new()).await
    }

    pub async fn sales(&self) -> ClientResult<Vec<Sale>> {
        self.read(SALES_PATH, Vec::new()).await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn invalidate(&self, prefixes: &[&str]) {
        for prefix in prefixes {
            self.cache.invalidate_prefix(prefix);
        }
    }

    pub async fn create_product(&self, product: &Product) -> ClientResult<Product> {
        validate_product(product)?;
        let created = self
            .transport
            .post(PRODUCTS_PATH, &serde_json::to_value(product)?)
            .await?;
        self.invalidate(&[PRODUCTS_PATH, DASHBOARD_PATH]);
        info!(sku = %product.sku, "Product created");
        Ok(serde_json::from_value(created)?)
    }

    pub async fn update_product(&self, product: &Product) -> ClientResult<Product> {
        validate_product(product)?;
        let path = format!("{PRODUCTS_PATH}/{}", product.id);
        let updated = self
            .transport
            .put(&path, &serde_json::to_value(product)?)
            .await?;
        self.invalidate(&[PRODUCTS_PATH, DASHBOARD_PATH]);
        Ok(serde_json::from_value(updated)?)
    }

    pub async fn delete_product(&self, id: &str) -> ClientResult<()> {
        self.transport.delete(&format!("{PRODUCTS_PATH}/{id}")).await?;
        self.invalidate(&[PRODUCTS_PATH, DASHBOARD_PATH]);
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    pub async fn create_category(&self, category: &Category) -> ClientResult<Category> {
        if category.name.trim().is_empty() {
            return Err(estoque_core::ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        let created = self
            .transport
            .post(CATEGORIES_PATH, &serde_json::to_value(category)?)
            .await?;
        self.invalidate(&[CATEGORIES_PATH]);
        Ok(serde_json::from_value(created)?)
    }

    pub async fn create_supplier(&self, supplier: &Supplier) -> ClientResult<Supplier> {
        if supplier.name.trim().is_empty() {
            return Err(estoque_core::ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        let created = self
            .transport
            .post(SUPPLIERS_PATH, &serde_json::to_value(supplier)?)
            .await?;
        self.invalidate(&[SUPPLIERS_PATH]);
        Ok(serde_json::from_value(created)?)
    }

    /// Records a sale after checking it against the current product list.
    /// The list is refetched first; cached stock levels are never trusted here.
    pub async fn create_sale(&self, sale: &NewSale) -> ClientResult<Sale> {
        self.cache.invalidate_prefix(PRODUCTS_PATH);
        let products = self.products(&ProductQuery::default()).await?;
        validate_new_sale(sale, &products)?;

        let created = self
            .transport
            .post(SALES_PATH, &serde_json::to_value(sale)?)
            .await?;
        self.invalidate(&[SALES_PATH, PRODUCTS_PATH, DASHBOARD_PATH]);

        let sale: Sale = serde_json::from_value(created)?;
        info!(sale_id = %sale.id, total = %sale.total, "Sale recorded");
        Ok(sale)
    }

    pub async fn update_company(&self, company: &Company) -> ClientResult<Company> {
        let updated = self
            .transport
            .put(COMPANY_PATH, &serde_json::to_value(company)?)
            .await?;
        self.invalidate(&[COMPANY_PATH]);
        Ok(serde_json::from_value(updated)?)
    }

    async fn authenticate(&self, path: &str, body: Value) -> ClientResult<Session> {
        let response: AuthResponse = serde_json::from_value(self.transport.post(path, &body).await?)?;
        self.transport.set_token(response.token);
        Ok(response.user)
    }
}

#[async_trait]
impl AuthBackend for Api {
    async fn login(&self, credentials: &Credentials) -> ClientResult<Session> {
        self.authenticate(LOGIN_PATH, serde_json::to_value(credentials)?).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<Session> {
        self.authenticate(REGISTER_PATH, serde_json::to_value(request)?).await
    }

    /// Drops the token and every cached response, whatever the backend says.
    async fn logout(&self) -> ClientResult<()> {
        let result = self.transport.post(LOGOUT_PATH, &Value::Null).await;
        self.transport.set_token(None);
        self.cache.clear();
        result.map(|_| ())
    }

    async fn current_session(&self) -> ClientResult<Option<Session>> {
        let value = match self.transport.get(ME_PATH, &[]).await {
            Ok(value) => value,
            Err(ClientError::Unauthorized) => return Ok(None),
            Err(e) => return Err(e),
        };
        if value.is_null() {
            return Ok(None);
        }

        // Accept both `{"user": {..}}` and a bare session object.
        let session = match value {
            Value::Object(mut map) if map.contains_key("user") => {
                serde_json::from_value(map.remove("user").unwrap_or(Value::Null))?
            }
            other => serde_json::from_value(other)?,
        };
        debug!("Session resolved from backend");
        Ok(Some(session))
    }

    async fn complete_onboarding(&self, company: &Company) -> ClientResult<Session> {
        let value = self
            .transport
            .post(ONBOARDING_PATH, &serde_json::to_value(company)?)
            .await?;
        self.invalidate(&[COMPANY_PATH, DASHBOARD_PATH]);

        let session = match value {
            Value::Object(mut map) if map.contains_key("user") => {
                serde_json::from_value(map.remove("user").unwrap_or(Value::Null))?
            }
            other => serde_json::from_value(other)?,
        };
        Ok(session)
    }
}
