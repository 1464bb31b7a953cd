//! # estoque-client: Data and Session Layer for Estoque Inteligente
//!
//! Everything the inventory client does that touches the outside world:
//! preference storage, UI providers, the session, the query cache over the
//! REST backend, postal-code lookup and document export.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         AppContext (built once)                         │
//! │                                                                         │
//! │  ┌───────────────┐ ┌───────────────┐ ┌───────────────┐                 │
//! │  │LocaleProvider │ │ ThemeProvider │ │SidebarProvider│                 │
//! │  └───────┬───────┘ └───────┬───────┘ └───────┬───────┘                 │
//! │          └─────────────────┼─────────────────┘                          │
//! │                            ▼                                            │
//! │                   PreferenceStore (port)                                │
//! │                                                                         │
//! │  ┌───────────────┐      ┌──────────────────────────────┐               │
//! │  │SessionProvider│─────►│ Api (AuthBackend)            │               │
//! │  │ + route guard │      │  QueryCache<Value>           │               │
//! │  └───────────────┘      │  JsonTransport (reqwest)     │               │
//! │                         └──────────────────────────────┘               │
//! │                                                                         │
//! │  ┌───────────────┐      ┌──────────────────────────────┐               │
//! │  │ PostalLookup  │─────►│ AddressService (ViaCEP)      │               │
//! │  └───────────────┘      └──────────────────────────────┘               │
//! │                                                                         │
//! │  ┌───────────────┐      ┌──────────────────────────────┐               │
//! │  │ ExportService │─────►│ DocumentExporter / Sink      │               │
//! │  └───────────────┘      └──────────────────────────────┘               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod locale;
pub mod postal;
pub mod query;
pub mod session;
pub mod sidebar;
pub mod storage;
pub mod theme;
pub mod transport;

use std::sync::Arc;

pub use api::{Api, ProductQuery};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, Presentation, StorageError};
pub use export::{DocumentExporter, DownloadSink, ExportError, ExportService, UnavailableExporter};
pub use locale::LocaleProvider;
pub use postal::{AddressService, PostalLookup, PostalLookupError, ViaCepService};
pub use query::{CachedQuery, QueryCache, QueryKey, QueryOptions, QueryStatus, Revalidate};
pub use session::{AuthBackend, SessionProvider, SessionSnapshot};
pub use sidebar::SidebarProvider;
pub use storage::{FileStore, MemoryStore, PreferenceStore};
pub use theme::{Theme, ThemeProvider};
pub use transport::{HttpTransport, JsonTransport};

/// The process-wide client objects, wired from one configuration.
pub struct AppContext {
    pub config: ClientConfig,
    pub locale: LocaleProvider,
    pub theme: ThemeProvider,
    pub sidebar: SidebarProvider,
    pub api: Arc<Api>,
    pub session: SessionProvider,
    pub postal: PostalLookup,
    pub exports: ExportService,
}

impl AppContext {
    /// Builds the context for a real network and the given storage and sink.
    pub fn build(
        config: ClientConfig,
        store: Arc<dyn PreferenceStore>,
        sink: Arc<dyn DownloadSink>,
        viewport_width: u32,
    ) -> ClientResult<Self> {
        let transport: Arc<dyn JsonTransport> = Arc::new(HttpTransport::new(&config.api)?);
        let postal: Arc<dyn AddressService> = Arc::new(ViaCepService::new(&config.postal)?);
        Ok(Self::with_services(config, store, sink, transport, postal, viewport_width))
    }

    /// Builds the context around caller-provided services.
    pub fn with_services(
        config: ClientConfig,
        store: Arc<dyn PreferenceStore>,
        sink: Arc<dyn DownloadSink>,
        transport: Arc<dyn JsonTransport>,
        address_service: Arc<dyn AddressService>,
        viewport_width: u32,
    ) -> Self {
        let api = Arc::new(Api::new(transport, config.cache.query_options()));
        let locale = LocaleProvider::new(Arc::clone(&store));
        locale.activate();

        AppContext {
            theme: ThemeProvider::new(Arc::clone(&store)),
            sidebar: SidebarProvider::with_breakpoint(
                store,
                viewport_width,
                config.ui.mobile_breakpoint_px,
            ),
            session: SessionProvider::new(api.clone()),
            postal: PostalLookup::new(address_service),
            exports: ExportService::with_default_backends(sink),
            locale,
            api,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MemorySink;
    use crate::storage::{LANGUAGE_KEY, SIDEBAR_OPEN_KEY};
    use estoque_core::guard::GuardDecision;
    use estoque_core::Language;

    #[tokio::test]
    async fn test_context_wiring() {
        let store = Arc::new(MemoryStore::with_values([
            (LANGUAGE_KEY, "en"),
            (SIDEBAR_OPEN_KEY, "false"),
        ]));
        let ctx = AppContext::build(
            ClientConfig::default(),
            store,
            Arc::new(MemorySink::new()),
            1280,
        )
        .unwrap();

        assert!(ctx.locale.is_ready());
        assert_eq!(ctx.locale.language(), Language::En);
        assert!(!ctx.sidebar.is_open());
        assert_eq!(ctx.session.guard("/dashboard"), GuardDecision::Loading);
        assert!(ctx.api.cache().is_empty());
    }
}
