//! # Postal-Code Lookup
//!
//! Resolves a Brazilian postal code (CEP) to an address.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lookup("01310-100")                                                    │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  strip non-digits ── ≠ 8 digits ──► InvalidFormat (no request)          │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  GET <base>/01310100/json/                                              │
//! │     ├── {"erro": true} ─────────► NotFound                              │
//! │     ├── network / status error ─► LookupFailed                          │
//! │     └── address fields ─────────► Address                               │
//! │                                                                         │
//! │  Each call takes a request id. When it finishes, state is written only  │
//! │  if no newer call started meanwhile.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use estoque_core::validation::{normalize_postal_code, PostalCode};
use estoque_core::{Address, Language, Message, ValidationError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PostalSettings;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostalLookupError {
    #[error("Invalid postal code: expected 8 digits")]
    InvalidFormat,

    #[error("Postal code {0} not found")]
    NotFound(String),

    #[error("Postal code lookup failed: {0}")]
    LookupFailed(String),
}

impl PostalLookupError {
    /// Translated message for display next to the field.
    pub fn message(&self, language: Language) -> &'static str {
        let key = match self {
            PostalLookupError::InvalidFormat => Message::ErrorPostalInvalid,
            PostalLookupError::NotFound(_) => Message::ErrorPostalNotFound,
            PostalLookupError::LookupFailed(_) => Message::ErrorLookupFailed,
        };
        language.translations().get(key)
    }
}

impl From<PostalLookupError> for ClientError {
    fn from(err: PostalLookupError) -> Self {
        match err {
            PostalLookupError::InvalidFormat => ClientError::Validation(ValidationError::InvalidFormat {
                field: "cep".to_string(),
                reason: "must have 8 digits".to_string(),
            }),
            PostalLookupError::NotFound(code) => ClientError::NotFound(code),
            PostalLookupError::LookupFailed(msg) => ClientError::Transport(msg),
        }
    }
}

/// Remote address directory.
#[async_trait]
pub trait AddressService: Send + Sync {
    async fn fetch(&self, code: &PostalCode) -> Result<Address, PostalLookupError>;
}

// =============================================================================
// ViaCEP
// =============================================================================

/// Response shape of the ViaCEP service.
#[derive(Debug, Default, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    erro: Option<Value>,
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    complemento: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
    #[serde(default)]
    ibge: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Maps a service body onto an [`Address`].
pub(crate) fn parse_via_cep(code: &PostalCode, body: Value) -> Result<Address, PostalLookupError> {
    let response: ViaCepResponse = serde_json::from_value(body)
        .map_err(|e| PostalLookupError::LookupFailed(format!("unexpected response: {e}")))?;

    // Older responses send the flag as the string "true".
    let not_found = match &response.erro {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag == "true",
        _ => false,
    };
    if not_found {
        return Err(PostalLookupError::NotFound(code.to_string()));
    }

    Ok(Address {
        postal_code: code.as_str().to_string(),
        street: response.logradouro.unwrap_or_default(),
        number: None,
        complement: non_empty(response.complemento),
        neighborhood: response.bairro.unwrap_or_default(),
        city: response.localidade.unwrap_or_default(),
        state: response.uf.unwrap_or_default(),
        ibge_code: non_empty(response.ibge),
    })
}

pub struct ViaCepService {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepService {
    pub fn new(settings: &PostalSettings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ClientError::Config(format!("HTTP client: {e}")))?;
        Ok(ViaCepService {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, code: &PostalCode) -> String {
        format!("{}/{}/json/", self.base_url, code.as_str())
    }
}

#[async_trait]
impl AddressService for ViaCepService {
    async fn fetch(&self, code: &PostalCode) -> Result<Address, PostalLookupError> {
        let url = self.url_for(code);
        debug!(%url, "Postal lookup request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PostalLookupError::LookupFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostalLookupError::LookupFailed(format!("HTTP {}", status.as_u16())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PostalLookupError::LookupFailed(e.to_string()))?;
        parse_via_cep(code, body)
    }
}

// =============================================================================
// Lookup State
// =============================================================================

#[derive(Debug, Default)]
struct LookupState {
    latest: u64,
    loading: bool,
    error: Option<PostalLookupError>,
    address: Option<Address>,
}

/// Lookup with the loading flag and last error a form binds to.
pub struct PostalLookup {
    service: Arc<dyn AddressService>,
    state: Mutex<LookupState>,
}

impl PostalLookup {
    pub fn new(service: Arc<dyn AddressService>) -> Self {
        PostalLookup {
            service,
            state: Mutex::new(LookupState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LookupState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up `input`. The caller always gets its own result; shared state
    /// only reflects the most recent call.
    pub async fn lookup(&self, input: &str) -> Result<Address, PostalLookupError> {
        let id = {
            let mut state = self.lock();
            state.latest += 1;
            state.latest
        };

        let code = match normalize_postal_code(input) {
            Ok(code) => code,
            Err(_) => {
                let err = PostalLookupError::InvalidFormat;
                let mut state = self.lock();
                if state.latest == id {
                    state.loading = false;
                    state.address = None;
                    state.error = Some(err.clone());
                }
                return Err(err);
            }
        };

        {
            let mut state = self.lock();
            if state.latest == id {
                state.loading = true;
                state.error = None;
            }
        }

        let result = self.service.fetch(&code).await;

        let mut state = self.lock();
        if state.latest != id {
            debug!(code = %code, "Postal lookup superseded, result not applied");
            return result;
        }

        state.loading = false;
        match &result {
            Ok(address) => {
                state.address = Some(address.clone());
                state.error = None;
            }
            Err(err) => {
                warn!(code = %code, error = %err, "Postal lookup failed");
                state.address = None;
                state.error = Some(err.clone());
            }
        }
        result
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn last_error(&self) -> Option<PostalLookupError> {
        self.lock().error.clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.lock().address.clone()
    }

    /// Clears the error and result, e.g. when the field is emptied.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.latest += 1;
        state.loading = false;
        state.error = None;
        state.address = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeDirectory {
        addresses: HashMap<String, Address>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn with(code: &str, city: &str) -> Self {
            let mut dir = FakeDirectory::default();
            dir.add(code, city);
            dir
        }

        fn add(&mut self, code: &str, city: &str) {
            self.addresses.insert(
                code.to_string(),
                Address {
                    postal_code: code.to_string(),
                    city: city.to_string(),
                    state: "SP".to_string(),
                    ..Default::default()
                },
            );
        }
    }

    #[async_trait]
    impl AddressService for FakeDirectory {
        async fn fetch(&self, code: &PostalCode) -> Result<Address, PostalLookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(code.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            self.addresses
                .get(code.as_str())
                .cloned()
                .ok_or_else(|| PostalLookupError::NotFound(code.to_string()))
        }
    }

    #[test]
    fn test_parse_via_cep_address() {
        let code = normalize_postal_code("01310-100").unwrap();
        let body = json!({
            "cep": "01310-100",
            "logradouro": "Avenida Paulista",
            "complemento": "de 612 a 1510 - lado par",
            "bairro": "Bela Vista",
            "localidade": "São Paulo",
            "uf": "SP",
            "ibge": "3550308"
        });

        let address = parse_via_cep(&code, body).unwrap();
        assert_eq!(address.postal_code, "01310100");
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.neighborhood, "Bela Vista");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.ibge_code.as_deref(), Some("3550308"));
    }

    #[test]
    fn test_parse_via_cep_not_found() {
        let code = normalize_postal_code("99999999").unwrap();
        assert!(matches!(
            parse_via_cep(&code, json!({"erro": true})),
            Err(PostalLookupError::NotFound(_))
        ));
        assert!(matches!(
            parse_via_cep(&code, json!({"erro": "true"})),
            Err(PostalLookupError::NotFound(_))
        ));
        assert!(matches!(
            parse_via_cep(&code, json!([1, 2])),
            Err(PostalLookupError::LookupFailed(_))
        ));
    }

    #[test]
    fn test_service_url() {
        let settings = PostalSettings {
            base_url: "https://viacep.com.br/ws/".to_string(),
            timeout_secs: 5,
        };
        let service = ViaCepService::new(&settings).unwrap();
        let code = normalize_postal_code("01310100").unwrap();
        assert_eq!(service.url_for(&code), "https://viacep.com.br/ws/01310100/json/");
    }

    #[tokio::test]
    async fn test_invalid_input_makes_no_request() {
        let directory = Arc::new(FakeDirectory::default());
        let lookup = PostalLookup::new(directory.clone());

        for input in ["123", "1234-56789", "abc", ""] {
            assert_eq!(lookup.lookup(input).await, Err(PostalLookupError::InvalidFormat));
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
        assert_eq!(lookup.last_error(), Some(PostalLookupError::InvalidFormat));
        assert!(!lookup.is_loading());
    }

    #[tokio::test]
    async fn test_successful_lookup() {
        let directory = Arc::new(FakeDirectory::with("01310100", "São Paulo"));
        let lookup = PostalLookup::new(directory.clone());

        let address = lookup.lookup("01310-100").await.unwrap();
        assert_eq!(address.city, "São Paulo");
        assert_eq!(lookup.address(), Some(address));
        assert_eq!(lookup.last_error(), None);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_found_sets_error() {
        let lookup = PostalLookup::new(Arc::new(FakeDirectory::default()));
        let err = lookup.lookup("00000-000").await.unwrap_err();

        assert!(matches!(err, PostalLookupError::NotFound(_)));
        assert_eq!(err.message(Language::PtBr), "CEP não encontrado");
        assert!(lookup.address().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_response_is_ignored() {
        let mut directory = FakeDirectory::with("11111111", "Campinas");
        directory.add("22222222", "Santos");
        directory
            .delays
            .insert("11111111".to_string(), Duration::from_millis(500));
        directory
            .delays
            .insert("22222222".to_string(), Duration::from_millis(10));
        let lookup = PostalLookup::new(Arc::new(directory));

        let (first, second) = tokio::join!(lookup.lookup("11111-111"), lookup.lookup("22222-222"));

        // Each caller sees its own answer...
        assert_eq!(first.unwrap().city, "Campinas");
        assert_eq!(second.unwrap().city, "Santos");
        // ...but the shared state belongs to the newest request.
        assert_eq!(lookup.address().unwrap().city, "Santos");
        assert!(!lookup.is_loading());
    }

    #[tokio::test]
    async fn test_reset() {
        let lookup = PostalLookup::new(Arc::new(FakeDirectory::default()));
        let _ = lookup.lookup("1").await;
        lookup.reset();
        assert_eq!(lookup.last_error(), None);
    }

    #[test]
    fn test_into_client_error() {
        let err: ClientError = PostalLookupError::InvalidFormat.into();
        assert!(matches!(err, ClientError::Validation(_)));
        let err: ClientError = PostalLookupError::LookupFailed("dns".into()).into();
        assert!(err.is_retryable());
    }
}
