//! # estoque-core: Pure Business Logic for Estoque Inteligente
//!
//! Every decision the inventory client makes without talking to the outside
//! world: domain types, money, display formatting, validation, the route
//! guard, translations and the export table model.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Estoque Inteligente Client                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front end / CLI                              │   │
//! │  │    Dashboard ──► Products ──► Sales ──► Reports / Export        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    estoque-client                               │   │
//! │  │   providers • query cache • HTTP • CEP lookup • exporters       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ estoque-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │  guard  │ │  i18n   │ │ export  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌────────────┐ ┌───────────┐                     │   │
//! │  │   │ format  │ │ validation │ │ dashboard │                     │   │
//! │  │   └─────────┘ └────────────┘ └───────────┘                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO STORAGE • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use estoque_core::guard::{evaluate, GuardDecision, GuardInput};
//! use estoque_core::money::Money;
//! use estoque_core::i18n::Language;
//!
//! assert_eq!(Money::from_cents(1099).format(Language::PtBr), "R$ 10,99");
//!
//! let decision = evaluate(&GuardInput::loading(), "/products");
//! assert_eq!(decision, GuardDecision::Loading);
//! ```

pub mod dashboard;
pub mod error;
pub mod export;
pub mod format;
pub mod guard;
pub mod i18n;
pub mod money;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use i18n::{Language, Message, Translations};
pub use money::Money;
pub use types::*;

/// Viewport width (px) below which the sidebar is forced closed.
pub const MOBILE_BREAKPOINT_PX: u32 = 768;
