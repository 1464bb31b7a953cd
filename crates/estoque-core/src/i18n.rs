//! # Internationalization
//!
//! Supported languages and the translation tables for UI strings.
//!
//! ## Language Catalog
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Code    │ Name        │ Currency style    │ Date style                │
//! │  ─────── │ ─────────── │ ───────────────── │ ──────────────────────    │
//! │  pt-BR   │ Português   │ R$ 1.234,56       │ 31/12/2024  (baseline)    │
//! │  en      │ English     │ R$1,234.56        │ 12/31/2024                │
//! │  es      │ Español     │ R$ 1.234,56       │ 31/12/2024                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Translations are keyed by the [`Message`] enum, so a missing entry is a
//! compile error instead of a blank label. [`Translations::lookup`] offers
//! the dotted string keys used by the web front end.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Language
// =============================================================================

/// A supported UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Language {
    /// Brazilian Portuguese, the baseline language.
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en")]
    En,
    #[serde(rename = "es")]
    Es,
}

impl Language {
    /// Every supported language, baseline first.
    pub const ALL: [Language; 3] = [Language::PtBr, Language::En, Language::Es];

    /// Persisted / wire code.
    pub const fn code(&self) -> &'static str {
        match self {
            Language::PtBr => "pt-BR",
            Language::En => "en",
            Language::Es => "es",
        }
    }

    /// Name of the language written in that language.
    pub const fn native_name(&self) -> &'static str {
        match self {
            Language::PtBr => "Português",
            Language::En => "English",
            Language::Es => "Español",
        }
    }

    /// Parses a code from the supported set.
    ///
    /// Matching ignores ASCII case so `"PT-br"` written by an older client
    /// still resolves.
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// Translation table for this language.
    pub const fn translations(&self) -> Translations {
        Translations { language: *self }
    }

    /// Thousands and decimal separators used for numbers.
    pub(crate) const fn separators(&self) -> (char, char) {
        match self {
            Language::En => (',', '.'),
            Language::PtBr | Language::Es => ('.', ','),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| ValidationError::NotAllowed {
            field: "language".to_string(),
            allowed: Language::ALL.iter().map(|l| l.code().to_string()).collect(),
        })
    }
}

/// Entry of the language picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOption {
    pub code: String,
    pub name: String,
}

/// The supported-language catalog shown in the language picker.
pub fn language_catalog() -> Vec<LanguageOption> {
    Language::ALL
        .iter()
        .map(|lang| LanguageOption {
            code: lang.code().to_string(),
            name: lang.native_name().to_string(),
        })
        .collect()
}

// =============================================================================
// Messages
// =============================================================================

/// Every translatable UI string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    AppName,
    NavDashboard,
    NavProducts,
    NavCategories,
    NavSuppliers,
    NavSales,
    NavReports,
    NavSettings,
    NavUsers,
    NavCompany,
    AuthLogin,
    AuthLogout,
    AuthRegister,
    OnboardingTitle,
    CommonLoading,
    CommonRetry,
    StockInStock,
    StockLow,
    StockOut,
    DashboardTotalProducts,
    DashboardLowStock,
    DashboardOutOfStock,
    DashboardInventoryValue,
    DashboardSalesToday,
    DashboardRevenueToday,
    DashboardRevenueMonth,
    ExportSpreadsheet,
    ExportPdf,
    ErrorPostalInvalid,
    ErrorPostalNotFound,
    ErrorLookupFailed,
    ErrorExportUnavailable,
    ThemeLight,
    ThemeDark,
}

impl Message {
    /// All messages, in declaration order.
    pub const ALL: [Message; 34] = [
        Message::AppName,
        Message::NavDashboard,
        Message::NavProducts,
        Message::NavCategories,
        Message::NavSuppliers,
        Message::NavSales,
        Message::NavReports,
        Message::NavSettings,
        Message::NavUsers,
        Message::NavCompany,
        Message::AuthLogin,
        Message::AuthLogout,
        Message::AuthRegister,
        Message::OnboardingTitle,
        Message::CommonLoading,
        Message::CommonRetry,
        Message::StockInStock,
        Message::StockLow,
        Message::StockOut,
        Message::DashboardTotalProducts,
        Message::DashboardLowStock,
        Message::DashboardOutOfStock,
        Message::DashboardInventoryValue,
        Message::DashboardSalesToday,
        Message::DashboardRevenueToday,
        Message::DashboardRevenueMonth,
        Message::ExportSpreadsheet,
        Message::ExportPdf,
        Message::ErrorPostalInvalid,
        Message::ErrorPostalNotFound,
        Message::ErrorLookupFailed,
        Message::ErrorExportUnavailable,
        Message::ThemeLight,
        Message::ThemeDark,
    ];

    /// Dotted key used by the web front end (`t("nav.dashboard")`).
    pub const fn key(&self) -> &'static str {
        match self {
            Message::AppName => "app.name",
            Message::NavDashboard => "nav.dashboard",
            Message::NavProducts => "nav.products",
            Message::NavCategories => "nav.categories",
            Message::NavSuppliers => "nav.suppliers",
            Message::NavSales => "nav.sales",
            Message::NavReports => "nav.reports",
            Message::NavSettings => "nav.settings",
            Message::NavUsers => "nav.users",
            Message::NavCompany => "nav.company",
            Message::AuthLogin => "auth.login",
            Message::AuthLogout => "auth.logout",
            Message::AuthRegister => "auth.register",
            Message::OnboardingTitle => "onboarding.title",
            Message::CommonLoading => "common.loading",
            Message::CommonRetry => "common.retry",
            Message::StockInStock => "stock.inStock",
            Message::StockLow => "stock.low",
            Message::StockOut => "stock.out",
            Message::DashboardTotalProducts => "dashboard.totalProducts",
            Message::DashboardLowStock => "dashboard.lowStock",
            Message::DashboardOutOfStock => "dashboard.outOfStock",
            Message::DashboardInventoryValue => "dashboard.inventoryValue",
            Message::DashboardSalesToday => "dashboard.salesToday",
            Message::DashboardRevenueToday => "dashboard.revenueToday",
            Message::DashboardRevenueMonth => "dashboard.revenueMonth",
            Message::ExportSpreadsheet => "export.spreadsheet",
            Message::ExportPdf => "export.pdf",
            Message::ErrorPostalInvalid => "errors.postalInvalid",
            Message::ErrorPostalNotFound => "errors.postalNotFound",
            Message::ErrorLookupFailed => "errors.lookupFailed",
            Message::ErrorExportUnavailable => "errors.exportUnavailable",
            Message::ThemeLight => "theme.light",
            Message::ThemeDark => "theme.dark",
        }
    }
}

// =============================================================================
// Translations
// =============================================================================

/// The active translation table for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translations {
    language: Language,
}

impl Translations {
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Translates a message.
    pub const fn get(&self, message: Message) -> &'static str {
        match self.language {
            Language::PtBr => pt_br(message),
            Language::En => en(message),
            Language::Es => es(message),
        }
    }

    /// Translates a dotted front-end key, `None` for unknown keys.
    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        Message::ALL
            .iter()
            .find(|m| m.key() == key)
            .map(|m| self.get(*m))
    }
}

const fn pt_br(message: Message) -> &'static str {
    match message {
        Message::AppName => "Estoque Inteligente",
        Message::NavDashboard => "Painel",
        Message::NavProducts => "Produtos",
        Message::NavCategories => "Categorias",
        Message::NavSuppliers => "Fornecedores",
        Message::NavSales => "Vendas",
        Message::NavReports => "Relatórios",
        Message::NavSettings => "Configurações",
        Message::NavUsers => "Usuários",
        Message::NavCompany => "Empresa",
        Message::AuthLogin => "Entrar",
        Message::AuthLogout => "Sair",
        Message::AuthRegister => "Criar conta",
        Message::OnboardingTitle => "Configure sua empresa",
        Message::CommonLoading => "Carregando...",
        Message::CommonRetry => "Tentar novamente",
        Message::StockInStock => "Em estoque",
        Message::StockLow => "Estoque baixo",
        Message::StockOut => "Sem estoque",
        Message::DashboardTotalProducts => "Total de produtos",
        Message::DashboardLowStock => "Produtos com estoque baixo",
        Message::DashboardOutOfStock => "Produtos sem estoque",
        Message::DashboardInventoryValue => "Valor do estoque",
        Message::DashboardSalesToday => "Vendas hoje",
        Message::DashboardRevenueToday => "Faturamento hoje",
        Message::DashboardRevenueMonth => "Faturamento do mês",
        Message::ExportSpreadsheet => "Exportar Excel",
        Message::ExportPdf => "Exportar PDF",
        Message::ErrorPostalInvalid => "CEP inválido",
        Message::ErrorPostalNotFound => "CEP não encontrado",
        Message::ErrorLookupFailed => "Erro ao buscar CEP",
        Message::ErrorExportUnavailable => "Exportação indisponível neste ambiente",
        Message::ThemeLight => "Claro",
        Message::ThemeDark => "Escuro",
    }
}

const fn en(message: Message) -> &'static str {
    match message {
        Message::AppName => "Estoque Inteligente",
        Message::NavDashboard => "Dashboard",
        Message::NavProducts => "Products",
        Message::NavCategories => "Categories",
        Message::NavSuppliers => "Suppliers",
        Message::NavSales => "Sales",
        Message::NavReports => "Reports",
        Message::NavSettings => "Settings",
        Message::NavUsers => "Users",
        Message::NavCompany => "Company",
        Message::AuthLogin => "Sign in",
        Message::AuthLogout => "Sign out",
        Message::AuthRegister => "Create account",
        Message::OnboardingTitle => "Set up your company",
        Message::CommonLoading => "Loading...",
        Message::CommonRetry => "Try again",
        Message::StockInStock => "In stock",
        Message::StockLow => "Low stock",
        Message::StockOut => "Out of stock",
        Message::DashboardTotalProducts => "Total products",
        Message::DashboardLowStock => "Low stock products",
        Message::DashboardOutOfStock => "Out of stock products",
        Message::DashboardInventoryValue => "Inventory value",
        Message::DashboardSalesToday => "Sales today",
        Message::DashboardRevenueToday => "Revenue today",
        Message::DashboardRevenueMonth => "Revenue this month",
        Message::ExportSpreadsheet => "Export Excel",
        Message::ExportPdf => "Export PDF",
        Message::ErrorPostalInvalid => "Invalid postal code",
        Message::ErrorPostalNotFound => "Postal code not found",
        Message::ErrorLookupFailed => "Could not look up postal code",
        Message::ErrorExportUnavailable => "Export is not available in this environment",
        Message::ThemeLight => "Light",
        Message::ThemeDark => "Dark",
    }
}

const fn es(message: Message) -> &'static str {
    match message {
        Message::AppName => "Estoque Inteligente",
        Message::NavDashboard => "Panel",
        Message::NavProducts => "Productos",
        Message::NavCategories => "Categorías",
        Message::NavSuppliers => "Proveedores",
        Message::NavSales => "Ventas",
        Message::NavReports => "Informes",
        Message::NavSettings => "Configuración",
        Message::NavUsers => "Usuarios",
        Message::NavCompany => "Empresa",
        Message::AuthLogin => "Iniciar sesión",
        Message::AuthLogout => "Cerrar sesión",
        Message::AuthRegister => "Crear cuenta",
        Message::OnboardingTitle => "Configure su empresa",
        Message::CommonLoading => "Cargando...",
        Message::CommonRetry => "Reintentar",
        Message::StockInStock => "En stock",
        Message::StockLow => "Stock bajo",
        Message::StockOut => "Sin stock",
        Message::DashboardTotalProducts => "Total de productos",
        Message::DashboardLowStock => "Productos con stock bajo",
        Message::DashboardOutOfStock => "Productos sin stock",
        Message::DashboardInventoryValue => "Valor del inventario",
        Message::DashboardSalesToday => "Ventas hoy",
        Message::DashboardRevenueToday => "Ingresos hoy",
        Message::DashboardRevenueMonth => "Ingresos del mes",
        Message::ExportSpreadsheet => "Exportar Excel",
        Message::ExportPdf => "Exportar PDF",
        Message::ErrorPostalInvalid => "Código postal inválido",
        Message::ErrorPostalNotFound => "Código postal no encontrado",
        Message::ErrorLookupFailed => "Error al buscar el código postal",
        Message::ErrorExportUnavailable => "Exportación no disponible en este entorno",
        Message::ThemeLight => "Claro",
        Message::ThemeDark => "Oscuro",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("pt-BR"), Some(Language::PtBr));
        assert_eq!(Language::from_code("pt-br"), Some(Language::PtBr));
        assert_eq!(Language::from_code(" en "), Some(Language::En));
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::from_code(""), None);
    }

    #[test]
    fn test_parse_unsupported_lists_allowed() {
        let err = "fr".parse::<Language>().unwrap_err();
        assert!(matches!(err, ValidationError::NotAllowed { ref allowed, .. } if allowed.len() == 3));
    }

    #[test]
    fn test_baseline_is_portuguese() {
        assert_eq!(Language::default(), Language::PtBr);
        assert_eq!(Language::ALL[0], Language::PtBr);
    }

    #[test]
    fn test_keys_are_unique() {
        let keys: HashSet<_> = Message::ALL.iter().map(|m| m.key()).collect();
        assert_eq!(keys.len(), Message::ALL.len());
    }

    #[test]
    fn test_every_language_translates_every_message() {
        for lang in Language::ALL {
            let table = lang.translations();
            for message in Message::ALL {
                assert!(!table.get(message).is_empty(), "{lang} missing {message:?}");
            }
        }
    }

    #[test]
    fn test_lookup_by_key() {
        let table = Language::En.translations();
        assert_eq!(table.lookup("nav.products"), Some("Products"));
        assert_eq!(table.lookup("nav.unknown"), None);
        assert_eq!(
            Language::PtBr.translations().lookup("stock.low"),
            Some("Estoque baixo")
        );
    }

    #[test]
    fn test_catalog() {
        let catalog = language_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].code, "pt-BR");
        assert_eq!(catalog[2].name, "Español");
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Language::PtBr).unwrap(), "\"pt-BR\"");
        let lang: Language = serde_json::from_str("\"es\"").unwrap();
        assert_eq!(lang, Language::Es);
    }
}
