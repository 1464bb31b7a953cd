//! # Validation Module
//!
//! Input validation that runs before anything reaches the network.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (front end)                                             │
//! │  └── Immediate feedback while typing                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Postal code normalization (8 digits, no request otherwise)        │
//! │  ├── Credentials / registration                                        │
//! │  └── Product and sale rules (stock availability)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: REST API                                                     │
//! │  └── Uniqueness, ownership, persistence                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Credentials, NewSale, Product, RegisterRequest};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Number of digits in a Brazilian postal code (CEP).
pub const POSTAL_CODE_DIGITS: usize = 8;

/// Minimum password length accepted by the registration form.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// Postal Code
// =============================================================================

/// A validated postal code: exactly 8 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    /// The 8 digits, no separator.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::format::format_postal_code(&self.0))
    }
}

/// Normalizes free-form input into a postal code.
///
/// ## Rules
/// - Every non-digit character is stripped (`"01310-100"`, `" 01310 100 "`)
/// - Exactly 8 digits must remain
///
/// ```rust
/// use estoque_core::validation::normalize_postal_code;
///
/// assert_eq!(normalize_postal_code("01310-100").unwrap().as_str(), "01310100");
/// assert!(normalize_postal_code("1234-567").is_err());
/// assert!(normalize_postal_code("123456789").is_err());
/// ```
pub fn normalize_postal_code(input: &str) -> ValidationResult<PostalCode> {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    if digits.len() != POSTAL_CODE_DIGITS {
        return Err(ValidationError::InvalidFormat {
            field: "cep".to_string(),
            reason: format!(
                "must contain exactly {POSTAL_CODE_DIGITS} digits, got {}",
                digits.len()
            ),
        });
    }

    Ok(PostalCode(digits))
}

// =============================================================================
// Auth Forms
// =============================================================================

fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.com".to_string(),
        });
    }

    Ok(())
}

/// Validates the login form.
pub fn validate_credentials(credentials: &Credentials) -> ValidationResult<()> {
    validate_email(&credentials.email)?;
    if credentials.password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    Ok(())
}

/// Validates the registration form.
pub fn validate_registration(request: &RegisterRequest) -> ValidationResult<()> {
    if request.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    validate_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// Validates a product before it is sent to the API.
///
/// ## Rules
/// - name: 1-200 characters
/// - sku: 1-50 characters of letters, digits, `-` or `_`
/// - price, stock and minimum stock must not be negative
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    let name = product.name.trim();
    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    let sku = product.sku.trim();
    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }
    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    if product.price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    for (field, value) in [("stock", product.stock), ("minStock", product.min_stock)] {
        if value < 0 {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: i64::MAX,
            });
        }
    }

    Ok(())
}

/// Checks a sale against the products it sells.
///
/// Quantities of repeated lines are added up before comparing with stock.
pub fn validate_new_sale(sale: &NewSale, products: &[Product]) -> CoreResult<()> {
    if sale.items.is_empty() {
        return Err(CoreError::EmptySale);
    }

    let mut requested: HashMap<&str, i64> = HashMap::new();
    for item in &sale.items {
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        *requested.entry(item.product_id.as_str()).or_default() += item.quantity;
    }

    for (product_id, quantity) in requested {
        let product = products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "productId".to_string(),
                allowed: products.iter().map(|p| p.id.clone()).collect(),
            })?;

        if !product.can_sell(quantity) {
            return Err(CoreError::InsufficientStock {
                sku: product.sku.clone(),
                available: product.stock,
                requested: quantity,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{NewSaleItem, PaymentMethod};

    fn product(id: &str, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: "Feijão 1kg".to_string(),
            sku: format!("FEI-{id}"),
            description: None,
            price: Money::from_cents(899),
            cost: None,
            stock,
            min_stock: 2,
            category_id: None,
            supplier_id: None,
            unit: "un".to_string(),
            active: true,
        }
    }

    #[test]
    fn test_postal_code_strips_non_digits() {
        assert_eq!(normalize_postal_code("01310-100").unwrap().as_str(), "01310100");
        assert_eq!(normalize_postal_code("CEP: 01.310 100").unwrap().as_str(), "01310100");
        assert_eq!(normalize_postal_code("01310100").unwrap().to_string(), "01310-100");
    }

    #[test]
    fn test_postal_code_wrong_length() {
        for input in ["", "abc", "1234567", "123456789", "0131-01"] {
            let err = normalize_postal_code(input).unwrap_err();
            assert!(matches!(err, ValidationError::InvalidFormat { .. }), "{input}");
        }
    }

    #[test]
    fn test_credentials() {
        let ok = Credentials {
            email: "ana@loja.com".to_string(),
            password: "x".to_string(),
        };
        assert!(validate_credentials(&ok).is_ok());

        let bad_email = Credentials {
            email: "ana.loja.com".to_string(),
            ..ok.clone()
        };
        assert!(matches!(
            validate_credentials(&bad_email),
            Err(ValidationError::InvalidFormat { .. })
        ));

        let no_password = Credentials {
            password: String::new(),
            ..ok
        };
        assert!(matches!(
            validate_credentials(&no_password),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_registration_password_length() {
        let req = RegisterRequest {
            name: "Ana".to_string(),
            email: "ana@loja.com".to_string(),
            password: "12345".to_string(),
        };
        assert_eq!(
            validate_registration(&req),
            Err(ValidationError::TooShort {
                field: "password".to_string(),
                min: 6
            })
        );
    }

    #[test]
    fn test_product_rules() {
        assert!(validate_product(&product("1", 3)).is_ok());

        let mut p = product("1", 3);
        p.sku = "FEI 1".to_string();
        assert!(validate_product(&p).is_err());

        let mut p = product("1", -1);
        p.sku = "FEI-1".to_string();
        assert!(matches!(
            validate_product(&p),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "stock"
        ));
    }

    #[test]
    fn test_sale_stock_check_sums_repeated_lines() {
        let products = vec![product("1", 3)];
        let sale = NewSale {
            items: vec![
                NewSaleItem {
                    product_id: "1".to_string(),
                    quantity: 2,
                },
                NewSaleItem {
                    product_id: "1".to_string(),
                    quantity: 2,
                },
            ],
            customer_name: None,
            payment_method: PaymentMethod::Cash,
        };

        assert_eq!(
            validate_new_sale(&sale, &products),
            Err(CoreError::InsufficientStock {
                sku: "FEI-1".to_string(),
                available: 3,
                requested: 4
            })
        );
    }

    #[test]
    fn test_empty_sale() {
        let sale = NewSale {
            items: vec![],
            customer_name: None,
            payment_method: PaymentMethod::Pix,
        };
        assert_eq!(validate_new_sale(&sale, &[]), Err(CoreError::EmptySale));
    }
}
