//! # Domain Types
//!
//! Core domain types used throughout Control Ventas.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │    Product    │   │   Customer    │   │     Sale      │          │
//! │  │ ────────────  │   │ ────────────  │   │ ────────────  │          │
//! │  │ id (UUID)     │   │ rut (key)     │   │ id (UUID)     │          │
//! │  │ code (unique) │   │ name          │   │ customer_rut? │          │
//! │  │ price_cents   │   │ email?        │   │ receipt_rut?  │          │
//! │  │ stock         │   │               │   │ total_cents   │          │
//! │  └───────────────┘   └───────────────┘   └───────┬───────┘          │
//! │          ▲                                       │ owns             │
//! │          │ references                    ┌───────▼───────┐          │
//! │          └───────────────────────────────│   SaleLine    │          │
//! │                                          │ ────────────  │          │
//! │                                          │ position      │          │
//! │                                          │ quantity      │          │
//! │                                          │ unit_price    │          │
//! │                                          └───────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Sale` exclusively owns its lines (deleted with it). A `Product` is
//! referenced by lines and cannot be deleted while referenced. A sale
//! survives deletion of its customer - the reference just becomes empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code shown on labels and receipts. Unique in the catalog.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Price in cents. Never negative.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether current stock covers a requested quantity.
    #[inline]
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        quantity <= self.stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered ("habitual") customer, keyed by canonical RUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Canonical RUT, e.g. "12345678-5". Primary identity.
    pub rut: String,

    /// Display name.
    pub name: String,

    /// Optional contact email, stored as given.
    pub email: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Immutable once registered.
///
/// Exactly one of `customer_rut` / `receipt_rut` is set at creation:
/// either the sale belongs to a registered customer, or it is a walk-in
/// receipt that only records the buyer's RUT as text. Deleting the
/// customer later clears `customer_rut` without touching the sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Link to a registered customer, if the sale was flagged as one.
    pub customer_rut: Option<String>,

    /// Bare RUT captured for walk-in/receipt-only sales.
    pub receipt_rut: Option<String>,

    /// Sum of line subtotals at the moment of creation, in cents.
    pub total_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// The RUT this sale was issued to, whichever way it was captured.
    pub fn buyer_rut(&self) -> Option<&str> {
        self.customer_rut
            .as_deref()
            .or(self.receipt_rut.as_deref())
    }
}

// =============================================================================
// Sale Line
// =============================================================================

/// One line of a sale.
///
/// `unit_price_cents` is a snapshot of the product price at transaction
/// time - a historical record, never re-read from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,

    /// Zero-based index preserving the order the lines were submitted in.
    pub position: i64,

    /// Quantity sold. Always >= 1.
    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
}

impl SaleLine {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line subtotal (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale Aggregate
// =============================================================================

/// A sale together with its lines, in submission order.
///
/// This is what `register_sale` returns and what the sale-detail screen
/// renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

impl SaleDetail {
    /// Sum of the line subtotals.
    ///
    /// Always equals `sale.total()` for a sale produced by
    /// `register_sale`; recomputed here for tests and consistency checks.
    pub fn lines_total(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total())
    }
}

// =============================================================================
// Input Carriers
// =============================================================================

/// Input for creating a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
}

/// Input for creating a customer directly (outside a sale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    /// Raw RUT in any accepted spelling; validated and canonicalized at
    /// the storage boundary.
    pub rut: String,
    pub name: String,
    pub email: Option<String>,
}

/// One row of a sale form. Either part may be missing - the row is then
/// incomplete and silently discarded before registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
}

impl LineRequest {
    /// A fully filled-in row.
    pub fn filled(product_id: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            product_id: Some(product_id.into()),
            quantity: Some(quantity),
        }
    }

    /// An empty row, as submitted by an untouched form slot.
    pub fn empty() -> Self {
        LineRequest::default()
    }
}

/// Everything `register_sale` needs, already parsed and type-checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Raw RUT of the buyer, in any accepted spelling.
    pub rut: String,

    /// When true, resolve-or-create a Customer record for the RUT;
    /// requires `customer_name`.
    pub register_customer: bool,

    pub customer_name: Option<String>,
    pub customer_email: Option<String>,

    /// Requested lines, in display order.
    pub lines: Vec<LineRequest>,
}

impl SaleRequest {
    /// Drops incomplete rows, keeping the order of the rest.
    ///
    /// A row missing its product or its quantity was never filled in and
    /// is discarded without error. A row that is present but *invalid*
    /// (non-positive quantity, unknown product) is NOT dropped here - it
    /// fails loudly during registration.
    pub fn complete_lines(&self) -> Vec<(String, i64)> {
        self.lines
            .iter()
            .filter_map(|row| match (&row.product_id, row.quantity) {
                (Some(product_id), Some(quantity)) => Some((product_id.clone(), quantity)),
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: &str, qty: i64) -> SaleLine {
        SaleLine {
            id: format!("line-{product_id}"),
            sale_id: "sale-1".to_string(),
            product_id: product_id.to_string(),
            position: 0,
            quantity: qty,
            unit_price_cents: 100_000,
        }
    }

    #[test]
    fn test_line_total() {
        let l = line("p1", 3);
        assert_eq!(l.line_total().cents(), 300_000);
    }

    #[test]
    fn test_sale_detail_lines_total() {
        let detail = SaleDetail {
            sale: Sale {
                id: "sale-1".to_string(),
                customer_rut: None,
                receipt_rut: Some("12345678-5".to_string()),
                total_cents: 500_000,
                created_at: Utc::now(),
            },
            lines: vec![line("p1", 3), line("p2", 2)],
        };
        assert_eq!(detail.lines_total().cents(), 500_000);
        assert_eq!(detail.lines_total(), detail.sale.total());
    }

    #[test]
    fn test_buyer_rut_prefers_customer_link() {
        let mut sale = Sale {
            id: "sale-1".to_string(),
            customer_rut: Some("12345678-5".to_string()),
            receipt_rut: None,
            total_cents: 0,
            created_at: Utc::now(),
        };
        assert_eq!(sale.buyer_rut(), Some("12345678-5"));

        sale.customer_rut = None;
        sale.receipt_rut = Some("11111111-1".to_string());
        assert_eq!(sale.buyer_rut(), Some("11111111-1"));

        sale.receipt_rut = None;
        assert_eq!(sale.buyer_rut(), None);
    }

    #[test]
    fn test_complete_lines_discards_incomplete_rows() {
        let request = SaleRequest {
            rut: "12345678-5".to_string(),
            register_customer: false,
            customer_name: None,
            customer_email: None,
            lines: vec![
                LineRequest::filled("p1", 2),
                LineRequest::empty(),
                LineRequest {
                    product_id: Some("p2".to_string()),
                    quantity: None,
                },
                LineRequest {
                    product_id: None,
                    quantity: Some(4),
                },
                LineRequest::filled("p3", 1),
            ],
        };

        assert_eq!(
            request.complete_lines(),
            vec![("p1".to_string(), 2), ("p3".to_string(), 1)]
        );
    }

    #[test]
    fn test_complete_lines_keeps_invalid_quantities_for_loud_failure() {
        // Zero is complete (both parts present) - the registration step
        // rejects it with InvalidQuantity instead of silently dropping it.
        let request = SaleRequest {
            rut: "12345678-5".to_string(),
            register_customer: false,
            customer_name: None,
            customer_email: None,
            lines: vec![LineRequest::filled("p1", 0)],
        };

        assert_eq!(request.complete_lines(), vec![("p1".to_string(), 0)]);
    }

    #[test]
    fn test_product_can_fulfill() {
        let product = Product {
            id: "p1".to_string(),
            code: "A".to_string(),
            name: "A".to_string(),
            price_cents: 100_000,
            stock: 5,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.can_fulfill(5));
        assert!(product.can_fulfill(1));
        assert!(!product.can_fulfill(6));
    }

    #[test]
    fn test_entities_serialize_with_flat_field_names() {
        let product = Product {
            id: "p1".to_string(),
            code: "CAFE-250".to_string(),
            name: "Café molido 250g".to_string(),
            price_cents: 459_000,
            stock: 12,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["code"], "CAFE-250");
        assert_eq!(json["price_cents"], 459_000);
        assert_eq!(json["stock"], 12);
    }
}
