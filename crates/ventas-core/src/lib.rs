//! # ventas-core: Pure Business Logic for Control Ventas
//!
//! This crate is the **heart** of Control Ventas. It contains all business
//! logic as pure functions and types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  Control Ventas Architecture                        │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │            Presentation (out of this workspace)               │  │
//! │  │    catalog screens ──► sale form ──► receipt view             │  │
//! │  └─────────────────────────────┬─────────────────────────────────┘  │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐  │
//! │  │               ★ ventas-core (THIS CRATE) ★                    │  │
//! │  │                                                               │  │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌──────────┐  │  │
//! │  │   │   types   │  │   money   │  │    rut    │  │validation│  │  │
//! │  │   │  Product  │  │   Money   │  │ normalize │  │  rules   │  │  │
//! │  │   │   Sale    │  │  (cents)  │  │ checksum  │  │  checks  │  │  │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └──────────┘  │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │  │
//! │  └─────────────────────────────┬─────────────────────────────────┘  │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐  │
//! │  │                  ventas-db (Database Layer)                   │  │
//! │  │        SQLite repositories + the sale transaction             │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, SaleLine, requests)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`rut`] - Chilean RUT normalization and modulo-11 checksum
//! - [`error`] - Domain error types, including the sale rejection taxonomy
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod rut;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use ventas_core::Money` instead of
// `use ventas_core::money::Money`

pub use error::{SaleError, StockShortage, ValidationError};
pub use money::Money;
pub use rut::Rut;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page size for catalog, customer, and sale listings.
///
/// Listing screens page by ten records; repositories take explicit
/// limit/offset so callers can override it.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
