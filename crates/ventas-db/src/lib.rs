//! # ventas-db: Database Layer for Control Ventas
//!
//! This crate provides database access for the Control Ventas system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Control Ventas Data Flow                        │
//! │                                                                     │
//! │  Presentation layer (sale form, catalog screens)                    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                    ventas-db (THIS CRATE)                     │  │
//! │  │                                                               │  │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐    │  │
//! │  │   │   Database   │   │ Repositories  │   │  Migrations  │    │  │
//! │  │   │  (pool.rs)   │   │ product.rs    │   │  (embedded)  │    │  │
//! │  │   │              │◄──│ customer.rs   │   │ 001_init.sql │    │  │
//! │  │   │  SqlitePool  │   │ sale.rs ★     │   │              │    │  │
//! │  │   └──────────────┘   └───────────────┘   └──────────────┘    │  │
//! │  │                                                               │  │
//! │  │   ★ sale.rs hosts register_sale: the one atomic transaction   │  │
//! │  │     that validates, snapshots prices, decrements stock and    │  │
//! │  │     totals a sale - all-or-nothing.                           │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database (WAL mode, foreign keys ON)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, customer, sale)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ventas_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/ventas.db")).await?;
//!
//! let products = db.products().search("café", 10, 0).await?;
//! let detail = db.sales().register_sale(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, RegisterSaleError};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
