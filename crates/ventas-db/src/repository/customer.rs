//! # Customer Repository
//!
//! Database operations for customer records, keyed by canonical RUT.
//!
//! The RUT is validated and canonicalized at this boundary via
//! [`Rut::parse`], so every row in `customers` holds a checksum-correct
//! identifier in canonical form. Lookups normalize their input the same
//! way, which makes "12.345.678-5" and "123456785" hit the same record.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use ventas_core::rut::{self, Rut};
use ventas_core::validation::validate_customer_name;
use ventas_core::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "rut, name, email, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by RUT, in any accepted spelling.
    pub async fn get_by_rut(&self, raw_rut: &str) -> DbResult<Option<Customer>> {
        let canonical = rut::normalize(raw_rut);

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE rut = ?1"
        ))
        .bind(canonical)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Inserts a new customer.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Inserted customer with canonical RUT
    /// * `Err(DbError::Invalid)` - RUT or name failed validation
    /// * `Err(DbError::UniqueViolation)` - RUT already registered
    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        let rut = Rut::parse(&new.rut)?;
        validate_customer_name(&new.name)?;

        let now = Utc::now();
        let customer = Customer {
            rut: rut.into_string(),
            name: new.name.trim().to_string(),
            email: new.email.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(rut = %customer.rut, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (rut, name, email, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&customer.rut)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists customers ordered by RUT, paged with `limit`/`offset`.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY rut LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Counts all customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes a customer.
    ///
    /// Their sales survive: the schema clears `sales.customer_rut`
    /// (ON DELETE SET NULL) without touching the sale rows.
    pub async fn delete(&self, raw_rut: &str) -> DbResult<()> {
        let canonical = rut::normalize(raw_rut);

        debug!(rut = %canonical, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE rut = ?1")
            .bind(&canonical)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", canonical));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
