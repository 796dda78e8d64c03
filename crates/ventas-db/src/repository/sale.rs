//! # Sale Repository
//!
//! Sale registration and queries.
//!
//! ## Registration Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 register_sale (one transaction)                     │
//! │                                                                     │
//! │  1. VALIDATE IDENTITY                                               │
//! │     └── normalize RUT + checksum → InvalidRut                       │
//! │     └── habitual customer needs a name → MissingCustomerName        │
//! │                                                                     │
//! │  2. FILTER ROWS                                                     │
//! │     └── drop incomplete rows, abort if none left → NoLineItems      │
//! │                                                                     │
//! │  3. RESOLVE + CHECK (inside the transaction)                        │
//! │     └── quantity > 0 → InvalidQuantity                              │
//! │     └── product exists → ProductNotFound                            │
//! │     └── collect ALL stock violations → InsufficientStock            │
//! │                                                                     │
//! │  4. RESOLVE-OR-CREATE CUSTOMER (or keep the bare RUT)               │
//! │                                                                     │
//! │  5. WRITE                                                           │
//! │     └── sale shell (total 0)                                        │
//! │     └── per line, in input order: snapshot price, guarded stock     │
//! │         decrement (re-checks `stock >= qty`), accumulate total      │
//! │     └── persist total, COMMIT                                       │
//! │                                                                     │
//! │  Any failure before COMMIT rolls back: no stock change, no sale,    │
//! │  no customer. All-or-nothing.                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult, RegisterSaleError};
use ventas_core::rut;
use ventas_core::{Money, Product, Sale, SaleDetail, SaleError, SaleLine, SaleRequest, StockShortage};

const SALE_COLUMNS: &str = "id, customer_rut, receipt_rut, total_cents, created_at";
const LINE_COLUMNS: &str = "id, sale_id, product_id, position, quantity, unit_price_cents";
const PRODUCT_COLUMNS: &str = "id, code, name, price_cents, stock, created_at, updated_at";

/// Repository for sale database operations, including the atomic
/// registration transaction.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Registers a sale: the one write path for sales.
    ///
    /// Validates the buyer's RUT, filters incomplete line rows, checks
    /// stock for every remaining line (reporting every violation, not
    /// just the first), optionally resolves-or-creates the customer, then
    /// writes the sale, its lines (price snapshots, input order), and the
    /// stock decrements in a single transaction.
    ///
    /// ## Stock Safety
    /// Stock is checked twice: once up front so the caller gets a full
    /// shortage report, and again inside each decrement statement
    /// (`AND stock >= qty`). The second check is what makes concurrent
    /// registrations safe - two racing sales of the same product can
    /// never both drive stock below zero, whatever the earlier reads saw.
    ///
    /// ## Returns
    /// The completed sale with its lines, or a [`RegisterSaleError`]:
    /// a business rejection (fix the input, re-submit) or a storage
    /// fault. Nothing is committed on any error.
    pub async fn register_sale(&self, req: &SaleRequest) -> Result<SaleDetail, RegisterSaleError> {
        // ---- 1. Identity -------------------------------------------------
        let canonical_rut = rut::normalize(&req.rut);
        if !rut::is_valid(&canonical_rut) {
            return Err(SaleError::InvalidRut {
                rut: req.rut.clone(),
            }
            .into());
        }

        let customer_name = req
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if req.register_customer && customer_name.is_none() {
            return Err(SaleError::MissingCustomerName.into());
        }

        // ---- 2. Filter incomplete rows ----------------------------------
        let requested = req.complete_lines();
        if requested.is_empty() {
            return Err(SaleError::NoLineItems.into());
        }

        let mut tx = self.pool.begin().await?;

        // ---- 3. Resolve products, check quantities and stock ------------
        // Reads happen inside the transaction so the stock we check is the
        // stock we decrement.
        let mut resolved: Vec<(Product, i64)> = Vec::with_capacity(requested.len());
        let mut shortages: Vec<StockShortage> = Vec::new();

        for (line, (product_id, quantity)) in requested.iter().enumerate() {
            if *quantity <= 0 {
                return Err(SaleError::InvalidQuantity {
                    line,
                    quantity: *quantity,
                }
                .into());
            }

            let product = sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
            ))
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| SaleError::ProductNotFound {
                line,
                product_id: product_id.clone(),
            })?;

            if !product.can_fulfill(*quantity) {
                shortages.push(StockShortage {
                    line,
                    code: product.code.clone(),
                    requested: *quantity,
                    available: product.stock,
                });
            }

            resolved.push((product, *quantity));
        }

        if !shortages.is_empty() {
            return Err(SaleError::InsufficientStock { shortages }.into());
        }

        // ---- 4. Customer link or bare receipt RUT -----------------------
        let now = Utc::now();

        let (customer_rut, receipt_rut) = if req.register_customer {
            let existing = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM customers WHERE rut = ?1",
            )
            .bind(&canonical_rut)
            .fetch_one(&mut *tx)
            .await?;

            if existing == 0 {
                // First sale for this customer: create the record. An
                // existing record is reused untouched - name and email
                // from the form never overwrite what was registered first.
                debug!(rut = %canonical_rut, "Creating customer for sale");
                sqlx::query(
                    "INSERT INTO customers (rut, name, email, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .bind(&canonical_rut)
                .bind(customer_name.unwrap_or_default())
                .bind(&req.customer_email)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            (Some(canonical_rut.clone()), None)
        } else {
            (None, Some(canonical_rut.clone()))
        };

        // ---- 5. Sale shell, lines, decrements, total --------------------
        let sale_id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO sales (id, customer_rut, receipt_rut, total_cents, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
        )
        .bind(&sale_id)
        .bind(&customer_rut)
        .bind(&receipt_rut)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut total = Money::zero();
        let mut lines: Vec<SaleLine> = Vec::with_capacity(resolved.len());

        for (position, (product, quantity)) in resolved.iter().enumerate() {
            let sale_line = SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: product.id.clone(),
                position: position as i64,
                quantity: *quantity,
                unit_price_cents: product.price_cents,
            };

            sqlx::query(
                "INSERT INTO sale_lines (id, sale_id, product_id, position, quantity, unit_price_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&sale_line.id)
            .bind(&sale_line.sale_id)
            .bind(&sale_line.product_id)
            .bind(sale_line.position)
            .bind(sale_line.quantity)
            .bind(sale_line.unit_price_cents)
            .execute(&mut *tx)
            .await?;

            // The decrement re-checks availability: a racing transaction
            // may have shipped the same units since our read above.
            let decremented = sqlx::query(
                "UPDATE products SET stock = stock - ?2, updated_at = ?3
                 WHERE id = ?1 AND stock >= ?2",
            )
            .bind(&product.id)
            .bind(*quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let available: i64 =
                    sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
                        .bind(&product.id)
                        .fetch_one(&mut *tx)
                        .await?;

                // Dropping the transaction rolls everything back.
                return Err(SaleError::InsufficientStock {
                    shortages: vec![StockShortage {
                        line: position,
                        code: product.code.clone(),
                        requested: *quantity,
                        available,
                    }],
                }
                .into());
            }

            total += sale_line.line_total();
            lines.push(sale_line);
        }

        sqlx::query("UPDATE sales SET total_cents = ?2 WHERE id = ?1")
            .bind(&sale_id)
            .bind(total.cents())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            total = %total,
            lines = lines.len(),
            "Sale registered"
        );

        Ok(SaleDetail {
            sale: Sale {
                id: sale_id,
                customer_rut,
                receipt_rut,
                total_cents: total.cents(),
                created_at: now,
            },
            lines,
        })
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale =
            sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(sale)
    }

    /// Gets all lines for a sale, in the order they were submitted.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY position"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets a sale together with its lines.
    pub async fn get_detail(&self, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(sale) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let lines = self.get_lines(id).await?;
        Ok(Some(SaleDetail { sale, lines }))
    }

    /// Lists sales, newest first, paged with `limit`/`offset`.
    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts all sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Deletes a sale. Its lines go with it (ON DELETE CASCADE);
    /// referenced products and stock levels are untouched.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use ventas_core::{LineRequest, NewProduct};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, code: &str, price_cents: i64, stock: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: format!("Producto {code}"),
                price_cents,
                stock,
            })
            .await
            .unwrap()
    }

    fn walk_in(rut: &str, lines: Vec<LineRequest>) -> SaleRequest {
        SaleRequest {
            rut: rut.to_string(),
            register_customer: false,
            customer_name: None,
            customer_email: None,
            lines,
        }
    }

    fn habitual(rut: &str, name: &str, email: Option<&str>, lines: Vec<LineRequest>) -> SaleRequest {
        SaleRequest {
            rut: rut.to_string(),
            register_customer: true,
            customer_name: Some(name.to_string()),
            customer_email: email.map(str::to_string),
            lines,
        }
    }

    async fn assert_storage_empty(db: &Database) {
        assert_eq!(db.sales().count().await.unwrap(), 0);
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    fn rejection(err: RegisterSaleError) -> SaleError {
        match err {
            RegisterSaleError::Rejected(sale_err) => sale_err,
            RegisterSaleError::Db(db_err) => panic!("expected rejection, got {db_err}"),
        }
    }

    // -------------------------------------------------------------------------
    // Happy path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_register_walk_in_sale() {
        let db = test_db().await;
        // Product at $1.000,00 with 5 on the shelf, request 3
        let product = seed_product(&db, "A", 100_000, 5).await;

        let detail = db
            .sales()
            .register_sale(&walk_in("12345678-5", vec![LineRequest::filled(&product.id, 3)]))
            .await
            .unwrap();

        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].unit_price_cents, 100_000);
        assert_eq!(detail.lines[0].quantity, 3);
        assert_eq!(detail.sale.total_cents, 300_000); // $3.000,00
        assert_eq!(detail.sale.receipt_rut.as_deref(), Some("12345678-5"));
        assert_eq!(detail.sale.customer_rut, None);

        // Stock decremented 5 -> 2, no customer created
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 2);
        assert_eq!(db.customers().count().await.unwrap(), 0);

        // The persisted aggregate matches what was returned
        let persisted = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.sale.total_cents, 300_000);
        assert_eq!(persisted.lines.len(), 1);
        assert_eq!(persisted.lines_total(), persisted.sale.total());
    }

    #[tokio::test]
    async fn test_register_normalizes_rut() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        let detail = db
            .sales()
            .register_sale(&walk_in("12.345.678-5", vec![LineRequest::filled(&product.id, 1)]))
            .await
            .unwrap();

        assert_eq!(detail.sale.receipt_rut.as_deref(), Some("12345678-5"));
    }

    #[tokio::test]
    async fn test_lines_keep_input_order() {
        let db = test_db().await;
        let first = seed_product(&db, "ZZZ", 100, 10).await;
        let second = seed_product(&db, "AAA", 200, 10).await;
        let third = seed_product(&db, "MMM", 300, 10).await;

        let detail = db
            .sales()
            .register_sale(&walk_in(
                "12345678-5",
                vec![
                    LineRequest::filled(&first.id, 1),
                    LineRequest::filled(&second.id, 2),
                    LineRequest::filled(&third.id, 3),
                ],
            ))
            .await
            .unwrap();

        let ids: Vec<&str> = detail.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec![&first.id, &second.id, &third.id]);
        assert_eq!(
            detail.lines.iter().map(|l| l.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        // Same order when read back
        let persisted = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
        let persisted_ids: Vec<&str> =
            persisted.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(persisted_ids, ids);

        // Total across mixed lines: 1×100 + 2×200 + 3×300 = 1400
        assert_eq!(detail.sale.total_cents, 1400);
    }

    #[tokio::test]
    async fn test_incomplete_rows_are_silently_dropped() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        let detail = db
            .sales()
            .register_sale(&walk_in(
                "12345678-5",
                vec![
                    LineRequest::empty(),
                    LineRequest::filled(&product.id, 2),
                    LineRequest {
                        product_id: Some(product.id.clone()),
                        quantity: None,
                    },
                ],
            ))
            .await
            .unwrap();

        // Only the complete row made it in
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].quantity, 2);
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 3);
    }

    #[tokio::test]
    async fn test_price_snapshot_is_frozen() {
        let db = test_db().await;
        let mut product = seed_product(&db, "A", 100_000, 10).await;

        let detail = db
            .sales()
            .register_sale(&walk_in("12345678-5", vec![LineRequest::filled(&product.id, 1)]))
            .await
            .unwrap();

        // Reprice the product after the sale
        product.price_cents = 999_999;
        db.products().update(&product).await.unwrap();

        // The line still shows the price at transaction time
        let persisted = db.sales().get_detail(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(persisted.lines[0].unit_price_cents, 100_000);
        assert_eq!(persisted.sale.total_cents, 100_000);
    }

    // -------------------------------------------------------------------------
    // Rejections - and that they leave storage untouched
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_invalid_rut_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        for bad in ["12345678-4", "not-a-rut", ""] {
            let err = db
                .sales()
                .register_sale(&walk_in(bad, vec![LineRequest::filled(&product.id, 1)]))
                .await
                .unwrap_err();
            assert!(matches!(rejection(err), SaleError::InvalidRut { .. }), "{bad}");
        }

        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 5);
        assert_storage_empty(&db).await;
    }

    #[tokio::test]
    async fn test_habitual_customer_requires_name() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        let mut request = habitual("12345678-5", "Ana", None, vec![LineRequest::filled(&product.id, 1)]);
        request.customer_name = None;
        let err = db.sales().register_sale(&request).await.unwrap_err();
        assert_eq!(rejection(err), SaleError::MissingCustomerName);

        // Blank counts as missing
        request.customer_name = Some("   ".to_string());
        let err = db.sales().register_sale(&request).await.unwrap_err();
        assert_eq!(rejection(err), SaleError::MissingCustomerName);

        assert_storage_empty(&db).await;
    }

    #[tokio::test]
    async fn test_no_line_items_rejected() {
        let db = test_db().await;
        seed_product(&db, "A", 100, 5).await;

        // Entirely empty
        let err = db
            .sales()
            .register_sale(&walk_in("12345678-5", vec![]))
            .await
            .unwrap_err();
        assert_eq!(rejection(err), SaleError::NoLineItems);

        // Nothing but incomplete rows
        let err = db
            .sales()
            .register_sale(&walk_in(
                "12345678-5",
                vec![LineRequest::empty(), LineRequest::empty()],
            ))
            .await
            .unwrap_err();
        assert_eq!(rejection(err), SaleError::NoLineItems);

        assert_storage_empty(&db).await;
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        for qty in [0, -2] {
            let err = db
                .sales()
                .register_sale(&walk_in("12345678-5", vec![LineRequest::filled(&product.id, qty)]))
                .await
                .unwrap_err();
            assert_eq!(
                rejection(err),
                SaleError::InvalidQuantity { line: 0, quantity: qty }
            );
        }

        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 5);
        assert_storage_empty(&db).await;
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        let err = db
            .sales()
            .register_sale(&walk_in(
                "12345678-5",
                vec![
                    LineRequest::filled(&product.id, 1),
                    LineRequest::filled("missing-product", 1),
                ],
            ))
            .await
            .unwrap_err();

        assert_eq!(
            rejection(err),
            SaleError::ProductNotFound {
                line: 1,
                product_id: "missing-product".to_string()
            }
        );

        // The valid first line was not applied
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 5);
        assert_storage_empty(&db).await;
    }

    #[tokio::test]
    async fn test_insufficient_stock_reports_every_offending_line() {
        let db = test_db().await;
        let scarce_a = seed_product(&db, "A", 100, 1).await;
        let plenty = seed_product(&db, "B", 200, 100).await;
        let scarce_c = seed_product(&db, "C", 300, 0).await;

        let err = db
            .sales()
            .register_sale(&habitual(
                "12345678-5",
                "Ana",
                Some("ana@example.cl"),
                vec![
                    LineRequest::filled(&scarce_a.id, 9),
                    LineRequest::filled(&plenty.id, 2),
                    LineRequest::filled(&scarce_c.id, 1),
                ],
            ))
            .await
            .unwrap_err();

        let SaleError::InsufficientStock { shortages } = rejection(err) else {
            panic!("expected InsufficientStock");
        };

        assert_eq!(
            shortages,
            vec![
                StockShortage {
                    line: 0,
                    code: "A".to_string(),
                    requested: 9,
                    available: 1,
                },
                StockShortage {
                    line: 2,
                    code: "C".to_string(),
                    requested: 1,
                    available: 0,
                },
            ]
        );

        // Nothing moved: no partial decrement, no sale, no customer -
        // even though the request asked to register one.
        for (product, stock) in [(&scarce_a, 1), (&plenty, 100), (&scarce_c, 0)] {
            let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
            assert_eq!(reloaded.stock, stock, "{}", product.code);
        }
        assert_storage_empty(&db).await;
    }

    // -------------------------------------------------------------------------
    // Customer resolution
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_habitual_customer_created_once_never_overwritten() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 50).await;

        let first = db
            .sales()
            .register_sale(&habitual(
                "12.345.678-5",
                "Ana Pérez",
                Some("ana@example.cl"),
                vec![LineRequest::filled(&product.id, 1)],
            ))
            .await
            .unwrap();
        assert_eq!(first.sale.customer_rut.as_deref(), Some("12345678-5"));
        assert_eq!(first.sale.receipt_rut, None);

        // Same RUT again, different spelling, different name and email
        let second = db
            .sales()
            .register_sale(&habitual(
                "123456785",
                "A. Pérez Soto",
                Some("otra@example.cl"),
                vec![LineRequest::filled(&product.id, 2)],
            ))
            .await
            .unwrap();
        assert_eq!(second.sale.customer_rut.as_deref(), Some("12345678-5"));

        // One customer record, first-registered data intact
        assert_eq!(db.customers().count().await.unwrap(), 1);
        let customer = db.customers().get_by_rut("12345678-5").await.unwrap().unwrap();
        assert_eq!(customer.name, "Ana Pérez");
        assert_eq!(customer.email.as_deref(), Some("ana@example.cl"));

        // Both sales exist
        assert_eq!(db.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_deleting_customer_detaches_sales() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 50).await;

        let detail = db
            .sales()
            .register_sale(&habitual(
                "12345678-5",
                "Ana",
                None,
                vec![LineRequest::filled(&product.id, 1)],
            ))
            .await
            .unwrap();

        db.customers().delete("12345678-5").await.unwrap();

        let sale = db.sales().get_by_id(&detail.sale.id).await.unwrap().unwrap();
        assert_eq!(sale.customer_rut, None);
        assert_eq!(sale.total_cents, 100);
    }

    // -------------------------------------------------------------------------
    // Totals stay exact
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_totals_are_exact_over_repeated_registrations() {
        let db = test_db().await;
        // $0,10 - the classic float-drift trap
        let product = seed_product(&db, "A", 10, 10_000).await;

        let mut grand_total = Money::zero();
        for _ in 0..100 {
            let detail = db
                .sales()
                .register_sale(&walk_in("12345678-5", vec![LineRequest::filled(&product.id, 3)]))
                .await
                .unwrap();
            assert_eq!(detail.sale.total_cents, 30);
            assert_eq!(detail.lines_total(), detail.sale.total());
            grand_total += detail.sale.total();
        }

        assert_eq!(grand_total.cents(), 3000); // exactly $30,00
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 10_000 - 300);
    }

    // -------------------------------------------------------------------------
    // Concurrency: stock can never go negative
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_concurrent_registrations_admit_exactly_one() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 5).await;

        let sales = db.sales();
        let request = walk_in("12345678-5", vec![LineRequest::filled(&product.id, 3)]);

        let (first, second) = tokio::join!(
            sales.register_sale(&request),
            sales.register_sale(&request)
        );

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one of two racing sales may win");

        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(
            rejection(loser.unwrap_err()),
            SaleError::InsufficientStock { .. }
        ));

        // 5 - 3 = 2, and definitely never negative
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 2);
        assert_eq!(db.sales().count().await.unwrap(), 1);
    }

    // -------------------------------------------------------------------------
    // Queries and ownership rules
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_and_count() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 100).await;

        for _ in 0..12 {
            db.sales()
                .register_sale(&walk_in("12345678-5", vec![LineRequest::filled(&product.id, 1)]))
                .await
                .unwrap();
        }

        assert_eq!(db.sales().count().await.unwrap(), 12);
        assert_eq!(db.sales().list(10, 0).await.unwrap().len(), 10);
        assert_eq!(db.sales().list(10, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_deleting_sale_cascades_to_lines_and_frees_product() {
        let db = test_db().await;
        let product = seed_product(&db, "A", 100, 10).await;

        let detail = db
            .sales()
            .register_sale(&walk_in(
                "12345678-5",
                vec![
                    LineRequest::filled(&product.id, 1),
                    LineRequest::filled(&product.id, 2),
                ],
            ))
            .await
            .unwrap();

        // While the sale references it, the product is protected
        let err = db.products().delete(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        db.sales().delete(&detail.sale.id).await.unwrap();

        // Lines went with the sale
        assert!(db.sales().get_detail(&detail.sale.id).await.unwrap().is_none());
        let orphan_lines: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines WHERE sale_id = ?1")
                .bind(&detail.sale.id)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(orphan_lines, 0);

        // Deleting the sale does not restock; the product merely becomes
        // deletable again
        let reloaded = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 7);
        db.products().delete(&product.id).await.unwrap();
    }
}
