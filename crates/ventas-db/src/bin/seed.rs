//! # Seed Data Generator
//!
//! Populates a development database with catalog products and registers a
//! demo sale through the real transaction path.
//!
//! ## Usage
//! ```bash
//! # Default database (./ventas_dev.db)
//! cargo run -p ventas-db --bin seed
//!
//! # Specify database path
//! cargo run -p ventas-db --bin seed -- --db ./data/ventas.db
//! ```

use std::env;

use ventas_core::{LineRequest, Money, NewProduct, SaleRequest};
use ventas_db::{Database, DbConfig};

/// Corner-store catalog: (code, name, price in cents, stock).
const PRODUCTS: &[(&str, &str, i64, i64)] = &[
    ("CAFE-250", "Café molido 250g", 459_000, 24),
    ("TE-VERDE", "Té verde 20 bolsas", 189_000, 40),
    ("AZUCAR-1K", "Azúcar 1kg", 139_000, 60),
    ("HARINA-1K", "Harina sin polvos 1kg", 125_000, 45),
    ("ARROZ-1K", "Arroz grado 1 1kg", 149_000, 80),
    ("ACEITE-1L", "Aceite maravilla 1L", 319_000, 30),
    ("LECHE-1L", "Leche entera 1L", 119_000, 72),
    ("PAN-MOLDE", "Pan de molde blanco", 219_000, 18),
    ("GALLETA-SODA", "Galletas de soda", 99_000, 50),
    ("BEBIDA-15", "Bebida 1.5L", 179_000, 36),
    ("FIDEOS-400", "Fideos espirales 400g", 109_000, 55),
    ("ATUN-LATA", "Atún lomitos en agua", 159_000, 42),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./ventas_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Control Ventas Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./ventas_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Control Ventas Seed Data Generator");
    println!("==================================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count("").await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} products");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Inserting catalog...");

    let mut first_ids: Vec<String> = Vec::new();
    for (code, name, price_cents, stock) in PRODUCTS {
        let product = db
            .products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: name.to_string(),
                price_cents: *price_cents,
                stock: *stock,
            })
            .await?;

        println!(
            "  {:<14} {:<28} {:>12}  stock {}",
            product.code,
            product.name,
            Money::from_cents(product.price_cents).to_string(),
            product.stock
        );

        if first_ids.len() < 2 {
            first_ids.push(product.id);
        }
    }

    println!();
    println!("Registering a demo sale...");

    // A habitual customer buying through the real transaction path
    let request = SaleRequest {
        rut: "12.345.678-5".to_string(),
        register_customer: true,
        customer_name: Some("Ana Pérez".to_string()),
        customer_email: Some("ana@example.cl".to_string()),
        lines: vec![
            LineRequest::filled(first_ids[0].clone(), 2),
            LineRequest::filled(first_ids[1].clone(), 1),
        ],
    };

    let detail = db.sales().register_sale(&request).await?;

    println!(
        "✓ Sale {} registered for {}",
        detail.sale.id,
        detail.sale.total()
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&detail)?);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
