//! # Seed Data Generator
//!
//! Populates an empty store with a demo catalogue for development.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by SHOPFRONT_DB_PATH (default ./shopfront.db)
//! cargo run -p shopfront-db --bin seed
//!
//! # Specify database path and stock per product
//! cargo run -p shopfront-db --bin seed -- --db ./data/shop.db --stock 25
//!
//! # More logging
//! RUST_LOG=shopfront_db=debug cargo run -p shopfront-db --bin seed
//! ```
//!
//! Prints the resulting catalogue as JSON on stdout.

use std::env;

use shopfront_core::NewProduct;
use shopfront_db::{Database, StoreConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Demo catalogue: (name, description, price)
const CATALOGUE: &[(&str, &str, i64)] = &[
    ("Espresso beans 250g", "Dark roast, whole bean", 450),
    ("Filter coffee 500g", "Medium roast, ground", 620),
    ("Green tea 100g", "Loose leaf sencha", 300),
    ("Black tea 100g", "Assam breakfast blend", 280),
    ("Herbal tea 20 bags", "Chamomile and mint", 190),
    ("Ceramic mug", "350ml, dishwasher safe", 900),
    ("Travel tumbler", "Insulated steel, 450ml", 1800),
    ("Pour-over dripper", "Size 02, ceramic", 1500),
    ("Paper filters x100", "Size 02", 350),
    ("Honey 250g", "Wildflower", 520),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = StoreConfig::from_env()?;
    let mut stock: i64 = 20;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = path.into();
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if let Some(value) = args.get(i + 1) {
                    stock = value.parse()?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Shopfront Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: $SHOPFRONT_DB_PATH or ./shopfront.db)");
                println!("  -s, --stock <N>     Stock per product (default: 20)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(path = %config.database_path.display(), "Seeding database");

    let db = Database::from_store_config(&config).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
    } else {
        for (name, description, price) in CATALOGUE {
            let product = NewProduct::new(*name, *price, stock).with_description(*description);
            db.products().create(&product).await?;
        }
        info!(count = CATALOGUE.len(), stock, "Seed complete");
    }

    let catalogue = db.products().list().await?;
    println!("{}", serde_json::to_string_pretty(&catalogue)?);

    db.close().await;
    Ok(())
}
