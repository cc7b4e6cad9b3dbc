//! # Seed Data Generator
//!
//! Populates the database with educational kits for development.
//!
//! ## Usage
//! ```bash
//! # Seed every kit below into ./kitshop.db
//! cargo run -p kitshop-db --bin seed
//!
//! # Specify database path and a stock level
//! cargo run -p kitshop-db --bin seed -- --db ./data/kitshop.db --stock 25
//!
//! # Also give a demo customer some available bonuses
//! cargo run -p kitshop-db --bin seed -- --demo-customer "+7 (777) 123-12-12"
//! ```
//!
//! Product ids are printed so they can be pasted into `POST /api/sales`.

use std::env;

use chrono::Utc;
use kitshop_core::validation::validate_phone;
use kitshop_core::Product;
use kitshop_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

/// Kit catalogue: (name, price in tenge, optional sale price)
const KITS: &[(&str, i64, Option<i64>)] = &[
    ("Робототехника: стартовый набор", 24_990, None),
    ("Robotics Starter Kit", 24_990, Some(21_990)),
    ("Chemistry Lab Kit", 10_000, None),
    ("Юный химик: 50 опытов", 8_490, Some(7_490)),
    ("Electronics Breadboard Set", 12_500, None),
    ("Solar System Model", 6_990, None),
    ("Microscope 40x-640x", 32_000, Some(28_500)),
    ("Физика: электричество и магнетизм", 14_990, None),
    ("Coding Cards for Kids", 4_990, None),
    ("Volcano Science Kit", 5_490, Some(4_990)),
    ("Arduino Projects Box", 29_990, None),
    ("Crystal Growing Kit", 3_990, None),
];

const DEMO_CUSTOMER_BONUSES: i64 = 1_500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./kitshop.db");
    let mut stock: i64 = 20;
    let mut demo_customer: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if i + 1 < args.len() {
                    stock = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--demo-customer" => {
                if i + 1 < args.len() {
                    demo_customer = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kitshop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -d, --db <PATH>              Database file path (default: ./kitshop.db)"
                );
                println!("  -s, --stock <N>              Units in stock per kit (default: 20)");
                println!(
                    "      --demo-customer <PHONE>  Credit {} bonuses to this phone",
                    DEMO_CUSTOMER_BONUSES
                );
                println!("  -h, --help                   Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kitshop Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping products to avoid duplicates.");
    } else {
        println!();
        println!("Inserting kits...");

        for (name, price, sale_price) in KITS {
            let product = kit(name, *price, *sale_price, stock);
            match db.products().insert(&product).await {
                Ok(p) => println!("  {}  {}", p.id, p.name),
                Err(e) => eprintln!("Failed to insert {}: {}", name, e),
            }
        }
    }

    if let Some(raw) = demo_customer {
        let phone = validate_phone("--demo-customer", &raw)?;
        let account = db
            .bonuses()
            .credit(phone.as_str(), DEMO_CUSTOMER_BONUSES, Some("Demo Customer"), Utc::now())
            .await?;
        println!();
        println!(
            "✓ {} now has {} available bonuses",
            account.phone_number, account.available_bonuses
        );
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one kit row.
fn kit(name: &str, price: i64, sale_price: Option<i64>, stock: i64) -> Product {
    let now = Utc::now();
    let stock = stock.max(0);

    Product {
        id: kitshop_core::new_id(),
        name: name.to_string(),
        price,
        sale_price,
        in_stock: stock > 0,
        stock_quantity: stock,
        created_at: now,
        updated_at: now,
    }
}
