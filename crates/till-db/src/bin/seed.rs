//! # Seed Data Generator
//!
//! Populates a development database with dining tables and loyalty
//! customers.
//!
//! ## Usage
//! ```bash
//! # 12 tables, 3 customers (default)
//! cargo run -p till-db --bin seed
//!
//! # Custom table count and database path
//! cargo run -p till-db --bin seed -- --tables 20 --db ./data/till.db
//! ```

use std::env;
use till_core::validation::normalize_customer_key;
use till_core::{Money, TableConfig};
use till_db::{Database, DbConfig};
use uuid::Uuid;

/// Sample loyalty customers: (phone, name, points, visits, spent in cents)
const CUSTOMERS: &[(&str, &str, i64, i64, i64)] = &[
    ("(11) 98765-4321", "Dora Lima", 120, 6, 48_900),
    ("(21) 99876-5432", "Caio Souza", 40, 2, 15_500),
    ("(31) 91234-5678", "Helena Prado", 0, 1, 3_200),
];

/// Extra non-numbered areas configured after the numbered tables.
const AREAS: &[(&str, &str)] = &[("Terrace", "Outdoor, 6 seats"), ("Counter", "Bar stools")];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut table_count: usize = 12;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tables" | "-t" => {
                if i + 1 < args.len() {
                    table_count = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tables <N>   Number of numbered tables (default: 12)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till POS Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Tables:   {} (+{} areas)", table_count, AREAS.len());
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.tables().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} tables", existing);
        println!("  Skipping table seed to avoid duplicates.");
    } else {
        let numbered = (1..=table_count).map(|n| (n.to_string(), String::new()));
        let areas = AREAS
            .iter()
            .map(|(number, description)| (number.to_string(), description.to_string()));

        let mut created = 0;
        for (number, description) in numbered.chain(areas) {
            let table = TableConfig {
                id: Uuid::new_v4().to_string(),
                number,
                description,
            };
            if let Err(e) = db.tables().insert(&table).await {
                eprintln!("Failed to insert table {}: {}", table.number, e);
                continue;
            }
            created += 1;
        }
        println!("✓ Created {} tables", created);
    }

    println!();
    println!("Seeding loyalty customers...");
    for (phone, name, points, visits, spent) in CUSTOMERS {
        let key = normalize_customer_key(phone)?;
        if db.loyalty().get_customer(&key).await?.is_some() {
            println!("  {} already registered", name);
            continue;
        }

        db.loyalty().register_customer(&key, name).await?;
        for _ in 0..*visits {
            db.loyalty()
                .update_customer_stats(name, &key, Money::from_cents(spent / visits))
                .await?;
        }
        db.loyalty().credit_points(&key, *points, "seed").await?;
        println!("  {} ({}) with {} points", name, key, points);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
