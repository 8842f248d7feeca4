//! # Slot Seeder
//!
//! Populates an empty database with a row of parking slots for development.
//!
//! ## Usage
//! ```bash
//! # Create 20 slots (default)
//! cargo run -p park-db --bin seed
//!
//! # Create a custom amount
//! cargo run -p park-db --bin seed -- --count 60
//!
//! # Specify database path
//! cargo run -p park-db --bin seed -- --db ./data/parking.db
//! ```
//!
//! ## Generated Slots
//! Slots are numbered `S101`, `S102`, ... Every tenth slot is a large bay
//! and every fifth (that is not also a tenth) is for motorcycles.
//! All slots start unoccupied.

use std::env;

use park_core::SlotType;
use park_db::{Database, DbConfig};

const DEFAULT_COUNT: usize = 20;
const DEFAULT_DB: &str = "./parking.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count = DEFAULT_COUNT;
    let mut db_path = String::from(DEFAULT_DB);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
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
                println!("Parking slot seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of slots to create (default: {})", DEFAULT_COUNT);
                println!("  -d, --db <PATH>    Database file path (default: {})", DEFAULT_DB);
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Parking Slot Seeder");
    println!("======================");
    println!("Database: {}", db_path);
    println!("Slots:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let (existing, _) = db.slots().counts().await?;
    if existing > 0 {
        println!("⚠ Database already has {} slots", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut created = 0;
    for n in 1..=count {
        let number = slot_number(n);
        let slot_type = slot_type(n);
        match db.slots().create(&number, slot_type).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("Failed to create {}: {}", number, e),
        }
    }

    let report = db.ledger(Default::default(), std::sync::Arc::new(park_core::SystemClock))
        .check_consistency()
        .await?;

    println!();
    println!("✓ Created {} slots", created);
    println!("✓ Ledger consistent: {}", report.is_consistent());

    db.close().await;
    Ok(())
}

fn slot_number(n: usize) -> String {
    format!("S{}", 100 + n)
}

fn slot_type(n: usize) -> SlotType {
    if n % 10 == 0 {
        SlotType::Large
    } else if n % 5 == 0 {
        SlotType::Motorcycle
    } else {
        SlotType::Compact
    }
}
