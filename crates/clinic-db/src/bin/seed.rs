//! # Seed Data Generator
//!
//! Populates a development database with staff, stock and one open order.
//!
//! ## Usage
//! ```bash
//! # Seed ./clinic_dev.db with the default admin password
//! cargo run -p clinic-db --bin seed
//!
//! # Specify database path and admin password
//! cargo run -p clinic-db --bin seed -- --db ./data/clinic.db --admin-password hunter22
//! ```
//!
//! ## Generated Data
//! - `admin` plus one account per department role (password = admin password)
//! - A handful of stock batches in every department
//! - One pending order for the first optical batch

use std::env;

use clinic_core::{Department, NewOrder, NewOrderLine, NewStockItem, NewUser, Role};
use clinic_db::{Database, DbConfig, DbError};

/// (batch prefix, department, product type, [(name, specification, unit price cents)])
const STOCK: &[(&str, Department, &str, &[(&str, Option<&str>, i64)])] = &[
    (
        "GLS",
        Department::Optical,
        "lens",
        &[
            ("Single Vision Lens", Some("-2.00 / 1.56 index"), 1_500),
            ("Bifocal Lens", Some("+1.50 add / 1.56 index"), 3_200),
            ("Photochromic Lens", Some("1.60 index"), 5_400),
        ],
    ),
    (
        "MED",
        Department::Pharmacy,
        "medicine",
        &[
            ("Amoxicillin 500mg", Some("capsules x 21"), 450),
            ("Paracetamol 500mg", Some("tablets x 100"), 300),
            ("Timolol Eye Drops", Some("0.5% 5ml"), 1_250),
        ],
    ),
    (
        "LAB",
        Department::Laboratory,
        "reagent",
        &[
            ("Glucose Test Strips", Some("box of 50"), 2_000),
            ("Malaria RDT Kit", None, 180),
        ],
    ),
    (
        "OPH",
        Department::Ophthalmology,
        "consumable",
        &[
            ("Fluorescein Strips", Some("box of 100"), 1_800),
            ("Tropicamide 1%", Some("15ml"), 950),
        ],
    ),
];

/// Units received per batch.
const BATCH_QUANTITY: i64 = 40;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./clinic_dev.db");
    let mut admin_password = String::from("admin12345");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--admin-password" | "-p" => {
                if i + 1 < args.len() {
                    admin_password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Clinic Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>                Database file path (default: ./clinic_dev.db)");
                println!("  -p, --admin-password <SECRET>  Password for seeded accounts (default: admin12345)");
                println!("  -h, --help                     Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Clinic Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.stock().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} stock items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Staff accounts
    println!();
    println!("Creating staff accounts...");
    for role in Role::ALL {
        let username = role.as_str().to_string();
        let user = NewUser {
            username: username.clone(),
            password: admin_password.clone(),
            full_name: format!("{} Desk", capitalize(&username)),
            role,
        };
        match db.users().create(&user).await {
            Ok(_) => println!("  + {}", username),
            Err(DbError::UniqueViolation { .. }) => println!("  = {} (exists)", username),
            Err(e) => return Err(e.into()),
        }
    }

    // Stock batches
    println!();
    println!("Receiving stock...");
    let mut first_optical = None;
    for (prefix, department, product_type, products) in STOCK {
        for (idx, (name, specification, price)) in products.iter().enumerate() {
            let item = NewStockItem {
                batch_number: format!("{}-{:03}", prefix, idx + 1),
                product_name: name.to_string(),
                product_type: product_type.to_string(),
                specification: specification.map(str::to_string),
                department: *department,
                quantity: BATCH_QUANTITY,
                unit_price_cents: *price,
                low_stock_threshold: 5,
            };
            let created = db.stock().create(&item).await?;
            println!("  + {} {}", created.batch_number, created.product_name);

            if *department == Department::Optical && first_optical.is_none() {
                first_optical = Some(created);
            }
        }
    }

    // An open order to issue against
    if let Some(lens) = first_optical {
        let order = NewOrder {
            customer_name: "Walk-in Patient".to_string(),
            customer_phone: None,
            items: vec![NewOrderLine {
                stock_item_id: lens.id.clone(),
                quantity: 2,
                unit_price_cents: lens.unit_price_cents,
                discount_cents: 0,
            }],
            amount_paid_cents: lens.unit_price_cents,
            notes: Some("Seeded order".to_string()),
        };
        let created = db.orders().create(&order).await?;
        println!();
        println!("✓ Created order {}", created.order.order_number);
    }

    let snapshot = db.stock().snapshot(None).await?;
    println!();
    println!(
        "✓ Seed complete: {} items, stock value {}",
        snapshot.items.len(),
        snapshot.total_stock_value()
    );

    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
