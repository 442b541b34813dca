//! # Seed Data Generator
//!
//! Populates a fresh database with the accounts and catalog needed to run
//! the portal locally.
//!
//! ## Usage
//! ```bash
//! # Seed ./data/perkhub.db
//! cargo run -p perkhub-db --bin seed
//!
//! # Specify database path and number of starter coupons
//! cargo run -p perkhub-db --bin seed -- --db ./data/dev.db --coupons 20
//! ```
//!
//! ## What Gets Created
//! - `superadmin@gmail.com` / `superadmin` with 100,000 coins
//! - a demo company admin and employee (`admin@acme.test`, `employee@acme.test`)
//! - the brand voucher catalog
//! - a batch of starter coupons worth 50..=500 coins (printed at the end)

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use perkhub_core::code::generate_code;
use perkhub_core::credentials::hash_password;
use perkhub_core::{Coupon, User, UserRole, Voucher, MAX_CODE_ATTEMPTS};
use perkhub_db::{Database, DbConfig, DbError};

/// (title, category, coins, brand, face value, featured, description)
const CATALOG: &[(&str, &str, i64, &str, &str, bool, &str)] = &[
    ("Amazon Gift Card $25", "Shopping", 250, "Amazon", "$25.00", true,
     "Shop millions of products on Amazon with this digital gift card."),
    ("Starbucks $10 Gift Card", "Food & Beverage", 100, "Starbucks", "$10.00", true,
     "Coffee, tea and snacks at any participating Starbucks."),
    ("Netflix Premium 3 Months", "Entertainment", 450, "Netflix", "$45.00", true,
     "Three months of Netflix Premium streaming in Ultra HD."),
    ("Spotify Premium 6 Months", "Entertainment", 600, "Spotify", "$60.00", true,
     "Ad-free music streaming with offline downloads."),
    ("Apple App Store $15", "Technology", 150, "Apple", "$15.00", true,
     "Apps, games, music and more from the App Store."),
    ("Google Play Store $20", "Technology", 200, "Google", "$20.00", true,
     "Apps, games, movies and books on Google Play."),
    ("McDonald's Big Mac Meal", "Food & Beverage", 80, "McDonald's", "$8.00", false,
     "A classic Big Mac meal with fries and a drink."),
    ("Subway Footlong Sub", "Food & Beverage", 90, "Subway", "$9.00", false,
     "Any footlong sub with your favourite toppings."),
    ("Uber Ride Credit $15", "Transportation", 150, "Uber", "$15.00", false,
     "Ride credit for Uber trips in your city."),
    ("Steam Wallet $25", "Gaming", 250, "Steam", "$25.00", false,
     "Wallet funds for games and content on Steam."),
    ("Xbox Game Pass 3 Months", "Gaming", 450, "Xbox", "$45.00", false,
     "Hundreds of games on console and PC for three months."),
    ("Planet Fitness 1 Month", "Health & Fitness", 200, "Planet Fitness", "$20.00", false,
     "One month of gym access at any Planet Fitness."),
    ("Nike Store $40", "Fashion", 400, "Nike", "$40.00", false,
     "Shoes, apparel and accessories at Nike stores and online."),
    ("Barnes & Noble $20", "Education", 200, "Barnes & Noble", "$20.00", false,
     "Books, magazines and gifts in store or online."),
    ("Spa Day Relaxation Package", "Health & Wellness", 800, "Premium Spas", "$80.00", true,
     "A full spa day including massage and facial."),
    ("Fine Dining Experience", "Food & Beverage", 1000, "Premium Restaurants", "$100.00", true,
     "Three-course meal for two with wine pairing."),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = "./data/perkhub.db".to_string();
    let mut coupon_count: usize = 10;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                i += 1;
                db_path = args.get(i).context("--db needs a path")?.clone();
            }
            "--coupons" | "-c" => {
                i += 1;
                coupon_count = args
                    .get(i)
                    .context("--coupons needs a number")?
                    .parse()
                    .context("--coupons must be a number")?;
            }
            "--help" | "-h" => {
                println!("PerkHub Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./data/perkhub.db)");
                println!("  -c, --coupons <N>     Starter coupons to create (default: 10)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    println!("🌱 PerkHub Seed Data Generator");
    println!("==============================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} users");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Accounts
    let superadmin = account(
        "Super Admin",
        "superadmin@gmail.com",
        "superadmin",
        UserRole::Superadmin,
        100_000,
        None,
    )?;
    let admin = account(
        "Acme Admin",
        "admin@acme.test",
        "admin123",
        UserRole::CompanyAdmin,
        0,
        Some("Acme Corp"),
    )?;
    let employee = account(
        "Acme Employee",
        "employee@acme.test",
        "employee123",
        UserRole::Employee,
        0,
        Some("Acme Corp"),
    )?;
    db.users()
        .upsert_many(&[superadmin.clone(), admin, employee])
        .await?;
    println!("✓ Created 3 accounts (superadmin@gmail.com / superadmin)");

    // Catalog
    let now = Utc::now();
    for (title, category, coins, brand, face, featured, description) in CATALOG {
        let voucher = Voucher {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            coin_value: *coins,
            is_active: true,
            expiry_date: now + Duration::days(365),
            created_at: now,
            created_by: superadmin.id.clone(),
            image_url: None,
            featured: *featured,
            brand: Some(brand.to_string()),
            original_price: Some(face.to_string()),
        };
        db.vouchers().insert(&voucher).await?;
    }
    println!("✓ Created {} vouchers", db.vouchers().count().await?);

    // Starter coupons: 50, 100, ... 500, repeating
    println!();
    println!("Starter coupons:");
    let mut rng = rand::rng();
    for n in 0..coupon_count {
        let value = 50 * ((n as i64 % 10) + 1);
        let mut inserted = false;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let coupon = Coupon {
                id: Uuid::new_v4().to_string(),
                code: generate_code(&mut rng),
                value,
                is_used: false,
                redeemed_by: None,
                issued_at: Utc::now(),
                redeemed_at: None,
            };
            match db.coupons().insert(&coupon).await {
                Ok(()) => {
                    println!("  {}  {:>4} coins", coupon.code, value);
                    inserted = true;
                    break;
                }
                Err(e @ DbError::UniqueViolation { .. }) => {
                    eprintln!("  collision, retrying: {e}");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if !inserted {
            bail!("could not generate a unique coupon code");
        }
    }

    println!();
    println!("✓ Seed complete!");
    db.close().await;
    Ok(())
}

fn account(
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
    balance: i64,
    company: Option<&str>,
) -> anyhow::Result<User> {
    let now = Utc::now();
    Ok(User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: hash_password(password)?,
        role,
        coin_balance: balance,
        company_name: company.map(str::to_string),
        created_at: now,
        last_updated: now,
    })
}
