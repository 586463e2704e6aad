//! Database seeder for Paylink development and testing.
//!
//! Seeds a demo company with a fixed API key and one sample invoice so the
//! client app and portal can be exercised locally.
//!
//! Usage: cargo run --bin seeder

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use paylink_db::entities::{companies, invoices};
use paylink_shared::token::generate_token;

/// Demo company ID (consistent for all seeds)
const DEMO_COMPANY_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Demo API key; development only, never valid in production config
const DEMO_API_KEY: &str =
    "0000000000000000000000000000000000000000000000000000000000000001";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = paylink_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding demo company...");
    seed_demo_company(&db).await;

    println!("Seeding sample invoice...");
    seed_sample_invoice(&db).await;

    println!("Seeding complete!");
    println!("  Demo API key: {DEMO_API_KEY}");
}

fn demo_company_id() -> Uuid {
    Uuid::parse_str(DEMO_COMPANY_ID).unwrap()
}

/// Seeds the demo company for development.
async fn seed_demo_company(db: &DatabaseConnection) {
    // Check if the company already exists
    if companies::Entity::find_by_id(demo_company_id())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Demo company already exists, skipping...");
        return;
    }

    let now = chrono::Utc::now().into();
    let company = companies::ActiveModel {
        id: Set(demo_company_id()),
        name: Set("Acme Consulting".to_string()),
        logo_url: Set(None),
        api_key: Set(DEMO_API_KEY.to_string()),
        contact_email: Set(Some("billing@acme.test".to_string())),
        stripe_account_id: Set(None),
        stripe_charges_enabled: Set(false),
        paypal_merchant_id: Set(None),
        paypal_email: Set(None),
        square_merchant_id: Set(None),
        square_access_token: Set(None),
        square_location_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    if let Err(e) = company.insert(db).await {
        eprintln!("Failed to insert demo company: {e}");
    } else {
        println!("  Created demo company: Acme Consulting");
    }
}

/// Seeds one open sample invoice.
async fn seed_sample_invoice(db: &DatabaseConnection) {
    let existing = invoices::Entity::find()
        .one(db)
        .await
        .ok()
        .flatten();
    if existing.is_some() {
        println!("  Invoices already present, skipping...");
        return;
    }

    let now = chrono::Utc::now();
    let invoice = invoices::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(demo_company_id()),
        invoice_number: Set("INV-1001".to_string()),
        invoice_token: Set(generate_token()),
        customer_token: Set(generate_token()),
        customer_name: Set("Ada Lovelace".to_string()),
        customer_email: Set(Some("ada@example.com".to_string())),
        payload: Set(serde_json::json!({
            "lines": [
                {"description": "Consulting, June", "amount": "120.00"},
                {"description": "Travel", "amount": "30.00"}
            ],
            "notes": "Thank you for your business."
        })),
        status: Set("sent".to_string()),
        total_amount: Set(Decimal::new(15000, 2)),
        balance_due: Set(Decimal::new(15000, 2)),
        currency: Set("USD".to_string()),
        due_date: Set(Some((now + chrono::Duration::days(30)).date_naive())),
        viewed_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    match invoice.insert(db).await {
        Err(e) => eprintln!("Failed to insert sample invoice: {e}"),
        Ok(created) => {
            println!("  Created invoice INV-1001");
            println!("  Portal token: {}", created.invoice_token);
        }
    }
}
