use celebration_site::common::models::{Collection, record_id};
use celebration_site::server::database::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let db_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:data/celebration.db".to_string());
    println!("Connecting to {}", db_url);
    let db = Database::connect(&db_url).await?;
    db.migrate().await?;

    for collection in Collection::ALL {
        let records = db.list(collection).await?;
        println!("\n-- {} ({} records) --", collection, records.len());
        for record in records.iter().rev().take(10) {
            let id = record_id(record).unwrap_or("?");
            let label = ["title", "name", "siteTitle", "path"]
                .iter()
                .find_map(|f| record.get(*f).and_then(|v| v.as_str()))
                .unwrap_or("");
            println!("id={} {} ({} bytes)", id, label, record.to_string().len());
        }
    }

    Ok(())
}
