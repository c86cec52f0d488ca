use crate::backend::build_backend;
use crate::cli::{load_config, InspectArgs};
use crate::config::BackendType;
use crate::model::Cursor;
use crate::serialization::SerializerEnum;
use anyhow::{Context, Result};

pub async fn execute(args: &InspectArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    if config.backend == BackendType::Memory {
        println!(
            "Feed '{}' uses the in-memory backend; its state lives in the owning process only.",
            config.name
        );
        return Ok(());
    }

    let backend = build_backend(&config)
        .await
        .with_context(|| format!("Failed to connect to backend of feed '{}'", config.name))?;
    backend
        .ping()
        .await
        .context("Backend did not answer PING")?;
    let serializer = SerializerEnum::from_config(&config.serialization, config.compress);

    let total = backend.index_len().await?;
    let cursor = Cursor::new(args.cursor);
    let entries = backend.range_below(cursor, args.count).await?;

    println!("=== Feed '{}' ===", config.name);
    println!("Index size: {}", total);
    println!("Cursor:     {}\n", cursor);

    if entries.is_empty() {
        println!("No entries below cursor (readers would fall back to source).");
        return Ok(());
    }

    let ids: Vec<_> = entries.iter().map(|e| e.member).collect();
    let bodies = backend.get_items(&ids).await?;

    for (entry, body) in entries.iter().zip(bodies) {
        match body {
            None => println!("{:>15}  {:<12} <missing>", entry.score, entry.member),
            Some(bytes) => match serializer.decode_item(&bytes) {
                Ok(item) if args.verbose => {
                    println!("{:>15}  {:<12}", entry.score, entry.member);
                    println!("{}", serde_json::to_string_pretty(&item)?);
                }
                Ok(item) => println!(
                    "{:>15}  {:<12} {} (by {}, expires {})",
                    entry.score, entry.member, item.title, item.author_nickname, item.expires_at
                ),
                Err(e) => println!("{:>15}  {:<12} <undecodable: {}>", entry.score, entry.member, e),
            },
        }
    }

    if let Some(last) = entries.last() {
        println!("\nNext cursor: {}", last.score);
    }
    Ok(())
}
