use crate::backend::build_backend;
use crate::cli::{load_config, ClearArgs};
use crate::config::BackendType;
use anyhow::{Context, Result};
use std::io::Write;

pub async fn execute(args: &ClearArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    if config.backend == BackendType::Memory {
        println!(
            "Feed '{}' uses the in-memory backend; nothing to clear from here.",
            config.name
        );
        return Ok(());
    }

    if !args.yes {
        println!("Preparing to clear feed: {}", config.name);
        println!("  - index key {}:index", config.name);
        println!("  - item keys {}:item:*", config.name);
        print!("\nDo you want to continue? [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let backend = build_backend(&config)
        .await
        .with_context(|| format!("Failed to connect to backend of feed '{}'", config.name))?;
    backend.clear().await?;

    println!("\n✅ Feed '{}' cleared.", config.name);
    Ok(())
}
