use crate::backend::redis_provider::redact_connection_string;
use crate::cli::{load_config, ConfigArgs};
use crate::config::{BackendType, FeedCacheConfig};
use anyhow::Result;
use secrecy::ExposeSecret;

pub fn execute(args: &ConfigArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    println!("✅ Configuration is valid: {}\n", args.config.display());
    print_config(&config);
    Ok(())
}

fn print_config(config: &FeedCacheConfig) {
    let or_disabled = |v: u64| {
        if v == 0 {
            "disabled".to_string()
        } else {
            v.to_string()
        }
    };

    println!("Feed:                     {}", config.name);
    println!("Load limit:               {}", config.load_limit);
    println!("Refresh threshold:        {}", or_disabled(config.refresh_threshold));
    println!(
        "Refresh interval (secs):  {}",
        or_disabled(config.refresh_interval_secs)
    );
    println!(
        "Max consecutive failures: {}",
        match config.max_consecutive_failures {
            0 => "never escalate".to_string(),
            n => n.to_string(),
        }
    );
    println!(
        "Serialization:            {:?}{}",
        config.serialization,
        if config.compress { " (gzip)" } else { "" }
    );

    match config.backend {
        BackendType::Memory => {
            println!("Backend:                  memory");
            println!("  max_capacity:           {}", config.memory.max_capacity);
        }
        BackendType::Redis => {
            println!("Backend:                  redis");
            if let Some(redis) = &config.redis {
                println!("  mode:                   {:?}", redis.mode);
                println!(
                    "  connection:             {}",
                    redact_connection_string(redis.connection_string.expose_secret())
                );
                println!("  command_timeout_ms:     {}", redis.command_timeout_ms);
                println!("  tls:                    {}", redis.enable_tls);
            }
        }
    }
}
