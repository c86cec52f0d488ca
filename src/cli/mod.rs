//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::FeedCacheConfig;
use crate::telemetry::init_tracing;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "feedcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, global = true, help = "Log filter directives (overrides RUST_LOG)")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "inspect", about = "Print index entries and cached items of a feed")]
    Inspect(InspectArgs),

    #[command(name = "clear", about = "Delete the feed index and all cached items")]
    Clear(ClearArgs),

    #[command(name = "config", about = "Validate and print a feed configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    #[arg(short, long, help = "Path to the feed configuration file")]
    pub config: PathBuf,

    #[arg(short = 'n', long, default_value_t = 20, help = "Number of entries to print")]
    pub count: usize,

    #[arg(long, default_value_t = 0, help = "Cursor returned by a previous page (0 = first page)")]
    pub cursor: i64,

    #[arg(short, long, help = "Print full item bodies as JSON")]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct ClearArgs {
    #[arg(short, long, help = "Path to the feed configuration file")]
    pub config: PathBuf,

    #[arg(short, long, help = "Skip the confirmation prompt")]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[arg(short, long, help = "Path to the feed configuration file")]
    pub config: PathBuf,
}

mod clear;
mod config;
mod inspect;

pub(crate) fn load_config(path: &Path) -> Result<FeedCacheConfig> {
    FeedCacheConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("feedcache", cli.log.as_deref());

    match &cli.command {
        Commands::Inspect(args) => inspect::execute(args).await,
        Commands::Clear(args) => clear::execute(args).await,
        Commands::Config(args) => config::execute(args),
    }
}
