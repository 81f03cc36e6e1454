//! Build cache inspection.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::cache::BuildCache;

/// Arguments of `gadash cache`.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: Option<CacheSubcommand>,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommand {
    /// Show the cache location and the stored entry (default)
    Info,
    /// Delete the cache directory
    Clear,
}

impl CacheCommand {
    /// Run the cache subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the cache cannot be
    /// removed.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_build_config().await?;
        let cache = BuildCache::with_dir(config.cache_dir);

        match self.command.unwrap_or(CacheSubcommand::Info) {
            CacheSubcommand::Info => {
                let info = cache.info();
                if cli.quiet {
                    return Ok(());
                }
                println!("{} {}", "Cache:".cyan(), info.dir.display());
                match info.entry {
                    Some(entry) => {
                        println!("  {:<10} {}", "Source:", entry.source_hash);
                        println!("  {:<10} {}", "Records:", entry.record_count);
                        println!("  {:<10} {} bytes", "Size:", info.size_bytes);
                    }
                    None if info.size_bytes > 0 => {
                        println!("  {}", "Entry is unreadable and will be ignored".yellow());
                    }
                    None => println!("  {}", "Empty".dimmed()),
                }
            }
            CacheSubcommand::Clear => {
                let removed = cache.clear()?;
                if !cli.quiet {
                    if removed {
                        println!("{} Cleared {}", "✓".green(), cache.cache_location().display());
                    } else {
                        println!("Cache is already empty");
                    }
                }
            }
        }
        Ok(())
    }
}
