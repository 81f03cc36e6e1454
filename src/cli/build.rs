//! Build the dashboard artifact.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::build::{BuildOptions, BuildReport, CacheOutcome, run_build};
use crate::config::Password;

/// Arguments of `gadash build`.
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Write the artifact here instead of the configured output_file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Neither read nor update the build cache
    #[arg(long)]
    pub no_cache: bool,

    /// Delete the build cache before building
    #[arg(long)]
    pub clear_cache: bool,
}

impl BuildCommand {
    /// Run the build.
    ///
    /// The password is resolved first, so a missing secret fails before any
    /// file is read.
    ///
    /// # Errors
    ///
    /// Returns the first fatal pipeline error.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let password = Password::from_env()?;

        let mut config = cli.load_build_config().await?;
        if let Some(output) = self.output {
            config.output_file = output;
        }

        let options = BuildOptions {
            no_cache: self.no_cache,
            clear_cache: self.clear_cache,
        };
        let report = run_build(&config, &password, options).await?;

        if !cli.quiet {
            print_summary(&report);
        }
        Ok(())
    }
}

fn print_summary(report: &BuildReport) {
    let cache = match report.cache {
        CacheOutcome::Hit => "hit".green(),
        CacheOutcome::Miss => "miss".yellow(),
        CacheOutcome::Disabled => "disabled".dimmed(),
    };
    let libraries = format!("{}/{}", report.libraries.inlined_count(), report.libraries.outcomes.len());

    println!("{} {}", "✓".green().bold(), "Dashboard built".bold());
    println!("  {:<12} {}", "Source:".cyan(), report.source.display());
    println!("  {:<12} {}", "Records:".cyan(), report.record_count);
    println!("  {:<12} {}", "Cache:".cyan(), cache);
    println!("  {:<12} {}", "Libraries:".cyan(), libraries);
    println!(
        "  {:<12} {} ({})",
        "Output:".cyan(),
        report.output.display(),
        format_size(report.output_bytes)
    );
    println!("  {:<12} {}", "Data as of:".cyan(), report.timestamp);
    println!("  {:<12} {:.2}s", "Elapsed:".cyan(), report.elapsed.as_secs_f64());

    if !report.missing_fragments.is_empty() {
        println!(
            "  {} {} template fragment(s) missing, see warnings",
            "!".yellow().bold(),
            report.missing_fragments.len()
        );
    }
}

fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= KIB * KIB {
        format!("{:.1} MiB", bytes_f / (KIB * KIB))
    } else if bytes_f >= KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{bytes} bytes")
    }
}
