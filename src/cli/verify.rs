//! Decrypt the payload of a built artifact.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::config::Password;
use crate::core::GadashError;
use crate::crypto::decrypt;
use crate::embed::extract_payload;
use crate::extract::count_records;

/// Arguments of `gadash verify`.
#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// Artifact to check (default: the configured output_file)
    #[arg(value_name = "ARTIFACT")]
    pub artifact: Option<PathBuf>,
}

impl VerifyCommand {
    /// Extract and decrypt the embedded payload.
    ///
    /// # Errors
    ///
    /// Returns [`GadashError::PayloadNotFound`] when the artifact carries no
    /// payload and [`GadashError::Decryption`] on a wrong password or tampering.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let password = Password::from_env()?;
        let path = match self.artifact {
            Some(path) => path,
            None => cli.load_build_config().await?.output_file,
        };

        let artifact = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;

        let origin = path.display().to_string();
        let payload = extract_payload(&artifact, &origin)?;
        tracing::debug!("Payload: {} / {}, {} iterations", payload.cipher, payload.kdf, payload.iterations);

        let text = decrypt(&payload, password.expose())?;
        let records = count_records(&text).map_err(|e| GadashError::Decryption {
            reason: format!("decrypted data is not well-formed: {e}"),
        })?;

        if !cli.quiet {
            println!(
                "{} {} decrypts: {} records",
                "✓".green().bold(),
                path.display(),
                records
            );
        }
        Ok(())
    }
}
