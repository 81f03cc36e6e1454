//! Build pipeline orchestration.
//!
//! ```text
//! source workbook ──► cache lookup ──hit──────────────┐
//!                         │ miss                       ▼
//!                         └──► extract ──► store ──► canonical text ──► encrypt ─┐
//!                                                                                ├─► embed ──► write
//! template tree ──► assemble ──► inline libraries ───────────────────────────────┘
//! ```
//!
//! The data path (hash, cache, extract, encrypt) and the document path (assemble,
//! inline) share nothing and run concurrently. Every fatal error carries the
//! [`BuildStage`] it came from, and nothing is written to the output path unless
//! every stage succeeded.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::assemble::Assembler;
use crate::assemble::inline::{InlineReport, inline_libraries};
use crate::cache::{BuildCache, CacheEntry};
use crate::config::{BuildConfig, Password};
use crate::core::GadashError;
use crate::crypto::encrypt;
use crate::embed::embed;
use crate::extract::{CanonicalTable, extract_workbook};
use crate::rules::DerivationRules;
use crate::utils::fs::{atomic_write, content_checksum, find_files_with_extension};

/// Extension of source workbooks.
const SOURCE_EXTENSION: &str = "xlsx";

/// Pipeline stage, used to label fatal errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Locating the source workbook
    Discover,
    /// Hashing the source and consulting the cache
    Cache,
    /// Reading and transforming the workbook
    Extract,
    /// Loading fragments and rendering the document
    Assemble,
    /// Substituting library references
    Inline,
    /// Encrypting the dataset
    Encrypt,
    /// Filling the insertion points
    Embed,
    /// Writing the artifact
    Write,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Discover => "discover",
            BuildStage::Cache => "cache",
            BuildStage::Extract => "extract",
            BuildStage::Assemble => "assemble",
            BuildStage::Inline => "inline",
            BuildStage::Encrypt => "encrypt",
            BuildStage::Embed => "embed",
            BuildStage::Write => "write",
        };
        f.write_str(name)
    }
}

fn stage_failed(stage: BuildStage) -> String {
    format!("Build failed during the {stage} stage")
}

/// Per-run switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Skip cache lookup and store for this run
    pub no_cache: bool,
    /// Remove the cache directory before the run
    pub clear_cache: bool,
}

/// How the dataset was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Reused the stored transform
    Hit,
    /// Transformed the workbook and stored the result
    Miss,
    /// Caching was disabled for this run
    Disabled,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOutcome::Hit => write!(f, "hit"),
            CacheOutcome::Miss => write!(f, "miss"),
            CacheOutcome::Disabled => write!(f, "disabled"),
        }
    }
}

/// Summary of a successful build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Workbook that was used
    pub source: PathBuf,
    /// `sha256:<hex>` of the workbook bytes
    pub source_hash: String,
    /// Number of data records embedded
    pub record_count: usize,
    /// `sha256:<hex>` of the canonical text that was encrypted
    pub dataset_hash: String,
    /// Cache result
    pub cache: CacheOutcome,
    /// Artifact path
    pub output: PathBuf,
    /// Artifact size in bytes
    pub output_bytes: usize,
    /// Timestamp text embedded in the artifact
    pub timestamp: String,
    /// Fragments that were absent
    pub missing_fragments: Vec<String>,
    /// Library inlining results
    pub libraries: InlineReport,
    /// Wall-clock duration
    pub elapsed: Duration,
}

/// Pick the source workbook in `input_dir`.
///
/// Candidates are `.xlsx` files (any case) directly in the directory, excluding
/// `~$` lock files, sorted by file name. The first is used; any others are
/// listed in a warning.
///
/// # Errors
///
/// Returns [`GadashError::SourceNotFound`] when there is no candidate.
pub fn find_source_file(input_dir: &Path) -> Result<PathBuf> {
    let candidates = find_files_with_extension(input_dir, SOURCE_EXTENSION)?;

    let mut iter = candidates.into_iter();
    let Some(first) = iter.next() else {
        return Err(GadashError::SourceNotFound {
            dir: input_dir.display().to_string(),
        }
        .into());
    };

    let others: Vec<String> = iter
        .map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default())
        .collect();
    if !others.is_empty() {
        tracing::warn!(
            "Multiple workbooks in {}; using {} and ignoring: {}",
            input_dir.display(),
            first.display(),
            others.join(", ")
        );
    }

    Ok(first)
}

/// Obtain the canonical dataset, through the cache when enabled.
///
/// Blocking: hashes and possibly parses the whole workbook.
///
/// # Errors
///
/// Returns an error if the workbook cannot be hashed or extracted. Cache
/// failures are logged and never returned.
pub fn load_dataset(
    source: &Path,
    sheet_name: &str,
    rules: &DerivationRules,
    cache: Option<&BuildCache>,
) -> Result<(CanonicalTable, String, CacheOutcome)> {
    // hash and extract the same bytes so the cache key matches the rows
    let bytes = std::fs::read(source)
        .map_err(|e| GadashError::SourceRead {
            path: source.display().to_string(),
            reason: e.to_string(),
        })
        .with_context(|| stage_failed(BuildStage::Cache))?;
    let source_hash = content_checksum(&bytes);
    tracing::debug!("Source hash: {}", source_hash);

    let Some(cache) = cache else {
        let table = extract_workbook(bytes, source, sheet_name, rules)
            .with_context(|| stage_failed(BuildStage::Extract))?;
        return Ok((table, source_hash, CacheOutcome::Disabled));
    };

    let fingerprint = rules.fingerprint();
    if let Some(table) = cache.lookup(&source_hash, &fingerprint) {
        tracing::info!("Using cached dataset ({} records, workbook unchanged)", table.record_count);
        return Ok((table, source_hash, CacheOutcome::Hit));
    }

    let table = extract_workbook(bytes, source, sheet_name, rules)
        .with_context(|| stage_failed(BuildStage::Extract))?;

    let entry = CacheEntry::new(source_hash.clone(), fingerprint, &table);
    match cache.store(&entry) {
        Ok(()) => tracing::debug!("Cached dataset in {}", cache.cache_location().display()),
        Err(e) => tracing::warn!("Could not update build cache: {e:#}"),
    }

    Ok((table, source_hash, CacheOutcome::Miss))
}

/// Run the whole pipeline and write the artifact.
///
/// # Errors
///
/// Returns the first fatal error, labelled with its [`BuildStage`]. The output
/// path is untouched on failure.
pub async fn run_build(
    config: &BuildConfig,
    password: &Password,
    options: BuildOptions,
) -> Result<BuildReport> {
    let started = Instant::now();
    let cache = BuildCache::with_dir(config.cache_dir.clone());

    if options.clear_cache
        && cache.clear().with_context(|| stage_failed(BuildStage::Cache))?
    {
        tracing::info!("Cleared build cache at {}", cache.cache_location().display());
    }

    let source = find_source_file(&config.input_dir)
        .with_context(|| stage_failed(BuildStage::Discover))?;
    tracing::info!("Using source workbook {}", source.display());

    let data = {
        let source = source.clone();
        let sheet_name = config.sheet_name.clone();
        let rules = config.rules();
        let cache = (!options.no_cache).then(|| cache.clone());
        let password = password.clone();
        let iterations = config.crypto.iterations;
        tokio::task::spawn_blocking(move || -> Result<_> {
            let (table, source_hash, outcome) =
                load_dataset(&source, &sheet_name, &rules, cache.as_ref())?;
            let payload = encrypt(&table.text, password.expose(), iterations)
                .with_context(|| stage_failed(BuildStage::Encrypt))?;
            Ok((table, source_hash, outcome, payload))
        })
    };

    let document = async {
        let assembler = Assembler::new(
            config.template_dir.clone(),
            config.fragments.clone(),
            config.max_parallel,
        );
        let assembled =
            assembler.assemble().await.with_context(|| stage_failed(BuildStage::Assemble))?;
        let missing: Vec<String> = assembled.missing().map(|f| f.path.display().to_string()).collect();
        let (html, libraries) = inline_libraries(assembled.html, &config.lib_dir)
            .with_context(|| stage_failed(BuildStage::Inline))?;
        Ok::<_, anyhow::Error>((html, missing, libraries))
    };

    let (data, (html, missing_fragments, libraries)) = tokio::try_join!(
        async { data.await.context("Dataset task failed").and_then(std::convert::identity) },
        document
    )?;
    let (table, source_hash, cache_outcome, payload) = data;

    let timestamp = Local::now().format(&config.timestamp_format).to_string();
    let artifact =
        embed(html, &payload, &timestamp).with_context(|| stage_failed(BuildStage::Embed))?;

    atomic_write(&config.output_file, artifact.as_bytes())
        .with_context(|| stage_failed(BuildStage::Write))?;
    tracing::info!("Wrote {} ({} bytes)", config.output_file.display(), artifact.len());

    Ok(BuildReport {
        source,
        source_hash,
        record_count: table.record_count,
        dataset_hash: content_checksum(table.text.as_bytes()),
        cache: cache_outcome,
        output: config.output_file.clone(),
        output_bytes: artifact.len(),
        timestamp,
        missing_fragments,
        libraries,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CryptoConfig;
    use crate::constants::MIN_KDF_ITERATIONS;
    use crate::crypto::decrypt;
    use crate::embed::extract_payload;
    use crate::test_utils::fixtures::{TemplateFixture, write_sample_workbook};
    use crate::test_utils::init_test_logging;
    use tempfile::TempDir;

    const PASSWORD: &str = "correct horse";

    fn project() -> (TempDir, BuildConfig) {
        project_with(TemplateFixture::standard())
    }

    fn project_with(templates: TemplateFixture) -> (TempDir, BuildConfig) {
        init_test_logging(None);
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write_sample_workbook(&root.join("input/cost_detail.xlsx"));
        templates.write_to(root);
        let config = BuildConfig {
            max_parallel: 4,
            crypto: CryptoConfig {
                iterations: MIN_KDF_ITERATIONS,
            },
            ..BuildConfig::default()
        }
        .resolved(root);
        (temp, config)
    }

    fn password() -> Password {
        Password::from_lookup(|_| Some(PASSWORD.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_second_build_hits_cache_with_identical_dataset() {
        let (_temp, config) = project();

        let cold = run_build(&config, &password(), BuildOptions::default()).await.unwrap();
        let cold_artifact = std::fs::read_to_string(&cold.output).unwrap();
        let warm = run_build(&config, &password(), BuildOptions::default()).await.unwrap();
        let warm_artifact = std::fs::read_to_string(&warm.output).unwrap();

        assert_eq!(cold.cache, CacheOutcome::Miss);
        assert_eq!(warm.cache, CacheOutcome::Hit);
        assert_eq!(cold.record_count, warm.record_count);
        assert_eq!(cold.dataset_hash, warm.dataset_hash);

        let cold_text = decrypt(&extract_payload(&cold_artifact, "cold").unwrap(), PASSWORD).unwrap();
        let warm_text = decrypt(&extract_payload(&warm_artifact, "warm").unwrap(), PASSWORD).unwrap();
        assert_eq!(cold_text, warm_text);
    }

    #[tokio::test]
    async fn test_build_embeds_everything() {
        let (_temp, config) = project();
        let report = run_build(&config, &password(), BuildOptions {
            no_cache: true,
            clear_cache: false,
        })
        .await
        .unwrap();

        assert_eq!(report.cache, CacheOutcome::Disabled);
        assert_eq!(report.record_count, 4);
        assert!(!config.cache_dir.exists());

        let artifact = std::fs::read_to_string(&report.output).unwrap();
        assert!(!artifact.contains(crate::constants::PAYLOAD_MARKER));
        assert!(!artifact.contains(crate::constants::TIMESTAMP_MARKER));
        assert!(artifact.contains(&report.timestamp));
        assert!(!artifact.contains("https://cdn.jsdelivr.net"));

        let text = decrypt(&extract_payload(&artifact, "artifact").unwrap(), PASSWORD).unwrap();
        assert!(text.starts_with("Document Type,Cost Type,Job,G/L Date,Amount,Category"));
        assert!(text.contains("711 - Fuel"));
        assert!(!text.contains("Grand Total"));
    }

    #[tokio::test]
    async fn test_missing_marker_writes_nothing() {
        // a script set without the timestamp-bearing fragment
        let (_temp, config) =
            project_with(TemplateFixture::standard().without_file("template/js/init.js"));

        let err = run_build(&config, &password(), BuildOptions::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GadashError>(),
            Some(GadashError::MarkerNotFound { .. })
        ));
        assert!(format!("{err:#}").contains("embed stage"));
        assert!(!config.output_file.exists());
    }

    #[tokio::test]
    async fn test_no_source_workbook() {
        let (temp, config) = project();
        std::fs::remove_file(temp.path().join("input/cost_detail.xlsx")).unwrap();

        let err = run_build(&config, &password(), BuildOptions::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GadashError>(),
            Some(GadashError::SourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear_cache_forces_transform() {
        let (_temp, config) = project();
        run_build(&config, &password(), BuildOptions::default()).await.unwrap();

        let report = run_build(&config, &password(), BuildOptions {
            no_cache: false,
            clear_cache: true,
        })
        .await
        .unwrap();
        assert_eq!(report.cache, CacheOutcome::Miss);
    }

    #[test]
    fn test_cached_hash_matches_extracted_bytes() {
        let (temp, config) = project();
        let source = temp.path().join("input/cost_detail.xlsx");
        let cache = BuildCache::with_dir(config.cache_dir.clone());
        let rules = config.rules();

        let (table, source_hash, outcome) =
            load_dataset(&source, &config.sheet_name, &rules, Some(&cache)).unwrap();
        assert_eq!(outcome, CacheOutcome::Miss);
        assert_eq!(source_hash, content_checksum(&std::fs::read(&source).unwrap()));

        let cached = cache.lookup(&source_hash, &rules.fingerprint()).unwrap();
        assert_eq!(cached.text, table.text);
    }

    #[tokio::test]
    async fn test_failed_cache_clear_names_stage() {
        let (_temp, config) = project();
        // a regular file where the cache directory should be
        std::fs::write(&config.cache_dir, "not a directory").unwrap();

        let err = run_build(&config, &password(), BuildOptions {
            no_cache: false,
            clear_cache: true,
        })
        .await
        .unwrap_err();
        assert!(format!("{err:#}").contains("cache stage"));
        assert!(!config.output_file.exists());
    }

    #[test]
    fn test_source_discovery_order() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("input");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(input.join("b.xlsx"), "").unwrap();
        std::fs::write(input.join("a.xlsx"), "").unwrap();
        std::fs::write(input.join("~$a.xlsx"), "").unwrap();

        assert_eq!(find_source_file(&input).unwrap(), input.join("a.xlsx"));
    }
}
