//! Global constants used throughout the gadash codebase.
//!
//! Default locations, payload parameters, reserved marker text and parallelism
//! limits live here so that the configuration layer and the tests agree on them.

/// Default name of the optional project configuration file.
pub const CONFIG_FILE_NAME: &str = "gadash.toml";

/// Environment variable carrying the dashboard password. There is no fallback.
pub const PASSWORD_ENV_VAR: &str = "DASHBOARD_PASSWORD";

/// Default directory (relative to the project) searched for the source workbook.
pub const DEFAULT_INPUT_DIR: &str = "input";

/// Default fragment root containing `css/`, `html/` and `js/`.
pub const DEFAULT_TEMPLATE_DIR: &str = "template";

/// Default directory holding pre-fetched third-party scripts.
pub const DEFAULT_LIB_DIR: &str = "lib";

/// Default build cache directory.
pub const DEFAULT_CACHE_DIR: &str = ".build_cache";

/// Default artifact path.
pub const DEFAULT_OUTPUT_FILE: &str = "outputs/Indirect G&A Dashboard.html";

/// Sheet holding the cost detail rows.
pub const DEFAULT_SHEET_NAME: &str = "Cost Code Detail Report";

/// Default display format for the build timestamp (local time).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M %p UTC%:z";

/// PBKDF2 iteration count used when the configuration does not override it.
pub const DEFAULT_KDF_ITERATIONS: u32 = 200_000;

/// Lowest iteration count the configuration layer accepts.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Salt length in bytes (128 bits).
pub const SALT_LENGTH: usize = 16;

/// AES-GCM nonce length in bytes (96 bits).
pub const IV_LENGTH: usize = 12;

/// Derived key length in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// Payload format version written into every descriptor.
pub const PAYLOAD_VERSION: u32 = 1;

/// Cipher identifier expected by the client decryptor.
pub const CIPHER_ID: &str = "AES-256-GCM";

/// KDF identifier expected by the client decryptor.
pub const KDF_ID: &str = "PBKDF2-SHA256";

/// Reserved marker the document layout emits for the encrypted payload.
pub const PAYLOAD_MARKER: &str = "<!-- EMBEDDED_ENCRYPTED_PAYLOAD_JSON -->";

/// Reserved marker a script fragment carries where the build timestamp goes.
pub const TIMESTAMP_MARKER: &str = "<!-- DATA_TIMESTAMP -->";

/// Script variable the payload is assigned to.
pub const PAYLOAD_VARIABLE: &str = "encryptedPayload";

/// Minimum number of parallel fragment reads regardless of CPU count.
pub const MIN_PARALLELISM: usize = 10;

/// Multiplier applied to CPU core count for default parallelism.
pub const PARALLELISM_CORE_MULTIPLIER: usize = 2;

/// Default CPU core count when detection fails.
pub const FALLBACK_CORE_COUNT: usize = 4;

/// Default bound on concurrent fragment reads.
pub fn default_max_parallel() -> usize {
    let cores = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(FALLBACK_CORE_COUNT);
    std::cmp::max(MIN_PARALLELISM, cores * PARALLELISM_CORE_MULTIPLIER)
}
