use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pipeline::chunking::ChunkerConfig;

/// Application-level constants
pub const APP_NAME: &str = "TenderLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// 50MB per uploaded file.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;
/// 200MB per analysis run, summed over every input.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 200 * 1024 * 1024;
pub const DEFAULT_ZIP_MAX_ENTRIES: usize = 100;
pub const DEFAULT_ZIP_MAX_UNCOMPRESSED_BYTES: u64 = 200 * 1024 * 1024;

/// Default log filter for the tracing subscriber when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,tenderlens_lib=debug,tenderlens=debug"
    } else {
        "warn,tenderlens_lib=info,tenderlens=info"
    }
}

/// ~/TenderLens/ on all platforms. Falls back to the working directory
/// when no home directory can be resolved.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory for persisted analysis blobs.
pub fn analyses_dir() -> PathBuf {
    app_data_dir().join("analyses")
}

/// Engine configuration, built once at process start and passed down by
/// reference. Nothing below the binary reads environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ollama_url: String,
    pub model: String,
    pub llm_timeout_secs: u64,
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
    pub zip_max_entries: usize,
    pub zip_max_uncompressed_bytes: u64,
    pub parallel_extraction: bool,
    pub store_dir: PathBuf,
    pub chunk: ChunkerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
            llm_timeout_secs: 120,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            zip_max_entries: DEFAULT_ZIP_MAX_ENTRIES,
            zip_max_uncompressed_bytes: DEFAULT_ZIP_MAX_UNCOMPRESSED_BYTES,
            parallel_extraction: true,
            store_dir: analyses_dir(),
            chunk: ChunkerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `TENDERLENS_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but with an injectable lookup, so tests don't
    /// mutate process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("TENDERLENS_OLLAMA_URL").filter(|v| !v.trim().is_empty()) {
            config.ollama_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("TENDERLENS_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("TENDERLENS_LLM_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.llm_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid TENDERLENS_LLM_TIMEOUT_SECS"),
            }
        }
        if let Some(dir) = lookup("TENDERLENS_STORE_DIR").filter(|v| !v.trim().is_empty()) {
            config.store_dir = PathBuf::from(dir);
        }

        config
    }
}
