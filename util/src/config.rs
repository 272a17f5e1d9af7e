//! Global application configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};

/// Represents the complete application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub ocr_url: String,
    pub plagiarism_url: String,
    pub rag_url: String,
    pub ocr_timeout_secs: u64,
    pub plagiarism_timeout_secs: u64,
    pub rag_timeout_secs: u64,
    pub rag_train_timeout_secs: u64,
    pub worker_concurrency: usize,
    pub correctness_concurrency: usize,
    pub scheduler_poll_secs: u64,
    pub task_max_attempts: u32,
    pub task_retry_backoff_secs: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            env: var_or("APP_ENV", "development"),
            project_name: var_or("PROJECT_NAME", "classroom-grader"),
            log_level: var_or("LOG_LEVEL", "api=info,grader=info"),
            log_file: var_or("LOG_FILE", "grader.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            database_path: var_or("DATABASE_PATH", "data/grader.db"),
            host: var_or("HOST", "127.0.0.1"),
            port: parsed_or("PORT", 3000),
            ocr_url: var_or("OCR_URL", "http://localhost:8001/pdf"),
            plagiarism_url: var_or(
                "PLAGIARISM_URL",
                "http://localhost:8002/api/plagiarism/check",
            ),
            rag_url: var_or("RAG_URL", "http://localhost:8003"),
            ocr_timeout_secs: parsed_or("OCR_TIMEOUT_SECS", 60),
            plagiarism_timeout_secs: parsed_or("PLAGIARISM_TIMEOUT_SECS", 120),
            rag_timeout_secs: parsed_or("RAG_TIMEOUT_SECS", 420),
            rag_train_timeout_secs: parsed_or("RAG_TRAIN_TIMEOUT_SECS", 120),
            worker_concurrency: parsed_or("WORKER_CONCURRENCY", 4),
            correctness_concurrency: parsed_or("CORRECTNESS_CONCURRENCY", 4),
            scheduler_poll_secs: parsed_or("SCHEDULER_POLL_SECS", 5),
            task_max_attempts: parsed_or("TASK_MAX_ATTEMPTS", 3),
            task_retry_backoff_secs: parsed_or("TASK_RETRY_BACKOFF_SECS", 10),
        }
    }

    /// Returns a shared reference to the global configuration.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn global() -> std::sync::RwLockReadGuard<'static, AppConfig> {
        CONFIG_INSTANCE
            .get_or_init(|| RwLock::new(AppConfig::from_env()))
            .read()
            .expect("Failed to acquire AppConfig read lock")
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        if let Some(lock) = CONFIG_INSTANCE.get() {
            if let Ok(mut guard) = lock.write() {
                *guard = AppConfig::from_env();
            }
        }
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = lock
            .write()
            .expect("Failed to acquire AppConfig write lock");
        setter(&mut guard);
    }

    // --- Per-field setters below ---

    pub fn set_env(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.env = value.into());
    }

    pub fn set_log_level(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.log_level = value.into());
    }

    pub fn set_database_path(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.database_path = value.into());
    }

    pub fn set_ocr_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.ocr_url = value.into());
    }

    pub fn set_plagiarism_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.plagiarism_url = value.into());
    }

    pub fn set_rag_url(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.rag_url = value.into());
    }

    pub fn set_worker_concurrency(value: usize) {
        AppConfig::set_field(|cfg| cfg.worker_concurrency = value);
    }

    pub fn set_task_retry_backoff_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.task_retry_backoff_secs = value);
    }
}

// --- Free accessors, mirroring the fields above ---

pub fn env() -> String {
    AppConfig::global().env.clone()
}

pub fn project_name() -> String {
    AppConfig::global().project_name.clone()
}

pub fn log_level() -> String {
    AppConfig::global().log_level.clone()
}

pub fn log_file() -> String {
    AppConfig::global().log_file.clone()
}

pub fn log_to_stdout() -> bool {
    AppConfig::global().log_to_stdout
}

pub fn database_path() -> String {
    AppConfig::global().database_path.clone()
}

pub fn host() -> String {
    AppConfig::global().host.clone()
}

pub fn port() -> u16 {
    AppConfig::global().port
}

pub fn ocr_url() -> String {
    AppConfig::global().ocr_url.clone()
}

pub fn plagiarism_url() -> String {
    AppConfig::global().plagiarism_url.clone()
}

pub fn rag_url() -> String {
    AppConfig::global().rag_url.clone()
}

pub fn ocr_timeout_secs() -> u64 {
    AppConfig::global().ocr_timeout_secs
}

pub fn plagiarism_timeout_secs() -> u64 {
    AppConfig::global().plagiarism_timeout_secs
}

pub fn rag_timeout_secs() -> u64 {
    AppConfig::global().rag_timeout_secs
}

pub fn rag_train_timeout_secs() -> u64 {
    AppConfig::global().rag_train_timeout_secs
}

pub fn worker_concurrency() -> usize {
    AppConfig::global().worker_concurrency.max(1)
}

pub fn correctness_concurrency() -> usize {
    AppConfig::global().correctness_concurrency.max(1)
}

pub fn scheduler_poll_secs() -> u64 {
    AppConfig::global().scheduler_poll_secs.max(1)
}

pub fn task_max_attempts() -> u32 {
    AppConfig::global().task_max_attempts.max(1)
}

pub fn task_retry_backoff_secs() -> u64 {
    AppConfig::global().task_retry_backoff_secs
}
