use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

pub const DEFAULT_LOG_PATH: &str = "logs/dicomstore.log";
pub const DEFAULT_STORAGE_DIR: &str = "./dicomFiles";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ip: String,
    pub port: u16,
    pub log_path: PathBuf,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub security: Option<SecurityConfig>,
}

/// Configuration as read from the layered sources.
///
/// A plain `{ "ip", "port", "logPath" }` file is accepted as-is. The camelCase
/// key is kept apart from `log_path` so both spellings can coexist across
/// layers; the snake_case one (also what environment variables produce) wins.
#[derive(Debug, Deserialize)]
struct RawConfig {
    ip: String,
    port: u16,
    log_path: Option<PathBuf>,
    #[serde(rename = "logPath", alias = "logpath")]
    log_path_legacy: Option<PathBuf>,
    #[serde(alias = "storageDir", alias = "storagedir")]
    storage_dir: Option<PathBuf>,
    max_upload_bytes: usize,
    security: Option<SecurityConfig>,
}

impl RawConfig {
    fn resolve(self) -> AppConfig {
        AppConfig {
            ip: self.ip,
            port: self.port,
            log_path: self.log_path.or(self.log_path_legacy).unwrap_or_else(|| DEFAULT_LOG_PATH.into()),
            storage_dir: self.storage_dir.unwrap_or_else(|| DEFAULT_STORAGE_DIR.into()),
            max_upload_bytes: self.max_upload_bytes,
            security: self.security,
        }
    }
}

impl AppConfig {
    /// The socket to bind. `ip` may be an IPv4 or IPv6 literal.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr =
            self.ip.trim().parse().map_err(|e| anyhow::anyhow!("invalid ip {:?}: {}", self.ip, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        match defaults().build() {
            Ok(cfg) => match cfg.try_deserialize::<RawConfig>() {
                Ok(raw) => raw.resolve(),
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

fn defaults() -> ConfigBuilder<DefaultState> {
    ::config::Config::builder().add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
}

type FileLayer = ::config::File<::config::FileSourceFile, ::config::FileFormat>;

/// Stacks `files` and optionally the environment on the embedded defaults, then
/// resolves and validates.
fn load_layers(files: Vec<FileLayer>, with_env: bool) -> anyhow::Result<AppConfig> {
    let mut builder = defaults();
    for file in files {
        builder = builder.add_source(file);
    }
    // Environment variables last to have highest precedence
    if with_env {
        builder = builder.add_source(::config::Environment::with_prefix("DICOMSTORE").separator("__"));
    }

    let app_cfg = builder.build()?.try_deserialize::<RawConfig>()?.resolve();
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Loads the layered configuration: embedded defaults, then `config.{json,toml}`
/// in the working directory, then the file named by `DICOMSTORE_CONFIG`, then
/// `DICOMSTORE__*` environment variables.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut files = vec![::config::File::with_name("config").required(false)];
    if let Some(custom_path) = std::env::var_os("DICOMSTORE_CONFIG") {
        files.push(::config::File::from(PathBuf::from(custom_path)).required(true));
    }
    load_layers(files, true)
}

/// Loads the embedded defaults overlaid with a single file, without the
/// environment layer. Format is taken from the file extension.
pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    load_layers(vec![::config::File::from(path)], false)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    if cfg.port == 0 {
        return Err(anyhow::anyhow!("invalid port: {}", cfg.port));
    }
    #[cfg(unix)]
    if cfg.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.port);
    }
    cfg.listen_addr()?;
    if cfg.log_path.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("log_path must not be empty"));
    }
    if cfg.storage_dir.as_os_str().is_empty() {
        return Err(anyhow::anyhow!("storage_dir must not be empty"));
    }
    if cfg.max_upload_bytes == 0 {
        return Err(anyhow::anyhow!("max_upload_bytes must be > 0"));
    }
    Ok(())
}
