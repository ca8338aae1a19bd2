use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: Some(4) }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 4000 }

/// Which object store implementation backs the roster adapter.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    GoogleDrive,
    /// In-process store, data is lost on restart.
    Memory,
}

/// How the root container is located.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RootMode {
    /// Root is a pre-provisioned shared drive identified by `shared_drive_id`.
    #[default]
    SharedDrive,
    /// Root is a folder named `root_folder_name`, searched for at runtime.
    NamedFolder,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub root_mode: RootMode,
    /// Service-account key as an inline JSON blob.
    #[serde(default)]
    pub credentials_json: Option<String>,
    /// Service-account key file, used when `credentials_json` is absent.
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default)]
    pub shared_drive_id: Option<String>,
    #[serde(default = "default_root_folder_name")]
    pub root_folder_name: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_upload_base")]
    pub upload_base: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            root_mode: RootMode::default(),
            credentials_json: None,
            credentials_path: None,
            shared_drive_id: None,
            root_folder_name: default_root_folder_name(),
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_root_folder_name() -> String { "Schools".into() }
fn default_api_base() -> String { "https://www.googleapis.com".into() }
fn default_upload_base() -> String { "https://www.googleapis.com".into() }
fn default_request_timeout() -> u64 { 30 }

/// Reads `CONFIG_PATH` (default `config.toml`); a missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    match std::fs::read_to_string(&path) {
        Ok(content) => parse(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

pub fn parse(content: &str) -> Result<AppConfig> {
    Ok(toml::from_str(content)?)
}

impl AppConfig {
    /// File, then environment overrides, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn normalize_and_validate<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.server.normalize(&lookup)?;
        self.store.normalize(&lookup)?;
        self.store.validate()?;
        Ok(())
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ServerConfig {
    fn normalize<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) -> Result<()> {
        if let Some(host) = non_empty(lookup("HOST")) {
            self.host = host;
        }
        if let Some(port) = non_empty(lookup("PORT")) {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(w) = non_empty(lookup("TOKIO_WORKER_THREADS")).and_then(|v| v.parse().ok()) {
            self.worker_threads = Some(w);
        }
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("server.port must be in 1..=65535".into()));
        }
        if matches!(self.worker_threads, None | Some(0)) {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl StoreConfig {
    fn normalize<F: Fn(&str) -> Option<String>>(&mut self, lookup: &F) -> Result<()> {
        if let Some(b) = non_empty(lookup("STORE_BACKEND")) {
            self.backend = match b.to_ascii_lowercase().as_str() {
                "google_drive" | "drive" => StoreBackend::GoogleDrive,
                "memory" => StoreBackend::Memory,
                other => return Err(ConfigError::Invalid(format!("unknown STORE_BACKEND: {other}"))),
            };
        }
        if let Some(m) = non_empty(lookup("ROOT_MODE")) {
            self.root_mode = match m.to_ascii_lowercase().as_str() {
                "shared_drive" => RootMode::SharedDrive,
                "named_folder" => RootMode::NamedFolder,
                other => return Err(ConfigError::Invalid(format!("unknown ROOT_MODE: {other}"))),
            };
        }
        if let Some(v) = non_empty(lookup("GOOGLE_SERVICE_ACCOUNT")) {
            self.credentials_json = Some(v);
        }
        if let Some(v) = non_empty(lookup("GOOGLE_SERVICE_ACCOUNT_FILE")) {
            self.credentials_path = Some(v);
        }
        if let Some(v) = non_empty(lookup("SHARED_DRIVE_ID")) {
            self.shared_drive_id = Some(v);
        }
        if let Some(v) = non_empty(lookup("ROOT_FOLDER_NAME")) {
            self.root_folder_name = v;
        }
        if let Some(v) = non_empty(lookup("DRIVE_TIMEOUT_SECS")) {
            self.request_timeout_secs = v
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("DRIVE_TIMEOUT_SECS is not a number: {v}")))?;
        }
        self.credentials_json = non_empty(self.credentials_json.take());
        self.credentials_path = non_empty(self.credentials_path.take());
        self.shared_drive_id = non_empty(self.shared_drive_id.take());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.root_mode == RootMode::SharedDrive && self.shared_drive_id.is_none() {
            return Err(ConfigError::Missing(
                "SHARED_DRIVE_ID is required when root_mode is shared_drive".into(),
            ));
        }
        if self.root_mode == RootMode::NamedFolder && self.root_folder_name.trim().is_empty() {
            return Err(ConfigError::Missing("root_folder_name is empty".into()));
        }
        if self.backend == StoreBackend::GoogleDrive
            && self.credentials_json.is_none()
            && self.credentials_path.is_none()
        {
            return Err(ConfigError::Missing(
                "GOOGLE_SERVICE_ACCOUNT or GOOGLE_SERVICE_ACCOUNT_FILE must be set".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// The service-account key blob, read from disk when only a path is configured.
    pub fn credentials(&self) -> Result<String> {
        if let Some(json) = &self.credentials_json {
            return Ok(json.clone());
        }
        match &self.credentials_path {
            Some(path) => std::fs::read_to_string(path)
                .map_err(|source| ConfigError::Io { path: path.clone(), source }),
            None => Err(ConfigError::Missing("service-account credentials".into())),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
