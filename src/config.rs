use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};

use crate::directory::{KeyValue, KeyValueList};
use crate::i18n::Locale;

pub const DEFAULT_CONFIG_PATH: &str = "tamm.toml";

/// Global timezone setting for the application
static APP_TIMEZONE: OnceLock<Tz> = OnceLock::new();

/// Initialize the timezone from the given string
pub fn init_timezone(tz_str: &str) {
    let timezone: Tz = tz_str.parse().unwrap_or_else(|_| {
        warn!(timezone = tz_str, "invalid timezone, falling back to UTC");
        chrono_tz::UTC
    });

    if APP_TIMEZONE.set(timezone).is_err() {
        warn!("timezone already initialized");
    }
}

/// Get the configured timezone
pub fn get_timezone() -> Tz {
    *APP_TIMEZONE.get().unwrap_or(&chrono_tz::UTC)
}

/// Today's date in the configured timezone. Due dates are compared to this.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&get_timezone()).date_naive()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: String,
    /// Base URL of the TaMM backend; endpoint paths are joined onto it.
    pub backend_url: String,
    /// Cookie header forwarded to the backend, e.g. `JSESSIONID=...`.
    pub session_cookie: Option<String>,
    pub locale: Locale,
    pub timezone: String,
    /// Owner directory used when the backend cannot provide one.
    pub owners: Vec<KeyValue>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            backend_url: "http://localhost:8080/tamm/".to_string(),
            session_cookie: None,
            locale: Locale::De,
            timezone: "UTC".to_string(),
            owners: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Apply `TAMM_*` overrides. `lookup` resolves a variable name, usually
    /// from the `.env` file first and the process environment second.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TAMM_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(tag) = lookup("TAMM_LOCALE") {
            self.locale = Locale::from_tag(&tag);
        }
        if let Some(tz) = lookup("TAMM_TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(listen) = lookup("TAMM_LISTEN") {
            self.listen = listen;
        }
    }

    pub fn owner_directory(&self) -> KeyValueList {
        self.owners.iter().cloned().collect()
    }
}

/// Read the config file. A missing file gives the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        info!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(config)
}
