// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use roster_app::{DEFAULT_PAGE_SIZE, SortColumn, ViewState, is_valid_page_size};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_FILTER: &str = "warn";
const DEFAULT_FETCH_TIMEOUT: &str = "5s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub page_size: Option<usize>,
    pub default_sort: Option<String>,
    pub sort_descending: Option<bool>,
    pub persist_view: Option<bool>,
    pub state_path: Option<String>,
    pub fetch_timeout: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            page_size: Some(DEFAULT_PAGE_SIZE),
            default_sort: Some(SortColumn::Username.as_str().to_owned()),
            sort_descending: Some(false),
            persist_view: Some(true),
            state_path: None,
            fetch_timeout: Some(DEFAULT_FETCH_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub filter: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            filter: Some(DEFAULT_LOG_FILTER.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ROSTER_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ROSTER_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(roster_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [storage], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            roster_db::validate_db_path(db_path)?;
        }

        if let Some(size) = self.ui.page_size
            && !is_valid_page_size(size)
        {
            bail!(
                "ui.page_size in {} must be between 1 and {}, got {}",
                path.display(),
                roster_app::MAX_PAGE_SIZE,
                size
            );
        }

        if let Some(sort) = &self.ui.default_sort
            && SortColumn::parse(sort).is_none()
        {
            let known = SortColumn::ALL
                .iter()
                .map(|column| column.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            bail!(
                "ui.default_sort in {} is {sort:?}; use one of: {known}",
                path.display()
            );
        }

        if let Some(state_path) = &self.ui.state_path
            && state_path.trim().is_empty()
        {
            bail!(
                "ui.state_path in {} must not be empty; remove it to use the default",
                path.display()
            );
        }

        if let Some(timeout) = &self.ui.fetch_timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "ui.fetch_timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(filter) = &self.log.filter {
            EnvFilter::try_new(filter).with_context(|| {
                format!(
                    "log.filter in {} is not a valid filter (for example \"info\" or \"roster_app=debug\")",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => roster_db::default_db_path(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn default_sort(&self) -> SortColumn {
        SortColumn::parse_or_default(self.ui.default_sort.as_deref())
    }

    pub fn persist_view(&self) -> bool {
        self.ui.persist_view.unwrap_or(true)
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.ui.state_path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [ui].state_path in the config")
        })?;
        Ok(data_root.join(roster_db::APP_NAME).join("views.json"))
    }

    pub fn fetch_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .fetch_timeout
                .as_deref()
                .unwrap_or(DEFAULT_FETCH_TIMEOUT),
        )
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// The view a fresh session starts from when nothing was persisted.
    pub fn default_view(&self) -> ViewState {
        let mut view = ViewState::with_page_size(self.page_size());
        view.set_sort(self.default_sort(), false);
        if self.ui.sort_descending.unwrap_or(false) {
            view.toggle_sort(self.default_sort());
        }
        view
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# roster config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/roster/roster.db)\n# db_path = \"/absolute/path/to/roster.db\"\n\n[ui]\npage_size = {}\n# One of: username, email, create_at\ndefault_sort = \"username\"\nsort_descending = false\npersist_view = true\n# state_path = \"/absolute/path/to/views.json\"\nfetch_timeout = \"{}\"\n\n[log]\n# RUST_LOG overrides this when set\nfilter = \"{}\"\n",
            path.display(),
            DEFAULT_PAGE_SIZE,
            DEFAULT_FETCH_TIMEOUT,
            DEFAULT_LOG_FILTER,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use <N>ms or <N>s (for example 500ms or 5s)")
}
