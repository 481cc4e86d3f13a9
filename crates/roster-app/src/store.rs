// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{PersistedView, ViewSession, ViewState};

const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    Keep,
    Discard,
}

/// Per-view persisted state, keyed by a host-chosen view name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewStateStore {
    views: BTreeMap<String, PersistedView>,
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    views: BTreeMap<String, PersistedView>,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session from the persisted entry for `key`, or from
    /// `defaults` when nothing was kept.
    pub fn mount(&self, key: &str, defaults: ViewState) -> ViewSession {
        let state = match self.views.get(key) {
            Some(persisted) => {
                debug!(key, "restoring persisted view");
                persisted.restore()
            }
            None => defaults,
        };
        ViewSession::new(state)
    }

    /// Cancels pending work and keeps or drops the view's state.
    pub fn unmount(&mut self, key: &str, mut session: ViewSession, policy: PersistPolicy) {
        session.cancel_pending();
        match policy {
            PersistPolicy::Keep => {
                self.views
                    .insert(key.to_owned(), PersistedView::from(session.state()));
            }
            PersistPolicy::Discard => {
                self.views.remove(key);
            }
        }
        debug!(key, ?policy, "view unmounted");
    }

    pub fn get(&self, key: &str) -> Option<&PersistedView> {
        self.views.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, view: PersistedView) {
        self.views.insert(key.into(), view);
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let file = StoreFile {
            version: STORE_VERSION,
            views: self.views.clone(),
        };
        serde_json::to_string_pretty(&file).context("serialize view state")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: StoreFile = serde_json::from_str(raw).context("parse view state")?;
        if file.version != STORE_VERSION {
            bail!(
                "view state version {} is not supported (expected {STORE_VERSION}); \
                 delete the file to start fresh",
                file.version
            );
        }
        Ok(Self { views: file.views })
    }

    /// Missing files load as an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read view state from {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("load view state from {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("write view state to {}", path.display()))
    }
}
