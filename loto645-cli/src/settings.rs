use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use loto645_db::ledger::default_log_path;

use crate::analysis::GenerationOptions;
use crate::analysis::trend::DEFAULT_SCOPE;
use crate::fetch::DEFAULT_ENDPOINT;

pub const MIN_HISTORY_COUNT: u32 = 5;
pub const MAX_HISTORY_COUNT: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub cache_ttl_hours: i64,
    pub history_count: u32,
    pub weight_percent: u32,
    pub trend_scope: usize,
    pub options: GenerationOptions,
    pub result_log: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 3,
            cache_ttl_hours: 24,
            history_count: 10,
            weight_percent: 100,
            trend_scope: DEFAULT_SCOPE,
            options: GenerationOptions::default(),
            result_log: default_log_path(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let mut path = std::env::current_dir().unwrap_or_default();
        path.push("data");
        path.push("settings.json");
        path
    }

    /// Fichier absent : valeurs par défaut. Fichier illisible : erreur.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Pas de configuration à {}, valeurs par défaut", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire la configuration {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("JSON invalide dans {}", path.display()))?;
        settings.validate()
            .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs doit être strictement positif");
        }
        if self.cache_ttl_hours < 0 {
            bail!("cache_ttl_hours ne peut pas être négatif : {}", self.cache_ttl_hours);
        }
        self.cache_ttl()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_hours(self.cache_ttl_hours)
            .with_context(|| format!("cache_ttl_hours hors limites : {}", self.cache_ttl_hours))
    }

    pub fn clamp_history_count(count: u32) -> u32 {
        count.clamp(MIN_HISTORY_COUNT, MAX_HISTORY_COUNT)
    }
}
