//! Journal des grilles générées : une ligne JSON par lot, jamais réécrite.
//!
//! Les écritures concurrentes sont sérialisées par un verrou exclusif du
//! système sur le journal lui-même, libéré à la fermeture du fichier ou à la
//! mort du processus. Les lecteurs ignorent les lignes illisibles.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::models::{Draw, LoggedBatch, TierTally};

pub fn default_log_path() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("results.jsonl");
    path
}

pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, batch: &LoggedBatch) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
        }

        let mut line = serde_json::to_string(batch)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Impossible d'ouvrir le journal {:?}", self.path))?;

        FileExt::lock_exclusive(&file)
            .with_context(|| format!("Impossible de verrouiller le journal {:?}", self.path))?;
        let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        FileExt::unlock(&file)
            .with_context(|| format!("Impossible de déverrouiller le journal {:?}", self.path))?;
        written.with_context(|| format!("Échec d'écriture dans {:?}", self.path))?;

        log::info!("{} grilles journalisées pour le tirage {}", batch.games.len(), batch.episode);
        Ok(())
    }

    /// Tous les lots lisibles, dans l'ordre d'écriture. Journal absent = vide.
    pub fn read_all(&self) -> Result<Vec<LoggedBatch>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Impossible de lire le journal {:?}", self.path));
            }
        };

        let mut batches = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let Ok(line) = line else {
                log::debug!("Ligne {} illisible, ignorée", i + 1);
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LoggedBatch>(&line) {
                Ok(batch) => batches.push(batch),
                Err(e) => log::debug!("Ligne {} ignorée : {}", i + 1, e),
            }
        }
        Ok(batches)
    }

    pub fn batches_for(&self, episode: u32) -> Result<Vec<LoggedBatch>> {
        Ok(self.read_all()?
            .into_iter()
            .filter(|b| b.episode == episode)
            .collect())
    }

    /// Compte les rangs obtenus par toutes les grilles journalisées pour ce tirage.
    pub fn tally(&self, draw: &Draw) -> Result<TierTally> {
        let mut tally = TierTally::default();
        for batch in self.batches_for(draw.episode)? {
            for game in &batch.games {
                tally.record(game, draw);
            }
        }
        Ok(tally)
    }
}
