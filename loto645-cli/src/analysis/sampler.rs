use std::collections::BTreeSet;

use anyhow::{Result, bail};
use rand::Rng;
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;

use loto645_db::models::{Combination, GAMES_PER_BATCH, PICK_COUNT, POOL_SIZE};

use super::GenerationOptions;
use super::filters::{has_consecutive_pair, passes_hard_filters};

/// Au-delà, les grilles restantes sont tirées uniformément sans filtre.
pub const MAX_ATTEMPTS: u32 = 5000;

/// Grilles soumises à la règle des numéros consécutifs.
const CONSECUTIVE_QUOTA: usize = 3;
const CONSECUTIVE_REJECT_PROBABILITY: f64 = 0.7;

pub struct SamplingWeights {
    weights: [f64; POOL_SIZE as usize],
    index: WeightedIndex<f64>,
}

impl SamplingWeights {
    pub fn new(weights: [f64; POOL_SIZE as usize]) -> Result<Self> {
        if let Some((i, w)) = weights.iter().enumerate().find(|(_, w)| !(w.is_finite() && **w > 0.0)) {
            bail!("Poids invalide pour le numéro {} : {}", i + 1, w);
        }
        let index = WeightedIndex::new(&weights)?;
        Ok(Self { weights, index })
    }

    /// Poids du numéro, `None` hors de 1..=45.
    pub fn weight(&self, number: u8) -> Option<f64> {
        number.checked_sub(1).and_then(|i| self.weights.get(i as usize)).copied()
    }
}

/// Tire des numéros avec remise selon les poids, en rejetant les doublons,
/// jusqu'à en avoir six distincts.
pub fn sample_combination<R: Rng + ?Sized>(weights: &SamplingWeights, rng: &mut R) -> Result<Combination> {
    let mut picked = BTreeSet::new();
    while picked.len() < PICK_COUNT {
        let idx = weights.index.sample(rng);
        picked.insert((idx + 1) as u8);
    }
    let numbers: Vec<u8> = picked.into_iter().collect();
    Combination::new(&numbers)
}

pub fn uniform_combination<R: Rng + ?Sized>(rng: &mut R) -> Result<Combination> {
    let numbers: Vec<u8> = rand::seq::index::sample(rng, POOL_SIZE as usize, PICK_COUNT)
        .into_iter()
        .map(|i| (i + 1) as u8)
        .collect();
    Combination::new(&numbers)
}

#[derive(Debug, Clone)]
pub struct Generation {
    /// Grilles dans l'ordre d'acceptation.
    pub games: Vec<Combination>,
    pub attempts: u32,
    /// Grilles tirées sans filtre après épuisement des essais.
    pub fallbacks: usize,
}

pub fn generate_games<R: Rng + ?Sized>(
    weights: &SamplingWeights,
    options: &GenerationOptions,
    rng: &mut R,
) -> Result<Generation> {
    let mut games = Vec::with_capacity(GAMES_PER_BATCH);
    let mut attempts = 0u32;
    let mut fallbacks = 0usize;

    while games.len() < GAMES_PER_BATCH {
        attempts += 1;

        if attempts > MAX_ATTEMPTS {
            games.push(uniform_combination(rng)?);
            fallbacks += 1;
            continue;
        }

        let candidate = sample_combination(weights, rng)?;
        if !passes_hard_filters(&candidate, options) {
            continue;
        }

        // Règle souple : seulement pour les premières grilles, rejet à 70 %
        if options.use_consecutive
            && games.len() < CONSECUTIVE_QUOTA
            && !has_consecutive_pair(&candidate)
            && rng.random_bool(CONSECUTIVE_REJECT_PROBABILITY)
        {
            continue;
        }

        games.push(candidate);
    }

    if fallbacks > 0 {
        log::warn!("{} essais dépassés : {} grilles tirées sans filtre", MAX_ATTEMPTS, fallbacks);
    }
    log::debug!("{} grilles acceptées en {} essais", games.len(), attempts);

    Ok(Generation {
        games,
        attempts,
        fallbacks,
    })
}
