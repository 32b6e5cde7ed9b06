use std::collections::BTreeMap;

use loto645_db::models::{PICK_COUNT, POOL_SIZE};

/// Nombre de tirages récents pris en compte par défaut.
pub const DEFAULT_SCOPE: usize = 15;

const BASE_WEIGHT: f64 = 1.0;
const WEIGHT_PER_HIT: f64 = 0.5;

/// Poids par numéro (1..=45). Vide si la fenêtre l'était.
pub type FrequencyTable = BTreeMap<u8, f64>;

/// Les `scope` derniers tirages d'une liste à plat (plus récent en premier),
/// ou tout l'historique s'il est plus court.
pub fn recent_window(numbers: &[u8], scope: usize) -> &[u8] {
    let len = scope.saturating_mul(PICK_COUNT).min(numbers.len());
    &numbers[..len]
}

pub fn trend_weights(window: &[u8]) -> FrequencyTable {
    if window.is_empty() {
        return FrequencyTable::new();
    }

    let mut table: FrequencyTable = (1..=POOL_SIZE).map(|n| (n, BASE_WEIGHT)).collect();
    for &n in window {
        if let Some(weight) = table.get_mut(&n) {
            *weight += WEIGHT_PER_HIT;
        }
    }
    table
}

/// Vecteur de poids final. Le bonus `weight_percent` ne s'applique qu'aux
/// numéros déjà au-dessus du poids de base ; les autres restent à 1.0.
pub fn sampling_weights(table: &FrequencyTable, weight_percent: u32) -> [f64; POOL_SIZE as usize] {
    let boost = weight_percent as f64 / 100.0;
    let mut weights = [BASE_WEIGHT; POOL_SIZE as usize];
    for (i, weight) in weights.iter_mut().enumerate() {
        let base = table.get(&((i + 1) as u8)).copied().unwrap_or(BASE_WEIGHT);
        if base > BASE_WEIGHT {
            *weight = base + boost;
        }
    }
    weights
}
