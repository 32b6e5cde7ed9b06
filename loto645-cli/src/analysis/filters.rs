use std::ops::RangeInclusive;

use loto645_db::models::{Combination, POOL_SIZE};

use super::GenerationOptions;

const BAND_WIDTH: u8 = 5;
const BAND_COUNT: usize = (POOL_SIZE / BAND_WIDTH) as usize;
const MIN_EMPTY_BANDS: usize = 2;

pub const SUM_RANGE: RangeInclusive<u32> = 100..=175;
/// Au-delà de cette borne un numéro est « haut ».
pub const LOW_MAX: u8 = 22;

/// Au moins deux numéros partagent le même chiffre des unités.
pub fn has_end_digit_pair(combination: &Combination) -> bool {
    let mut seen = [false; 10];
    for &n in combination.numbers() {
        let digit = (n % 10) as usize;
        if seen[digit] {
            return true;
        }
        seen[digit] = true;
    }
    false
}

/// Au moins deux des neuf tranches de 5 numéros restent vides.
pub fn has_dead_zones(combination: &Combination) -> bool {
    let mut occupied = [false; BAND_COUNT];
    for &n in combination.numbers() {
        occupied[((n - 1) / BAND_WIDTH) as usize] = true;
    }
    occupied.iter().filter(|&&o| !o).count() >= MIN_EMPTY_BANDS
}

/// Somme dans 100..=175, ni 0 ni 6 impairs, ni 0 ni 6 numéros bas.
pub fn within_typical_stats(combination: &Combination) -> bool {
    if !SUM_RANGE.contains(&combination.sum()) {
        return false;
    }
    let numbers = combination.numbers();
    let odd = numbers.iter().filter(|&&n| n % 2 == 1).count();
    if odd == 0 || odd == numbers.len() {
        return false;
    }
    let low = numbers.iter().filter(|&&n| n <= LOW_MAX).count();
    low != 0 && low != numbers.len()
}

pub fn has_consecutive_pair(combination: &Combination) -> bool {
    combination.numbers().windows(2).any(|w| w[1] == w[0] + 1)
}

/// Filtres bloquants (chiffre des unités, zones mortes, statistiques).
/// Un filtre désactivé laisse toujours passer.
pub fn passes_hard_filters(combination: &Combination, options: &GenerationOptions) -> bool {
    (!options.use_end_digit || has_end_digit_pair(combination))
        && (!options.use_dead_zone || has_dead_zones(combination))
        && (!options.use_stats || within_typical_stats(combination))
}
