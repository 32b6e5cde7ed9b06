pub mod filters;
pub mod sampler;
pub mod trend;

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use loto645_db::models::POOL_SIZE;

use crate::analysis::sampler::{Generation, SamplingWeights, generate_games};
use crate::analysis::trend::{recent_window, sampling_weights, trend_weights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub use_trend: bool,
    pub use_end_digit: bool,
    pub use_dead_zone: bool,
    pub use_stats: bool,
    pub use_consecutive: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            use_trend: true,
            use_end_digit: true,
            use_dead_zone: true,
            use_stats: true,
            use_consecutive: true,
        }
    }
}

impl GenerationOptions {
    pub fn active_labels(&self) -> Vec<&'static str> {
        [
            (self.use_trend, "Tendance"),
            (self.use_end_digit, "Unités"),
            (self.use_dead_zone, "Zones mortes"),
            (self.use_stats, "Statistiques"),
            (self.use_consecutive, "Consécutifs"),
        ]
        .into_iter()
        .filter_map(|(on, label)| on.then_some(label))
        .collect()
    }
}

pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_rng(&mut rand::rng()),
    }
}

/// Génère les grilles à partir de l'historique à plat (plus récent en premier).
pub fn generate<R: Rng + ?Sized>(
    recent_numbers: &[u8],
    weight_percent: u32,
    scope: usize,
    options: &GenerationOptions,
    rng: &mut R,
) -> Result<Generation> {
    let weights = if options.use_trend {
        let table = trend_weights(recent_window(recent_numbers, scope));
        sampling_weights(&table, weight_percent)
    } else {
        [1.0; POOL_SIZE as usize]
    };
    let weights = SamplingWeights::new(weights)?;

    let hot: Vec<u8> = (1..=POOL_SIZE).filter(|&n| weights.weight(n).is_some_and(|w| w > 1.0)).collect();
    log::debug!("Numéros chauds : {:?}", hot);

    generate_games(&weights, options, rng)
}
