use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Plus grand numéro tirable (les numéros vont de 1 à 45).
pub const POOL_SIZE: u8 = 45;
/// Numéros gagnants par tirage, et par grille jouée.
pub const PICK_COUNT: usize = 6;
/// Grilles produites par une génération.
pub const GAMES_PER_BATCH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub episode: u32,
    pub date: String,
    pub numbers: [u8; 6],
    pub bonus: u8,
}

impl Draw {
    /// Construit un tirage validé, numéros gagnants triés.
    pub fn new(episode: u32, date: impl Into<String>, mut numbers: [u8; 6], bonus: u8) -> Result<Self> {
        validate_draw(&numbers, bonus)?;
        numbers.sort();
        Ok(Self {
            episode,
            date: date.into(),
            numbers,
            bonus,
        })
    }
}

pub fn validate_draw(numbers: &[u8; 6], bonus: u8) -> Result<()> {
    for &n in numbers {
        if !(1..=POOL_SIZE).contains(&n) {
            bail!("Numéro {} hors limites (1-{})", n, POOL_SIZE);
        }
    }
    if !(1..=POOL_SIZE).contains(&bonus) {
        bail!("Numéro bonus {} hors limites (1-{})", bonus, POOL_SIZE);
    }
    for i in 0..numbers.len() {
        for j in (i + 1)..numbers.len() {
            if numbers[i] == numbers[j] {
                bail!("Numéro en double : {}", numbers[i]);
            }
        }
    }
    if numbers.contains(&bonus) {
        bail!("Le numéro bonus {} figure déjà parmi les gagnants", bonus);
    }
    Ok(())
}

/// Grille de 6 numéros distincts dans 1..=45, toujours triée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Combination([u8; 6]);

impl Combination {
    pub fn new(numbers: &[u8]) -> Result<Self> {
        if numbers.len() != PICK_COUNT {
            bail!("Une grille compte {} numéros, {} reçus", PICK_COUNT, numbers.len());
        }
        let mut sorted = [0u8; 6];
        sorted.copy_from_slice(numbers);
        sorted.sort();
        for &n in &sorted {
            if !(1..=POOL_SIZE).contains(&n) {
                bail!("Numéro {} hors limites (1-{})", n, POOL_SIZE);
            }
        }
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            bail!("Numéro en double dans la grille {:?}", numbers);
        }
        Ok(Self(sorted))
    }

    pub fn numbers(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn sum(&self) -> u32 {
        self.0.iter().map(|&n| n as u32).sum()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.contains(&number)
    }

    /// Nombre de numéros communs avec les gagnants du tirage (bonus exclu).
    pub fn matches(&self, draw: &Draw) -> usize {
        self.0.iter().filter(|n| draw.numbers.contains(n)).count()
    }
}

impl TryFrom<Vec<u8>> for Combination {
    type Error = anyhow::Error;

    fn try_from(numbers: Vec<u8>) -> Result<Self> {
        Combination::new(&numbers)
    }
}

impl From<Combination> for Vec<u8> {
    fn from(combination: Combination) -> Self {
        combination.0.to_vec()
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| format!("{:2}", n)).collect();
        write!(f, "{}", parts.join(" - "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    NoMatch,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::First,
        Tier::Second,
        Tier::Third,
        Tier::Fourth,
        Tier::Fifth,
        Tier::NoMatch,
    ];

    /// Rang de la grille face au tirage réel : le bonus ne compte qu'à 5 bons numéros.
    pub fn of(combination: &Combination, draw: &Draw) -> Tier {
        match combination.matches(draw) {
            6 => Tier::First,
            5 if combination.contains(draw.bonus) => Tier::Second,
            5 => Tier::Third,
            4 => Tier::Fourth,
            3 => Tier::Fifth,
            _ => Tier::NoMatch,
        }
    }

    pub fn rank(&self) -> Option<u8> {
        match self {
            Tier::First => Some(1),
            Tier::Second => Some(2),
            Tier::Third => Some(3),
            Tier::Fourth => Some(4),
            Tier::Fifth => Some(5),
            Tier::NoMatch => None,
        }
    }

    fn index(&self) -> usize {
        match self.rank() {
            Some(r) => (r - 1) as usize,
            None => 5,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.rank() {
            Some(1) => write!(f, "1er rang"),
            Some(r) => write!(f, "{}e rang", r),
            None => write!(f, "Perdu"),
        }
    }
}

/// Lot de grilles générées pour un tirage à venir, tel qu'écrit dans le journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedBatch {
    pub episode: u32,
    pub games: Vec<Combination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierTally {
    counts: [u32; 6],
}

impl TierTally {
    pub fn add(&mut self, tier: Tier) {
        self.counts[tier.index()] += 1;
    }

    pub fn record(&mut self, combination: &Combination, draw: &Draw) -> Tier {
        let tier = Tier::of(combination, draw);
        self.add(tier);
        tier
    }

    pub fn count(&self, tier: Tier) -> u32 {
        self.counts[tier.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}
