use loto645_db::models::{Combination, Draw, Tier, TierTally};

use crate::analysis::GenerationOptions;
use crate::analysis::sampler::Generation;

/// Couleur de boule par dizaine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallColor {
    Yellow,
    Blue,
    Red,
    Grey,
    Green,
}

pub fn ball_color(number: u8) -> BallColor {
    match number {
        0..=10 => BallColor::Yellow,
        11..=20 => BallColor::Blue,
        21..=30 => BallColor::Red,
        31..=40 => BallColor::Grey,
        _ => BallColor::Green,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallView {
    pub number: u8,
    pub color: BallColor,
}

impl BallView {
    pub fn new(number: u8) -> Self {
        Self { number, color: ball_color(number) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub label: String,
    pub balls: Vec<BallView>,
    pub bonus: Option<BallView>,
}

impl RowView {
    fn from_numbers(label: String, numbers: &[u8], bonus: Option<u8>) -> Self {
        Self {
            label,
            balls: numbers.iter().map(|&n| BallView::new(n)).collect(),
            bonus: bonus.map(BallView::new),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationView {
    pub rows: Vec<RowView>,
    pub weight_percent: u32,
    pub filters: Vec<&'static str>,
    pub attempts: u32,
    pub fallbacks: usize,
    pub logged_for: Option<u32>,
}

pub fn generation_view(
    generation: &Generation,
    weight_percent: u32,
    options: &GenerationOptions,
    logged_for: Option<u32>,
) -> GenerationView {
    GenerationView {
        rows: generation
            .games
            .iter()
            .enumerate()
            .map(|(i, game)| game_row(i, game))
            .collect(),
        weight_percent,
        filters: options.active_labels(),
        attempts: generation.attempts,
        fallbacks: generation.fallbacks,
        logged_for,
    }
}

fn game_row(index: usize, game: &Combination) -> RowView {
    RowView::from_numbers(format!("Grille {}", index + 1), game.numbers(), None)
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub rows: Vec<RowView>,
    pub dates: Vec<String>,
}

/// Tirages dans l'ordre reçu (plus récent en premier).
pub fn history_view(draws: &[Draw]) -> HistoryView {
    HistoryView {
        rows: draws.iter().map(draw_row).collect(),
        dates: draws.iter().map(|d| d.date.clone()).collect(),
    }
}

fn draw_row(draw: &Draw) -> RowView {
    RowView::from_numbers(format!("Tirage {}", draw.episode), &draw.numbers, Some(draw.bonus))
}

#[derive(Debug, Clone)]
pub struct TallyView {
    pub winning: RowView,
    pub batches: usize,
    pub lines: Vec<(String, u32)>,
    pub total: u32,
}

pub fn tally_view(draw: &Draw, batches: usize, tally: &TierTally) -> TallyView {
    TallyView {
        winning: draw_row(draw),
        batches,
        lines: Tier::ALL
            .iter()
            .map(|tier| (tier.to_string(), tally.count(*tier)))
            .collect(),
        total: tally.total(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ball_colors() {
        assert_eq!(ball_color(1), BallColor::Yellow);
        assert_eq!(ball_color(10), BallColor::Yellow);
        assert_eq!(ball_color(11), BallColor::Blue);
        assert_eq!(ball_color(30), BallColor::Red);
        assert_eq!(ball_color(31), BallColor::Grey);
        assert_eq!(ball_color(41), BallColor::Green);
        assert_eq!(ball_color(45), BallColor::Green);
    }

    #[test]
    fn test_generation_view() {
        let generation = Generation {
            games: vec![
                Combination::new(&[1, 12, 23, 34, 41, 45]).unwrap(),
                Combination::new(&[2, 3, 4, 5, 6, 7]).unwrap(),
            ],
            attempts: 12,
            fallbacks: 0,
        };
        let view = generation_view(&generation, 200, &GenerationOptions::default(), Some(1105));
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].label, "Grille 1");
        assert_eq!(view.rows[0].balls[1], BallView { number: 12, color: BallColor::Blue });
        assert!(view.rows[0].bonus.is_none());
        assert_eq!(view.filters.len(), 5);
        assert_eq!(view.logged_for, Some(1105));
    }

    #[test]
    fn test_history_and_tally_views() {
        let draw = Draw::new(1104, "2024-01-06", [1, 2, 3, 4, 5, 6], 7).unwrap();
        let history = history_view(std::slice::from_ref(&draw));
        assert_eq!(history.rows[0].label, "Tirage 1104");
        assert_eq!(history.rows[0].bonus.as_ref().map(|b| b.number), Some(7));
        assert_eq!(history.dates, vec!["2024-01-06".to_string()]);

        let mut tally = TierTally::default();
        tally.add(Tier::Fourth);
        tally.add(Tier::NoMatch);
        let view = tally_view(&draw, 1, &tally);
        assert_eq!(view.lines.len(), 6);
        assert_eq!(view.lines[3], ("4e rang".to_string(), 1));
        assert_eq!(view.total, 2);
    }
}
