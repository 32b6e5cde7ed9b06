use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use crate::view::{BallColor, BallView, GenerationView, HistoryView, RowView, TallyView};

fn ball_cell(ball: &BallView) -> Cell {
    let color = match ball.color {
        BallColor::Yellow => Color::Yellow,
        BallColor::Blue => Color::Blue,
        BallColor::Red => Color::Red,
        BallColor::Grey => Color::Grey,
        BallColor::Green => Color::Green,
    };
    Cell::new(format!("{:2}", ball.number)).fg(color)
}

fn row_cells(row: &RowView) -> Vec<Cell> {
    let mut cells = vec![Cell::new(&row.label)];
    cells.extend(row.balls.iter().map(ball_cell));
    if let Some(bonus) = &row.bonus {
        cells.push(ball_cell(bonus));
    }
    cells
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_generation(view: &GenerationView) {
    println!("\n🎲 Nouvelles grilles (pondération {} %)\n", view.weight_percent);

    let mut table = new_table(vec!["", "N1", "N2", "N3", "N4", "N5", "N6"]);
    for row in &view.rows {
        table.add_row(row_cells(row));
    }
    println!("{table}");

    if view.filters.is_empty() {
        println!("Filtres : aucun");
    } else {
        println!("Filtres : {}", view.filters.join(", "));
    }
    println!("Essais  : {}", view.attempts);
    if view.fallbacks > 0 {
        println!("⚠ {} grille(s) tirée(s) au hasard, aucun candidat ne passait les filtres", view.fallbacks);
    }
    if let Some(episode) = view.logged_for {
        println!("Grilles enregistrées pour le tirage {}", episode);
    }
}

pub fn display_history(view: &HistoryView) {
    if view.rows.is_empty() {
        println!("Aucun tirage à afficher.");
        return;
    }

    let mut table = new_table(vec!["Tirage", "Date", "N1", "N2", "N3", "N4", "N5", "N6", "Bonus"]);
    for (row, date) in view.rows.iter().zip(&view.dates) {
        let mut cells = row_cells(row);
        cells.insert(1, Cell::new(date));
        table.add_row(cells);
    }
    println!("{table}");
}

pub fn display_tally(view: &TallyView) {
    println!("\n📋 Résultat du tirage\n");
    let mut table = new_table(vec!["", "N1", "N2", "N3", "N4", "N5", "N6", "Bonus"]);
    table.add_row(row_cells(&view.winning));
    println!("{table}");

    if view.total == 0 {
        println!("Aucune grille enregistrée pour ce tirage.");
        return;
    }

    println!("\n{} grille(s) dans {} lot(s)\n", view.total, view.batches);
    let mut table = new_table(vec!["Rang", "Grilles"]);
    for (label, count) in &view.lines {
        table.add_row(vec![label.clone(), count.to_string()]);
    }
    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import terminé :");
    println!("  Total lignes lues : {}", result.total_records);
    println!("  Insérés           : {}", result.inserted);
    println!("  Doublons ignorés  : {}", result.skipped);
    if result.errors > 0 {
        println!("  Erreurs           : {}", result.errors);
    }
}
