use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::models::Draw;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    episode  INTEGER PRIMARY KEY,
    date     TEXT NOT NULL DEFAULT '',
    n1       INTEGER NOT NULL,
    n2       INTEGER NOT NULL,
    n3       INTEGER NOT NULL,
    n4       INTEGER NOT NULL,
    n5       INTEGER NOT NULL,
    n6       INTEGER NOT NULL,
    bonus    INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS refreshes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    fetched_at  TEXT NOT NULL,
    draw_count  INTEGER NOT NULL
);
";

const DRAW_COLUMNS: &str = "episode, date, n1, n2, n3, n4, n5, n6, bonus";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("loto645.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (episode, date, n1, n2, n3, n4, n5, n6, bonus)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            draw.episode,
            draw.date,
            draw.numbers[0],
            draw.numbers[1],
            draw.numbers[2],
            draw.numbers[3],
            draw.numbers[4],
            draw.numbers[5],
            draw.bonus,
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

/// Remplace tout l'historique en une transaction et note le rafraîchissement.
pub fn replace_draws(conn: &Connection, draws: &[Draw], fetched_at: DateTime<Utc>) -> Result<()> {
    let tx = conn.unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;
    tx.execute("DELETE FROM draws", [])
        .context("Échec de la purge de l'historique")?;
    for draw in draws {
        insert_draw(&tx, draw)?;
    }
    record_refresh(&tx, fetched_at, draws.len())?;
    tx.commit().context("Échec du commit")?;
    log::debug!("{} tirages enregistrés en cache", draws.len());
    Ok(())
}

fn row_to_draw(row: &rusqlite::Row<'_>) -> rusqlite::Result<Draw> {
    Ok(Draw {
        episode: row.get(0)?,
        date: row.get(1)?,
        numbers: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
        ],
        bonus: row.get(8)?,
    })
}

/// Derniers tirages, le plus récent en premier.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM draws ORDER BY episode DESC LIMIT ?1"
    ))?;
    let draws = stmt.query_map([limit], row_to_draw)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Tous les numéros gagnants à plat, tirage le plus récent en premier.
pub fn fetch_recent_numbers(conn: &Connection) -> Result<Vec<u8>> {
    let mut stmt = conn.prepare(
        "SELECT n1, n2, n3, n4, n5, n6 FROM draws ORDER BY episode DESC"
    )?;
    let rows = stmt.query_map([], |row| {
        Ok([
            row.get::<_, u8>(0)?,
            row.get::<_, u8>(1)?,
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
        ])
    })?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().flatten().collect())
}

pub fn find_draw(conn: &Connection, episode: u32) -> Result<Option<Draw>> {
    let draw = conn.query_row(
        &format!("SELECT {DRAW_COLUMNS} FROM draws WHERE episode = ?1"),
        [episode],
        row_to_draw,
    ).optional()?;
    Ok(draw)
}

pub fn latest_draw(conn: &Connection) -> Result<Option<Draw>> {
    Ok(fetch_last_draws(conn, 1)?.into_iter().next())
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

/// Remplace l'horodatage du dernier rafraîchissement : la table garde une seule ligne.
pub fn record_refresh(conn: &Connection, fetched_at: DateTime<Utc>, draw_count: usize) -> Result<()> {
    conn.execute("DELETE FROM refreshes", [])
        .context("Impossible de purger les rafraîchissements")?;
    conn.execute(
        "INSERT INTO refreshes (fetched_at, draw_count) VALUES (?1, ?2)",
        rusqlite::params![fetched_at.to_rfc3339(), draw_count as i64],
    ).context("Impossible d'enregistrer le rafraîchissement")?;
    Ok(())
}

pub fn last_refresh(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn.query_row(
        "SELECT fetched_at FROM refreshes ORDER BY id DESC LIMIT 1",
        [],
        |row| row.get(0),
    ).optional()?;
    match raw {
        Some(s) => {
            let at = DateTime::parse_from_rfc3339(&s)
                .with_context(|| format!("Horodatage invalide en base : '{}'", s))?;
            Ok(Some(at.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_draw(episode: u32, numbers: [u8; 6]) -> Draw {
        Draw::new(episode, "2024-01-06", numbers, 45).unwrap()
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw(1, [1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();

        let inserted = insert_draw(&conn, &test_draw(1, [1, 2, 3, 4, 5, 6])).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw(1, [7, 8, 9, 10, 11, 12])).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();

        insert_draw(&conn, &test_draw(1, [1, 2, 3, 4, 5, 6])).unwrap();
        insert_draw(&conn, &test_draw(3, [13, 14, 15, 16, 17, 18])).unwrap();
        insert_draw(&conn, &test_draw(2, [7, 8, 9, 10, 11, 12])).unwrap();

        let draws = fetch_last_draws(&conn, 10).unwrap();
        let episodes: Vec<u32> = draws.iter().map(|d| d.episode).collect();
        assert_eq!(episodes, vec![3, 2, 1]);

        let numbers = fetch_recent_numbers(&conn).unwrap();
        assert_eq!(numbers.len(), 18);
        assert_eq!(&numbers[..6], &[13, 14, 15, 16, 17, 18]);
        assert_eq!(&numbers[12..], &[1, 2, 3, 4, 5, 6]);

        assert_eq!(latest_draw(&conn).unwrap().unwrap().episode, 3);
    }

    #[test]
    fn test_find_draw() {
        let conn = memory_db();
        let draw = test_draw(1104, [3, 9, 21, 30, 38, 44]);
        insert_draw(&conn, &draw).unwrap();

        assert_eq!(find_draw(&conn, 1104).unwrap(), Some(draw));
        assert_eq!(find_draw(&conn, 1105).unwrap(), None);
    }

    #[test]
    fn test_replace_draws_and_refresh() {
        let conn = memory_db();
        assert_eq!(last_refresh(&conn).unwrap(), None);

        insert_draw(&conn, &test_draw(1, [1, 2, 3, 4, 5, 6])).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 6, 21, 0, 0).unwrap();
        let fresh = vec![test_draw(10, [1, 2, 3, 4, 5, 6]), test_draw(11, [7, 8, 9, 10, 11, 12])];
        replace_draws(&conn, &fresh, at).unwrap();

        assert_eq!(count_draws(&conn).unwrap(), 2);
        assert!(find_draw(&conn, 1).unwrap().is_none());
        assert_eq!(last_refresh(&conn).unwrap(), Some(at));
    }

    #[test]
    fn test_refresh_keeps_single_row() {
        let conn = memory_db();
        let first = Utc.with_ymd_and_hms(2024, 1, 6, 21, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 1, 13, 21, 0, 0).unwrap();

        record_refresh(&conn, first, 1).unwrap();
        replace_draws(&conn, &[test_draw(12, [1, 2, 3, 4, 5, 6])], second).unwrap();
        record_refresh(&conn, first, 1).unwrap();
        replace_draws(&conn, &[test_draw(13, [7, 8, 9, 10, 11, 12])], second).unwrap();

        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM refreshes", [], |row| row.get(0)).unwrap();
        assert_eq!(rows, 1);
        assert_eq!(last_refresh(&conn).unwrap(), Some(second));
    }
}
