//! Cache local de l'historique : les tirages sont rechargés quand le dernier
//! rafraîchissement dépasse la durée de validité, ou sur demande.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use loto645_db::db::{last_refresh, replace_draws};
use loto645_db::rusqlite::Connection;

use crate::fetch::{FetchError, HistorySource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Cached { refreshed_at: DateTime<Utc> },
    Refreshed { draws: usize },
}

pub fn is_fresh(last: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
    match last {
        Some(at) => now.signed_duration_since(at) < ttl,
        None => false,
    }
}

/// Un échec réseau bloque la suite : les tirages périmés ne sont pas utilisés.
pub fn ensure_history(
    conn: &Connection,
    source: &dyn HistorySource,
    ttl: chrono::Duration,
    force: bool,
    now: DateTime<Utc>,
) -> Result<Freshness> {
    let last = last_refresh(conn)?;
    if !force && is_fresh(last, now, ttl) {
        if let Some(refreshed_at) = last {
            log::debug!("Historique en cache depuis {}", refreshed_at);
            return Ok(Freshness::Cached { refreshed_at });
        }
    }

    let draws = source.fetch().context("Historique indisponible")?;
    replace_draws(conn, &draws, now)?;
    Ok(Freshness::Refreshed { draws: draws.len() })
}

/// Vrai si l'erreur vient du serveur distant plutôt que du stockage local.
pub fn is_unavailable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<FetchError>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use loto645_db::db::{count_draws, migrate};
    use loto645_db::models::Draw;
    use std::cell::Cell;

    struct StubSource {
        draws: Option<Vec<Draw>>,
        calls: Cell<u32>,
    }

    impl StubSource {
        fn ok(draws: Vec<Draw>) -> Self {
            Self { draws: Some(draws), calls: Cell::new(0) }
        }

        fn failing() -> Self {
            Self { draws: None, calls: Cell::new(0) }
        }
    }

    impl HistorySource for StubSource {
        fn fetch(&self) -> Result<Vec<Draw>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            self.draws.clone().ok_or(FetchError::Status { status: 503 })
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    fn sample_draws() -> Vec<Draw> {
        vec![
            Draw::new(1, "", [1, 2, 3, 4, 5, 6], 7).unwrap(),
            Draw::new(2, "", [8, 9, 10, 11, 12, 13], 14).unwrap(),
        ]
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 6, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_is_fresh() {
        let ttl = chrono::Duration::hours(2);
        assert!(!is_fresh(None, at(10), ttl));
        assert!(is_fresh(Some(at(9)), at(10), ttl));
        assert!(!is_fresh(Some(at(8)), at(10), ttl));
    }

    #[test]
    fn test_first_call_fetches_then_caches() {
        let conn = memory_db();
        let source = StubSource::ok(sample_draws());
        let ttl = chrono::Duration::hours(24);

        let first = ensure_history(&conn, &source, ttl, false, at(10)).unwrap();
        assert_eq!(first, Freshness::Refreshed { draws: 2 });
        assert_eq!(count_draws(&conn).unwrap(), 2);

        let second = ensure_history(&conn, &source, ttl, false, at(12)).unwrap();
        assert_eq!(second, Freshness::Cached { refreshed_at: at(10) });
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_force_refetches() {
        let conn = memory_db();
        let source = StubSource::ok(sample_draws());
        let ttl = chrono::Duration::hours(24);

        ensure_history(&conn, &source, ttl, false, at(10)).unwrap();
        ensure_history(&conn, &source, ttl, true, at(11)).unwrap();
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_failure_is_unavailable_and_keeps_cache() {
        let conn = memory_db();
        let ttl = chrono::Duration::hours(1);
        ensure_history(&conn, &StubSource::ok(sample_draws()), ttl, false, at(8)).unwrap();

        let err = ensure_history(&conn, &StubSource::failing(), ttl, false, at(12)).unwrap_err();
        assert!(is_unavailable(&err));
        assert_eq!(count_draws(&conn).unwrap(), 2);
    }

    #[test]
    fn test_empty_history_is_not_an_error() {
        let conn = memory_db();
        let source = StubSource::ok(Vec::new());
        let freshness = ensure_history(&conn, &source, chrono::Duration::hours(1), false, at(10)).unwrap();
        assert_eq!(freshness, Freshness::Refreshed { draws: 0 });
        assert_eq!(count_draws(&conn).unwrap(), 0);
    }
}
