use std::time::Duration;

use anyhow::{Context, bail};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use thiserror::Error;

use loto645_db::models::Draw;

pub const DEFAULT_ENDPOINT: &str =
    "https://www.dhlottery.co.kr/lt645/selectPstLt645Info.do?srchLtEpsd=all";

/// Échec de récupération de l'historique. Une liste vide n'est pas une erreur.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("requête échouée : {message}")]
    Http { message: String },

    #[error("le serveur a répondu {status}")]
    Status { status: u16 },

    #[error("réponse illisible : {message}")]
    Parse { message: String },
}

pub trait HistorySource {
    /// Historique complet, tous tirages confondus, ou rien.
    fn fetch(&self) -> Result<Vec<Draw>, FetchError>;
}

pub struct HttpSource {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("loto645/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Http {
                message: format!("Impossible de créer le client HTTP : {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn request(&self) -> Result<Vec<Draw>, FetchError> {
        let response = self.client.get(&self.endpoint).send().map_err(|e| FetchError::Http {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status { status: response.status().as_u16() });
        }

        let body: Value = response.json().map_err(|e| FetchError::Parse {
            message: format!("JSON invalide : {e}"),
        })?;
        parse_history(&body)
    }
}

impl HistorySource for HttpSource {
    fn fetch(&self) -> Result<Vec<Draw>, FetchError> {
        log::info!("Récupération de l'historique depuis {}", self.endpoint);

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Récupération des tirages...");
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = self.request();
        pb.finish_and_clear();

        if let Ok(draws) = &result {
            log::info!("{} tirages reçus", draws.len());
        }
        result
    }
}

/// Lit `{"data": {"list": [...]}}`. Un seul enregistrement invalide rejette toute la réponse.
pub fn parse_history(body: &Value) -> Result<Vec<Draw>, FetchError> {
    let list = body
        .get("data")
        .and_then(|d| d.get("list"))
        .and_then(Value::as_array)
        .ok_or_else(|| FetchError::Parse {
            message: "champ 'data.list' absent".to_string(),
        })?;

    list.iter()
        .enumerate()
        .map(|(i, item)| {
            parse_record(item).map_err(|e| FetchError::Parse {
                message: format!("enregistrement {i} : {e:#}"),
            })
        })
        .collect()
}

fn parse_record(item: &Value) -> anyhow::Result<Draw> {
    let episode = field_u32(item, "ltEpsd")?;

    let mut numbers = [0u8; 6];
    for (i, slot) in numbers.iter_mut().enumerate() {
        *slot = field_number(item, &format!("tm{}WnNo", i + 1))?;
    }
    let bonus = field_number(item, "bnsWnNo")?;

    let date = item
        .get("ltRflYmd")
        .and_then(Value::as_str)
        .map(normalize_date)
        .unwrap_or_default();

    Draw::new(episode, date, numbers, bonus)
        .with_context(|| format!("tirage {episode}"))
}

/// Accepte un nombre JSON ou une chaîne numérique.
fn field_u32(item: &Value, key: &str) -> anyhow::Result<u32> {
    match item.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .with_context(|| format!("'{key}' n'est pas un entier positif : {n}")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .with_context(|| format!("'{key}' illisible : '{s}'")),
        Some(other) => bail!("'{key}' de type inattendu : {other}"),
        None => bail!("champ '{key}' manquant"),
    }
}

fn field_number(item: &Value, key: &str) -> anyhow::Result<u8> {
    let value = field_u32(item, key)?;
    u8::try_from(value).with_context(|| format!("'{key}' hors limites : {value}"))
}

/// `20240106` devient `2024-01-06` ; tout autre format est conservé.
fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(episode: u32, numbers: [u8; 6], bonus: u8) -> Value {
        json!({
            "ltEpsd": episode,
            "tm1WnNo": numbers[0],
            "tm2WnNo": numbers[1],
            "tm3WnNo": numbers[2],
            "tm4WnNo": numbers[3],
            "tm5WnNo": numbers[4],
            "tm6WnNo": numbers[5],
            "bnsWnNo": bonus,
            "ltRflYmd": "20240106",
        })
    }

    #[test]
    fn test_parse_history() {
        let body = json!({"data": {"list": [
            record(1, [10, 23, 29, 33, 37, 40], 16),
            record(2, [9, 13, 21, 25, 32, 42], 2),
        ]}});
        let draws = parse_history(&body).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].episode, 1);
        assert_eq!(draws[0].numbers, [10, 23, 29, 33, 37, 40]);
        assert_eq!(draws[0].bonus, 16);
        assert_eq!(draws[0].date, "2024-01-06");
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let body = json!({"data": {"list": [{
            "ltEpsd": "1104",
            "tm1WnNo": "1", "tm2WnNo": "7", "tm3WnNo": "12",
            "tm4WnNo": "20", "tm5WnNo": "31", "tm6WnNo": "44",
            "bnsWnNo": "9",
        }]}});
        let draws = parse_history(&body).unwrap();
        assert_eq!(draws[0].episode, 1104);
        assert_eq!(draws[0].numbers, [1, 7, 12, 20, 31, 44]);
        assert_eq!(draws[0].date, "");
    }

    #[test]
    fn test_empty_list_is_not_an_error() {
        let body = json!({"data": {"list": []}});
        assert!(parse_history(&body).unwrap().is_empty());
    }

    #[test]
    fn test_missing_list_is_parse_error() {
        let err = parse_history(&json!({"result": "ok"})).unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[test]
    fn test_invalid_record_rejects_all() {
        let body = json!({"data": {"list": [
            record(1, [10, 23, 29, 33, 37, 40], 16),
            record(2, [9, 9, 21, 25, 32, 42], 2),
        ]}});
        assert!(matches!(parse_history(&body), Err(FetchError::Parse { .. })));

        let mut missing = record(3, [1, 2, 3, 4, 5, 6], 7);
        missing.as_object_mut().unwrap().remove("bnsWnNo");
        let body = json!({"data": {"list": [missing]}});
        assert!(parse_history(&body).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let body = json!({"data": {"list": [record(1, [1, 2, 3, 4, 5, 46], 7)]}});
        assert!(parse_history(&body).is_err());
        let body = json!({"data": {"list": [{
            "ltEpsd": 1, "tm1WnNo": 300, "tm2WnNo": 2, "tm3WnNo": 3,
            "tm4WnNo": 4, "tm5WnNo": 5, "tm6WnNo": 6, "bnsWnNo": 7,
        }]}});
        assert!(parse_history(&body).is_err());
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("20240106"), "2024-01-06");
        assert_eq!(normalize_date("2024-01-06"), "2024-01-06");
    }
}
