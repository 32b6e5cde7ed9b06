mod analysis;
mod display;
mod fetch;
mod history;
mod import;
mod settings;
mod view;

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};

use loto645_db::db::{
    count_draws, db_path, fetch_last_draws, fetch_recent_numbers, find_draw, latest_draw, migrate, open_db,
};
use loto645_db::ledger::ResultLog;
use loto645_db::models::LoggedBatch;
use loto645_db::rusqlite::Connection;

use crate::analysis::{generate, make_rng};
use crate::display::{display_generation, display_history, display_import_summary, display_tally};
use crate::fetch::HttpSource;
use crate::history::{Freshness, ensure_history, is_unavailable};
use crate::settings::Settings;
use crate::view::{generation_view, history_view, tally_view};

#[derive(Parser)]
#[command(name = "loto645", about = "Générateur de grilles Loto 6/45")]
struct Cli {
    /// Fichier de configuration JSON (défaut : data/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignorer le cache et recharger l'historique
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recharger l'historique depuis le serveur
    Refresh,

    /// Afficher les derniers tirages
    History {
        /// Nombre de tirages à afficher (5-100)
        #[arg(short, long)]
        last: Option<u32>,
    },

    /// Générer 5 grilles
    Generate {
        /// Pondération des numéros chauds, en pourcentage
        #[arg(short, long)]
        weight: Option<u32>,

        /// Nombre de tirages récents pour la tendance
        #[arg(short, long)]
        scope: Option<usize>,

        /// Désactiver la pondération par tendance
        #[arg(long)]
        no_trend: bool,

        /// Désactiver le filtre des chiffres des unités
        #[arg(long)]
        no_end_digit: bool,

        /// Désactiver le filtre des zones mortes
        #[arg(long)]
        no_dead_zone: bool,

        /// Désactiver le filtre statistique
        #[arg(long)]
        no_stats: bool,

        /// Désactiver la règle des numéros consécutifs
        #[arg(long)]
        no_consecutive: bool,

        /// Seed pour la reproductibilité
        #[arg(long)]
        seed: Option<u64>,

        /// Enregistrer les grilles pour le prochain tirage
        #[arg(long)]
        log: bool,
    },

    /// Comparer les grilles enregistrées avec un tirage réel
    Check {
        /// Numéro du tirage (défaut : le dernier connu)
        episode: Option<u32>,
    },

    /// Importer des tirages depuis un fichier CSV
    Import {
        /// Chemin vers le fichier CSV
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)?;

    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Refresh => cmd_refresh(&conn, &settings),
        Command::History { last } => cmd_history(&conn, &settings, cli.refresh, last),
        Command::Generate {
            weight,
            scope,
            no_trend,
            no_end_digit,
            no_dead_zone,
            no_stats,
            no_consecutive,
            seed,
            log,
        } => {
            let mut options = settings.options;
            options.use_trend &= !no_trend;
            options.use_end_digit &= !no_end_digit;
            options.use_dead_zone &= !no_dead_zone;
            options.use_stats &= !no_stats;
            options.use_consecutive &= !no_consecutive;

            let request = GenerateRequest {
                weight_percent: weight.unwrap_or(settings.weight_percent),
                scope: scope.unwrap_or(settings.trend_scope),
                options,
                seed,
                log,
            };
            cmd_generate(&conn, &settings, cli.refresh, &request)
        }
        Command::Check { episode } => cmd_check(&conn, &settings, cli.refresh, episode),
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

struct GenerateRequest {
    weight_percent: u32,
    scope: usize,
    options: analysis::GenerationOptions,
    seed: Option<u64>,
    log: bool,
}

/// Garantit un historique à jour. `Ok(false)` si le serveur n'a aucun tirage.
fn load_history(conn: &Connection, settings: &Settings, force: bool) -> Result<bool> {
    let source = HttpSource::new(settings.endpoint.clone(), settings.timeout())?;
    match ensure_history(conn, &source, settings.cache_ttl()?, force, Utc::now()) {
        Ok(Freshness::Refreshed { draws }) => log::info!("Historique rechargé : {} tirages", draws),
        Ok(Freshness::Cached { refreshed_at }) => log::debug!("Cache du {}", refreshed_at),
        Err(e) => {
            if is_unavailable(&e) {
                eprintln!("Le serveur des résultats est injoignable ; réessayez plus tard.");
            }
            return Err(e);
        }
    }

    if count_draws(conn)? == 0 {
        println!("Aucun tirage disponible.");
        return Ok(false);
    }
    Ok(true)
}

fn cmd_refresh(conn: &Connection, settings: &Settings) -> Result<()> {
    if load_history(conn, settings, true)? {
        println!("{} tirages en cache.", count_draws(conn)?);
    }
    Ok(())
}

fn cmd_history(conn: &Connection, settings: &Settings, force: bool, last: Option<u32>) -> Result<()> {
    if !load_history(conn, settings, force)? {
        return Ok(());
    }
    let count = Settings::clamp_history_count(last.unwrap_or(settings.history_count));
    let draws = fetch_last_draws(conn, count)?;
    println!("\n📋 {} derniers tirages\n", draws.len());
    display_history(&history_view(&draws));
    Ok(())
}

fn cmd_generate(conn: &Connection, settings: &Settings, force: bool, request: &GenerateRequest) -> Result<()> {
    if !load_history(conn, settings, force)? {
        return Ok(());
    }

    let numbers = fetch_recent_numbers(conn)?;
    let mut rng = make_rng(request.seed);
    let generation = generate(&numbers, request.weight_percent, request.scope, &request.options, &mut rng)?;

    let logged_for = if request.log {
        let Some(latest) = latest_draw(conn)? else {
            bail!("Aucun tirage connu : impossible de déterminer le prochain");
        };
        let batch = LoggedBatch {
            episode: latest.episode + 1,
            games: generation.games.clone(),
        };
        ResultLog::new(&settings.result_log).append(&batch)?;
        Some(batch.episode)
    } else {
        None
    };

    display_generation(&generation_view(&generation, request.weight_percent, &request.options, logged_for));
    Ok(())
}

fn cmd_check(conn: &Connection, settings: &Settings, force: bool, episode: Option<u32>) -> Result<()> {
    if !load_history(conn, settings, force)? {
        return Ok(());
    }

    let draw = match episode {
        Some(e) => find_draw(conn, e)?,
        None => latest_draw(conn)?,
    };
    let Some(draw) = draw else {
        println!("Tirage {} inconnu (pas encore tiré ?).", episode.unwrap_or_default());
        return Ok(());
    };

    let results = ResultLog::new(&settings.result_log);
    let batches = results.batches_for(draw.episode)?.len();
    let tally = results.tally(&draw)?;
    display_tally(&tally_view(&draw, batches, &tally));
    Ok(())
}

fn cmd_import(conn: &Connection, file: &PathBuf) -> Result<()> {
    let result = import::import_csv(conn, file, Utc::now())?;
    display_import_summary(&result);
    Ok(())
}
