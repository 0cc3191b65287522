//! SQL Gate Core - Demo Entry Point
//!
//! Wires the full feedback loop against an in-memory sample database:
//! start the traffic driver, let decisions accumulate, stop, retrain,
//! report. Duration is SQLGATE_DEMO_SECS (default 30).

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;

use sqlgate_core::constants;
use sqlgate_core::driver::{FeedbackConfig, FeedbackDriver, SyntheticTraffic};
use sqlgate_core::gate::{DecisionGate, SqliteExecutor};
use sqlgate_core::history::SqliteDecisionStore;
use sqlgate_core::model::artifact::ArtifactStore;
use sqlgate_core::model::SqlClassifier;
use sqlgate_core::rules::{RuleConfig, RuleEngine};
use sqlgate_core::training::{Trainer, TrainingConfig};

/// Sample rental schema for the demo target database.
const DEMO_SCHEMA: &str = "
CREATE TABLE customer (customer_id INTEGER PRIMARY KEY, first_name TEXT, last_name TEXT);
INSERT INTO customer VALUES (1, 'MARY', 'SMITH'), (2, 'PATRICIA', 'JOHNSON'), (3, 'LINDA', 'WILLIAMS');
CREATE TABLE film (film_id INTEGER PRIMARY KEY, title TEXT, release_year INTEGER);
INSERT INTO film VALUES (1, 'ACADEMY DINOSAUR', 2006), (2, 'ACE GOLDFINGER', 2006);
CREATE TABLE payment (payment_id INTEGER PRIMARY KEY, customer_id INTEGER, amount REAL);
INSERT INTO payment VALUES (1, 1, 2.99), (2, 2, 4.99), (3, 3, 0.99);
";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!(
        "Starting {} v{}...",
        constants::APP_NAME,
        constants::APP_VERSION
    );

    let data_dir = constants::get_data_dir();
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        log::error!("Cannot create data directory {}: {e}", data_dir.display());
        std::process::exit(1);
    }

    let history = match SqliteDecisionStore::open(&data_dir.join("decision-history.db")) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Cannot open decision history: {e}");
            std::process::exit(1);
        }
    };
    log::info!("Decision history ready under {}", data_dir.display());

    let artifacts = ArtifactStore::from_path(data_dir.join("models"));
    let classifier = Arc::new(SqlClassifier::from_store(&artifacts));
    if !classifier.is_trained() {
        log::info!("Classifier untrained - rule engine carries the first rounds");
    }

    let target = match Connection::open_in_memory() {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Cannot open demo target database: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = target.execute_batch(DEMO_SCHEMA) {
        log::error!("Cannot seed demo schema: {e}");
        std::process::exit(1);
    }
    log::info!("Demo target database seeded (customer, film, payment)");

    let gate = Arc::new(DecisionGate::new(
        RuleEngine::new(RuleConfig::default()),
        classifier,
        Arc::new(SqliteExecutor::from_connection(target)),
        history,
    ));

    let trainer = Arc::new(Trainer::with_store(TrainingConfig::default(), artifacts));
    let driver = FeedbackDriver::new(
        gate,
        trainer,
        Arc::new(SyntheticTraffic::default()),
        FeedbackConfig {
            interval_ms: constants::get_loop_interval_ms(),
            retrain_every: Some(250),
        },
    );

    let demo_secs: u64 = std::env::var("SQLGATE_DEMO_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30);

    driver.start();
    log::info!("Feedback loop running for {demo_secs}s");

    let started = std::time::Instant::now();
    while started.elapsed() < Duration::from_secs(demo_secs) {
        std::thread::sleep(Duration::from_secs(5).min(Duration::from_secs(demo_secs)));
        let snapshot = driver.snapshot();
        log::info!(
            "traffic: {} allowed / {} blocked ({} retrains)",
            snapshot.allowed,
            snapshot.blocked,
            snapshot.retrains
        );
    }

    driver.stop();

    match driver.retrain_now() {
        Ok(outcome) => {
            log::info!(
                "Final retrain: ROC-AUC {:.4}, threshold {:.4}, best C {}",
                outcome.roc_auc,
                outcome.threshold,
                outcome.best_c
            );
            log::info!("Classification report:\n{}", outcome.report);
        }
        Err(e) => log::warn!("Final retrain skipped: {e}"),
    }

    let snapshot = driver.snapshot();
    log::info!(
        "Demo finished: {} decisions ({} allowed, {} blocked)",
        snapshot.total,
        snapshot.allowed,
        snapshot.blocked
    );
}
