//! SQLite-Backed Decision Store
//!
//! One row per decision in `decision_log`, appended inside the connection
//! mutex so concurrent writers serialize. Structured fields (score source,
//! execution outcome) travel as JSON columns.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::gate::types::{Decision, ExecutionOutcome, Verdict};
use crate::model::{ClassifierScore, ScoreSource};
use crate::rules::RuleVerdict;

use super::{DecisionStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS decision_log (
    id          TEXT PRIMARY KEY,
    decided_at  TEXT NOT NULL,
    statement   TEXT NOT NULL,
    rule_safe   INTEGER NOT NULL,
    rule_reason TEXT NOT NULL,
    probability REAL NOT NULL,
    score_source TEXT NOT NULL,
    verdict     TEXT NOT NULL,
    flagged     INTEGER NOT NULL,
    outcome     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_decision_log_decided_at ON decision_log (decided_at);
";

pub struct SqliteDecisionStore {
    conn: Mutex<Connection>,
}

impl SqliteDecisionStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl DecisionStore for SqliteDecisionStore {
    fn append(&self, decision: &Decision) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO decision_log
             (id, decided_at, statement, rule_safe, rule_reason,
              probability, score_source, verdict, flagged, outcome)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                decision.id.to_string(),
                decision.decided_at.to_rfc3339(),
                decision.statement,
                decision.rule_verdict.is_safe as i64,
                decision.rule_verdict.reason,
                decision.score.probability as f64,
                serde_json::to_string(&decision.score.source)?,
                decision.verdict.as_str(),
                decision.flagged as i64,
                serde_json::to_string(&decision.outcome)?,
            ],
        )
        .map_err(backend)?;
        Ok(())
    }

    fn read_all(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Decision>, StoreError> {
        let conn = self.conn.lock();
        let floor = since
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| String::from(""));
        let mut stmt = conn
            .prepare(
                "SELECT id, decided_at, statement, rule_safe, rule_reason,
                        probability, score_source, verdict, flagged, outcome
                 FROM decision_log
                 WHERE decided_at >= ?1
                 ORDER BY decided_at ASC, id ASC",
            )
            .map_err(backend)?;

        let rows = stmt
            .query_map(params![floor], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(backend)?;

        let mut decisions = Vec::new();
        for row in rows {
            let (id, decided_at, statement, rule_safe, rule_reason, probability, source, verdict, flagged, outcome) =
                row.map_err(backend)?;

            let source: ScoreSource = serde_json::from_str(&source)?;
            let outcome: ExecutionOutcome = serde_json::from_str(&outcome)?;
            let id = id
                .parse::<Uuid>()
                .map_err(|e| StoreError::Backend(format!("bad decision id: {e}")))?;
            let decided_at = DateTime::parse_from_rfc3339(&decided_at)
                .map_err(|e| StoreError::Backend(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);
            let verdict = match verdict.as_str() {
                "blocked" => Verdict::Blocked,
                _ => Verdict::Allowed,
            };

            decisions.push(Decision {
                id,
                statement,
                rule_verdict: RuleVerdict {
                    is_safe: rule_safe != 0,
                    reason: rule_reason,
                },
                score: ClassifierScore {
                    probability: probability as f32,
                    source,
                },
                verdict,
                flagged: flagged != 0,
                outcome,
                decided_at,
            });
        }
        Ok(decisions)
    }

    fn len(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM decision_log", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(backend)
    }
}
