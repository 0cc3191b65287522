//! Synthetic Traffic Generator
//!
//! Template-driven safe and malicious statements over a sample rental
//! schema. Fuels the feedback loop and doubles as a training-set fixture.

use rand::seq::SliceRandom;
use rand::Rng;

const SAFE_TEMPLATES: [&str; 7] = [
    "SELECT * FROM {table} LIMIT {limit};",
    "SELECT {column} FROM {table} WHERE {column} IS NOT NULL LIMIT {limit};",
    "SELECT COUNT(*) FROM {table};",
    "SELECT DISTINCT {column} FROM {table};",
    "SELECT {column}, COUNT(*) FROM {table} GROUP BY {column} ORDER BY COUNT(*) DESC LIMIT {limit};",
    "SELECT * FROM {table} WHERE {column} LIKE 'A%';",
    "SELECT * FROM {table} ORDER BY {column} DESC LIMIT {limit};",
];

const MALICIOUS_TEMPLATES: [&str; 16] = [
    "SELEC FROM {table};",
    "SELECT * FORM {table};",
    "SELECT * FROM WHERE id = 1;",
    "SELECT * FROM {table} WHERE ;",
    "SELECT * FROM non_existing_table;",
    "SELECT fake_column FROM {table};",
    "DROP TABLE {table};",
    "DELETE FROM {table};",
    "TRUNCATE TABLE {table};",
    "UPDATE {table} SET {column} = 'HACKED';",
    "INSERT INTO {table} VALUES (9999, 'Evil', 'Hacker');",
    "SELECT 1/0;",
    "SELECT * FROM {table} WHERE {column} = 'abc';",
    "SELECT * FROM {table} WHERE {column} = '' OR '1'='1';",
    "SELECT * FROM {table} WHERE {column} = '' UNION SELECT version(), current_user, now();--';",
    "SELECT * FROM {table}; DROP TABLE {table};--",
];

const TABLES: [&str; 11] = [
    "actor", "film", "customer", "store", "payment", "rental", "category", "staff", "language",
    "inventory", "address",
];

const COLUMNS: [&str; 11] = [
    "actor_id",
    "first_name",
    "last_name",
    "title",
    "release_year",
    "amount",
    "payment_id",
    "customer_id",
    "store_id",
    "name",
    "district",
];

fn instantiate(template: &str, rng: &mut impl Rng) -> String {
    let table = TABLES.choose(rng).unwrap();
    let column = COLUMNS.choose(rng).unwrap();
    let limit = rng.gen_range(1..=50);
    template
        .replace("{table}", table)
        .replace("{column}", column)
        .replace("{limit}", &limit.to_string())
}

/// Generate `n` benign statements.
pub fn generate_safe_queries(n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let template = SAFE_TEMPLATES.choose(&mut rng).unwrap();
            instantiate(template, &mut rng)
        })
        .collect()
}

/// Generate `n` malicious or malformed statements.
pub fn generate_malicious_queries(n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let template = MALICIOUS_TEMPLATES.choose(&mut rng).unwrap();
            instantiate(template, &mut rng)
        })
        .collect()
}

/// Statement feed consumed by the feedback loop driver.
pub trait TrafficSource: Send + Sync {
    fn next_statement(&self) -> String;
}

/// Pre-generated pool of mixed safe and malicious statements, sampled
/// uniformly. Mirrors a replay of recorded mixed traffic.
pub struct SyntheticTraffic {
    pool: Vec<String>,
}

impl SyntheticTraffic {
    /// Pool with `n_each` safe and `n_each` malicious statements.
    pub fn new(n_each: usize) -> Self {
        let mut pool = generate_safe_queries(n_each);
        pool.extend(generate_malicious_queries(n_each));
        Self { pool }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }
}

impl Default for SyntheticTraffic {
    fn default() -> Self {
        Self::new(500)
    }
}

impl TrafficSource for SyntheticTraffic {
    fn next_statement(&self) -> String {
        self.pool
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}
