use anyhow::Result;
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Expected number of user accounts and false-positive rate of the filter.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Approximate set of registered emails. A miss means the email is free;
/// a hit has to be confirmed against the users table.
static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Trimmed, lower-cased form under which emails are stored.
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check: one `@` with text on both sides, no whitespace.
pub fn is_valid(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn might_exist(email: &str) -> bool {
    EMAIL_FILTER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .contains(&email.to_string())
}

pub fn insert(email: &str) {
    EMAIL_FILTER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .add(&normalize(email));
}

pub fn remove(email: &str) {
    EMAIL_FILTER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&normalize(email));
}

/// true  => email AVAILABLE
/// false => email TAKEN (or the lookup failed)
pub async fn is_available(pool: &MySqlPool, email: &str) -> bool {
    let email = normalize(email);

    if !might_exist(&email) {
        return true;
    }

    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(pool)
        .await
        .map(|count| count > 0)
        .unwrap_or(true); // fail-safe

    !taken
}

/// Loads every registered email into the filter.
pub async fn warmup(pool: &MySqlPool) -> Result<()> {
    let mut stream = sqlx::query_scalar::<_, String>("SELECT email FROM users").fetch(pool);

    let mut total = 0usize;
    while let Some(email) = stream.next().await {
        insert(&email?);
        total += 1;
    }

    log::info!("Email index warmup complete: {} users", total);
    Ok(())
}
