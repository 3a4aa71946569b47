use crate::model::working_graphic::Day;
use crate::utils::db_utils::placeholders;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Days of each working graphic, keyed by graphic id.
static SCHEDULE_CACHE: Lazy<Cache<u64, Arc<Vec<Day>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(3600))
        .build()
});

/// Bumped by every invalidation. A load that started before a bump may have
/// read rows from before the change and must not stay cached.
static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Caches `days` read while `seen` was the current generation, dropping them
/// again if an invalidation ran in between.
async fn store(id: u64, days: Arc<Vec<Day>>, seen: u64) {
    SCHEDULE_CACHE.insert(id, days).await;
    if GENERATION.load(Ordering::SeqCst) != seen {
        SCHEDULE_CACHE.invalidate(&id).await;
    }
}

/// Loads the days of the given graphics, hitting the database only for the
/// ids that are not cached yet.
pub async fn days_for(
    pool: &MySqlPool,
    graphic_ids: &[u64],
) -> Result<HashMap<u64, Arc<Vec<Day>>>, sqlx::Error> {
    let mut found = HashMap::with_capacity(graphic_ids.len());
    let mut missing = Vec::new();

    for &id in graphic_ids {
        if found.contains_key(&id) || missing.contains(&id) {
            continue;
        }
        match SCHEDULE_CACHE.get(&id).await {
            Some(days) => {
                found.insert(id, days);
            }
            None => missing.push(id),
        }
    }

    if missing.is_empty() {
        return Ok(found);
    }

    let seen = GENERATION.load(Ordering::SeqCst);

    let sql = format!(
        "SELECT * FROM days WHERE working_graphic_id IN ({}) ORDER BY id",
        placeholders(missing.len())
    );
    let mut query = sqlx::query_as::<_, Day>(&sql);
    for id in &missing {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut grouped: HashMap<u64, Vec<Day>> = missing.iter().map(|id| (*id, Vec::new())).collect();
    for day in rows {
        grouped.entry(day.working_graphic_id).or_default().push(day);
    }

    for (id, mut days) in grouped {
        days.sort_by_key(|d| d.weekday());
        let days = Arc::new(days);
        store(id, days.clone(), seen).await;
        found.insert(id, days);
    }

    Ok(found)
}

/// Drops a graphic after its days changed or it was deleted.
pub async fn invalidate(graphic_id: u64) {
    GENERATION.fetch_add(1, Ordering::SeqCst);
    SCHEDULE_CACHE.invalidate(&graphic_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn load_racing_an_invalidation_is_not_kept() {
        let seen = GENERATION.load(Ordering::SeqCst);
        invalidate(9_001).await;
        store(9_001, Arc::new(Vec::new()), seen).await;
        assert!(SCHEDULE_CACHE.get(&9_001).await.is_none());
    }

    #[actix_web::test]
    async fn load_without_invalidation_is_cached() {
        let id = 9_002;
        let mut seen = GENERATION.load(Ordering::SeqCst);
        store(id, Arc::new(Vec::new()), seen).await;
        // other tests may invalidate concurrently; retry until a quiet window
        while SCHEDULE_CACHE.get(&id).await.is_none() {
            seen = GENERATION.load(Ordering::SeqCst);
            store(id, Arc::new(Vec::new()), seen).await;
        }
        assert!(SCHEDULE_CACHE.get(&id).await.is_some());
    }
}
