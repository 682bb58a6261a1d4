//! SQLite-based star-list cache with single-flight fetch deduplication

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::stars::error::{CacheError, FetchError};
use crate::stars::types::StarKind;

type FlightKey = (StarKind, String);

/// Persistent cache mapping (kind, identifier) to an ordered star list.
///
/// Freshness is controlled by a single policy point: `ttl`. The default is
/// `None`, meaning TTL = infinity — a present entry is always fresh and is
/// only ever replaced wholesale by an explicit refetch after expiry.
///
/// `get_or_fetch` guarantees at most one upstream fetch per key even under
/// concurrent callers: requesters for the same key serialize on a shared
/// per-key handle and re-check the store before fetching.
pub struct StarCache {
    conn: Mutex<Connection>,
    ttl: Option<Duration>,
    flights: Mutex<HashMap<FlightKey, Arc<AsyncMutex<()>>>>,
}

impl StarCache {
    pub fn new(db_path: &Path, ttl: Option<Duration>) -> Result<Self, CacheError> {
        info!("Initializing star cache at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let cache = Self {
            conn: Mutex::new(conn),
            ttl,
            flights: Mutex::new(HashMap::new()),
        };

        cache.create_schema()?;
        debug!("Star cache initialized");

        Ok(cache)
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_millis() as i64
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS star_lists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                ident TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                UNIQUE(kind, ident)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS star_list_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                list_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                item TEXT NOT NULL,
                FOREIGN KEY (list_id) REFERENCES star_lists(id) ON DELETE CASCADE,
                UNIQUE(list_id, position)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_star_list_items_list_id ON star_list_items(list_id)",
            [],
        )?;

        Ok(())
    }

    /// Returns the cached list for a key, or `None` when absent or stale
    pub fn get(&self, kind: StarKind, ident: &str) -> Result<Option<Vec<String>>, CacheError> {
        let conn = self.lock_conn()?;

        let row = conn.query_row(
            "SELECT id, fetched_at FROM star_lists WHERE kind = ?1 AND ident = ?2",
            (kind.as_str(), ident),
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        );

        let (list_id, fetched_at) = match row {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Some(ttl) = self.ttl {
            let age_ms = Self::current_timestamp_ms() - fetched_at;
            if age_ms >= ttl.as_millis() as i64 {
                debug!("Cache entry for {}/{} is stale", kind.as_str(), ident);
                return Ok(None);
            }
        }

        let mut stmt = conn
            .prepare("SELECT item FROM star_list_items WHERE list_id = ?1 ORDER BY position")?;
        let items = stmt
            .query_map([list_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(items))
    }

    /// Replaces the stored list for a key wholesale, in one transaction
    pub fn put(&self, kind: StarKind, ident: &str, items: &[String]) -> Result<(), CacheError> {
        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO star_lists (kind, ident, fetched_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(kind, ident) DO UPDATE SET fetched_at = excluded.fetched_at
            "#,
            (kind.as_str(), ident, now),
        )?;

        let list_id: i64 = tx.query_row(
            "SELECT id FROM star_lists WHERE kind = ?1 AND ident = ?2",
            (kind.as_str(), ident),
            |row| row.get(0),
        )?;

        tx.execute("DELETE FROM star_list_items WHERE list_id = ?1", [list_id])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO star_list_items (list_id, position, item) VALUES (?1, ?2, ?3)",
            )?;
            for (position, item) in items.iter().enumerate() {
                stmt.execute((list_id, position as i64, item))?;
            }
        }

        tx.commit()?;

        debug!("Stored {} items for {}/{}", items.len(), kind.as_str(), ident);
        Ok(())
    }

    /// Returns the cached list for a key, invoking `fetch` on a miss and
    /// persisting its result.
    ///
    /// Concurrent callers for the same missing key trigger exactly one
    /// invocation of `fetch`; the rest serialize behind it and pick up the
    /// stored value. A `fetch` failure is never cached and propagates, so
    /// the next caller retries. A store failure degrades to a direct fetch
    /// with a warning instead of failing the request.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        kind: StarKind,
        ident: &str,
        fetch: F,
    ) -> Result<Vec<String>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<String>, FetchError>>,
    {
        let flight = self.flight(kind, ident);

        let result = {
            let _guard = flight.lock().await;

            match self.get(kind, ident) {
                Ok(Some(items)) => {
                    debug!("Cache hit for {}/{}", kind.as_str(), ident);
                    Ok(items)
                }
                other => {
                    if let Err(e) = other {
                        warn!(
                            "Cache unavailable for {}/{}, fetching directly: {}",
                            kind.as_str(),
                            ident,
                            e
                        );
                    }
                    let fetched = fetch().await;
                    if let Ok(items) = &fetched {
                        if let Err(e) = self.put(kind, ident, items) {
                            warn!(
                                "Failed to store {}/{} in cache: {}",
                                kind.as_str(),
                                ident,
                                e
                            );
                        }
                    }
                    fetched
                }
            }
        };

        self.release_flight(kind, ident, &flight);
        result
    }

    /// Returns the shared in-flight handle for a key, creating it on demand
    fn flight(&self, kind: StarKind, ident: &str) -> Arc<AsyncMutex<()>> {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        flights
            .entry((kind, ident.to_string()))
            .or_default()
            .clone()
    }

    /// Drops the in-flight handle once no other caller is waiting on it
    fn release_flight(&self, kind: StarKind, ident: &str, flight: &Arc<AsyncMutex<()>>) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        // Two strong refs means the map and us; anyone else still waiting
        // keeps the handle alive and removes it on their own completion.
        if Arc::strong_count(flight) <= 2 {
            flights.remove(&(kind, ident.to_string()));
        }
    }
}
