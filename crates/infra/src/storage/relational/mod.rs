//! Relational backend over sqlx's `Any` driver (MySQL in deployment, SQLite in
//! tests).
//!
//! The engine is synchronous: it owns a current-thread tokio runtime and
//! drives every sqlx future to completion before returning. Do not call it
//! from inside an async context; use `spawn_blocking` there.
//!
//! ## Error Mapping
//!
//! | sqlx error | StoreError |
//! |---|---|
//! | `PoolTimedOut`, `PoolClosed`, `Io`, `Tls`, `Configuration` | `Resource` |
//! | `ColumnDecode`, `Decode`, `ColumnNotFound` | `Format` |
//! | `Database` and anything else | `Durability` |
//!
//! Failures inside `reload` are always `Resource`.

mod schema;
mod session;

use std::collections::BTreeMap;

use hbnb_core::{EntityKind, Record, RecordKey, StorageEngine, StoreError, StoreResult};
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Transaction};
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument, warn};

use crate::config::{DatabaseConfig, Environment};

use schema::SqlValue;
use session::Session;

enum EngineState {
    Unopened,
    Open { pool: AnyPool, session: Session },
    Closed,
}

/// Relational storage engine: one table per kind, a pooled connection and a
/// session of pending changes.
pub struct RelationalStorage {
    database: DatabaseConfig,
    environment: Environment,
    runtime: Runtime,
    state: EngineState,
}

impl RelationalStorage {
    /// Build the engine. No connection is made until [`StorageEngine::reload`].
    pub fn new(database: DatabaseConfig, environment: Environment) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::resource(format!("failed to start database runtime: {e}")))?;
        Ok(Self {
            database,
            environment,
            runtime,
            state: EngineState::Unopened,
        })
    }

    fn open(&self, operation: &str) -> StoreResult<(&AnyPool, &Session)> {
        match &self.state {
            EngineState::Open { pool, session } => Ok((pool, session)),
            _ => Err(StoreError::not_open(operation)),
        }
    }

    async fn connect(&self, url: &str) -> Result<AnyPool, sqlx::Error> {
        AnyPoolOptions::new()
            .max_connections(self.database.max_connections)
            .test_before_acquire(true)
            .connect(url)
            .await
    }

    async fn prepare_schema(&self, pool: &AnyPool) -> Result<(), sqlx::Error> {
        if self.environment == Environment::Test {
            for table in schema::tables() {
                let sql = table.drop_sql();
                sqlx::query(&sql).execute(pool).await?;
            }
        }
        for table in schema::tables() {
            let sql = table.create_sql();
            sqlx::query(&sql).execute(pool).await?;
        }
        Ok(())
    }
}

impl StorageEngine for RelationalStorage {
    #[instrument(skip(self), err)]
    fn all(&self, kind: Option<EntityKind>) -> StoreResult<BTreeMap<String, Record>> {
        let (pool, session) = self.open("all")?;
        let mut records = BTreeMap::new();

        self.runtime.block_on(async {
            for table in schema::tables().filter(|t| kind.is_none_or(|k| t.kind == k)) {
                let sql = table.select_sql();
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| map_sqlx_error("all", e))?;
                for row in &rows {
                    let record = table.record_from_row(row)?;
                    records.insert(record.key().to_string(), record);
                }
            }
            Ok::<_, StoreError>(())
        })?;

        session.overlay(&mut records, kind);
        Ok(records)
    }

    #[instrument(skip(self, record), fields(key = %record.key()), err)]
    fn register(&mut self, record: Record) -> StoreResult<()> {
        let EngineState::Open { pool, session } = &mut self.state else {
            return Err(StoreError::not_open("register"));
        };

        let key = record.key();
        if let Some(kind) = self.runtime.block_on(committed_kind_elsewhere(pool, &key))? {
            return Err(StoreError::conflict(format!(
                "identity {id} is already stored as {kind}.{id}",
                id = key.id
            )));
        }
        session.add(record)?;
        debug!("registered");
        Ok(())
    }

    #[instrument(skip(self), err)]
    fn persist(&mut self) -> StoreResult<()> {
        let EngineState::Open { pool, session } = &mut self.state else {
            return Err(StoreError::not_open("persist"));
        };
        if !session.is_dirty() {
            return Ok(());
        }

        self.runtime.block_on(commit(pool, session))?;
        debug!(
            upserts = session.pending().count(),
            deletes = session.deleted().count(),
            "committed"
        );
        session.clear();
        Ok(())
    }

    #[instrument(skip(self, record), fields(key = ?record.map(Record::key)), err)]
    fn delete(&mut self, record: Option<&Record>) -> StoreResult<()> {
        let Some(record) = record else {
            return Ok(());
        };
        let EngineState::Open { pool, session } = &mut self.state else {
            return Err(StoreError::not_open("delete"));
        };

        let key = record.key();
        let cancelled = session.mark_deleted(key.clone());
        match self.runtime.block_on(commit(pool, session)) {
            Ok(()) => {
                session.clear();
                debug!("deleted");
                Ok(())
            }
            Err(err) => {
                session.unmark_deleted(&key, cancelled);
                Err(err)
            }
        }
    }

    #[instrument(skip(self), err)]
    fn reload(&mut self) -> StoreResult<()> {
        let url = self
            .database
            .connection_url()
            .map_err(|e| StoreError::resource(e.to_string()))?;
        sqlx::any::install_default_drivers();

        // A failed reload leaves the engine in whatever state it was in.
        let (pool, connected_here) = match &self.state {
            EngineState::Open { pool, .. } => (pool.clone(), false),
            _ => {
                let pool = self
                    .runtime
                    .block_on(self.connect(&url))
                    .map_err(|e| StoreError::resource(format!("failed to connect: {e}")))?;
                (pool, true)
            }
        };

        if let Err(e) = self.runtime.block_on(self.prepare_schema(&pool)) {
            if connected_here {
                self.runtime.block_on(pool.close());
            }
            return Err(StoreError::resource(format!("failed to prepare schema: {e}")));
        }

        info!(
            driver = url.split(':').next().unwrap_or_default(),
            environment = ?self.environment,
            "relational storage opened"
        );
        self.state = EngineState::Open {
            pool,
            session: Session::default(),
        };
        Ok(())
    }

    fn close(&mut self) {
        if let EngineState::Open { pool, session } =
            std::mem::replace(&mut self.state, EngineState::Closed)
        {
            if session.is_dirty() {
                warn!("relational storage closed with uncommitted changes; discarding them");
            }
            self.runtime.block_on(pool.close());
            info!("relational storage closed");
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.state, EngineState::Open { .. })
    }
}

impl Drop for RelationalStorage {
    fn drop(&mut self) {
        self.close();
    }
}

/// Kind of a committed row (other than `key.kind`) that already uses `key.id`.
async fn committed_kind_elsewhere(pool: &AnyPool, key: &RecordKey) -> StoreResult<Option<EntityKind>> {
    for table in schema::tables().filter(|t| t.kind != key.kind) {
        let sql = table.exists_sql();
        let row = sqlx::query(&sql)
            .bind(key.id.as_str().to_owned())
            .fetch_optional(pool)
            .await
            .map_err(|e| map_sqlx_error("register", e))?;
        if row.is_some() {
            return Ok(Some(table.kind));
        }
    }
    Ok(None)
}

/// Write the session in one transaction: deletes first, then upserts.
/// Either everything lands or nothing does.
async fn commit(pool: &AnyPool, session: &Session) -> StoreResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| map_sqlx_error("begin_transaction", e))?;

    match write_session(&mut tx, session).await {
        Ok(()) => tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e)),
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "rollback failed");
            }
            Err(err)
        }
    }
}

async fn write_session(tx: &mut Transaction<'_, Any>, session: &Session) -> StoreResult<()> {
    for key in session.deleted() {
        let sql = schema::table(key.kind).delete_sql();
        sqlx::query(&sql)
            .bind(key.id.as_str().to_owned())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
    }

    for record in session.pending() {
        let table = schema::table(record.kind());
        let values = table.values(record)?;

        // Portable upsert: replace the whole row.
        let delete = table.delete_sql();
        sqlx::query(&delete)
            .bind(record.id().as_str().to_owned())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("upsert", e))?;

        let insert = table.insert_sql();
        values
            .into_iter()
            .fold(sqlx::query(&insert), bind_value)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("upsert", e))?;
    }
    Ok(())
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        SqlValue::Text(v) => query.bind(v),
        SqlValue::Integer(v) => query.bind(v),
        SqlValue::Real(v) => query.bind(v),
    }
}

/// Map a sqlx error into the storage taxonomy.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::durability(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => {
            StoreError::resource(format!("connection error in {operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::format(format!("row decode error in {operation}: {err}"))
        }
        _ => StoreError::durability(format!("sqlx error in {operation}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_core::{Amenity, Entity, Place, State, StorageEngineExt};
    use tempfile::TempDir;

    fn sqlite(dir: &TempDir, environment: Environment) -> RelationalStorage {
        let database = DatabaseConfig::sqlite(dir.path().join("hbnb.db"));
        RelationalStorage::new(database, environment).unwrap()
    }

    fn open(dir: &TempDir) -> RelationalStorage {
        let mut store = sqlite(dir, Environment::Development);
        store.reload().unwrap();
        store
    }

    fn state(name: &str) -> State {
        State {
            name: name.to_string(),
            ..State::default()
        }
    }

    #[test]
    fn operations_before_reload_fail_fast() {
        let dir = TempDir::new().unwrap();
        let mut store = sqlite(&dir, Environment::Development);
        assert!(matches!(store.all(None), Err(StoreError::Resource(_))));
        assert!(matches!(store.persist(), Err(StoreError::Resource(_))));
        store.close();
        assert!(!store.is_open());
    }

    #[test]
    fn missing_connection_parameters_fail_reload() {
        let mut store =
            RelationalStorage::new(DatabaseConfig::default(), Environment::Development).unwrap();
        assert!(matches!(store.reload(), Err(StoreError::Resource(_))));
        assert!(!store.is_open());
    }

    #[test]
    fn uncommitted_registrations_are_visible_but_not_durable() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let ohio = state("Ohio");
        store.register(ohio.clone().into()).unwrap();
        assert_eq!(store.get_of::<State>(ohio.id()).unwrap(), Some(ohio.clone()));

        store.close();
        store.reload().unwrap();
        assert_eq!(store.get_of::<State>(ohio.id()).unwrap(), None);
    }

    #[test]
    fn rows_round_trip_every_column() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let mut place = Place {
            name: "Loft".to_string(),
            description: Some("Sunny".to_string()),
            number_rooms: 2,
            price_by_night: 120,
            latitude: Some(37.7749),
            ..Place::default()
        };
        place.add_amenity(&Amenity::default());
        store.register(place.clone().into()).unwrap();
        store.persist().unwrap();
        store.close();

        store.reload().unwrap();
        assert_eq!(store.get_of::<Place>(place.id()).unwrap(), Some(place));
    }

    #[test]
    fn save_twice_keeps_one_row() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let mut ohio = state("Ohio");
        ohio.save(&mut store).unwrap();
        ohio.name = "Buckeye State".to_string();
        ohio.save(&mut store).unwrap();

        let states = store.all_of::<State>().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[&ohio.key().to_string()].name, "Buckeye State");
    }

    #[test]
    fn test_environment_starts_from_empty_tables() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        state("Ohio").save(&mut store).unwrap();
        store.close();

        let mut fresh = sqlite(&dir, Environment::Test);
        fresh.reload().unwrap();
        assert_eq!(fresh.count(None).unwrap(), 0);
    }

    fn execute(store: &RelationalStorage, sql: &str) {
        let EngineState::Open { pool, .. } = &store.state else {
            panic!("store is not open");
        };
        store
            .runtime
            .block_on(sqlx::query(sql).execute(pool))
            .unwrap();
    }

    fn session(store: &RelationalStorage) -> &Session {
        match &store.state {
            EngineState::Open { session, .. } => session,
            _ => panic!("store is not open"),
        }
    }

    #[test]
    fn committed_identity_under_another_kind_conflicts() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let ohio = state("Ohio");
        ohio.clone().save(&mut store).unwrap();

        let impostor = Amenity {
            base: ohio.base.clone(),
            ..Amenity::default()
        };
        assert!(matches!(
            store.register(impostor.into()),
            Err(StoreError::Conflict(_))
        ));
        assert!(!session(&store).is_dirty());
        assert_eq!(store.count(None).unwrap(), 1);
    }

    #[test]
    fn failed_persist_rolls_back_and_keeps_the_session() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let kept = Amenity {
            name: "Wifi".to_string(),
            ..Amenity::default()
        };
        let ohio = state("Ohio");
        store.register(kept.clone().into()).unwrap();
        store.register(ohio.clone().into()).unwrap();

        execute(&store, "DROP TABLE states");
        assert!(matches!(store.persist(), Err(StoreError::Durability(_))));

        let pending: Vec<&Record> = session(&store).pending().collect();
        assert_eq!(pending.len(), 2);
        assert!(pending.contains(&&Record::from(ohio)));

        // Nothing from the failed transaction reached the other table.
        store.close();
        store.reload().unwrap();
        assert_eq!(store.get_of::<Amenity>(kept.id()).unwrap(), None);
    }

    #[test]
    fn failed_delete_undoes_the_mark() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let ohio = state("Ohio");
        ohio.clone().save(&mut store).unwrap();

        execute(&store, "DROP TABLE states");
        let err = store.delete(Some(&ohio.clone().into())).unwrap_err();

        assert!(matches!(err, StoreError::Durability(_)));
        assert_eq!(session(&store).deleted().count(), 0);
        assert!(!session(&store).is_dirty());
    }

    #[test]
    fn failed_reload_keeps_the_previous_state() {
        let dir = TempDir::new().unwrap();
        let unreachable = DatabaseConfig::sqlite(dir.path().join("missing").join("hbnb.db"));
        let mut store = RelationalStorage::new(unreachable, Environment::Development).unwrap();
        store.close();

        assert!(matches!(store.reload(), Err(StoreError::Resource(_))));
        assert!(matches!(store.state, EngineState::Closed));
    }

    #[test]
    fn delete_commits_immediately() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir);
        let ohio = state("Ohio");
        ohio.clone().save(&mut store).unwrap();

        store.delete(Some(&ohio.clone().into())).unwrap();
        store.close();
        store.reload().unwrap();
        assert_eq!(store.count(Some(EntityKind::State)).unwrap(), 0);
    }
}
