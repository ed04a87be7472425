//! Generic CRUD primitives over any [`Entity`], executed on a caller-provided [`Session`].
//!
//! Persistence errors are returned untranslated; the session scope that owns the
//! session turns them into domain errors.

use crate::error::{DbError, LookupContext};
use crate::session::Session;
use crate::sql::{self, ColumnDef, QueryBuf, QueryOptions, SqlValue, Table};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection};
use std::marker::PhantomData;
use uuid::Uuid;

/// A persisted record with a UUID identity and server-assigned `created_at` / `updated_at`.
pub trait Entity: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Every mapped column, in select order.
    const COLUMNS: &'static [ColumnDef];

    fn id(&self) -> Uuid;

    /// Id and business fields to write. Server-managed columns are left out.
    fn values(&self) -> Vec<(&'static str, SqlValue)>;
}

pub struct Repository<E> {
    schema: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Repository {
            schema: self.schema.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(schema: impl Into<String>) -> Self {
        Repository {
            schema: schema.into(),
            _entity: PhantomData,
        }
    }

    pub fn table(&self) -> Table<'_> {
        Table {
            schema: &self.schema,
            name: E::TABLE,
            entity: E::NAME,
            columns: E::COLUMNS,
        }
    }

    /// Insert or overwrite by id, commit, and return the row as stored.
    pub async fn save(&self, session: &mut Session, entity: &E) -> Result<E, DbError> {
        let q = sql::insert(&self.table(), entity.values(), true)?;
        let saved = fetch_one::<E>(session.connection().await?, q).await?;
        session.commit().await?;
        Ok(saved)
    }

    /// Insert without committing. Server defaults are visible in the returned row.
    pub async fn add(&self, session: &mut Session, entity: &E) -> Result<E, DbError> {
        let q = sql::insert(&self.table(), entity.values(), false)?;
        fetch_one::<E>(session.connection().await?, q).await
    }

    pub async fn add_all(&self, session: &mut Session, entities: &[E]) -> Result<Vec<E>, DbError> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            out.push(self.add(session, entity).await?);
        }
        Ok(out)
    }

    /// Rows in storage order unless `options` orders them; `skip` / `limit` paginate.
    pub async fn find_all(
        &self,
        session: &mut Session,
        skip: i64,
        limit: i64,
        options: &QueryOptions,
    ) -> Result<Vec<E>, DbError> {
        let q = sql::select_list(&self.table(), options, Some(skip), Some(limit))?;
        fetch_all::<E>(session.connection().await?, q).await
    }

    /// Exactly one row by id.
    pub async fn find_one(&self, session: &mut Session, id: Uuid, options: &QueryOptions) -> Result<E, DbError> {
        let q = sql::select_by_id(&self.table(), id, options)?;
        let mut rows = fetch_all::<E>(session.connection().await?, q).await?;
        let ctx = LookupContext { entity: E::NAME, id };
        match rows.len() {
            0 => Err(DbError::NoResultFound(ctx)),
            1 => rows.pop().ok_or(DbError::NoResultFound(ctx)),
            _ => Err(DbError::MultipleResultsFound(ctx)),
        }
    }

    /// Partial update by id. With `commit == false` the caller owns the transaction boundary.
    pub async fn update(
        &self,
        session: &mut Session,
        id: Uuid,
        values: Vec<(String, SqlValue)>,
        commit: bool,
    ) -> Result<Option<E>, DbError> {
        let q = sql::update(&self.table(), id, values)?;
        let row = fetch_optional::<E>(session.connection().await?, q).await?;
        if commit {
            session.commit().await?;
        }
        Ok(row)
    }

    /// Delete by id in a nested transaction, then commit. Returns the number of rows removed.
    pub async fn delete(&self, session: &mut Session, id: Uuid) -> Result<u64, DbError> {
        let q = sql::delete(&self.table(), id);
        let mut nested = session.savepoint().await?;
        let removed = execute(&mut nested, q).await?;
        nested.commit().await?;
        session.commit().await?;
        Ok(removed)
    }
}

async fn fetch_all<E: Entity>(conn: &mut PgConnection, q: QueryBuf) -> Result<Vec<E>, DbError> {
    let QueryBuf { sql, params } = q;
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query_as::<_, E>(&sql);
    for p in params {
        query = query.bind(p);
    }
    Ok(query.fetch_all(conn).await?)
}

async fn fetch_optional<E: Entity>(conn: &mut PgConnection, q: QueryBuf) -> Result<Option<E>, DbError> {
    let QueryBuf { sql, params } = q;
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query_as::<_, E>(&sql);
    for p in params {
        query = query.bind(p);
    }
    Ok(query.fetch_optional(conn).await?)
}

async fn fetch_one<E: Entity>(conn: &mut PgConnection, q: QueryBuf) -> Result<E, DbError> {
    let QueryBuf { sql, params } = q;
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query_as::<_, E>(&sql);
    for p in params {
        query = query.bind(p);
    }
    Ok(query.fetch_one(conn).await?)
}

async fn execute(conn: &mut PgConnection, q: QueryBuf) -> Result<u64, DbError> {
    let QueryBuf { sql, params } = q;
    tracing::debug!(sql = %sql, params = ?params, "query");
    let mut query = sqlx::query(&sql);
    for p in params {
        query = query.bind(p);
    }
    Ok(query.execute(conn).await?.rows_affected())
}
