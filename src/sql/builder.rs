//! Builds parameterized INSERT, SELECT, UPDATE, DELETE for a described table.

use super::params::SqlValue;
use crate::error::DbError;
use crate::model::SortOrder;
use uuid::Uuid;

/// One mapped column.
#[derive(Clone, Copy, Debug)]
pub struct ColumnDef {
    pub name: &'static str,
    pub pg_type: &'static str,
    /// User-defined enum type living in the table's schema; selected as text.
    pub is_enum: bool,
    /// Assigned by the database (timestamps); never written from an entity.
    pub server_managed: bool,
}

impl ColumnDef {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        ColumnDef {
            name,
            pg_type,
            is_enum: false,
            server_managed: false,
        }
    }

    pub const fn enumeration(name: &'static str, type_name: &'static str) -> Self {
        ColumnDef {
            is_enum: true,
            ..Self::new(name, type_name)
        }
    }

    pub const fn server_managed(name: &'static str, pg_type: &'static str) -> Self {
        ColumnDef {
            server_managed: true,
            ..Self::new(name, pg_type)
        }
    }
}

/// Table an entity maps to. Identifiers come from code only; values are always parameters.
#[derive(Clone, Copy, Debug)]
pub struct Table<'a> {
    pub schema: &'a str,
    pub name: &'static str,
    pub entity: &'static str,
    pub columns: &'static [ColumnDef],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
}

impl FilterOp {
    fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: SqlValue,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Filter {
            column: column.into(),
            op: FilterOp::Gte,
            value: value.into(),
        }
    }
}

/// Extra predicates and ordering for a read.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub order_by: Vec<(String, SortOrder)>,
}

impl QueryOptions {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(name))
}

impl<'a> Table<'a> {
    pub fn qualified_name(&self) -> String {
        qualified(self.schema, self.name)
    }

    fn column(&self, name: &str) -> Result<&'static ColumnDef, DbError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| DbError::UnknownColumn {
                entity: self.entity,
                column: name.to_string(),
            })
    }

    /// `$n` cast to the column's type.
    fn placeholder(&self, col: &ColumnDef, n: usize) -> String {
        if col.is_enum {
            format!("${}::{}", n, qualified(self.schema, col.pg_type))
        } else {
            format!("${}::{}", n, col.pg_type)
        }
    }

    fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| {
                let q = quoted(c.name);
                if c.is_enum {
                    format!("{}::text AS {}", q, q)
                } else {
                    q
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_where(&self, q: &mut QueryBuf, mut clauses: Vec<String>, options: &QueryOptions) -> Result<(), DbError> {
        for f in &options.filters {
            let col = self.column(&f.column)?;
            let n = q.push_param(f.value.clone());
            clauses.push(format!("{} {} {}", quoted(col.name), f.op.as_sql(), self.placeholder(col, n)));
        }
        if !clauses.is_empty() {
            q.sql.push_str(" WHERE ");
            q.sql.push_str(&clauses.join(" AND "));
        }
        Ok(())
    }

    fn push_order_by(&self, q: &mut QueryBuf, options: &QueryOptions) -> Result<(), DbError> {
        let mut parts = Vec::with_capacity(options.order_by.len());
        for (name, order) in &options.order_by {
            let col = self.column(name)?;
            parts.push(format!("{} {}", quoted(col.name), order.as_sql()));
        }
        if !parts.is_empty() {
            q.sql.push_str(" ORDER BY ");
            q.sql.push_str(&parts.join(", "));
        }
        Ok(())
    }
}

/// SELECT with filters, ordering and pagination. No ORDER BY unless asked for.
pub fn select_list(
    table: &Table<'_>,
    options: &QueryOptions,
    skip: Option<i64>,
    limit: Option<i64>,
) -> Result<QueryBuf, DbError> {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT {} FROM {}", table.select_list(), table.qualified_name());
    table.push_where(&mut q, Vec::new(), options)?;
    table.push_order_by(&mut q, options)?;
    if let Some(skip) = skip {
        let n = q.push_param(SqlValue::BigInt(skip));
        q.sql.push_str(&format!(" OFFSET ${}::bigint", n));
    }
    if let Some(limit) = limit {
        let n = q.push_param(SqlValue::BigInt(limit));
        q.sql.push_str(&format!(" LIMIT ${}::bigint", n));
    }
    Ok(q)
}

/// SELECT by id. Fetches at most two rows so callers can detect ambiguity.
pub fn select_by_id(table: &Table<'_>, id: Uuid, options: &QueryOptions) -> Result<QueryBuf, DbError> {
    let mut q = QueryBuf::new();
    q.sql = format!("SELECT {} FROM {}", table.select_list(), table.qualified_name());
    let n = q.push_param(SqlValue::Uuid(id));
    table.push_where(&mut q, vec![format!("\"id\" = ${}::uuid", n)], options)?;
    table.push_order_by(&mut q, options)?;
    q.sql.push_str(" LIMIT 2");
    Ok(q)
}

/// INSERT ... RETURNING. With `upsert`, an existing id is overwritten and `updated_at` bumped.
pub fn insert(table: &Table<'_>, values: Vec<(&'static str, SqlValue)>, upsert: bool) -> Result<QueryBuf, DbError> {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (name, value) in values {
        let col = table.column(name)?;
        let n = q.push_param(value);
        cols.push(col);
        placeholders.push(table.placeholder(col, n));
    }
    let col_list = cols.iter().map(|c| quoted(c.name)).collect::<Vec<_>>().join(", ");
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table.qualified_name())
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.qualified_name(),
            col_list,
            placeholders.join(", ")
        )
    };
    if upsert {
        let mut sets: Vec<String> = cols
            .iter()
            .filter(|c| c.name != "id")
            .map(|c| format!("{} = EXCLUDED.{}", quoted(c.name), quoted(c.name)))
            .collect();
        if table.columns.iter().any(|c| c.name == "updated_at") {
            sets.push("\"updated_at\" = CURRENT_TIMESTAMP(0)".into());
        }
        if sets.is_empty() {
            q.sql.push_str(" ON CONFLICT (\"id\") DO NOTHING");
        } else {
            q.sql.push_str(&format!(" ON CONFLICT (\"id\") DO UPDATE SET {}", sets.join(", ")));
        }
    }
    q.sql.push_str(&format!(" RETURNING {}", table.select_list()));
    Ok(q)
}

/// UPDATE by id, bumping `updated_at`. Server-managed columns cannot be set.
pub fn update(table: &Table<'_>, id: Uuid, values: Vec<(String, SqlValue)>) -> Result<QueryBuf, DbError> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::with_capacity(values.len() + 1);
    for (name, value) in values {
        let col = table.column(&name)?;
        if col.server_managed || col.name == "id" {
            return Err(DbError::UnknownColumn {
                entity: table.entity,
                column: name,
            });
        }
        let n = q.push_param(value);
        sets.push(format!("{} = {}", quoted(col.name), table.placeholder(col, n)));
    }
    if table.columns.iter().any(|c| c.name == "updated_at") {
        sets.push("\"updated_at\" = CURRENT_TIMESTAMP(0)".into());
    }
    let n = q.push_param(SqlValue::Uuid(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ${}::uuid RETURNING {}",
        table.qualified_name(),
        sets.join(", "),
        n,
        table.select_list()
    );
    Ok(q)
}

/// DELETE by id.
pub fn delete(table: &Table<'_>, id: Uuid) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(SqlValue::Uuid(id));
    q.sql = format!("DELETE FROM {} WHERE \"id\" = ${}::uuid", table.qualified_name(), n);
    q
}
