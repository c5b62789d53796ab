//! Parameterized query composition
//!
//! Filters become `AND column = $n` predicates with placeholders assigned
//! here, never by callers. Column names only ever come from the caller's
//! allowlist, so request keys cannot inject SQL. The WHERE clause is kept as
//! data so page and count queries are rendered from the same filter set.

use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

use crate::models::Page;

/// A bind parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i64),
}

/// Equality filters over allowlisted columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhereClause {
    conditions: Vec<(&'static str, String)>,
}

impl WhereClause {
    /// Build from `(key, value)` pairs in iteration order.
    ///
    /// Pairs whose value is `None` or whose key is not in `allowed_columns`
    /// are skipped.
    pub fn build<I, K>(filters: I, allowed_columns: &[&'static str]) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: AsRef<str>,
    {
        let conditions = filters
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?;
                let column = allowed_columns
                    .iter()
                    .copied()
                    .find(|column| *column == key.as_ref())?;
                Some((column, value))
            })
            .collect();

        Self { conditions }
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Render `WHERE 1=1 [AND column = $n]...` starting at `$1`.
    pub fn render(&self) -> String {
        self.conditions.iter().enumerate().fold(
            String::from("WHERE 1=1"),
            |mut sql, (index, (column, _))| {
                sql.push_str(&format!(" AND {} = ${}", column, index + 1));
                sql
            },
        )
    }

    /// Bind values matching the placeholders of [`render`](Self::render).
    pub fn params(&self) -> Vec<Param> {
        self.conditions
            .iter()
            .map(|(_, value)| Param::Text(value.clone()))
            .collect()
    }
}

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl ComposedQuery {
    /// `{select} {where} [ORDER BY {order_by}]`
    ///
    /// `select` and `order_by` are trusted, static SQL.
    pub fn select(select: &str, filter: &WhereClause, order_by: Option<&str>) -> Self {
        let mut sql = format!("{} {}", select, filter.render());
        if let Some(order_by) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }

        Self {
            sql,
            params: filter.params(),
        }
    }

    /// `SELECT COUNT(*) FROM {table} {where}` over the same filter params.
    pub fn count(table: &str, filter: &WhereClause) -> Self {
        Self {
            sql: format!("SELECT COUNT(*) FROM {} {}", table, filter.render()),
            params: filter.params(),
        }
    }

    /// Append `LIMIT $n OFFSET $n+1` after the existing parameters.
    pub fn paginate(mut self, page: Page) -> Self {
        let next = self.params.len() + 1;
        self.sql
            .push_str(&format!(" LIMIT ${} OFFSET ${}", next, next + 1));
        self.params.push(Param::Int(page.limit));
        self.params.push(Param::Int(page.offset));
        self
    }

    /// A sqlx query with every parameter bound in order.
    pub fn to_query(&self) -> Query<'_, Postgres, PgArguments> {
        self.params
            .iter()
            .fold(sqlx::query(&self.sql), |query, param| match param {
                Param::Text(value) => query.bind(value.as_str()),
                Param::Int(value) => query.bind(*value),
            })
    }
}
