//! Composable SQL predicates with bound parameters.
//!
//! A [`Predicate`] is a sequence of SQL text and values. It is rendered into a
//! `sqlx::QueryBuilder`, so every value goes through a `$n` placeholder and
//! column names are the only text that reaches the statement verbatim.

use orgdir_core::models::Status;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Uuid(Uuid),
    Bool(bool),
    Status(Status),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<Status> for SqlValue {
    fn from(v: Status) -> Self {
        SqlValue::Status(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Sql(String),
    Bind(SqlValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    fragments: Vec<Fragment>,
}

impl Predicate {
    /// Literal SQL condition without parameters, e.g. `is_deleted = FALSE`.
    pub fn raw(sql: &str) -> Self {
        Self {
            fragments: vec![Fragment::Sql(sql.to_string())],
        }
    }

    pub fn eq(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, "=", value.into())
    }

    pub fn ne(column: &str, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, "<>", value.into())
    }

    /// `column LIKE '%needle%'` with LIKE metacharacters in `needle` escaped.
    pub fn contains(column: &str, needle: &str) -> Self {
        Self::compare(
            column,
            "LIKE",
            SqlValue::Text(format!("%{}%", escape_like(needle))),
        )
    }

    fn compare(column: &str, op: &str, value: SqlValue) -> Self {
        Self {
            fragments: vec![
                Fragment::Sql(format!("{} {} ", column, op)),
                Fragment::Bind(value),
            ],
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        let mut fragments = Vec::with_capacity(self.fragments.len() + other.fragments.len() + 3);
        fragments.push(Fragment::Sql("(".to_string()));
        fragments.extend(self.fragments);
        fragments.push(Fragment::Sql(") AND (".to_string()));
        fragments.extend(other.fragments);
        fragments.push(Fragment::Sql(")".to_string()));
        Self { fragments }
    }

    pub fn and_maybe(self, other: Option<Predicate>) -> Self {
        match other {
            Some(other) => self.and(other),
            None => self,
        }
    }

    pub fn push_to(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        for fragment in &self.fragments {
            match fragment {
                Fragment::Sql(sql) => {
                    qb.push(sql);
                }
                Fragment::Bind(value) => {
                    match value.clone() {
                        SqlValue::Text(v) => qb.push_bind(v),
                        SqlValue::Uuid(v) => qb.push_bind(v),
                        SqlValue::Bool(v) => qb.push_bind(v),
                        SqlValue::Status(v) => qb.push_bind(v),
                    };
                }
            }
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
