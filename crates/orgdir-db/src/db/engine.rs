//! Shared data-access primitives: paginated listing, uniqueness pre-checks
//! and post-fetch record formatting.

use std::sync::Arc;

use async_trait::async_trait;
use orgdir_core::models::{Formattable, Page, PageRequest, Pagination, TIMESTAMP_FORMAT};
use orgdir_core::{AppError, ErrorCode};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};

use super::query::Predicate;

/// Timestamp fields every formatter renders, in addition to its own rules.
const AMBIENT_TIME_FIELDS: [&str; 2] = ["created_at", "updated_at"];

type Transform = Arc<dyn Fn(&str) -> Result<String, AppError> + Send + Sync>;

/// Replace a text field's value with the result of `transform`.
#[derive(Clone)]
pub struct FormatRule {
    field: &'static str,
    transform: Transform,
}

impl FormatRule {
    pub fn new<F>(field: &'static str, transform: F) -> Self
    where
        F: Fn(&str) -> Result<String, AppError> + Send + Sync + 'static,
    {
        Self {
            field,
            transform: Arc::new(transform),
        }
    }
}

/// Ordered format rules applied to every fetched record.
#[derive(Clone)]
pub struct Formatter {
    rules: Vec<FormatRule>,
}

impl Formatter {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rule(mut self, rule: FormatRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Fields that are absent or NULL are left alone.
    pub fn apply<R: Formattable>(&self, record: &mut R) -> Result<(), AppError> {
        for field in AMBIENT_TIME_FIELDS {
            if let Some(ts) = record.time_field(field) {
                ts.format(TIMESTAMP_FORMAT);
            }
        }
        for rule in &self.rules {
            if let Some(value) = record.text_field(rule.field) {
                let formatted = (rule.transform)(value.as_str())?;
                *value = formatted;
            }
        }
        Ok(())
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

/// A `SELECT` split into the parts pagination needs.
#[derive(Debug, Clone)]
pub struct Listing {
    pub columns: &'static str,
    pub from: &'static str,
    pub filter: Predicate,
    /// Must be a total order, e.g. `created_at DESC, id DESC`.
    pub order_by: &'static str,
}

impl Listing {
    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {} WHERE ", self.from));
        self.filter.push_to(&mut qb);
        qb
    }

    pub fn page_query(&self, page: PageRequest) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE ",
            self.columns, self.from
        ));
        self.filter.push_to(&mut qb);
        qb.push(format!(" ORDER BY {} LIMIT ", self.order_by));
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());
        qb
    }
}

/// Count the filtered rows, fetch one page of them and format each record.
pub async fn paginate<R>(
    conn: &mut PgConnection,
    listing: &Listing,
    page: PageRequest,
    formatter: &Formatter,
) -> Result<Page<R>, AppError>
where
    R: for<'r> FromRow<'r, PgRow> + Formattable + Send + Unpin,
{
    let mut count = listing.count_query();
    let total: i64 = count
        .build_query_scalar::<i64>()
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, from = listing.from, "Failed to count rows");
            AppError::StoreFailure(e)
        })?;

    let mut select = listing.page_query(page);
    let mut records: Vec<R> = select
        .build_query_as::<R>()
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, from = listing.from, "Failed to fetch page");
            AppError::StoreFailure(e)
        })?;

    for record in records.iter_mut() {
        formatter.apply(record)?;
    }

    Ok(Page {
        records,
        pagination: Pagination::new(page, total),
    })
}

/// Pairs the error surfaced on collision with the predicate that detects it.
#[derive(Debug, Clone)]
pub struct UniquenessRule {
    pub error: ErrorCode,
    pub predicate: Predicate,
}

impl UniquenessRule {
    pub fn new(error: ErrorCode, predicate: Predicate) -> Self {
        Self { error, predicate }
    }
}

#[async_trait]
pub trait ExistsProbe: Send {
    async fn exists(&mut self, table: &str, predicate: &Predicate) -> Result<bool, AppError>;
}

#[async_trait]
impl ExistsProbe for PgConnection {
    async fn exists(&mut self, table: &str, predicate: &Predicate) -> Result<bool, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE ",
            table
        ));
        predicate.push_to(&mut qb);
        qb.push(")");

        qb.build_query_scalar::<bool>()
            .fetch_one(&mut *self)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, table, "Uniqueness probe failed");
                AppError::StoreFailure(e)
            })
    }
}

/// Evaluate `rules` in order and fail with the first one that matches.
///
/// `except` is AND-ed into every rule so a row being updated does not
/// collide with itself.
pub async fn check_unique<P>(
    probe: &mut P,
    table: &str,
    rules: &[UniquenessRule],
    except: Option<&Predicate>,
) -> Result<(), AppError>
where
    P: ExistsProbe + ?Sized,
{
    for rule in rules {
        let predicate = rule.predicate.clone().and_maybe(except.cloned());
        if probe.exists(table, &predicate).await? {
            tracing::debug!(table, code = ?rule.error, "Uniqueness rule matched");
            return Err(AppError::Uniqueness(rule.error));
        }
    }
    Ok(())
}

/// Map a unique-constraint violation raised by the store to the domain code
/// registered for that constraint. Anything else is a store failure.
pub fn map_unique_violation(err: sqlx::Error, constraints: &[(&str, ErrorCode)]) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let hit = db_err
                .constraint()
                .and_then(|name| constraints.iter().find(|(c, _)| *c == name));
            if let Some((constraint, code)) = hit {
                tracing::debug!(constraint, "Unique constraint rejected write");
                return AppError::Uniqueness(*code);
            }
        }
    }
    tracing::error!(error = %err, "Database write failed");
    AppError::StoreFailure(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use orgdir_core::models::{AccountRecord, Status, Timestamp};
    use uuid::Uuid;

    /// Reports a collision for every predicate whose rendered SQL contains
    /// one of `colliding` columns.
    struct FakeProbe {
        colliding: Vec<&'static str>,
        calls: Vec<String>,
    }

    #[async_trait]
    impl ExistsProbe for FakeProbe {
        async fn exists(&mut self, table: &str, predicate: &Predicate) -> Result<bool, AppError> {
            let mut qb = QueryBuilder::<Postgres>::new(format!("{}: ", table));
            predicate.push_to(&mut qb);
            let sql = qb.sql().to_string();
            let hit = self.colliding.iter().any(|c| sql.contains(c));
            self.calls.push(sql);
            Ok(hit)
        }
    }

    fn account_rules() -> Vec<UniquenessRule> {
        vec![
            UniquenessRule::new(
                ErrorCode::AccountAlreadyExists,
                Predicate::eq("account", "alice"),
            ),
            UniquenessRule::new(
                ErrorCode::PhoneAlreadyExists,
                Predicate::eq("phone", "cipher"),
            ),
        ]
    }

    fn record() -> AccountRecord {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        AccountRecord {
            id: Uuid::nil(),
            account: "alice".to_string(),
            phone: Some("secret".to_string()),
            nick_name: "Alice".to_string(),
            avatar: None,
            status: Status::Enabled,
            created_at: Timestamp::At(at),
            updated_at: Timestamp::At(at),
        }
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let mut probe = FakeProbe {
            colliding: vec!["account", "phone"],
            calls: Vec::new(),
        };
        let err = check_unique(&mut probe, "users", &account_rules(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Uniqueness(ErrorCode::AccountAlreadyExists)));
        assert_eq!(probe.calls.len(), 1);
    }

    #[tokio::test]
    async fn test_later_rule_reported_when_earlier_passes() {
        let mut probe = FakeProbe {
            colliding: vec!["phone"],
            calls: Vec::new(),
        };
        let err = check_unique(&mut probe, "users", &account_rules(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Uniqueness(ErrorCode::PhoneAlreadyExists)));
    }

    #[tokio::test]
    async fn test_no_collision() {
        let mut probe = FakeProbe {
            colliding: vec![],
            calls: Vec::new(),
        };
        assert!(check_unique(&mut probe, "users", &account_rules(), None)
            .await
            .is_ok());
        assert_eq!(probe.calls.len(), 2);
    }

    #[tokio::test]
    async fn test_except_is_anded_into_every_rule() {
        let mut probe = FakeProbe {
            colliding: vec![],
            calls: Vec::new(),
        };
        let except = Predicate::ne("id", Uuid::nil());
        check_unique(&mut probe, "users", &account_rules(), Some(&except))
            .await
            .unwrap();
        assert_eq!(probe.calls[0], "users: (account = $1) AND (id <> $2)");
        assert_eq!(probe.calls[1], "users: (phone = $1) AND (id <> $2)");
    }

    #[test]
    fn test_page_query_shape() {
        let listing = Listing {
            columns: "id, account",
            from: "users",
            filter: Predicate::raw("is_deleted = FALSE").and(Predicate::eq("status", Status::Enabled)),
            order_by: "created_at DESC, id DESC",
        };
        assert_eq!(
            listing.count_query().sql(),
            "SELECT COUNT(*) FROM users WHERE (is_deleted = FALSE) AND (status = $1)"
        );
        assert_eq!(
            listing.page_query(PageRequest::new(3, 10)).sql(),
            "SELECT id, account FROM users WHERE (is_deleted = FALSE) AND (status = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_formatter_applies_ambient_timestamps() {
        let mut r = record();
        Formatter::new().apply(&mut r).unwrap();
        assert_eq!(r.created_at, Timestamp::Display("2024-05-01 12:30:00".to_string()));
        assert_eq!(r.updated_at, Timestamp::Display("2024-05-01 12:30:00".to_string()));
    }

    #[test]
    fn test_formatter_rules_skip_null_fields() {
        let mut r = record();
        let formatter = Formatter::new()
            .rule(FormatRule::new("phone", |v| Ok(v.to_uppercase())))
            .rule(FormatRule::new("avatar", |_| {
                Err(AppError::Internal("must not run".to_string()))
            }))
            .rule(FormatRule::new("unknown", |_| {
                Err(AppError::Internal("must not run".to_string()))
            }));
        formatter.apply(&mut r).unwrap();
        assert_eq!(r.phone.as_deref(), Some("SECRET"));
    }

    #[test]
    fn test_formatter_propagates_transform_error() {
        let mut r = record();
        let formatter = Formatter::new().rule(FormatRule::new("phone", |_| {
            Err(AppError::DecryptionFailure("bad".to_string()))
        }));
        assert!(matches!(
            formatter.apply(&mut r),
            Err(AppError::DecryptionFailure(_))
        ));
    }
}
