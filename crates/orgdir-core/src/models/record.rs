use chrono::{DateTime, Utc};
use serde::Serialize;

/// Display format applied to `created_at` / `updated_at` in every record.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A timestamp column that is fetched raw and may be replaced by its display
/// string during formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    At(DateTime<Utc>),
    Display(String),
}

impl Timestamp {
    pub fn format(&mut self, fmt: &str) {
        if let Timestamp::At(at) = self {
            *self = Timestamp::Display(at.format(fmt).to_string());
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Timestamp::At(at)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for Timestamp {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <DateTime<Utc> as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <DateTime<Utc> as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Timestamp {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let at = <DateTime<Utc> as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Timestamp::At(at))
    }
}

/// Named access to the fields of a fetched record.
///
/// A field that is absent or NULL returns `None`, and format rules skip it.
pub trait Formattable {
    fn text_field(&mut self, _name: &str) -> Option<&mut String> {
        None
    }

    fn time_field(&mut self, _name: &str) -> Option<&mut Timestamp> {
        None
    }
}
