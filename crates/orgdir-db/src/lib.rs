//! Orgdir data access layer
//!
//! Repositories over PostgreSQL plus the shared pagination, uniqueness and
//! formatting primitives in [`db::engine`].

pub mod db;

pub use db::engine::{
    check_unique, map_unique_violation, paginate, ExistsProbe, FormatRule, Formatter, Listing,
    UniquenessRule,
};
pub use db::query::{Predicate, SqlValue};
pub use db::transaction::TransactionGuard;
pub use db::*;
