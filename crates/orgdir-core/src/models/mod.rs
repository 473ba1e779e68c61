//! Data models for the directory
//!
//! Row types are split by table. List and detail queries return `*Record`
//! types, which implement [`Formattable`] so the data-access layer can
//! transform their fields after fetching.

mod membership;
mod organization;
mod pagination;
mod record;
mod user;

pub use membership::*;
pub use organization::*;
pub use pagination::*;
pub use record::*;
pub use user::*;
