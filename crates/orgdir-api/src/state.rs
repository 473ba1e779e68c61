//! Shared application state handed to every handler.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TenantAuthorizer;
use crate::services::{AccountService, MemberService, OrganizationService};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub authorizer: Arc<TenantAuthorizer>,
    pub accounts: AccountService,
    pub organizations: OrganizationService,
    pub members: MemberService,
}
