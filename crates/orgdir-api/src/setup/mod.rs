//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use orgdir_core::{Config, FieldCipher, TransportCipher};
use orgdir_db::{AccountRepository, AuthRepository, MembershipRepository, OrganizationRepository};
use sqlx::PgPool;

use crate::auth::{TenantAuthorizer, TokenService};
use crate::services::{bootstrap, AccountService, MemberService, OrganizationService};
use crate::state::AppState;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(&config.log_format)
        .context("Failed to initialize telemetry")?;
    tracing::info!(
        environment = %config.environment,
        token_revalidate = config.token_revalidate,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let state = build_state(&config, pool).await?;
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}

/// Wire repositories, services and the authorizer over an existing pool and
/// provision the platform admin on first start.
pub async fn build_state(config: &Config, pool: PgPool) -> Result<Arc<AppState>> {
    let field_cipher = FieldCipher::from_base64(&config.field_encryption_key)
        .context("Invalid FIELD_ENCRYPTION_KEY")?;
    let transport_cipher = TransportCipher::from_base64(&config.transport_encryption_key)
        .context("Invalid TRANSPORT_ENCRYPTION_KEY")?;

    let account_repository = AccountRepository::new(pool.clone(), field_cipher.clone());
    let organization_repository = OrganizationRepository::new(pool.clone());
    let membership_repository = MembershipRepository::new(pool.clone(), field_cipher);
    let auth_repository = AuthRepository::new(pool.clone());

    bootstrap::ensure_platform_admin(
        &pool,
        &account_repository,
        &organization_repository,
        &config.default_password,
    )
    .await
    .context("Failed to provision platform admin")?;

    let authorizer = Arc::new(TenantAuthorizer::new(
        Arc::new(auth_repository),
        transport_cipher,
        TokenService::new(&config.jwt_secret, config.jwt_expiry_minutes),
        config.token_revalidate,
    ));

    Ok(Arc::new(AppState {
        accounts: AccountService::new(
            pool.clone(),
            account_repository.clone(),
            config.default_password.clone(),
        ),
        organizations: OrganizationService::new(
            pool.clone(),
            organization_repository.clone(),
            account_repository.clone(),
        ),
        members: MemberService::new(
            pool.clone(),
            membership_repository,
            account_repository,
            organization_repository,
        ),
        authorizer,
        pool,
    }))
}
