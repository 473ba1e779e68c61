//! First-start provisioning of the superadmin account and the platform admin
//! organization. Safe to run on every start.

use orgdir_core::{
    models::{Status, SUPERADMIN_ACCOUNT},
    AppError,
};
use orgdir_db::{AccountRepository, NewAccount, NewOrganization, OrganizationRepository, TransactionGuard};
use sqlx::{PgConnection, PgPool};

use crate::auth::password::hash_password;

pub const ADMIN_ORG_NAME: &str = "platform";

pub async fn ensure_platform_admin(
    pool: &PgPool,
    accounts: &AccountRepository,
    organizations: &OrganizationRepository,
    default_password: &str,
) -> Result<(), AppError> {
    let mut tx = TransactionGuard::begin(pool).await?;
    let outcome = provision(&mut tx, accounts, organizations, default_password).await;
    tx.finish(outcome).await
}

async fn provision(
    conn: &mut PgConnection,
    accounts: &AccountRepository,
    organizations: &OrganizationRepository,
    default_password: &str,
) -> Result<(), AppError> {
    let admin = match accounts.find_by_account(conn, SUPERADMIN_ACCOUNT).await? {
        Some(user) => user,
        None => {
            let new = NewAccount {
                account: SUPERADMIN_ACCOUNT.to_string(),
                phone: None,
                nick_name: "Administrator".to_string(),
                avatar: None,
                status: Status::Enabled,
            };
            let user = accounts
                .create(conn, &new, &hash_password(default_password)?)
                .await?;
            tracing::warn!(
                account = SUPERADMIN_ACCOUNT,
                "Superadmin created with the default password"
            );
            user
        }
    };

    if organizations.find_admin(conn).await?.is_none() {
        let new = NewOrganization {
            name: ADMIN_ORG_NAME.to_string(),
            owner_id: admin.id,
            remark: Some("Platform administration".to_string()),
            is_admin: true,
        };
        let org = organizations.create(conn, &new, &admin.nick_name).await?;
        tracing::info!(org_id = %org.id, "Platform admin organization created");
    }

    Ok(())
}
