//! Login, tenant selection and per-request actor resolution.
//!
//! A user moves from unauthenticated, to authenticated without an org, to
//! authenticated with one org selected. Login selects the org automatically
//! when exactly one is available; otherwise the client lists the user's orgs
//! and calls [`TenantAuthorizer::select_org`].

use std::sync::Arc;

use async_trait::async_trait;
use orgdir_core::models::{OrgGrant, PasswordCredential, Status};
use orgdir_core::{AppError, TransportCipher};
use orgdir_db::AuthRepository;
use uuid::Uuid;

use super::models::Actor;
use super::password::{verify_dummy_password, verify_password};
use super::token::{IssuedToken, TokenService};

/// Identity lookups the authorizer depends on.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_password_credential(
        &self,
        account: &str,
    ) -> Result<Option<PasswordCredential>, AppError>;

    async fn user_status(&self, user_id: Uuid) -> Result<Option<Status>, AppError>;

    async fn list_grants(&self, user_id: Uuid) -> Result<Vec<OrgGrant>, AppError>;

    async fn find_grant(&self, user_id: Uuid, org_id: Uuid)
        -> Result<Option<OrgGrant>, AppError>;
}

#[async_trait]
impl IdentityStore for AuthRepository {
    async fn find_password_credential(
        &self,
        account: &str,
    ) -> Result<Option<PasswordCredential>, AppError> {
        AuthRepository::find_password_credential(self, account).await
    }

    async fn user_status(&self, user_id: Uuid) -> Result<Option<Status>, AppError> {
        AuthRepository::user_status(self, user_id).await
    }

    async fn list_grants(&self, user_id: Uuid) -> Result<Vec<OrgGrant>, AppError> {
        AuthRepository::list_grants(self, user_id).await
    }

    async fn find_grant(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<OrgGrant>, AppError> {
        AuthRepository::find_grant(self, user_id, org_id).await
    }
}

pub struct TenantAuthorizer {
    store: Arc<dyn IdentityStore>,
    transport: TransportCipher,
    tokens: TokenService,
    /// Re-check user, membership and org state on every request.
    revalidate: bool,
}

impl TenantAuthorizer {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        transport: TransportCipher,
        tokens: TokenService,
        revalidate: bool,
    ) -> Self {
        Self {
            store,
            transport,
            tokens,
            revalidate,
        }
    }

    /// Verify an account and its transport-encrypted password and issue a
    /// token. The token is bound to an org only when the user has exactly
    /// one usable membership.
    #[tracing::instrument(skip(self, encrypted_password))]
    pub async fn password_login(
        &self,
        account: &str,
        encrypted_password: &str,
    ) -> Result<IssuedToken, AppError> {
        let password = self.transport.decrypt(encrypted_password).map_err(|e| {
            tracing::warn!(error = %e, "Login password could not be decrypted");
            AppError::WrongCredentials
        })?;

        let credential = match self.store.find_password_credential(account).await? {
            Some(credential) => credential,
            None => {
                verify_dummy_password(&password);
                tracing::warn!("Login for unknown account");
                return Err(AppError::WrongCredentials);
            }
        };

        if !verify_password(&password, &credential.secret)? {
            tracing::warn!(user_id = %credential.user_id, "Login with wrong password");
            return Err(AppError::WrongCredentials);
        }

        if !credential.status.is_enabled() {
            tracing::warn!(user_id = %credential.user_id, "Login to disabled account");
            return Err(AppError::AccountDisabled);
        }

        let grants = self.store.list_grants(credential.user_id).await?;
        let actor = match grants.as_slice() {
            [only] => Actor::for_grant(credential.user_id, only),
            _ => Actor::unbound(credential.user_id),
        };

        tracing::info!(
            user_id = %actor.user_id,
            org_id = ?actor.org_id,
            org_count = grants.len(),
            "Login succeeded"
        );
        self.tokens.issue(&actor)
    }

    /// Organizations the actor's user may select.
    pub async fn list_orgs(&self, actor: &Actor) -> Result<Vec<OrgGrant>, AppError> {
        self.store.list_grants(actor.user_id).await
    }

    /// Bind the actor to `org_id`, recomputing owner/admin flags and scopes
    /// from current membership data.
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn select_org(&self, actor: &Actor, org_id: Uuid) -> Result<IssuedToken, AppError> {
        let grant = self
            .store
            .find_grant(actor.user_id, org_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(org_id = %org_id, "Org selection refused");
                AppError::OrgAccessDenied
            })?;

        self.tokens.issue(&Actor::for_grant(actor.user_id, &grant))
    }

    /// Decode a bearer token into an actor. In revalidating mode the user,
    /// membership and org are re-read and the claims replaced by current data.
    pub async fn resolve_actor(&self, token: &str) -> Result<Actor, AppError> {
        let claims = self.tokens.decode(token)?;
        let actor = Actor::from_claims(&claims);
        if !self.revalidate {
            return Ok(actor);
        }

        match self.store.user_status(actor.user_id).await? {
            Some(Status::Enabled) => {}
            Some(Status::Disabled) => return Err(AppError::AccountDisabled),
            None => return Err(AppError::Unauthorized("Account no longer exists".to_string())),
        }

        match actor.org_id {
            Some(org_id) => {
                let grant = self
                    .store
                    .find_grant(actor.user_id, org_id)
                    .await?
                    .ok_or(AppError::OrgAccessDenied)?;
                Ok(Actor::for_grant(actor.user_id, &grant))
            }
            None => Ok(actor),
        }
    }

    pub fn authorize(&self, actor: &Actor, required_scope: Option<&str>) -> Result<(), AppError> {
        actor.authorize(required_scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";
    const TRANSPORT_KEY: &[u8; 32] = b"transport-key-for-tests-32-bytes";

    #[derive(Default)]
    struct FakeStore {
        credentials: HashMap<String, PasswordCredential>,
        statuses: Mutex<HashMap<Uuid, Status>>,
        grants: Mutex<HashMap<Uuid, Vec<OrgGrant>>>,
    }

    impl FakeStore {
        fn add_user(&mut self, account: &str, password: &str, status: Status) -> Uuid {
            let user_id = Uuid::new_v4();
            self.credentials.insert(
                account.to_string(),
                PasswordCredential {
                    user_id,
                    status,
                    secret: hash_password(password).unwrap(),
                },
            );
            self.statuses.lock().unwrap().insert(user_id, status);
            user_id
        }

        fn grant(&self, user_id: Uuid, owner_id: Uuid, scopes: &[&str]) -> Uuid {
            let org_id = Uuid::new_v4();
            self.grants
                .lock()
                .unwrap()
                .entry(user_id)
                .or_default()
                .push(OrgGrant {
                    org_id,
                    org_name: format!("org-{}", org_id),
                    owner_id,
                    is_admin: false,
                    scopes: scopes.iter().map(|s| s.to_string()).collect(),
                });
            org_id
        }
    }

    #[async_trait]
    impl IdentityStore for FakeStore {
        async fn find_password_credential(
            &self,
            account: &str,
        ) -> Result<Option<PasswordCredential>, AppError> {
            Ok(self.credentials.get(account).cloned())
        }

        async fn user_status(&self, user_id: Uuid) -> Result<Option<Status>, AppError> {
            Ok(self.statuses.lock().unwrap().get(&user_id).copied())
        }

        async fn list_grants(&self, user_id: Uuid) -> Result<Vec<OrgGrant>, AppError> {
            Ok(self
                .grants
                .lock()
                .unwrap()
                .get(&user_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn find_grant(
            &self,
            user_id: Uuid,
            org_id: Uuid,
        ) -> Result<Option<OrgGrant>, AppError> {
            Ok(self
                .list_grants(user_id)
                .await?
                .into_iter()
                .find(|g| g.org_id == org_id))
        }
    }

    fn transport() -> TransportCipher {
        TransportCipher::from_key_bytes(TRANSPORT_KEY).unwrap()
    }

    fn authorizer(store: Arc<FakeStore>, revalidate: bool) -> TenantAuthorizer {
        TenantAuthorizer::new(store, transport(), TokenService::new(SECRET, 60), revalidate)
    }

    async fn login(authz: &TenantAuthorizer, account: &str, password: &str) -> Result<IssuedToken, AppError> {
        let encrypted = transport().encrypt(password).unwrap();
        authz.password_login(account, &encrypted).await
    }

    #[tokio::test]
    async fn test_single_membership_auto_selects_org() {
        let mut store = FakeStore::default();
        let user = store.add_user("alice", "pw-alice", Status::Enabled);
        let org = store.grant(user, user, &[]);
        let authz = authorizer(Arc::new(store), false);

        let issued = login(&authz, "alice", "pw-alice").await.unwrap();
        assert_eq!(issued.org_id, Some(org));
        assert!(issued.org_owner);

        let actor = authz.resolve_actor(&issued.token).await.unwrap();
        assert_eq!(actor.org_id, Some(org));
        assert!(actor.is_org_owner);
    }

    #[tokio::test]
    async fn test_single_membership_not_owner() {
        let mut store = FakeStore::default();
        let user = store.add_user("bob", "pw-bob", Status::Enabled);
        store.grant(user, Uuid::new_v4(), &["member:list"]);
        let authz = authorizer(Arc::new(store), false);

        let issued = login(&authz, "bob", "pw-bob").await.unwrap();
        assert!(issued.org_id.is_some());
        assert!(!issued.org_owner);
    }

    #[tokio::test]
    async fn test_two_memberships_defer_selection() {
        let mut store = FakeStore::default();
        let user = store.add_user("carol", "pw-carol", Status::Enabled);
        let first = store.grant(user, Uuid::new_v4(), &["member:list"]);
        store.grant(user, user, &[]);
        let authz = authorizer(Arc::new(store), false);

        let issued = login(&authz, "carol", "pw-carol").await.unwrap();
        assert_eq!(issued.org_id, None);

        let actor = authz.resolve_actor(&issued.token).await.unwrap();
        assert_eq!(authz.list_orgs(&actor).await.unwrap().len(), 2);

        let denied = authz.select_org(&actor, Uuid::new_v4()).await;
        assert!(matches!(denied, Err(AppError::OrgAccessDenied)));

        let selected = authz.select_org(&actor, first).await.unwrap();
        assert_eq!(selected.org_id, Some(first));
        assert!(!selected.org_owner);
        let bound = authz.resolve_actor(&selected.token).await.unwrap();
        assert_eq!(bound.scopes, vec!["member:list".to_string()]);
    }

    #[tokio::test]
    async fn test_no_membership_has_no_org() {
        let mut store = FakeStore::default();
        store.add_user("dave", "pw-dave", Status::Enabled);
        let authz = authorizer(Arc::new(store), false);
        assert_eq!(login(&authz, "dave", "pw-dave").await.unwrap().org_id, None);
    }

    #[tokio::test]
    async fn test_wrong_credentials() {
        let mut store = FakeStore::default();
        store.add_user("erin", "pw-erin", Status::Enabled);
        let authz = authorizer(Arc::new(store), false);

        assert!(matches!(
            login(&authz, "erin", "nope").await,
            Err(AppError::WrongCredentials)
        ));
        assert!(matches!(
            login(&authz, "nobody", "pw-erin").await,
            Err(AppError::WrongCredentials)
        ));
        assert!(matches!(
            authz.password_login("erin", "not-encrypted").await,
            Err(AppError::WrongCredentials)
        ));
    }

    #[tokio::test]
    async fn test_unknown_account_runs_dummy_verification() {
        let authz = authorizer(Arc::new(FakeStore::default()), false);

        assert!(matches!(
            login(&authz, "ghost", "pw-ghost").await,
            Err(AppError::WrongCredentials)
        ));
        assert!(crate::auth::password::dummy_hash().is_some());
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let mut store = FakeStore::default();
        store.add_user("frank", "pw-frank", Status::Disabled);
        let authz = authorizer(Arc::new(store), false);
        assert!(matches!(
            login(&authz, "frank", "pw-frank").await,
            Err(AppError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_revalidation_sees_revoked_membership() {
        let mut store = FakeStore::default();
        let user = store.add_user("gina", "pw-gina", Status::Enabled);
        store.grant(user, Uuid::new_v4(), &["member:list"]);
        let store = Arc::new(store);

        let strict = authorizer(store.clone(), true);
        let trusting = authorizer(store.clone(), false);
        let issued = login(&strict, "gina", "pw-gina").await.unwrap();

        store.grants.lock().unwrap().clear();

        assert!(matches!(
            strict.resolve_actor(&issued.token).await,
            Err(AppError::OrgAccessDenied)
        ));
        let stale = trusting.resolve_actor(&issued.token).await.unwrap();
        assert_eq!(stale.scopes, vec!["member:list".to_string()]);
    }

    #[tokio::test]
    async fn test_revalidation_sees_disabled_user() {
        let mut store = FakeStore::default();
        let user = store.add_user("hank", "pw-hank", Status::Enabled);
        let store = Arc::new(store);
        let strict = authorizer(store.clone(), true);
        let issued = login(&strict, "hank", "pw-hank").await.unwrap();

        store.statuses.lock().unwrap().insert(user, Status::Disabled);
        assert!(matches!(
            strict.resolve_actor(&issued.token).await,
            Err(AppError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_authorize_owner_bypass() {
        let store = Arc::new(FakeStore::default());
        let authz = authorizer(store, false);
        let owner = Actor {
            user_id: Uuid::new_v4(),
            org_id: Some(Uuid::new_v4()),
            is_org_owner: true,
            is_platform_admin: false,
            scopes: Vec::new(),
        };
        assert!(authz.authorize(&owner, Some("any:scope")).is_ok());
        let member = Actor {
            is_org_owner: false,
            ..owner
        };
        assert!(matches!(
            authz.authorize(&member, Some("any:scope")),
            Err(AppError::Forbidden(_))
        ));
    }
}
