use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use orgdir_core::models::OrgGrant;
use orgdir_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;

/// Signed token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<Uuid>,
    #[serde(default)]
    pub org_owner: bool,
    #[serde(default)]
    pub org_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    pub iat: i64,
    pub exp: i64,
}

/// Request-scoped identity and capabilities, resolved from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub org_id: Option<Uuid>,
    pub is_org_owner: bool,
    /// The selected organization is the platform admin org.
    pub is_platform_admin: bool,
    pub scopes: Vec<String>,
}

impl Actor {
    /// Authenticated, no organization selected yet.
    pub fn unbound(user_id: Uuid) -> Self {
        Self {
            user_id,
            org_id: None,
            is_org_owner: false,
            is_platform_admin: false,
            scopes: Vec::new(),
        }
    }

    pub fn for_grant(user_id: Uuid, grant: &OrgGrant) -> Self {
        Self {
            user_id,
            org_id: Some(grant.org_id),
            is_org_owner: grant.is_owned_by(user_id),
            is_platform_admin: grant.is_admin,
            scopes: grant.scopes.clone(),
        }
    }

    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            org_id: claims.org,
            is_org_owner: claims.org.is_some() && claims.org_owner,
            is_platform_admin: claims.org.is_some() && claims.org_admin,
            scopes: claims.scopes.clone().unwrap_or_default(),
        }
    }

    /// Owners and platform admins pass every check; others need the scope.
    pub fn authorize(&self, required: Option<&str>) -> Result<(), AppError> {
        let Some(scope) = required else {
            return Ok(());
        };
        if self.is_org_owner || self.is_platform_admin {
            return Ok(());
        }
        if self.scopes.iter().any(|s| s == scope) {
            Ok(())
        } else {
            Err(AppError::Forbidden(scope.to_string()))
        }
    }

    pub fn require(&self, scope: &str) -> Result<(), AppError> {
        self.authorize(Some(scope))
    }

    /// The selected organization, or `OrgAccessDenied` before selection.
    pub fn org(&self) -> Result<Uuid, AppError> {
        self.org_id.ok_or(AppError::OrgAccessDenied)
    }

    pub fn require_platform_admin(&self) -> Result<(), AppError> {
        if self.is_platform_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("platform admin".to_string()))
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Missing actor".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(scopes: &[&str]) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            org_id: Some(Uuid::new_v4()),
            is_org_owner: false,
            is_platform_admin: false,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_owner_bypasses_scopes() {
        let mut actor = member(&[]);
        actor.is_org_owner = true;
        assert!(actor.authorize(Some("any:scope")).is_ok());
    }

    #[test]
    fn test_platform_admin_bypasses_scopes() {
        let mut actor = member(&[]);
        actor.is_platform_admin = true;
        assert!(actor.require("account:delete").is_ok());
    }

    #[test]
    fn test_scope_required() {
        let actor = member(&["member:list"]);
        assert!(actor.require("member:list").is_ok());
        assert!(matches!(
            actor.require("member:update"),
            Err(AppError::Forbidden(scope)) if scope == "member:update"
        ));
    }

    #[test]
    fn test_no_required_scope_always_passes() {
        assert!(member(&[]).authorize(None).is_ok());
        assert!(Actor::unbound(Uuid::new_v4()).authorize(None).is_ok());
    }

    #[test]
    fn test_claims_without_org_carry_no_flags() {
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            org: None,
            org_owner: true,
            org_admin: true,
            scopes: None,
            iat: 0,
            exp: 0,
        };
        let actor = Actor::from_claims(&claims);
        assert!(!actor.is_org_owner);
        assert!(!actor.is_platform_admin);
        assert!(actor.scopes.is_empty());
        assert!(matches!(actor.org(), Err(AppError::OrgAccessDenied)));
    }

    #[test]
    fn test_for_grant_owner_flag() {
        let user = Uuid::new_v4();
        let grant = OrgGrant {
            org_id: Uuid::new_v4(),
            org_name: "acme".to_string(),
            owner_id: user,
            is_admin: false,
            scopes: vec![],
        };
        assert!(Actor::for_grant(user, &grant).is_org_owner);
        assert!(!Actor::for_grant(Uuid::new_v4(), &grant).is_org_owner);
    }
}
