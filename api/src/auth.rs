//! JWT authentication.

use chrono::Utc;
use consentry_access::{Caller, PermissionSet, Role};
use consentry_tenant::TenantId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Token claims.
///
/// Platform operator tokens carry no tenant fields at all; tenant staff
/// tokens always carry both the tenant id and its slug. Anything in
/// between is a forgery and never becomes a caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub permissions: PermissionSet,
    pub exp: usize,
}

impl Claims {
    /// Rebuild the principal this token was minted for.
    pub fn into_caller(self) -> Result<Caller, ApiError> {
        match (self.tenant_id, self.tenant_slug) {
            (Some(tenant_id), Some(tenant_slug)) => Ok(Caller::TenantUser {
                user_id: self.sub,
                tenant_id,
                tenant_slug,
                role: self.role.unwrap_or(Role::Operator),
                permissions: self.permissions,
            }),
            (None, None) => Ok(Caller::SuperAdmin {
                user_id: self.sub,
                permissions: self.permissions,
            }),
            _ => Err(ApiError::InvalidToken),
        }
    }
}

pub fn create_token(
    caller: &Caller,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + chrono::Duration::hours(ttl_hours)).timestamp() as usize;

    let claims = match caller {
        Caller::SuperAdmin {
            user_id,
            permissions,
        } => Claims {
            sub: *user_id,
            tenant_id: None,
            tenant_slug: None,
            role: None,
            permissions: *permissions,
            exp,
        },
        Caller::TenantUser {
            user_id,
            tenant_id,
            tenant_slug,
            role,
            permissions,
        } => Claims {
            sub: *user_id,
            tenant_id: Some(*tenant_id),
            tenant_slug: Some(tenant_slug.clone()),
            role: Some(*role),
            permissions: *permissions,
            exp,
        },
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentry_access::Permission;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_round_trip_tenant_user() {
        let caller = Caller::tenant_user(Uuid::new_v4(), Uuid::new_v4(), "clinic", Role::Operator);
        let token = create_token(&caller, SECRET, 1).unwrap();
        let recovered = verify_token(&token, SECRET).unwrap().into_caller().unwrap();
        assert_eq!(recovered.user_id(), caller.user_id());
        assert_eq!(recovered.tenant_slug(), Some("clinic"));
        assert_eq!(recovered.permissions(), caller.permissions());
    }

    #[test]
    fn test_round_trip_super_admin() {
        let caller = Caller::super_admin(Uuid::new_v4());
        let token = create_token(&caller, SECRET, 1).unwrap();
        let recovered = verify_token(&token, SECRET).unwrap().into_caller().unwrap();
        assert!(recovered.is_super_admin());
        assert!(recovered.permissions().contains(Permission::ManageTenants));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let caller = Caller::super_admin(Uuid::new_v4());
        let token = create_token(&caller, SECRET, 1).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let caller = Caller::super_admin(Uuid::new_v4());
        let token = create_token(&caller, SECRET, -2).unwrap();
        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_half_tenant_claims_rejected() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            tenant_slug: None,
            role: None,
            permissions: PermissionSet::EMPTY,
            exp: usize::MAX,
        };
        assert!(claims.into_caller().is_err());
    }
}
