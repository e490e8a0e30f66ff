use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::Viewer,
    config::{AppConfig, Env},
    models::{Profile, Role},
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// The part of the auth provider's JWT payload this service relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id, also the primary key of `public.profiles`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Rejects with 401 when no
/// valid credentials are presented or the profile no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_premium: bool,
}

impl From<Profile> for AuthUser {
    fn from(profile: Profile) -> Self {
        AuthUser {
            role: profile.role(),
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            is_premium: profile.is_premium,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Decodes and validates a bearer token with the shared secret.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, StatusCode> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Provider tokens carry `aud = "authenticated"`; the signature already scopes them.
    validation.validate_aud = false;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!("rejected token: {:?}", other),
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// resolve_profile
///
/// Shared identity resolution for both extractors.
///
/// - `Ok(None)`: no usable credentials, or a valid token whose profile is missing.
/// - `Ok(Some(profile))`: identity resolved.
/// - `Err(401)`: an Authorization header was sent but is malformed or invalid.
async fn resolve_profile(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<Option<Profile>, StatusCode> {
    // Local development bypass. Only honored when the id maps to a real profile;
    // otherwise the normal token flow applies.
    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());

        if let Some(user_id) = bypass_id {
            if let Some(profile) = repo.get_profile(user_id).await {
                return Ok(Some(profile));
            }
        }
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = decode_claims(token, &config.jwt_secret)?;

    let profile = repo.get_profile(claims.sub).await;
    if profile.is_none() {
        tracing::warn!(user_id = %claims.sub, "valid token without a profile");
    }
    Ok(profile)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_profile(parts, &repo, &config)
            .await?
            .map(AuthUser::from)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// Viewer extractor
///
/// Used on public routes. Requests without credentials, or whose profile cannot be
/// found, are served as `Viewer::Anonymous`. A bad token is still a 401.
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let profile = resolve_profile(parts, &repo, &config).await?;
        Ok(Viewer::from_profile(profile.as_ref()))
    }
}
