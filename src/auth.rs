//! Bearer token authentication
//!
//! The owner of every listing is the `sub` claim of an HS256 access token.
//! Request bodies and query strings are never consulted for identity.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Identity resolved from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOwner {
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        if let Some(issuer) = &config.jwt_issuer {
            validation.set_issuer(&[issuer.as_str()]);
        }

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedOwner, AppError> {
        let decoded = decode::<Claims>(token, &self.key, &self.validation).map_err(|error| {
            tracing::debug!(%error, "Token rejected");
            AppError::unauthorized("Invalid or expired token")
        })?;

        let owner_id = decoded.claims.sub.trim();
        if owner_id.is_empty() {
            return Err(AppError::unauthorized("Token subject is missing"));
        }

        Ok(AuthenticatedOwner {
            owner_id: owner_id.to_string(),
        })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized("Authorization scheme must be `Bearer`"));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

/// Resolve the owner and hand it to the handler as a request extension
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let owner = state.verifier().verify(token)?;
    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
    }

    fn config(issuer: Option<&str>) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_issuer: issuer.map(str::to_string),
        }
    }

    fn token(secret: &str, sub: &str, iss: Option<&str>, exp_offset: i64) -> String {
        let claims = TestClaims {
            sub,
            exp: chrono::Utc::now().timestamp() + exp_offset,
            iss,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_owner() {
        let verifier = TokenVerifier::new(&config(None));
        let owner = verifier
            .verify(&token("test-secret", "user-42", None, 3600))
            .unwrap();
        assert_eq!(owner.owner_id, "user-42");
    }

    #[test]
    fn test_wrong_secret_and_expired_are_rejected() {
        let verifier = TokenVerifier::new(&config(None));
        assert!(verifier
            .verify(&token("other-secret", "user-42", None, 3600))
            .is_err());
        assert!(verifier
            .verify(&token("test-secret", "user-42", None, -3600))
            .is_err());
    }

    #[test]
    fn test_issuer_is_checked_when_configured() {
        let verifier = TokenVerifier::new(&config(Some("classifieds")));
        assert!(verifier
            .verify(&token("test-secret", "u", Some("classifieds"), 3600))
            .is_ok());
        assert!(verifier
            .verify(&token("test-secret", "u", Some("elsewhere"), 3600))
            .is_err());
    }

    #[test]
    fn test_empty_subject_is_rejected() {
        let verifier = TokenVerifier::new(&config(None));
        let err = verifier
            .verify(&token("test-secret", "  ", None, 3600))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("bearer  abc.def "));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def");
    }
}
