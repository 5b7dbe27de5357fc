//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Verify its HS256 signature and expiry
//! 3. Inject the authenticated identity into the request
//! 4. Reject unauthorized requests with HTTP 401
//!
//! Verification is stateless: the token alone carries the identity claim
//! `{sub, role, exp}` and no session store exists. Expiry is checked on
//! every call.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Identity claim carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user's id
    pub sub: Uuid,

    /// Role name (e.g., "Admin", "Cashier")
    pub role: String,

    /// Expiry as a unix timestamp; enforced during verification
    pub exp: i64,
}

/// Verifies bearer tokens against the configured secret.
///
/// Pure function of the token: `verify(token) -> claims | failure`.
/// Cheap to clone; handed to the auth middleware as its state.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            // Validation::new enables expiry checking by default
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token, returning its claims or `InvalidToken`.
    ///
    /// Fails on bad signature, malformed token, wrong algorithm, or
    /// expiry. The caller never learns which; all failures map to 401.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }
}

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated user
    pub user_id: Uuid,

    /// Role of the authenticated user
    pub role: String,
}

/// Bearer token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Verify the token's signature and expiry
/// 3. If valid: inject `AuthContext` into request, call next handler
/// 4. If not: return 401 Unauthorized error
pub async fn auth_middleware(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidToken)?;

    // Expected format: "Bearer <token>"
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidToken)?;

    let claims = verifier.verify(token)?;

    let auth_context = AuthContext {
        user_id: claims.sub,
        role: claims.role,
    };

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn mint(secret: &str, role: &str, expires_in: Duration) -> String {
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: role.to_string(),
            exp: (Utc::now() + expires_in).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_a_valid_token() {
        let verifier = TokenVerifier::new("test-secret");
        let token = mint("test-secret", "Admin", Duration::minutes(15));
        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.role, "Admin");
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let verifier = TokenVerifier::new("test-secret");
        let token = mint("other-secret", "Admin", Duration::minutes(15));
        assert!(matches!(
            verifier.verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_an_expired_token() {
        let verifier = TokenVerifier::new("test-secret");
        // Well past the default validation leeway
        let token = mint("test-secret", "Admin", Duration::hours(-2));
        assert!(matches!(
            verifier.verify(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let verifier = TokenVerifier::new("test-secret");
        assert!(matches!(
            verifier.verify("not.a.token"),
            Err(AppError::InvalidToken)
        ));
    }
}
