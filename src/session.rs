//! Session and role guard.
//!
//! Sessions are issued by the OAuth front end as HS256 tokens. This module
//! only verifies them, resolves the subject to a stored user (creating it on
//! first sign-in) and exposes the result as extractors. The role always
//! comes from the store, never from the token.

use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{NewUser, Role, User};
use crate::store::Store;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

pub struct SessionVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
    admin_emails: Vec<String>,
}

impl SessionVerifier {
    /// `admin_emails` lists addresses that are provisioned as admins on
    /// their first sign-in.
    pub fn new(secret: &str, admin_emails: Vec<String>) -> Self {
        SessionVerifier {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            admin_emails: admin_emails.into_iter().map(|e| e.trim().to_lowercase()).collect(),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::warn!("rejected session token: {}", e);
                AppError::Unauthenticated
            })
    }

    fn new_user(&self, claims: Claims) -> NewUser {
        let role = if self.admin_emails.contains(&claims.email.to_lowercase()) {
            Role::Admin
        } else {
            Role::User
        };
        NewUser {
            id: claims.sub,
            name: claims.name,
            email: claims.email,
            role,
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authenticate(req: &HttpRequest) -> Result<User, AppError> {
    let verifier = req
        .app_data::<web::Data<SessionVerifier>>()
        .ok_or_else(|| AppError::Internal("session verifier is not configured".to_string()))?;
    let store = req
        .app_data::<web::Data<dyn Store>>()
        .ok_or_else(|| AppError::Internal("store is not configured".to_string()))?;

    let token = bearer_token(req).ok_or(AppError::Unauthenticated)?;
    let claims = verifier.verify(token)?;

    if let Some(user) = store.find_user(&claims.sub).await? {
        return Ok(user);
    }
    let user = store.provision_user(verifier.new_user(claims)).await?;
    log::info!("provisioned user {} ({:?}) on first sign-in", user.id, user.role);
    Ok(user)
}

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user = authenticate(&req).await?;
            Ok::<_, actix_web::Error>(CurrentUser(user))
        })
    }
}

/// A signed-in user whose stored role is `ADMIN`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user = authenticate(&req).await?;
            if !user.is_admin() {
                return Err(AppError::forbidden("access denied: admin required").into());
            }
            Ok::<_, actix_web::Error>(AdminUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-min-32-chars-long!!!";

    fn token(secret: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "Host@Example.org".to_string(),
            name: Some("Host".to_string()),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let verifier = SessionVerifier::new(SECRET, vec![]);
        let claims = verifier.verify(&token(SECRET, 3600)).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn rejects_expired_forged_and_malformed_tokens() {
        let verifier = SessionVerifier::new(SECRET, vec![]);
        assert!(matches!(verifier.verify(&token(SECRET, -3600)), Err(AppError::Unauthenticated)));
        assert!(matches!(
            verifier.verify(&token("another-secret-key-min-32-chars!!", 3600)),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(verifier.verify("invalid.token.format"), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn admin_emails_match_case_insensitively() {
        let verifier = SessionVerifier::new(SECRET, vec![" host@example.org ".to_string()]);
        let claims = verifier.verify(&token(SECRET, 3600)).unwrap();
        assert_eq!(verifier.new_user(claims).role, Role::Admin);

        let plain = SessionVerifier::new(SECRET, vec![]);
        let claims = plain.verify(&token(SECRET, 3600)).unwrap();
        assert_eq!(plain.new_user(claims).role, Role::User);
    }

    #[test]
    fn reads_bearer_tokens_only() {
        let req = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc.def"));

        let basic = actix_web::test::TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic Zm9vOmJhcg=="))
            .to_http_request();
        assert_eq!(bearer_token(&basic), None);

        let empty = actix_web::test::TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&empty), None);
    }
}
