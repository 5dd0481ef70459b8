use actix_service::{self, Transform};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse},
    web, Error, HttpMessage, HttpRequest,
};
use futures::{
    future::{ready, LocalBoxFuture, Ready},
    FutureExt,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{fs::read_to_string, path::Path, rc::Rc};

use crate::error::{AppError, Result as AppResult};
use crate::models::{
    role::{can, Capability},
    user::User,
};
use crate::state::AppState;

/// Claims of a Firebase ID token that the server relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub exp: i64,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_rsa_pem_file(path: &Path, project_id: &str) -> AppResult<Self> {
        let pem = read_to_string(path)
            .map_err(|error| AppError::Internal(format!("LOAD_FAILED_PUBLIC_KEY: {error}")))?;
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|error| AppError::Internal(format!("INVALID_PUBLIC_KEY: {error}")))?;
        Ok(Self::new(key, Algorithm::RS256, project_id))
    }

    #[cfg(test)]
    pub fn from_secret(secret: &[u8], project_id: &str) -> Self {
        Self::new(DecodingKey::from_secret(secret), Algorithm::HS256, project_id)
    }

    fn new(key: DecodingKey, algorithm: Algorithm, project_id: &str) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{project_id}")]);
        TokenVerifier { key, validation }
    }

    pub fn verify(&self, token: &str) -> Option<IdentityClaims> {
        match decode::<IdentityClaims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(error) => {
                tracing::debug!(%error, "rejected identity token");
                None
            }
        }
    }
}

/// Who is calling. `user` is `None` until the account registered its profile.
#[derive(Debug)]
pub struct IdentityData {
    pub auth_uid: String,
    pub email: Option<String>,
    pub user: Option<User>,
}

pub type Identity = Rc<IdentityData>;

impl IdentityData {
    pub fn user(&self) -> AppResult<&User> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::not_found("USER_PROFILE_NOT_FOUND"))
    }

    pub fn require(&self, capability: Capability) -> AppResult<&User> {
        let user = self.user()?;
        if can(user, capability) {
            Ok(user)
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Identity attached by [`IdentityMiddleware`], or 401.
pub fn identity(req: &HttpRequest) -> AppResult<Identity> {
    req.extensions()
        .get::<Identity>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

pub struct IdentityMiddleware<S> {
    service: Rc<S>,
}
pub struct IdentityMiddlewareFactory;

impl<S, B> Service<ServiceRequest> for IdentityMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv: Rc<S> = self.service.clone();

        async move {
            let state = req.app_data::<web::Data<AppState>>().cloned();
            if let (Some(state), Some(token)) = (state, bearer_token(&req)) {
                if let Some(claims) = state.verifier.verify(&token) {
                    let user = match state.users.user_by_auth_uid(&claims.sub).await {
                        Ok(user) => user,
                        Err(error) => {
                            tracing::warn!(%error, "identity lookup failed");
                            None
                        }
                    };
                    let identity = IdentityData {
                        auth_uid: claims.sub,
                        email: claims.email,
                        user,
                    };
                    req.extensions_mut().insert::<Identity>(Rc::new(identity));
                }
            }
            srv.call(req).await
        }
        .boxed_local()
    }
}
impl<S, B> Transform<S, ServiceRequest> for IdentityMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = IdentityMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddleware {
            service: Rc::new(service),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    fn token(project: &str, exp: i64) -> String {
        let claims = IdentityClaims {
            sub: "uid-42".to_string(),
            aud: project.to_string(),
            iss: format!("https://securetoken.google.com/{project}"),
            exp,
            email: Some("jane@example.com".to_string()),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[test]
    fn accepts_tokens_for_the_configured_project() {
        let verifier = TokenVerifier::from_secret(SECRET, "brilliant-os");
        let claims = verifier
            .verify(&token("brilliant-os", Utc::now().timestamp() + 3600))
            .unwrap();
        assert_eq!(claims.sub, "uid-42");
        assert_eq!(claims.email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn rejects_foreign_or_expired_tokens() {
        let verifier = TokenVerifier::from_secret(SECRET, "brilliant-os");
        assert!(verifier
            .verify(&token("someone-else", Utc::now().timestamp() + 3600))
            .is_none());
        assert!(verifier
            .verify(&token("brilliant-os", Utc::now().timestamp() - 3600))
            .is_none());
        assert!(verifier.verify("garbage").is_none());
    }

    #[test]
    fn identity_without_profile_cannot_act() {
        let identity = IdentityData {
            auth_uid: "uid-42".to_string(),
            email: None,
            user: None,
        };
        assert!(matches!(identity.user(), Err(AppError::NotFound(_))));
        assert!(matches!(
            identity.require(Capability::ViewOwnProgress),
            Err(AppError::NotFound(_))
        ));
    }
}
