//! Password hashing, sessions and the `Viewer` extractor.
use actix_web::{
    cookie::{Cookie, SameSite},
    dev::Payload,
    web, FromRequest, HttpRequest,
};
use futures::future::LocalBoxFuture;
use thiserror::Error;
use tracing::debug;

use crate::error::AppError;
use crate::models::user::User;
use crate::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

pub fn session_removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// The user behind the current request, if they are signed in.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    /// The signed-in user, or a redirect to the login page that returns to `next`.
    pub fn require(&self, next: &str) -> Result<&User, AppError> {
        self.0.as_ref().ok_or_else(|| AppError::LoginRequired {
            next: next.to_string(),
        })
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

        Box::pin(async move {
            let state = state.ok_or_else(|| AppError::Internal("application state missing".into()))?;
            let Some(token) = token.filter(|t| !t.is_empty()) else {
                return Ok(Viewer(None));
            };
            let user = state.db.get_session_user(&token).await?;
            if user.is_none() {
                debug!("Unknown session token presented");
            }
            Ok(Viewer(user))
        })
    }
}
