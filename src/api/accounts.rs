use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::render;
use crate::auth::{
    hash_password, session_cookie, session_removal_cookie, verify_password, Viewer,
    SESSION_COOKIE,
};
use crate::error::AppError;
use crate::forms::{safe_next, FieldErrors, FormData, LoginForm, SignupForm, Validated};
use crate::messages::{self, Message};
use crate::models::user::User;
use crate::AppState;

pub const BAD_CREDENTIALS: &str = "The username and/or password you specified are not correct.";

#[derive(Deserialize, Debug)]
pub struct NextParam {
    pub next: Option<String>,
}

/// Opens a session for `user` and redirects to `location` with the cookie set.
async fn sign_in(
    req: &HttpRequest,
    state: &AppState,
    user: &User,
    location: &str,
) -> Result<HttpResponse, AppError> {
    let token = state.db.create_session(user.id).await?;
    let mut resp = messages::redirect_with(
        req,
        location,
        &[Message::success(format!("Successfully signed in as {}.", user.username))],
    );
    resp.add_cookie(&session_cookie(&token))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(resp)
}

pub async fn signup_form(req: HttpRequest) -> HttpResponse {
    render(&req, &[], json!({ "form": SignupForm::default(), "errors": null }))
}

pub async fn signup(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let form = SignupForm::from_form(&FormData::parse(&body));
    let (username, password) = match form.clean(&state.db).await? {
        Validated::Valid(clean) => clean,
        Validated::Invalid(errors) => {
            return Ok(render(&req, &[], json!({ "form": form, "errors": errors })));
        }
    };

    let cost = state.config.auth.bcrypt_cost;
    let hash = web::block(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    let user = state.db.create_user(&username, &hash, false).await?;
    info!("New account: {}", user.username);
    sign_in(&req, &state, &user, "/").await
}

pub async fn login_form(req: HttpRequest, params: web::Query<NextParam>) -> HttpResponse {
    let form = LoginForm {
        next: params.into_inner().next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render(&req, &[], json!({ "form": form, "errors": null }))
}

pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let form = LoginForm::from_form(&FormData::parse(&body));
    if let Err(errors) = form.validate() {
        return Ok(render(&req, &[], json!({ "form": form, "errors": errors })));
    }

    let user = state.db.get_user_by_username(form.login.trim()).await?;
    let verified = match &user {
        Some(user) => {
            let password = form.password.clone();
            let hash = user.password_hash.clone();
            web::block(move || verify_password(&password, &hash))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?
        }
        None => false,
    };

    match user {
        Some(user) if verified => sign_in(&req, &state, &user, safe_next(&form.next)).await,
        _ => {
            warn!("Failed login for '{}'", form.login.trim());
            let mut errors = FieldErrors::default();
            errors.add("__all__", BAD_CREDENTIALS);
            Ok(render(&req, &[], json!({ "form": form, "errors": errors })))
        }
    }
}

pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    viewer: Viewer,
) -> Result<HttpResponse, AppError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        state.db.delete_session(cookie.value()).await?;
    }
    if let Some(user) = viewer.user() {
        info!("{} signed out", user.username);
    }
    let mut resp = messages::redirect_with(&req, "/", &[Message::info("You have signed out.")]);
    resp.add_cookie(&session_removal_cookie())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(resp)
}
