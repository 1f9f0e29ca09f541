use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use super::render;
use crate::error::AppError;
use crate::AppState;

const LATEST_ON_HOME: i64 = 3;

pub async fn home(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let latest = state.db.latest_published(LATEST_ON_HOME).await?;
    Ok(render(
        &req,
        &[],
        json!({ "page": "index", "latest_reviews": latest }),
    ))
}

pub async fn about(req: HttpRequest) -> HttpResponse {
    render(
        &req,
        &[],
        json!({
            "page": "about",
            "description": "Share reviews of the recipes you cook, vote on the ones you love and find new dishes to try.",
        }),
    )
}

pub async fn bad_request() -> Result<HttpResponse, AppError> {
    Err(AppError::BadRequest("Bad request".to_string()))
}

pub async fn permission_denied() -> Result<HttpResponse, AppError> {
    Err(AppError::Forbidden)
}

pub async fn server_error() -> Result<HttpResponse, AppError> {
    Err(AppError::Internal("error page requested".to_string()))
}

pub async fn not_found() -> Result<HttpResponse, AppError> {
    Err(AppError::NotFound)
}
