use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::messages::{self, Message};
use crate::models::review::Review;
use crate::AppState;

pub mod accounts;
pub mod comments;
pub mod pages;
pub mod reviews;
pub mod search;
pub mod votes;

pub fn review_url(slug: &str) -> String {
    format!("/review/{slug}/")
}

pub(crate) async fn find_review(state: &AppState, slug: &str) -> Result<Review, AppError> {
    state
        .db
        .get_review_by_slug(slug)
        .await?
        .ok_or(AppError::NotFound)
}

/// A 200 JSON page. Flash messages waiting in the request cookie are
/// delivered (and cleared) together with `extra`.
pub(crate) fn render(req: &HttpRequest, extra: &[Message], mut context: Value) -> HttpResponse {
    let pending = messages::pending(req);
    let mut builder = HttpResponse::Ok();
    messages::consume(&mut builder, &pending);

    let all: Vec<&Message> = pending.iter().chain(extra.iter()).collect();
    if let Value::Object(map) = &mut context {
        map.insert("messages".to_string(), json!(all));
    }
    builder.json(context)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(pages::home))
        .route("/about/", web::get().to(pages::about))
        .route("/400/", web::get().to(pages::bad_request))
        .route("/403/", web::get().to(pages::permission_denied))
        .route("/500/", web::get().to(pages::server_error))
        .service(
            web::resource("/search/")
                .route(web::get().to(search::search_get))
                .route(web::post().to(search::search_post)),
        )
        .route("/reviews/", web::get().to(reviews::list_reviews))
        .service(
            web::resource("/reviews/new/")
                .route(web::get().to(reviews::new_review_form))
                .route(web::post().to(reviews::create_review)),
        )
        .service(
            web::resource("/review/{slug}/")
                .route(web::get().to(reviews::review_detail))
                .route(web::post().to(reviews::post_comment)),
        )
        .route("/review/{slug}/vote/", web::post().to(votes::vote))
        .service(
            web::resource("/update_review/{slug}/")
                .route(web::get().to(reviews::update_review_form))
                .route(web::post().to(reviews::update_review)),
        )
        .route(
            "/delete_comment/{comment_id}/",
            web::post().to(comments::delete_comment),
        )
        .route(
            "/comments/{comment_id}/approve/",
            web::post().to(comments::approve_comment),
        )
        .service(
            web::resource("/accounts/signup/")
                .route(web::get().to(accounts::signup_form))
                .route(web::post().to(accounts::signup)),
        )
        .service(
            web::resource("/accounts/login/")
                .route(web::get().to(accounts::login_form))
                .route(web::post().to(accounts::login)),
        )
        .route("/accounts/logout/", web::post().to(accounts::logout));
}
