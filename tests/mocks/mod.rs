#![allow(dead_code)]
//! Shared fixtures: an in-memory app, signed-in users and a stub recipe API.
use std::sync::Arc;

use actix_web::{
    body::BoxBody,
    cookie::Cookie,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header::LOCATION,
    web, App, Error,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};

use recipereview::api::{self, pages};
use recipereview::auth::{hash_password, session_cookie};
use recipereview::config::Config;
use recipereview::db::Database;
use recipereview::messages::{decode, Message, MESSAGES_COOKIE};
use recipereview::models::review::{Review, ReviewDraft, ReviewStatus};
use recipereview::models::user::User;
use recipereview::search::{Recipe, RecipeSearch, SearchError};
use recipereview::AppState;

/// Recipe API double: answers every query with `recipes`, or fails.
#[derive(Default)]
pub struct StubSearch {
    pub recipes: Vec<Recipe>,
    pub fail: bool,
}

impl StubSearch {
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            recipes: labels
                .iter()
                .map(|label| Recipe {
                    label: label.to_string(),
                    url: format!("https://example.com/{}", label.to_lowercase()),
                    image: None,
                    source: Some("Example Kitchen".into()),
                    ingredient_lines: Vec::new(),
                    calories: None,
                })
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            recipes: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl RecipeSearch for StubSearch {
    async fn search(&self, _query: &str) -> Result<Vec<Recipe>, SearchError> {
        if self.fail {
            return Err(SearchError::Status {
                status: 503,
                body: "Service Unavailable".into(),
            });
        }
        Ok(self.recipes.clone())
    }
}

pub async fn test_state(search: StubSearch) -> web::Data<AppState> {
    let db = Database::new(":memory:").unwrap();
    db.create_schema().await.unwrap();
    let mut config = Config::default();
    config.auth.bcrypt_cost = 4;
    web::Data::new(AppState {
        db,
        search: Arc::new(search),
        config,
    })
}

pub fn app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<BoxBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .configure(api::configure)
        .default_service(web::route().to(pages::not_found))
}

/// Creates a user with password "password123" and an open session.
pub async fn sign_up(state: &AppState, username: &str, is_staff: bool) -> (User, Cookie<'static>) {
    let hash = hash_password("password123", 4).unwrap();
    let user = state.db.create_user(username, &hash, is_staff).await.unwrap();
    let token = state.db.create_session(user.id).await.unwrap();
    (user, session_cookie(&token))
}

/// Stores a published review, `age_minutes` old.
pub async fn publish(state: &AppState, author: &User, title: &str, age_minutes: i64) -> Review {
    let draft = ReviewDraft {
        title: title.to_string(),
        recipe: format!("{title} recipe"),
        content: format!("Notes on {title}"),
        slug: recipereview::utils::slug::slugify(title),
        status: Some(ReviewStatus::Published),
        ..ReviewDraft::default()
    };
    state
        .db
        .insert_review(author.id, &draft, Utc::now() - Duration::minutes(age_minutes))
        .await
        .unwrap()
}

pub fn location(resp: &ServiceResponse) -> String {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Flash messages set by a redirect.
pub fn flash(resp: &ServiceResponse) -> Vec<Message> {
    resp.response()
        .cookies()
        .find(|c| c.name() == MESSAGES_COOKIE)
        .map(|c| decode(c.value()))
        .unwrap_or_default()
}

pub fn flash_texts(resp: &ServiceResponse) -> Vec<String> {
    flash(resp).into_iter().map(|m| m.text).collect()
}
