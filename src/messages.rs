//! One-shot flash messages carried across a redirect in a cookie.
use actix_web::{
    cookie::Cookie,
    http::header::LOCATION,
    HttpRequest, HttpResponse, HttpResponseBuilder,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const MESSAGES_COOKIE: &str = "messages";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }
}

pub fn encode(messages: &[Message]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    urlencoding::encode(&json).into_owned()
}

/// Decodes a cookie value; anything malformed reads as no messages.
pub fn decode(value: &str) -> Vec<Message> {
    let json = match urlencoding::decode(value) {
        Ok(json) => json,
        Err(e) => {
            warn!("Dropping undecodable messages cookie: {}", e);
            return Vec::new();
        }
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        warn!("Dropping malformed messages cookie: {}", e);
        Vec::new()
    })
}

/// Messages waiting for the current request.
pub fn pending(req: &HttpRequest) -> Vec<Message> {
    req.cookie(MESSAGES_COOKIE)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default()
}

fn store_cookie(messages: &[Message]) -> Cookie<'static> {
    let mut cookie = Cookie::new(MESSAGES_COOKIE, encode(messages));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(MESSAGES_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}

/// Marks messages read by the current page so the browser drops them.
pub fn consume(builder: &mut HttpResponseBuilder, consumed: &[Message]) {
    if !consumed.is_empty() {
        builder.cookie(removal_cookie());
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.to_string()))
        .finish()
}

/// Redirects with `messages` queued for the next page. Messages this request
/// arrived with and nobody rendered yet are carried along in front.
pub fn redirect_with(req: &HttpRequest, location: &str, messages: &[Message]) -> HttpResponse {
    let mut queued = pending(req);
    queued.extend_from_slice(messages);
    HttpResponse::Found()
        .insert_header((LOCATION, location.to_string()))
        .cookie(store_cookie(&queued))
        .finish()
}
