use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::render;
use crate::error::AppError;
use crate::forms::FormData;
use crate::search::{get_recipes, SearchOutcome};
use crate::AppState;

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    pub query: Option<String>,
}

pub async fn search_get(
    req: HttpRequest,
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.into_inner().query.unwrap_or_default();
    run_search(&req, &state, &query).await
}

pub async fn search_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let query = FormData::parse(&body).get_or_empty("query");
    run_search(&req, &state, &query).await
}

async fn run_search(
    req: &HttpRequest,
    state: &AppState,
    query: &str,
) -> Result<HttpResponse, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(render(
            req,
            &[],
            json!({
                "query": "",
                "heading": "",
                "reviews": [],
                "ingredients": [],
                "utensils": [],
                "recipes": SearchOutcome::Empty,
            }),
        ));
    }

    let reviews = state.db.search_reviews(query).await?;
    let ingredients = state.db.search_ingredients(query).await?;
    let utensils = state.db.search_utensils(query).await?;
    let recipes = get_recipes(state.search.as_ref(), query).await;
    info!(
        "Search '{}': {} reviews, {} ingredients, {} utensils",
        query,
        reviews.len(),
        ingredients.len(),
        utensils.len()
    );

    Ok(render(
        req,
        &[],
        json!({
            "query": query,
            "heading": format!("Search results for: {query}"),
            "reviews": reviews,
            "ingredients": ingredients,
            "utensils": utensils,
            "recipes": recipes,
        }),
    ))
}
