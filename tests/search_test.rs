use actix_web::{http::StatusCode, test};
use serde_json::Value;

use recipereview::models::review::{ReviewDraft, ReviewStatus};

mod mocks;
use mocks::{app, publish, sign_up, test_state, StubSearch};

#[actix_web::test]
async fn test_search_finds_reviews_ingredients_and_recipes() {
    let state = test_state(StubSearch::with_labels(&["Flour Tortillas"])).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    let draft = ReviewDraft {
        title: "Pancakes".into(),
        recipe: "Pancakes".into(),
        content: "Fluffy".into(),
        slug: "pancakes".into(),
        status: Some(ReviewStatus::Published),
        new_ingredients: vec!["Flour".into(), "Milk".into()],
        ..ReviewDraft::default()
    };
    state
        .db
        .insert_review(alice.id, &draft, chrono::Utc::now())
        .await
        .unwrap();
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get().uri("/search/?query=Flour").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["heading"], "Search results for: Flour");
    assert_eq!(body["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(body["reviews"][0]["slug"], "pancakes");
    assert_eq!(body["ingredients"][0]["name"], "Flour");
    assert_eq!(body["recipes"]["status"], "found");
    assert_eq!(body["recipes"]["recipes"][0]["label"], "Flour Tortillas");
}

#[actix_web::test]
async fn test_search_by_post() {
    let state = test_state(StubSearch::default()).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    publish(&state, &alice, "Beef Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/search/")
        .set_payload("query=stew")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["query"], "stew");
    assert_eq!(body["reviews"][0]["title"], "Beef Stew");
    assert_eq!(body["recipes"]["status"], "empty");
}

#[actix_web::test]
async fn test_absent_term_returns_nothing() {
    let state = test_state(StubSearch::default()).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/search/?query=zzzqqq")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert!(body["reviews"].as_array().unwrap().is_empty());
    assert!(body["ingredients"].as_array().unwrap().is_empty());
    assert!(body["utensils"].as_array().unwrap().is_empty());
    assert_eq!(body["recipes"]["status"], "empty");
}

#[actix_web::test]
async fn test_upstream_failure_still_renders_page() {
    let state = test_state(StubSearch::failing()).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get().uri("/search/?query=stew").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(body["recipes"]["status"], "unavailable");
}

#[actix_web::test]
async fn test_blank_query_is_empty_page() {
    let state = test_state(StubSearch::with_labels(&["Anything"])).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get().uri("/search/?query=+++").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["query"], "");
    assert_eq!(body["recipes"]["status"], "empty");
    assert!(body["reviews"].as_array().unwrap().is_empty());
}
