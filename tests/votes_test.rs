use actix_web::{http::StatusCode, test};
use serde_json::Value;

mod mocks;
use mocks::{app, flash_texts, location, publish, sign_up, test_state, StubSearch};

macro_rules! vote {
    ($app:expr, $session:expr, $vote_type:expr) => {{
        let req = test::TestRequest::post()
            .uri("/review/stew/vote/")
            .cookie($session.clone())
            .set_payload(format!("vote_type={}", $vote_type))
            .to_request();
        test::call_service(&$app, req).await
    }};
}

macro_rules! detail {
    ($app:expr, $session:expr) => {{
        let req = test::TestRequest::get()
            .uri("/review/stew/")
            .cookie($session.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body
    }};
}

#[actix_web::test]
async fn test_upvote_then_switch_to_downvote() {
    let state = test_state(StubSearch::default()).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    let (_bob, session) = sign_up(&state, "bob", false).await;
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let resp = vote!(app, session, "upvote");
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/review/stew/");

    let body = detail!(app, session);
    assert_eq!(body["review"]["upvotes"], 1);
    assert_eq!(body["review"]["downvotes"], 0);
    assert_eq!(body["upvoted"], true);

    vote!(app, session, "downvote");
    let body = detail!(app, session);
    assert_eq!(body["review"]["upvotes"], 0);
    assert_eq!(body["review"]["downvotes"], 1);
    assert_eq!(body["review"]["net_votes"], -1);
    assert_eq!(body["upvoted"], false);
    assert_eq!(body["downvoted"], true);
}

#[actix_web::test]
async fn test_repeat_vote_clears_it() {
    let state = test_state(StubSearch::default()).await;
    let (alice, session) = sign_up(&state, "alice", false).await;
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    vote!(app, session, "upvote");
    vote!(app, session, "upvote");

    let body = detail!(app, session);
    assert_eq!(body["review"]["upvotes"], 0);
    assert_eq!(body["review"]["downvotes"], 0);
    assert_eq!(body["upvoted"], false);
}

#[actix_web::test]
async fn test_unknown_vote_type_redirects_without_voting() {
    let state = test_state(StubSearch::default()).await;
    let (alice, session) = sign_up(&state, "alice", false).await;
    let review = publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    for vote_type in ["sideways", ""] {
        let resp = vote!(app, session, vote_type);
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/review/stew/");
        assert_eq!(flash_texts(&resp), vec!["Unknown vote type"]);
    }

    // No field at all behaves the same.
    let req = test::TestRequest::post()
        .uri("/review/stew/vote/")
        .cookie(session.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/review/stew/");

    assert_eq!(state.db.vote_of(review.id, alice.id).await.unwrap(), None);
    let body = detail!(app, session);
    assert_eq!(body["review"]["upvotes"], 0);
    assert_eq!(body["review"]["downvotes"], 0);
}

#[actix_web::test]
async fn test_anonymous_vote_redirects_to_login() {
    let state = test_state(StubSearch::default()).await;
    let (alice, _) = sign_up(&state, "alice", false).await;
    publish(&state, &alice, "Stew", 1).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/review/stew/vote/")
        .set_payload("vote_type=upvote")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/accounts/login/?next="));
}

#[actix_web::test]
async fn test_vote_on_missing_review_is_404() {
    let state = test_state(StubSearch::default()).await;
    let (_alice, session) = sign_up(&state, "alice", false).await;
    let app = test::init_service(app(state.clone())).await;

    let resp = vote!(app, session, "upvote");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
