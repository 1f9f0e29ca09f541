use actix_web::{http::StatusCode, test};
use serde_json::Value;

use recipereview::auth::SESSION_COOKIE;

mod mocks;
use mocks::{app, location, sign_up, test_state, StubSearch};

fn session_of(resp: &actix_web::dev::ServiceResponse) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

#[actix_web::test]
async fn test_signup_signs_in() {
    let state = test_state(StubSearch::default()).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/accounts/signup/")
        .set_payload("username=dana&password1=s3cret-pass&password2=s3cret-pass")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let token = session_of(&resp).expect("session cookie");
    let user = state.db.get_session_user(&token).await.unwrap().unwrap();
    assert_eq!(user.username, "dana");
    assert!(!user.is_staff);
}

#[actix_web::test]
async fn test_signup_rejects_taken_username_and_mismatch() {
    let state = test_state(StubSearch::default()).await;
    sign_up(&state, "dana", false).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/accounts/signup/")
        .set_payload("username=dana&password1=s3cret-pass&password2=s3cret-pass")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["username"].is_array());

    let req = test::TestRequest::post()
        .uri("/accounts/signup/")
        .set_payload("username=erin&password1=s3cret-pass&password2=other-pass")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["errors"]["password2"][0],
        "You must type the same password each time."
    );
    assert!(state.db.get_user_by_username("erin").await.unwrap().is_none());
}

#[actix_web::test]
async fn test_login_wrong_password() {
    let state = test_state(StubSearch::default()).await;
    sign_up(&state, "dana", false).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_payload("login=dana&password=wrong-password")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(session_of(&resp).is_none());
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["__all__"][0]
        .as_str()
        .unwrap()
        .contains("not correct"));
}

#[actix_web::test]
async fn test_login_follows_next_and_logout_ends_session() {
    let state = test_state(StubSearch::default()).await;
    sign_up(&state, "dana", false).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get()
        .uri("/accounts/login/?next=/reviews/new/")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["form"]["next"], "/reviews/new/");

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_payload("login=dana&password=password123&next=%2Freviews%2Fnew%2F")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/reviews/new/");
    let token = session_of(&resp).unwrap();

    let req = test::TestRequest::post()
        .uri("/accounts/logout/")
        .cookie(recipereview::auth::session_cookie(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/");
    assert_eq!(session_of(&resp).as_deref(), Some(""));
    assert!(state.db.get_session_user(&token).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_login_ignores_offsite_next() {
    let state = test_state(StubSearch::default()).await;
    sign_up(&state, "dana", false).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/accounts/login/")
        .set_payload("login=dana&password=password123&next=https%3A%2F%2Fevil.example%2F")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_new_review_page_requires_login() {
    let state = test_state(StubSearch::default()).await;
    let (_dana, session) = sign_up(&state, "dana", false).await;
    let app = test::init_service(app(state.clone())).await;

    let req = test::TestRequest::get().uri("/reviews/new/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/accounts/login/?next=%2Freviews%2Fnew%2F");

    let req = test::TestRequest::get()
        .uri("/reviews/new/")
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
