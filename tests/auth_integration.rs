use dotenvy::dotenv;
use emeloc_rs::user::SigninRequest;
use emeloc_rs::{Emeloc, EmelocError};
use std::env;

// Helper function to initialize a client from environment variables loaded
// from .env, for tests that need a live deployment.
fn setup_live_client() -> Emeloc {
    dotenv().ok();

    let server_url = env::var("EMELOC_SERVER_URL")
        .expect("EMELOC_SERVER_URL not set in .env or environment for live integration tests");
    let dispatch_url = env::var("EMELOC_DISPATCH_URL").ok();

    Emeloc::new(&server_url, dispatch_url.as_deref()).expect("Failed to create EmelocClient")
}

#[tokio::test]
async fn profile_without_a_session_is_rejected_locally() {
    // No token has been stored, so the call must fail before any request
    // goes out; an unroutable URL proves no network was attempted.
    let client = Emeloc::new("http://127.0.0.1:9", None).unwrap();
    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, EmelocError::SessionTokenMissing));
}

#[tokio::test]
#[ignore = "requires a live EmeLoc backend; set EMELOC_SERVER_URL (and credentials) in .env"]
async fn signin_stores_the_bearer_token() {
    let mut client = setup_live_client();
    let email = env::var("EMELOC_TEST_EMAIL").expect("EMELOC_TEST_EMAIL not set");
    let username = env::var("EMELOC_TEST_USERNAME").expect("EMELOC_TEST_USERNAME not set");
    let phone = env::var("EMELOC_TEST_PHONE").unwrap_or_default();

    let response = client
        .signin(&SigninRequest {
            email: &email,
            username: &username,
            phone: &phone,
        })
        .await
        .expect("signin failed");

    assert!(!response.token.is_empty(), "backend must issue a token");
    assert!(client.is_authenticated());
    assert_eq!(client.session_token(), Some(response.token.as_str()));
    assert_eq!(response.user.email, email);

    client.signout();
    assert!(!client.is_authenticated());
}

#[tokio::test]
#[ignore = "requires a live EmeLoc backend; set EMELOC_SERVER_URL (and credentials) in .env"]
async fn profile_reflects_the_signed_in_user() {
    let mut client = setup_live_client();
    let email = env::var("EMELOC_TEST_EMAIL").expect("EMELOC_TEST_EMAIL not set");
    let username = env::var("EMELOC_TEST_USERNAME").expect("EMELOC_TEST_USERNAME not set");

    client
        .signin(&SigninRequest {
            email: &email,
            username: &username,
            phone: "",
        })
        .await
        .expect("signin failed");

    let profile = client.profile().await.expect("profile fetch failed");
    assert_eq!(profile.email, email);
}
