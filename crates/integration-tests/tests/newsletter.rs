//! Integration tests for the newsletter signup.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use cafe_jalu_integration_tests::{
    MarketingCall, RecordingMarketingClient, StorefrontMode, TestApp, body_string,
};
use serde_json::json;

#[tokio::test]
async fn test_validate_enables_button_for_valid_email() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    let response = app
        .post_form("/newsletter/validate", "email=guest%40example.com")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains(r#"id="newsletter-submit""#));
    assert!(!html.contains("disabled"));
}

#[tokio::test]
async fn test_validate_disables_button_for_malformed_email() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    for input in ["", "guest%40", "%40example.com", "guest%40example"] {
        let response = app
            .post_form("/newsletter/validate", &format!("email={input}"))
            .await;
        let html = body_string(response).await;
        assert!(html.contains("disabled"), "input {input:?} should disable");
    }
}

#[tokio::test]
async fn test_subscribe_identifies_then_tracks_consent() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    let response = app
        .post_form("/newsletter", "email=Guest.Name%40Example.com")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(html.contains("Merci!"));
    assert!(html.contains("Check your email for updates"));
    assert!(!html.contains("<input"));

    assert_eq!(
        app.marketing.calls(),
        vec![
            MarketingCall::Identify {
                ids: json!({"email_id": "guest.name@example.com"}),
                properties: json!({
                    "email": "guest.name@example.com",
                    "data_source": "restaurant"
                }),
            },
            MarketingCall::Track {
                event_type: "consent".to_string(),
                ids: json!({"email_id": "guest.name@example.com"}),
                properties: json!({
                    "category": "email",
                    "valid_until": "unlimited",
                    "action": "accept",
                    "data_source": "restaurant"
                }),
            },
        ]
    );
}

#[tokio::test]
async fn test_subscribe_rejects_malformed_email() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    let response = app.post_form("/newsletter", "email=not-an-email").await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let html = body_string(response).await;
    assert!(html.contains("Please enter a valid email address."));
    assert!(html.contains(r#"value="not-an-email""#));
    assert!(app.marketing.calls().is_empty());
}

#[tokio::test]
async fn test_unacknowledged_signup_shows_error_state() {
    let app = TestApp::with_marketing(
        StorefrontMode::Healthy,
        RecordingMarketingClient::failing_track(),
    )
    .await;

    let response = app
        .post_form("/newsletter", "email=guest%40example.com")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_string(response).await;
    assert!(!html.contains("Merci!"));
    assert!(html.contains("Something went wrong. Please try again."));
    // Form stays usable so the visitor can retry
    assert!(html.contains("<input"));
    assert!(!html.contains(" disabled>"));
    assert_eq!(app.marketing.calls().len(), 2);
}

#[tokio::test]
async fn test_subscribe_is_rate_limited_per_client() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    let mut statuses = Vec::new();
    for _ in 0..11 {
        statuses.push(app.post_form("/newsletter", "email=x").await.status());
    }

    assert!(
        statuses[..10]
            .iter()
            .all(|s| *s == StatusCode::UNPROCESSABLE_ENTITY)
    );
    assert_eq!(statuses[10], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_validation_is_not_rate_limited() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    for _ in 0..20 {
        let response = app.post_form("/newsletter/validate", "email=gu").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_landing_page_embeds_idle_form() {
    let app = TestApp::new(StorefrontMode::Healthy).await;

    let html = body_string(app.get("/").await).await;
    assert!(html.contains("Sign up for our newsletter"));
    assert!(html.contains(r#"placeholder="Enter email address""#));
    assert!(html.contains(r#"hx-trigger="input changed delay:150ms""#));
    // Empty input keeps the button disabled
    assert!(html.contains(r#"class="footer-button" disabled"#));
}
