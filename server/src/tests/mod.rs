use axum::http::StatusCode;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use tower::ServiceExt;

use crate::{auth::SESSION_COOKIE, routes::app_router::AppRouter};
use common::*;


fn gmail_message(id: &str, labels: &[&str], from: &str, subject: &str) -> String {
    json!({
        "id": id,
        "threadId": id,
        "labelIds": labels,
        "snippet": format!("About {subject}"),
        "internalDate": "1727089470000",
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": from},
                {"name": "To", "value": TEST_EMAIL},
                {"name": "Subject", "value": subject},
                {"name": "Date", "value": "Mon, 23 Sep 2024 11:04:30 +0000"},
            ],
        },
    })
    .to_string()
}

async fn mock_message(server: &mut ServerGuard, id: &str, token: &str, body: String) -> Mock {
    server
        .mock("GET", format!("/gmail/v1/users/me/messages/{id}").as_str())
        .match_query(Matcher::UrlEncoded("format".into(), "full".into()))
        .match_header("authorization", format!("Bearer {token}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

async fn mock_list(server: &mut ServerGuard, token: &str, ids: &[&str]) -> Mock {
    let messages = ids
        .iter()
        .map(|id| json!({"id": id, "threadId": id}))
        .collect::<Vec<_>>();
    server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(Matcher::UrlEncoded("q".into(), "in:inbox".into()))
        .match_header("authorization", format!("Bearer {token}").as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"messages": messages, "nextPageToken": "page-2"}).to_string())
        .create_async()
        .await
}

async fn mailbox_with_three_messages(server: &mut ServerGuard, token: &str) -> Vec<Mock> {
    vec![
        mock_list(server, token, &["A", "B", "C"]).await,
        mock_message(
            server,
            "A",
            token,
            gmail_message("A", &["INBOX", "CATEGORY_PROMOTIONS"], "Shop <shop@store.com>", "New in"),
        )
        .await,
        mock_message(
            server,
            "B",
            token,
            gmail_message("B", &["INBOX", "CATEGORY_SOCIAL"], "friend@social.net", "Photos"),
        )
        .await,
        mock_message(
            server,
            "C",
            token,
            gmail_message("C", &["INBOX"], "bob@example.com", "50% off today"),
        )
        .await,
    ]
}

fn ids(body: &serde_json::Value) -> Vec<&str> {
    body["emails"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_and_fallback() {
    let server = Server::new_async().await;
    let router = AppRouter::create(test_state(&server.url()));

    let resp = router.clone().oneshot(get("/", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(text_body(resp).await, "Inbox server");

    let resp = router.oneshot(get("/nowhere", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(text_body(resp).await, "Route does not exist");
}

#[tokio::test]
async fn test_mailbox_routes_require_session() {
    let mut server = Server::new_async().await;
    let gmail = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));

    let resp = router.clone().oneshot(get("/api/emails", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["message"], "Not authenticated");

    let resp = router
        .clone()
        .oneshot(get("/api/emails/abc", Some("session=forged.jwt.value")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["message"], "Invalid session");

    let resp = router
        .oneshot(post_json(
            "/api/emails/action",
            None,
            json!({"ids": ["a"], "action": "archive"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    gmail.assert_async().await;
}

#[tokio::test]
async fn test_expired_session_without_refresh_token() {
    let server = Server::new_async().await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = format!("{SESSION_COOKIE}={}", session_jwt("old", -60, None));

    let resp = router.oneshot(get("/api/emails", Some(&cookie))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(resp).await["error"]["message"], "Session expired");
}

#[tokio::test]
async fn test_list_promotions() {
    let mut server = Server::new_async().await;
    let _mocks = mailbox_with_three_messages(&mut server, "access-1").await;
    let router = AppRouter::create(test_state(&server.url()));

    let cookie = session_cookie("access-1");
    let resp = router
        .oneshot(get("/api/emails?category=promotions", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(ids(&body), vec!["A", "C"]);
    assert_eq!(body["nextPageToken"], "page-2");
    assert!(body.get("failedCount").is_none());
    assert_eq!(body["emails"][1]["category"], "promotions");
    assert_eq!(body["emails"][1]["subject"], "50% off today");
    assert_eq!(body["emails"][1]["date"], "2024-09-23T11:04:30+00:00");
}

#[tokio::test]
async fn test_list_all_with_bearer_and_failed_fetch() {
    let mut server = Server::new_async().await;
    let _list = mock_list(&mut server, "access-1", &["A", "B"]).await;
    let _a = mock_message(
        &mut server,
        "A",
        "access-1",
        gmail_message("A", &["INBOX"], "alice@example.com", "Lunch"),
    )
    .await;
    let _b = server
        .mock("GET", "/gmail/v1/users/me/messages/B")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));

    let req = axum::http::Request::builder()
        .uri("/api/emails?category=all")
        .header(
            "authorization",
            format!("Bearer {}", session_jwt("access-1", 3600, None)),
        )
        .body(axum::body::Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(ids(&body), vec!["A"]);
    assert_eq!(body["failedCount"], 1);
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let server = Server::new_async().await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(get("/api/emails?category=spam", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_category_lists_primary() {
    let mut server = Server::new_async().await;
    let list = server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "in:inbox".into()),
            Matcher::UrlEncoded("labelIds".into(), "CATEGORY_PERSONAL".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"messages": [{"id": "P", "threadId": "P"}]}).to_string())
        .expect(2)
        .create_async()
        .await;
    let _message = mock_message(
        &mut server,
        "P",
        "access-1",
        gmail_message("P", &["INBOX", "CATEGORY_PERSONAL"], "mom@example.com", "Dinner"),
    )
    .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    for uri in ["/api/emails?category=", "/api/emails?category=%20"] {
        let resp = router.clone().oneshot(get(uri, Some(&cookie))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(ids(&body), vec!["P"]);
        assert_eq!(body["emails"][0]["category"], "primary");
    }

    list.assert_async().await;
}

#[tokio::test]
async fn test_listing_failure_is_an_error() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/gmail/v1/users/me/messages")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(get("/api/emails?category=all", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"]["message"], "Failed to fetch emails");
}

#[tokio::test]
async fn test_expired_session_is_refreshed_and_cookie_reissued() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"access-2","token_type":"Bearer","expires_in":3599}"#)
        .expect(1)
        .create_async()
        .await;
    let _mocks = mailbox_with_three_messages(&mut server, "access-2").await;
    let router = AppRouter::create(test_state(&server.url()));

    let cookie = format!(
        "{SESSION_COOKIE}={}",
        session_jwt("access-1", -60, Some("refresh-1"))
    );
    let resp = router
        .oneshot(get("/api/emails?category=social", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    token.assert_async().await;

    let reissued = set_session_cookie(&resp).expect("session cookie should be re-issued");
    assert_ne!(reissued, cookie);
    assert!(reissued.contains("HttpOnly"));

    let body = json_body(resp).await;
    assert_eq!(ids(&body), vec!["B"]);
}

#[tokio::test]
async fn test_refreshed_session_survives_failed_call() {
    let mut server = Server::new_async().await;
    let _rejected = server
        .mock("GET", "/gmail/v1/users/me/messages/m1")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"access-2","token_type":"Bearer","expires_in":3599}"#)
        .expect(1)
        .create_async()
        .await;
    let retried = server
        .mock("GET", "/gmail/v1/users/me/messages/m1")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer access-2")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(get("/api/emails/m1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    token.assert_async().await;
    retried.assert_async().await;

    let reissued = set_session_cookie(&resp).expect("refreshed session should be kept");
    assert_ne!(reissued, cookie);
}

#[tokio::test]
async fn test_email_detail() {
    let mut server = Server::new_async().await;
    let _detail = server
        .mock("GET", "/gmail/v1/users/me/messages/m1")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(gmail_message("m1", &["INBOX"], "alice@example.com", "Hi"))
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/gmail/v1/users/me/messages/gone")
        .match_query(Matcher::Any)
        .with_status(404)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .clone()
        .oneshot(get("/api/emails/m1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["id"], "m1");
    assert_eq!(body["from"], "alice@example.com");
    assert_eq!(body["to"], TEST_EMAIL);
    assert_eq!(body["subject"], "Hi");
    assert_eq!(body["body"], "");

    let resp = router
        .oneshot(get("/api/emails/gone", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_action_reports_each_message() {
    let mut server = Server::new_async().await;
    let archived = server
        .mock("POST", "/gmail/v1/users/me/messages/x/modify")
        .match_body(Matcher::Json(json!({"addLabelIds": [], "removeLabelIds": ["INBOX"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"x"}"#)
        .expect(1)
        .create_async()
        .await;
    let _missing = server
        .mock("POST", "/gmail/v1/users/me/messages/y/modify")
        .with_status(404)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(post_json(
            "/api/emails/action",
            Some(&cookie),
            json!({"ids": ["x", "y"], "action": "archive"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    archived.assert_async().await;

    let body = json_body(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["results"]["x"], json!({"status": "ok"}));
    assert_eq!(body["results"]["y"]["status"], "failed");
}

#[tokio::test]
async fn test_bulk_validation() {
    let mut server = Server::new_async().await;
    let gmail = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    for (uri, body) in [
        ("/api/emails/action", json!({"ids": [], "action": "trash"})),
        ("/api/emails/action", json!({"action": "trash"})),
        ("/api/emails/delete", json!({"ids": []})),
    ] {
        let resp = router
            .clone()
            .oneshot(post_json(uri, Some(&cookie), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await["error"]["message"],
            "No email IDs provided"
        );
    }

    for body in [
        json!({"ids": ["a"]}),
        json!({"ids": ["a"], "action": ""}),
        json!({"ids": ["a"], "action": null}),
    ] {
        let resp = router
            .clone()
            .oneshot(post_json("/api/emails/action", Some(&cookie), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await["error"]["message"],
            "Missing required fields"
        );
    }

    let resp = router
        .oneshot(post_json(
            "/api/emails/action",
            Some(&cookie),
            json!({"ids": ["z"], "action": "explode"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["results"]["z"]["status"], "failed");

    gmail.assert_async().await;
}

#[tokio::test]
async fn test_bulk_action_runs_repeated_ids_once() {
    let mut server = Server::new_async().await;
    let spam = server
        .mock("POST", "/gmail/v1/users/me/messages/x/modify")
        .match_body(Matcher::Json(json!({"addLabelIds": ["SPAM"], "removeLabelIds": ["INBOX"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"x"}"#)
        .expect(1)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(post_json(
            "/api/emails/action",
            Some(&cookie),
            json!({"ids": ["x", "x", " "], "action": "spam"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    spam.assert_async().await;

    let body = json_body(resp).await;
    assert_eq!(body["results"], json!({"x": {"status": "ok"}}));
}

#[tokio::test]
async fn test_bulk_delete_trashes() {
    let mut server = Server::new_async().await;
    let trash = server
        .mock("POST", "/gmail/v1/users/me/messages/d1/trash")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"d1"}"#)
        .expect(1)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .oneshot(post_json("/api/emails/delete", Some(&cookie), json!({"ids": ["d1"]})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    trash.assert_async().await;
    assert_eq!(json_body(resp).await["results"]["d1"]["status"], "ok");
}

#[tokio::test]
async fn test_send_email() {
    let mut server = Server::new_async().await;
    let send = server
        .mock("POST", "/gmail/v1/users/me/messages/send")
        .match_body(Matcher::Regex(r#"^\{"raw":"[A-Za-z0-9_-]+"\}$"#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"sent-1"}"#)
        .expect(1)
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .clone()
        .oneshot(post_json(
            "/api/emails/send",
            Some(&cookie),
            json!({"to": "bob@example.com", "subject": "Hi"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(resp).await["error"]["message"],
        "Missing required fields"
    );

    let resp = router
        .oneshot(post_json(
            "/api/emails/send",
            Some(&cookie),
            json!({"to": "bob@example.com", "subject": "Hi", "content": "<p>Hello</p>"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({"success": true}));
    send.assert_async().await;
}

#[tokio::test]
async fn test_session_and_logout() {
    let server = Server::new_async().await;
    let router = AppRouter::create(test_state(&server.url()));
    let cookie = session_cookie("access-1");

    let resp = router
        .clone()
        .oneshot(get("/auth/session", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["email"], TEST_EMAIL);
    assert!(body["accessTokenExpires"].is_string());

    let resp = router
        .oneshot(post_json("/auth/logout", Some(&cookie), json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = set_session_cookie(&resp).expect("session cookie should be cleared");
    assert!(cleared.starts_with(&format!("{SESSION_COOKIE}=;")));
}

#[tokio::test]
async fn test_google_login_flow() {
    let mut server = Server::new_async().await;
    let router = AppRouter::create(test_state(&server.url()));

    let resp = router.clone().oneshot(get("/auth/google", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let url = json_body(resp).await["url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&format!("{}/o/oauth2/v2/auth?", server.url())));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("prompt=consent"));
    assert!(url.contains("client_id=client-id"));

    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "code-1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3599,
                "refresh_token": "refresh-1",
                "scope": "email https://www.googleapis.com/auth/gmail.modify https://www.googleapis.com/auth/gmail.send",
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _profile = server
        .mock("GET", "/gmail/v1/users/me/profile")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"emailAddress": TEST_EMAIL}).to_string())
        .create_async()
        .await;

    let resp = router
        .clone()
        .oneshot(get("/auth/callback?code=code-1", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    token.assert_async().await;
    let cookie = set_session_cookie(&resp).expect("login should set a session cookie");
    let cookie = cookie.split(';').next().unwrap().to_string();

    let resp = router.oneshot(get("/auth/session", Some(&cookie))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["email"], TEST_EMAIL);
}

#[tokio::test]
async fn test_login_missing_scopes_or_denied() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3599,
                "scope": "email https://www.googleapis.com/auth/gmail.readonly",
            })
            .to_string(),
        )
        .create_async()
        .await;
    let router = AppRouter::create(test_state(&server.url()));

    let resp = router
        .clone()
        .oneshot(get("/auth/callback?code=code-1", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(set_session_cookie(&resp).is_none());

    let resp = router
        .oneshot(get("/auth/callback?error=access_denied", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
