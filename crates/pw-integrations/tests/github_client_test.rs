//! GitHub client tests against an in-process mock of the REST API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use pw_integrations::github::client::{GitHubClient, GitHubError};
use pw_integrations::github::{issues, pull_requests};
use pw_integrations::types::{GitHubConfig, PrState};

// ===========================================================================
// Test helpers
// ===========================================================================

async fn serve(app: Router) -> GitHubClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    GitHubClient::new(GitHubConfig {
        token: Some("ghp_test".into()),
        owner: "octo".into(),
        repo: "widgets".into(),
    })
    .unwrap()
    .with_base_url(&format!("http://{addr}"))
}

fn page_param(q: &HashMap<String, String>) -> u32 {
    q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
}

fn with_next(body: Value) -> Response {
    (
        [(header::LINK, r#"<http://mock/next>; rel="next", <http://mock/last>; rel="last""#)],
        Json(body),
    )
        .into_response()
}

// ===========================================================================
// Pagination
// ===========================================================================

#[tokio::test]
async fn timeline_paginates_until_empty_page() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/repos/{owner}/{repo}/issues/{number}/timeline",
        get(move |Query(q): Query<HashMap<String, String>>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(q.get("per_page").map(String::as_str), Some("100"));
                match page_param(&q) {
                    1 => with_next(json!([
                        {"event": "copilot_work_started", "created_at": "2025-06-01T10:00:00Z"},
                        {"event": "labeled", "created_at": "2025-06-01T10:01:00Z"}
                    ])),
                    2 => with_next(json!([
                        {"event": "copilot_work_finished", "created_at": "2025-06-01T11:00:00Z"}
                    ])),
                    // still advertises a next page, but is empty
                    _ => with_next(json!([])),
                }
            }
        }),
    );
    let client = serve(app).await;

    let events = issues::list_timeline(&client, 7).await.unwrap();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(kinds, ["copilot_work_started", "labeled", "copilot_work_finished"]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn pagination_stops_without_next_link() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/repos/{owner}/{repo}/issues/{number}/comments",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!([{"id": 1, "body": "hello", "user": {"login": "alice"}}]))
            }
        }),
    );
    let client = serve(app).await;

    let comments = issues::list_comments(&client, 7).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author(), "alice");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lossy_timeline_keeps_pages_before_failure() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/issues/{number}/timeline",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            match page_param(&q) {
                1 => with_next(json!([{"event": "copilot_work_started"}])),
                _ => (StatusCode::BAD_GATEWAY, "upstream down").into_response(),
            }
        }),
    );
    let client = serve(app).await;

    let strict = issues::list_timeline(&client, 7).await;
    match strict {
        Err(GitHubError::Api(msg)) => assert!(msg.contains("502")),
        other => panic!("expected Api error, got {other:?}"),
    }

    let events = issues::fetch_timeline(&client, 7).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "copilot_work_started");
}

#[tokio::test]
async fn lossy_timeline_on_unreachable_host_is_empty() {
    let client = GitHubClient::new(GitHubConfig {
        token: Some("ghp_test".into()),
        owner: "octo".into(),
        repo: "widgets".into(),
    })
    .unwrap()
    .with_base_url("http://127.0.0.1:1");

    assert!(issues::fetch_timeline(&client, 1).await.is_empty());
}

// ===========================================================================
// Pull requests
// ===========================================================================

#[tokio::test]
async fn get_pull_request_reads_state() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/pulls/{number}",
        get(|headers: HeaderMap| async move {
            assert_eq!(headers[header::AUTHORIZATION], "Bearer ghp_test");
            assert!(headers.contains_key(header::USER_AGENT));
            Json(json!({
                "number": 7,
                "title": "Add widget",
                "state": "closed",
                "merged": true,
                "user": {"login": "copilot-swe-agent"},
                "html_url": "https://github.com/octo/widgets/pull/7"
            }))
        }),
    );
    let client = serve(app).await;

    let pr = pull_requests::get_pull_request(&client, 7).await.unwrap();
    assert_eq!(pr.state, PrState::Closed);
    assert!(!pr.is_open());
    assert!(pr.is_merged());
    assert_eq!(pr.user.unwrap().login, "copilot-swe-agent");
}

#[tokio::test]
async fn diff_uses_diff_media_type() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/pulls/{number}",
        get(|headers: HeaderMap| async move {
            assert_eq!(headers[header::ACCEPT], "application/vnd.github.v3.diff");
            "diff --git a/x b/x\n+added\n"
        }),
    );
    let client = serve(app).await;

    let diff = pull_requests::get_pull_request_diff(&client, 7).await.unwrap();
    assert!(diff.starts_with("diff --git"));
}

#[tokio::test]
async fn commits_and_files_are_listed() {
    let app = Router::new()
        .route(
            "/repos/{owner}/{repo}/pulls/{number}/commits",
            get(|| async {
                Json(json!([
                    {"sha": "0123456789abcdef", "commit": {"message": "Initial plan\n\nbody", "author": {"name": "Copilot"}}}
                ]))
            }),
        )
        .route(
            "/repos/{owner}/{repo}/pulls/{number}/files",
            get(|| async {
                Json(json!([
                    {"filename": "src/lib.rs", "status": "modified", "additions": 4, "deletions": 1}
                ]))
            }),
        );
    let client = serve(app).await;

    let commits = pull_requests::list_pr_commits(&client, 7).await.unwrap();
    assert_eq!(commits[0].short_sha(), "0123456");
    assert_eq!(commits[0].subject(), "Initial plan");

    let files = pull_requests::list_pr_files(&client, 7).await.unwrap();
    assert_eq!(files[0].filename, "src/lib.rs");
    assert_eq!(files[0].additions, 4);
}

// ===========================================================================
// Writes
// ===========================================================================

#[tokio::test]
async fn create_comment_posts_body() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/issues/{number}/comments",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["body"], "@copilot please add tests");
            (StatusCode::CREATED, Json(json!({"id": 99, "body": body["body"]})))
        }),
    );
    let client = serve(app).await;

    let comment = issues::create_comment(&client, 7, "@copilot please add tests")
        .await
        .unwrap();
    assert_eq!(comment.id, 99);
}

#[tokio::test]
async fn request_reviewers_posts_logins() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/pulls/{number}/requested_reviewers",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["reviewers"], json!(["octocat"]));
            (StatusCode::CREATED, Json(json!({"number": 7})))
        }),
    );
    let client = serve(app).await;

    pull_requests::request_reviewers(&client, 7, &["octocat".to_string()])
        .await
        .unwrap();
}

#[tokio::test]
async fn write_failure_surfaces_api_error() {
    let app = Router::new().route(
        "/repos/{owner}/{repo}/issues/{number}/comments",
        post(|| async { (StatusCode::FORBIDDEN, "Resource not accessible by integration") }),
    );
    let client = serve(app).await;

    let err = issues::create_comment(&client, 7, "hi").await.unwrap_err();
    assert!(err.to_string().contains("403"));
}
