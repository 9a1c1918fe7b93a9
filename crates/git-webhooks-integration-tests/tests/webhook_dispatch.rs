//! End-to-end tests of webhook dispatch
//!
//! Each test configures the service from a TOML file, sends deliveries through
//! the router and observes the deployment commands run by the shell launcher
//! through the files they create.

#![cfg(unix)]

mod common;

use axum::http::StatusCode;
use common::{
    eventually, github_signature, json_post, post, settle, Sandbox, GITHUB_PUSH, GITLAB_PUSH,
};
use git_webhooks_core::webhook::verifier::gitee_signature;

// ============================================================================
// GitHub
// ============================================================================

/// Verify that a correctly signed GitHub push runs the repository's command
#[tokio::test]
async fn test_signed_github_push_deploys() {
    // Arrange
    let sandbox = Sandbox::new(
        r#"
[providers.github]
verify = true
secret = "gh-secret"
handle_events = "push"
"#,
        &[("owner/repo", "touch deployed")],
    );
    let signature = github_signature("gh-secret", GITHUB_PUSH);

    // Act
    let status = sandbox
        .send(json_post(
            &[("X-GitHub-Event", "push"), ("X-Hub-Signature", signature.as_str())],
            GITHUB_PUSH,
        ))
        .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    let marker = sandbox.path("deployed");
    assert!(eventually(|| marker.exists()).await, "command did not run");
}

/// Verify that a bad signature is refused and nothing runs
#[tokio::test]
async fn test_tampered_github_push_is_refused() {
    let sandbox = Sandbox::new(
        r#"
[providers.github]
verify = true
secret = "gh-secret"
"#,
        &[("owner/repo", "touch deployed")],
    );
    let signature = github_signature("wrong-secret", GITHUB_PUSH);

    let status = sandbox
        .send(json_post(
            &[("X-GitHub-Event", "push"), ("X-Hub-Signature", signature.as_str())],
            GITHUB_PUSH,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    settle().await;
    assert!(!sandbox.path("deployed").exists());
}

/// Verify that events outside `handle_events` are refused before verification
#[tokio::test]
async fn test_filtered_event_is_refused() {
    let sandbox = Sandbox::new(
        r#"
[providers.github]
handle_events = ["release"]
"#,
        &[("owner/repo", "touch deployed")],
    );

    let status = sandbox
        .send(json_post(&[("X-GitHub-Event", "push")], GITHUB_PUSH))
        .await;

    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    settle().await;
    assert!(!sandbox.path("deployed").exists());
}

// ============================================================================
// Gitee
// ============================================================================

/// Verify both Gitee token modes: plain password and signed timestamp
#[tokio::test]
async fn test_gitee_password_and_signature_modes() {
    let sandbox = Sandbox::new(
        r#"
[providers.gitee]
verify = true
secret = "gitee-pw"
"#,
        &[("owner/repo", "touch deployed-$$")],
    );

    let password = sandbox
        .send(json_post(
            &[("X-Gitee-Event", "Push Hook"), ("X-Gitee-Token", "gitee-pw")],
            GITHUB_PUSH,
        ))
        .await;
    assert_eq!(password, StatusCode::OK);

    let signature = gitee_signature(1_700_000_000_000, "gitee-pw");
    let signed = sandbox
        .send(json_post(
            &[
                ("X-Gitee-Event", "Push Hook"),
                ("X-Gitee-Token", signature.as_str()),
                ("X-Gitee-Timestamp", "1700000000000"),
            ],
            GITHUB_PUSH,
        ))
        .await;
    assert_eq!(signed, StatusCode::OK);

    assert!(eventually(|| sandbox.files_with_prefix("deployed-").len() == 2).await);
}

/// Verify that Gitee checks a supplied token even with `verify` off
#[tokio::test]
async fn test_gitee_token_checked_without_verify() {
    let sandbox = Sandbox::new(
        r#"
[providers.gitee]
secret = "gitee-pw"
"#,
        &[("owner/repo", "touch deployed")],
    );

    let wrong = sandbox
        .send(json_post(
            &[("X-Gitee-Event", "Push Hook"), ("X-Gitee-Token", "guess")],
            GITHUB_PUSH,
        ))
        .await;
    assert_eq!(wrong, StatusCode::UNAUTHORIZED);

    let absent = sandbox
        .send(json_post(&[("X-Gitee-Event", "Push Hook")], GITHUB_PUSH))
        .await;
    assert_eq!(absent, StatusCode::OK);
    assert!(eventually(|| sandbox.path("deployed").exists()).await);
}

// ============================================================================
// GitLab and custom providers
// ============================================================================

/// Verify GitLab token authentication and its identifier path
#[tokio::test]
async fn test_gitlab_token_deploys() {
    let sandbox = Sandbox::new(
        r#"
[providers.gitlab]
verify = true
secret = "gl-token"
handle_events = "Push Hook, Tag Push Hook"
"#,
        &[("group/project", "touch deployed")],
    );

    let refused = sandbox
        .send(json_post(
            &[("X-Gitlab-Event", "Push Hook"), ("X-Gitlab-Token", "nope")],
            GITLAB_PUSH,
        ))
        .await;
    assert_eq!(refused, StatusCode::UNAUTHORIZED);

    let accepted = sandbox
        .send(json_post(
            &[("X-Gitlab-Event", "Push Hook"), ("X-Gitlab-Token", "gl-token")],
            GITLAB_PUSH,
        ))
        .await;
    assert_eq!(accepted, StatusCode::OK);
    assert!(eventually(|| sandbox.path("deployed").exists()).await);
}

/// Verify a custom provider with its own headers and a form-encoded body
#[tokio::test]
async fn test_custom_provider_form_delivery() {
    let sandbox = Sandbox::new(
        r#"
[providers.custom]
verify = true
secret = "forge-token"
header_name = "X-Forge"
header_value = "forge"
header_event = "X-Forge-Event"
header_token = "X-Forge-Token"
identifier_path = "repo"
handle_events = "deploy"
"#,
        &[("Team/App", "touch deployed")],
    );
    let body = "repo=Team%2FApp&ref=main";

    let status = sandbox
        .send(post(
            "application/x-www-form-urlencoded",
            &[
                ("X-Forge", "forge-v2"),
                ("X-Forge-Event", "deploy"),
                ("X-Forge-Token", "forge-token"),
            ],
            body,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(eventually(|| sandbox.path("deployed").exists()).await);
}

/// Verify that a GitHub header wins over a matching custom header
#[tokio::test]
async fn test_github_detected_before_custom() {
    let sandbox = Sandbox::new(
        r#"
[providers.custom]
verify = true
secret = "forge-token"
"#,
        &[("owner/repo", "touch deployed")],
    );

    let status = sandbox
        .send(json_post(
            &[("X-GitHub-Event", "push"), ("X-Custom-Webhook", "custom")],
            GITHUB_PUSH,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(eventually(|| sandbox.path("deployed").exists()).await);
}

// ============================================================================
// Dispatch failures
// ============================================================================

/// Verify the status of each request the dispatcher cannot act on
#[tokio::test]
async fn test_undeliverable_requests() {
    let sandbox = Sandbox::new("", &[("owner/repo", "touch deployed")]);

    let no_provider = sandbox.send(json_post(&[], GITHUB_PUSH)).await;
    assert_eq!(no_provider, StatusCode::PRECONDITION_FAILED);

    let unknown_repo = sandbox
        .send(json_post(
            &[("X-GitHub-Event", "push")],
            r#"{"repository":{"full_name":"owner/other"}}"#,
        ))
        .await;
    assert_eq!(unknown_repo, StatusCode::NOT_FOUND);

    let no_identifier = sandbox
        .send(json_post(&[("X-GitHub-Event", "ping")], r#"{"zen":"hi"}"#))
        .await;
    assert_eq!(no_identifier, StatusCode::NOT_FOUND);

    let not_json = sandbox
        .send(json_post(&[("X-GitHub-Event", "push")], "{not json"))
        .await;
    assert_eq!(not_json, StatusCode::BAD_REQUEST);

    settle().await;
    assert!(!sandbox.path("deployed").exists());
}

// ============================================================================
// Concurrency
// ============================================================================

/// Verify that concurrent deliveries each start their own deployment
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deliveries_each_deploy() {
    let sandbox = std::sync::Arc::new(Sandbox::new(
        "",
        &[("owner/repo", "touch marker-$$")],
    ));

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let sandbox = sandbox.clone();
            tokio::spawn(async move {
                sandbox
                    .send(json_post(&[("X-GitHub-Event", "push")], GITHUB_PUSH))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    assert!(
        eventually(|| sandbox.files_with_prefix("marker-").len() == 5).await,
        "expected five deployments, found {:?}",
        sandbox.files_with_prefix("marker-")
    );
}
