//! Common test utilities for git-webhooks integration tests
//!
//! This module provides:
//! - A deployment sandbox: a temporary working directory plus a service
//!   configuration file pointing at it
//! - Request builders for each provider's delivery format
//! - Helpers for waiting on the background deployment commands

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use git_webhooks_api::{create_router, AppState, ServiceConfig};
use git_webhooks_core::ShellLauncher;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tower::ServiceExt;

/// Payload naming `owner/repo` the way GitHub and Gitee do.
#[allow(dead_code)]
pub const GITHUB_PUSH: &str = r#"{"ref":"refs/heads/main","repository":{"full_name":"owner/repo"}}"#;

/// Payload naming `group/project` the way GitLab does.
#[allow(dead_code)]
pub const GITLAB_PUSH: &str = r#"{"object_kind":"push","project":{"path_with_namespace":"group/project"}}"#;

// ============================================================================
// Sandbox
// ============================================================================

/// A temporary deployment target and the router configured for it.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    pub router: Router,
}

impl Sandbox {
    /// Build a sandbox from the provider sections of a configuration file.
    ///
    /// `repositories` are `(name, cmd)` pairs; every command runs in the
    /// sandbox directory.
    pub fn new(providers_toml: &str, repositories: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_config(dir.path(), providers_toml, repositories);
        let config = ServiceConfig::load(Some(&config_path), true).unwrap();
        let state = AppState::from_config(&config, Arc::new(ShellLauncher::new())).unwrap();
        let router = create_router(state, config.server.max_body_size);
        Self { dir, router }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Send one request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> StatusCode {
        self.router.clone().oneshot(request).await.unwrap().status()
    }

    /// Files in the sandbox whose names start with `prefix`.
    #[allow(dead_code)]
    pub fn files_with_prefix(&self, prefix: &str) -> Vec<String> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(prefix))
            .collect()
    }
}

fn write_config(dir: &Path, providers_toml: &str, repositories: &[(&str, &str)]) -> PathBuf {
    let mut contents = String::from(providers_toml);
    for (name, cmd) in repositories {
        contents.push_str(&format!(
            "\n[[repositories]]\nname = {:?}\ncwd = {:?}\ncmd = {:?}\n",
            name,
            dir.to_string_lossy(),
            cmd
        ));
    }

    let path = dir.join("gitwebhooks.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

// ============================================================================
// Waiting on deployments
// ============================================================================

/// Poll until `condition` holds or five seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

/// Give a launched command time to run, for asserting that nothing ran.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

// ============================================================================
// Request builders
// ============================================================================

/// POST `body` to `/` with the given content type and extra headers.
pub fn post(content_type: &str, headers: &[(&str, &str)], body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", content_type)
        .header("content-length", body.len());
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn json_post(headers: &[(&str, &str)], body: &str) -> Request<Body> {
    post("application/json", headers, body)
}

/// `X-Hub-Signature` value for `body` signed with `secret`.
#[allow(dead_code)]
pub fn github_signature(secret: &str, body: &str) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}
