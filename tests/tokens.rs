// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end tests for the service-accounts endpoints: directory, email,
//! aliases, scopes, access tokens, and identity tokens under each credential
//! strategy.

mod common;

use axum::Json;
use axum::routing::post;
use fake_metadata_server::{Builder, CredentialStrategy};
use reqwest::StatusCode;
use scoped_env::ScopedEnv;
use serial_test::serial;

type Result = anyhow::Result<()>;

const SA_BASE: &str = "/computeMetadata/v1/instance/service-accounts";

#[tokio::test]
#[serial]
async fn directory_lists_default_and_the_resolved_email() -> Result {
    let _email = ScopedEnv::set("GOOGLE_ACCOUNT_EMAIL", common::TEST_EMAIL);
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.text().await?,
        format!("default/\n{}/", common::TEST_EMAIL)
    );

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn account_directory_lists_the_endpoints() -> Result {
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "aliases\nemail\nidentity\nscopes\ntoken");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn aliases_and_scopes_have_fixed_values() -> Result {
    let server = Builder::new().start().await?;

    let aliases = common::get(&server, &format!("{SA_BASE}/default/aliases")).await;
    assert_eq!(aliases.text().await?, "default");

    let scopes = common::get(&server, &format!("{SA_BASE}/default/scopes")).await;
    assert_eq!(
        scopes.text().await?,
        "https://www.googleapis.com/auth/cloud-platform"
    );

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn email_prefers_the_override_variable() -> Result {
    let _email = ScopedEnv::set("GOOGLE_ACCOUNT_EMAIL", "override@test.iam");
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/email")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "override@test.iam");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn email_comes_from_the_key_file_for_default() -> Result {
    let key_path = common::write_key_file();
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", key_path.to_str().unwrap());
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/email")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, common::TEST_EMAIL);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn named_account_email_echoes_the_account() -> Result {
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/other@proj.iam/email")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "other@proj.iam");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn default_email_without_any_configuration_is_not_found() -> Result {
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::remove("GOOGLE_APPLICATION_CREDENTIALS");
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/email")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn token_without_credentials_names_both_missing_variables() -> Result {
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::remove("GOOGLE_APPLICATION_CREDENTIALS");
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/token")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await?;
    assert!(body.contains("GOOGLE_ACCOUNT_EMAIL"), "{body}");
    assert!(body.contains("GOOGLE_APPLICATION_CREDENTIALS"), "{body}");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn token_is_issued_from_the_key_file() -> Result {
    let key_path = common::write_key_file();
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", key_path.to_str().unwrap());
    let server = Builder::new().start().await?;

    let response = common::get(&server, &format!("{SA_BASE}/default/token?scopes=a,b")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );
    let body: serde_json::Value = response.json().await?;
    let access_token = body
        .get("access_token")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    assert_eq!(access_token.split('.').count(), 3, "{access_token}");
    assert_eq!(body.get("token_type").and_then(|v| v.as_str()), Some("Bearer"));
    let expires_in = body.get("expires_in").and_then(|v| v.as_i64()).unwrap_or(0);
    assert!((3590..=3600).contains(&expires_in), "{expires_in}");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn identity_requires_an_audience() -> Result {
    let server = Builder::new().start().await?;

    for path in [
        format!("{SA_BASE}/default/identity"),
        format!("{SA_BASE}/default/identity?audience="),
    ] {
        let response = common::get(&server, &path).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let body = response.text().await?;
        assert!(body.contains("audience parameter required"), "{body}");
    }

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn identity_impersonates_the_configured_principal() -> Result {
    let key_path = common::write_key_file();
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", key_path.to_str().unwrap());

    let app = axum::Router::new().route(
        "/v1/projects/-/serviceAccounts/target@proj.iam.gserviceaccount.com:generateIdToken",
        post(|Json(body): Json<serde_json::Value>| async move {
            assert_eq!(
                body.get("audience").and_then(|v| v.as_str()),
                Some("https://audience.example.com")
            );
            Json(serde_json::json!({"token": "impersonated-id-token"}))
        }),
    );
    let (endpoint, _fixture) = common::start_fixture(app).await;

    let server = Builder::new().with_iam_endpoint(endpoint).start().await?;
    server.set_credential_strategy(CredentialStrategy::Impersonate(
        "target@proj.iam.gserviceaccount.com".to_string(),
    ));

    let response = common::get(
        &server,
        &format!("{SA_BASE}/default/identity?audience=https://audience.example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "impersonated-id-token");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn identity_reports_federation_failures_with_their_cause() -> Result {
    let key_path = common::write_key_file();
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", key_path.to_str().unwrap());

    let app = axum::Router::new().route(
        "/v1/projects/-/serviceAccounts/fed@proj.iam.gserviceaccount.com:generateIdToken",
        post(|| async { (StatusCode::FORBIDDEN, "permission denied") }),
    );
    let (endpoint, _fixture) = common::start_fixture(app).await;

    let server = Builder::new()
        .with_iam_endpoint(endpoint)
        .with_credential_strategy(CredentialStrategy::Federate(
            "fed@proj.iam.gserviceaccount.com".to_string(),
        ))
        .start()
        .await?;

    let response = common::get(
        &server,
        &format!("{SA_BASE}/default/identity?audience=https://audience.example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text().await?;
    assert!(body.contains("permission denied"), "{body}");

    server.shutdown().await?;
    Ok(())
}

#[tokio::test]
#[serial]
async fn identity_exchanges_an_assertion_by_default() -> Result {
    let key_path = common::write_key_file();
    let _e1 = ScopedEnv::remove("GOOGLE_ACCOUNT_EMAIL");
    let _e2 = ScopedEnv::set("GOOGLE_APPLICATION_CREDENTIALS", key_path.to_str().unwrap());

    let app = axum::Router::new().route(
        "/token",
        post(|body: String| async move {
            assert!(
                body.contains("urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"),
                "{body}"
            );
            Json(serde_json::json!({"id_token": "ambient-id-token"}))
        }),
    );
    let (endpoint, _fixture) = common::start_fixture(app).await;

    let server = Builder::new()
        .with_token_endpoint(format!("{endpoint}/token"))
        .start()
        .await?;

    let response = common::get(
        &server,
        &format!("{SA_BASE}/default/identity?audience=https://audience.example.com"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, "ambient-id-token");

    server.shutdown().await?;
    Ok(())
}
