mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;
use devcamper_api::database::models::Role;
use devcamper_api::database::UserCredentials;

/// Register an account and promote it the way the operator CLI does
async fn admin_token(server: &TestServer, client: &reqwest::Client) -> Result<String> {
    let (email, token) = server.register(client, "user").await?;
    UserCredentials::set_role(server.db.pool(), &email, Role::Admin).await?;
    Ok(token)
}

#[tokio::test]
async fn user_admin_requires_token() -> Result<()> {
    let server = TestServer::without_database().await?;
    let res = reqwest::get(server.url("/api/v1/auth/users")).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn non_admins_are_forbidden() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let (_, token) = server.register(&client, "publisher").await?;

    let res = client.get(server.url("/api/v1/auth/users")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "status": false, "message": "User role publisher is not authorized to access this route" })
    );
    Ok(())
}

#[tokio::test]
async fn admin_manages_users() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let token = admin_token(&server, &client).await?;

    let email = format!("{}@devcamper.test", uuid::Uuid::new_v4());
    let res = client
        .post(server.url("/api/v1/auth/users"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Staff", "email": email, "password": "123456", "role": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"].get("password").is_none());
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = client
        .get(server.url(&format!("/api/v1/auth/users?email={}&select=email,role", email)))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0], json!({ "id": id, "email": email, "role": "admin" }));

    let res = client
        .get(server.url("/api/v1/auth/users?password=123456"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(server.url(&format!("/api/v1/auth/users/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "name": "Renamed", "password": "abcdef" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["name"], "Renamed");

    let res = client
        .post(server.url("/api/v1/auth/login"))
        .json(&json!({ "email": email, "password": "abcdef" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.delete(server.url(&format!("/api/v1/auth/users/{}", id))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({ "status": true, "data": {} }));

    let res = client.get(server.url(&format!("/api/v1/auth/users/{}", id))).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["message"], format!("User {} not found", id));
    Ok(())
}

#[tokio::test]
async fn deleted_users_lose_access() -> Result<()> {
    let Some(server) = TestServer::with_database().await? else { return Ok(()) };
    let client = reqwest::Client::new();
    let admin = admin_token(&server, &client).await?;
    let (_, token) = server.register(&client, "user").await?;

    let res = client.get(server.url("/api/v1/auth/me")).bearer_auth(&token).send().await?;
    let id = res.json::<Value>().await?["data"]["id"].as_str().unwrap_or_default().to_string();

    let res = client.delete(server.url(&format!("/api/v1/auth/users/{}", id))).bearer_auth(&admin).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url("/api/v1/auth/me")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
