use serde_json::{json, Value};

use super::{api_path, TestApp, DEFAULT_PASSWORD};

/// Log in and return the full response body.
pub async fn login_raw(app: &TestApp, account: &str, password: &str) -> (u16, Value) {
    let encrypted = app.transport.encrypt(password).expect("encrypt password");
    let response = app
        .client()
        .post(&api_path("/auth/login"))
        .json(&json!({ "account": account, "password": encrypted }))
        .await;
    (response.status_code().as_u16(), response.json())
}

pub async fn login(app: &TestApp, account: &str) -> Value {
    let (status, body) = login_raw(app, account, DEFAULT_PASSWORD).await;
    assert_eq!(status, 200, "login failed: {}", body);
    body["data"].clone()
}

pub async fn admin_token(app: &TestApp) -> String {
    token_of(&login(app, "admin").await)
}

pub fn token_of(data: &Value) -> String {
    data["token"].as_str().expect("token").to_string()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Create an account through the API and return its id.
pub async fn create_account(app: &TestApp, token: &str, account: &str, phone: Option<&str>) -> String {
    let response = app
        .client()
        .post(&api_path("/accounts"))
        .add_header("Authorization", bearer(token))
        .json(&json!({ "account": account, "phone": phone, "nick_name": account }))
        .await;
    assert_eq!(response.status_code(), 200, "create account failed: {}", response.text());
    let body: Value = response.json();
    body["data"]["id"].as_str().expect("account id").to_string()
}

/// Create an organization owned by `owner_account` and return its id.
pub async fn create_org(app: &TestApp, token: &str, name: &str, owner_account: &str) -> String {
    let response = app
        .client()
        .post(&api_path("/orgs"))
        .add_header("Authorization", bearer(token))
        .json(&json!({ "name": name, "owner_account": owner_account }))
        .await;
    assert_eq!(response.status_code(), 200, "create org failed: {}", response.text());
    let body: Value = response.json();
    body["data"]["id"].as_str().expect("org id").to_string()
}
