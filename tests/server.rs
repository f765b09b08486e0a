//! End-to-end tests against a config-built server on a real socket.

use request_validator::config::loader::parse_config;
use request_validator::config::validation::ConfigIssue;
use request_validator::http::{ServerError, ValidationServer};
use request_validator::AppConfig;
use serde_json::{json, Value};

mod common;

use common::start_server;

const CONFIG: &str = r#"
[options]
strip_unknown = true
context = { defaultRole = "member" }

[[routes]]
path = "/users/{username}"
method = "POST"

[routes.sections.params]
fields = [{ name = "username", type = "string", required = true, min = 1, max = 4 }]

[routes.sections.body]
fields = [
    { name = "age", type = "number", required = true },
    { name = "role", type = "string", default = { context = "defaultRole" } },
]

[[routes]]
path = "/search"
method = "GET"

[routes.sections.query]
fields = [
    { name = "q", type = "string", required = true },
    { name = "limit", type = "number", default = { value = 10 } },
]
"#;

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_validated_post_is_echoed() {
    let (addr, shutdown) = start_server(parse_config(CONFIG).unwrap()).await;

    let response = client()
        .post(format!("http://{addr}/users/Pete"))
        .json(&json!({"age": "18", "extra": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["params"], json!({"username": "Pete"}));
    assert_eq!(body["body"], json!({"age": 18, "role": "member"}));
    assert!(body.get("query").is_none());

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_rejections_name_failing_section() {
    let (addr, shutdown) = start_server(parse_config(CONFIG).unwrap()).await;
    let client = client();

    let response = client
        .post(format!("http://{addr}/users/Peter"))
        .json(&json!({"age": 18}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("ValidationError"));
    assert_eq!(body["section"], json!("params"));
    assert_eq!(
        body["message"],
        json!("\"username\" length must be less than or equal to 4 characters long")
    );

    let response = client
        .post(format!("http://{addr}/users/Pete"))
        .json(&json!({"age": "old"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["section"], json!("body"));
    assert_eq!(body["message"], json!("\"age\" must be a number"));

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_query_defaults_and_missing_keys() {
    let (addr, shutdown) = start_server(parse_config(CONFIG).unwrap()).await;
    let client = client();

    let response = client
        .get(format!("http://{addr}/search?q=rust&debug=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query"], json!({"q": "rust", "limit": 10}));

    let response = client.get(format!("http://{addr}/search")).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], json!("\"q\" is required"));

    let response = client.get(format!("http://{addr}/missing")).send().await.unwrap();
    assert_eq!(response.status(), 404);

    let _ = shutdown.send(());
}

#[test]
fn test_invalid_config_is_refused() {
    let config: AppConfig = toml::from_str(
        r#"
        [[routes]]
        path = "/a"
        method = "FETCH"
        "#,
    )
    .unwrap();
    assert!(parse_config("[[routes]]\npath = \"/a\"\nmethod = \"FETCH\"").is_err());

    match ValidationServer::new(config) {
        Err(ServerError::InvalidConfig(issues)) => {
            assert!(issues.iter().any(|i| matches!(i, ConfigIssue::Method { .. })));
        }
        Ok(_) => panic!("server accepted an unknown method"),
    }
}
