mod common;

use anyhow::Result;
use common::TestServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn record_lifecycle() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server.post(&admin, "/app/todos").json(&json!({"title": "milk", "done": false})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await?;
    let id = created["id"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty(), "server should assign an id: {}", created);
    assert_eq!(created["title"], "milk");

    let res = server.get(&admin, "/app/todos").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let list: Value = res.json().await?;
    assert_eq!(list, json!([created]));

    let path = format!("/app/todos/{}", id);
    let res = server.get(&admin, &path).send().await?;
    assert_eq!(res.json::<Value>().await?, created);

    let res = server.delete(&admin, &path).send().await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(res.bytes().await?.is_empty());

    let res = server.get(&admin, &path).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["code"], "not_found");

    let res = server.delete(&admin, &path).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn put_replaces_and_patch_merges() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let created: Value = server
        .post(&admin, "/app/todos")
        .json(&json!({"title": "milk", "done": false, "tags": ["shop"]}))
        .send()
        .await?
        .json()
        .await?;
    let id = created["id"].as_str().unwrap_or_default().to_string();
    let path = format!("/app/todos/{}", id);

    // PUT drops fields not supplied and keeps the stored id
    let res = server.put(&admin, &path).json(&json!({"id": "hijack", "title": "eggs"})).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({"id": id, "title": "eggs"}));

    let res = server.patch(&admin, &path).json(&json!({"done": true})).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({"id": id, "title": "eggs", "done": true}));

    let res = server.patch(&admin, "/app/todos/missing").json(&json!({"done": true})).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn missing_tables_are_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server.get(&admin, "/nothing/here").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server.delete(&admin, "/nothing/here").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server
        .post(&admin, "/app/todos")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["code"], "invalid_json");

    let res = server.post(&admin, "/app/todos").json(&json!([1, 2, 3])).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn server_assigns_ids_on_plain_tables() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server.post(&admin, "/app/todos").json(&json!({"id": "mine", "title": "milk"})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn schema_rejects_wrong_types() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server
        .post(&admin, "/app/people")
        .json(&json!({"_init": true, "_schema": {"age": "Number", "name": "String"}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let view: Value = res.json().await?;
    assert_eq!(view["schema"]["age"], "Number");
    assert_eq!(view["count"], 0);

    let res = server.post(&admin, "/app/people").json(&json!({"name": "Ada", "age": "old"})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "validation_error");
    assert!(body["message"].as_str().unwrap_or_default().contains("age"), "{}", body);

    let res = server.post(&admin, "/app/people").json(&json!({"name": "Ada", "age": 36})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let ada: Value = res.json().await?;

    let path = format!("/app/people/{}", ada["id"].as_str().unwrap_or_default());
    let res = server.patch(&admin, &path).json(&json!({"age": true})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_schema_types_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server
        .post(&admin, "/app/people")
        .json(&json!({"_init": true, "_schema": {"age": "Integer"}}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn designated_primary_keys_are_client_supplied() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server
        .post(&admin, "/shop/items")
        .json(&json!({"_init": true, "_primaryKey": "sku"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.post(&admin, "/shop/items").json(&json!({"sku": "A1", "price": 3})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.get(&admin, "/shop/items/A1").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["price"], 3);

    let res = server.post(&admin, "/shop/items").json(&json!({"sku": "A1", "price": 4})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn primary_keys_must_stay_addressable() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;
    server
        .post(&admin, "/shop/items")
        .json(&json!({"_init": true, "_primaryKey": "sku"}))
        .send()
        .await?;

    let res = server.post(&admin, "/shop/items").json(&json!({"sku": 1, "n": "first"})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Same path segment as the numeric key
    let res = server.post(&admin, "/shop/items").json(&json!({"sku": "1", "n": "second"})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["code"], "bad_request");

    // Would be shadowed by the table-management routes
    let res = server.post(&admin, "/shop/items").json(&json!({"sku": "schema"})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let list: Value = server.get(&admin, "/shop/items").send().await?.json().await?;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["n"], "first");
    Ok(())
}

#[tokio::test]
async fn numeric_key_overflow_is_a_client_error() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;
    server
        .post(&admin, "/app/rows")
        .json(&json!({"_init": true, "_schema": {"id": "Number"}, "_primaryKey": "id"}))
        .send()
        .await?;

    let res = server.post(&admin, "/app/rows").json(&json!({"id": i64::MAX})).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server.post(&admin, "/app/rows").json(&json!({})).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn record_quota_is_enforced() -> Result<()> {
    let server = TestServer::start_with(|config| config.api.max_records_per_table = 2).await?;
    let admin = server.admin().await?;

    for n in 0..2 {
        let res = server.post(&admin, "/app/todos").json(&json!({"n": n})).send().await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
    let res = server.post(&admin, "/app/todos").json(&json!({"n": 2})).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.json::<Value>().await?["code"], "quota_exceeded");
    Ok(())
}

#[tokio::test]
async fn html_clients_get_an_error_page() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let res = server.get(&admin, "/nothing/here").header("accept", "text/html").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let content_type = res
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"), "{}", content_type);
    assert!(res.text().await?.contains("404"));
    Ok(())
}
