mod common;

use anyhow::Result;
use common::{Session, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn seeded() -> Result<(TestServer, Session)> {
    let server = TestServer::start().await?;
    let admin = server.admin().await?;

    let rows = [
        json!({"name": "milk", "done": false, "shelf": 1}),
        json!({"name": "eggs", "done": true, "shelf": 1}),
        json!({"name": "bread", "done": false, "shelf": 2}),
        json!({"name": "jam", "done": false, "shelf": 1}),
        json!({"name": "tea", "done": true, "shelf": 3}),
    ];
    for row in rows {
        let res = server.post(&admin, "/app/groceries").json(&row).send().await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }
    Ok((server, admin))
}

fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(|row| row["name"].as_str())
        .collect()
}

#[tokio::test]
async fn filters_match_exactly() -> Result<()> {
    let (server, admin) = seeded().await?;

    let list: Value = server.get(&admin, "/app/groceries?name=eggs").send().await?.json().await?;
    assert_eq!(names(&list), vec!["eggs"]);

    // Query values are strings; scalars compare by their text
    let list: Value = server.get(&admin, "/app/groceries?done=true").send().await?.json().await?;
    assert_eq!(names(&list), vec!["eggs", "tea"]);

    let list: Value = server.get(&admin, "/app/groceries?name=nothing").send().await?.json().await?;
    assert_eq!(list, json!([]));
    Ok(())
}

#[tokio::test]
async fn filters_are_combined_with_and() -> Result<()> {
    let (server, admin) = seeded().await?;

    let list: Value = server
        .get(&admin, "/app/groceries?done=false&shelf=1")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(names(&list), vec!["milk", "jam"]);
    Ok(())
}

#[tokio::test]
async fn pagination_wraps_the_result() -> Result<()> {
    let (server, admin) = seeded().await?;

    let res = server.get(&admin, "/app/groceries?page=2&limit=2").send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["total"], 5);
    assert_eq!(names(&body["data"]), vec!["bread", "jam"]);

    let body: Value = server.get(&admin, "/app/groceries?page=9&limit=2").send().await?.json().await?;
    assert_eq!(body["total"], 5);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn pagination_applies_after_filtering() -> Result<()> {
    let (server, admin) = seeded().await?;

    let body: Value = server
        .get(&admin, "/app/groceries?done=false&limit=2")
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["page"], 1);
    assert_eq!(body["total"], 3);
    assert_eq!(names(&body["data"]), vec!["milk", "bread"]);
    Ok(())
}

#[tokio::test]
async fn invalid_pagination_is_rejected() -> Result<()> {
    let (server, admin) = seeded().await?;

    for query in ["page=0", "page=abc", "limit=0", "limit=-3"] {
        let res = server.get(&admin, &format!("/app/groceries?{}", query)).send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {}", query);
    }

    // Oversized limits are clamped rather than refused
    let body: Value = server.get(&admin, "/app/groceries?limit=100000").send().await?.json().await?;
    assert_eq!(body["limit"], 1000);
    assert_eq!(body["total"], 5);
    Ok(())
}
