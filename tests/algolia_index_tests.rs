//! Algolia publisher against a mock REST API

use std::time::Duration;

use catalog_mirror::config::{IndexConfig, PublishMode};
use catalog_mirror::index::{AlgoliaIndex, TaskWait};
use catalog_mirror::models::{Brand, ProductRecord, TARGET_CURRENCY};
use catalog_mirror::traits::SearchIndex;
use reqwest::Client;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn index_for(server: &MockServer, mode: PublishMode) -> AlgoliaIndex {
    let config = IndexConfig {
        app_id: "APPID".to_string(),
        api_key: "secret".to_string(),
        index_name: "products".to_string(),
        host: server.uri(),
        publish_mode: mode,
    };
    AlgoliaIndex::new(Client::new(), &config).with_task_wait(TaskWait {
        interval: Duration::from_millis(5),
        max_polls: 3,
    })
}

fn product(object_id: &str) -> ProductRecord {
    ProductRecord {
        id: Some(object_id.to_string()),
        title: Some("Cabin".to_string()),
        price: Some(4530.0),
        category: vec!["Luggage".to_string()],
        currency: TARGET_CURRENCY.to_string(),
        brand: Brand::from_name("Rimowa"),
        gender: vec!["unisex".to_string()],
        slug: format!("rimowa-{object_id}"),
        images: vec![],
        variants: vec![],
        object_id: object_id.to_string(),
    }
}

async fn mount_task_published(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/1/indexes/[^/]+/task/\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "published"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn clears_then_writes_all_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .and(header("X-Algolia-Application-Id", "APPID"))
        .and(header("X-Algolia-API-Key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 11})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 12, "objectIDs": []})))
        .expect(1)
        .mount(&server)
        .await;
    mount_task_published(&server).await;

    let products = vec![product("a"), product("b"), product("c")];
    index_for(&server, PublishMode::Replace)
        .replace_all(&products)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let posts: Vec<_> = requests
        .iter()
        .filter(|r| r.method.to_string() == "POST")
        .collect();
    assert!(posts[0].url.path().ends_with("/clear"));
    assert!(posts[1].url.path().ends_with("/batch"));

    let batch: Value = serde_json::from_slice(&posts[1].body).unwrap();
    let ops = batch["requests"].as_array().unwrap();
    assert_eq!(ops.len(), 3);
    assert_eq!(ops[0]["action"], "updateObject");
    assert_eq!(ops[2]["body"]["objectID"], "c");
}

#[tokio::test]
async fn empty_catalog_still_clears_the_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 2})))
        .expect(0)
        .mount(&server)
        .await;
    mount_task_published(&server).await;

    index_for(&server, PublishMode::Replace)
        .replace_all(&[])
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_clear_is_an_error_and_nothing_is_written() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Invalid API key"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 2})))
        .expect(0)
        .mount(&server)
        .await;

    let err = index_for(&server, PublishMode::Replace)
        .replace_all(&[product("a")])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn task_that_never_publishes_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 5})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/task/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "notPublished"})))
        .expect(3)
        .mount(&server)
        .await;

    let err = index_for(&server, PublishMode::Replace)
        .replace_all(&[])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not published"));
}

#[tokio::test]
async fn staging_mode_fills_staging_then_moves_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products_staging/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 1})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products_staging/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 2})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products_staging/operation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 3})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1/indexes/products/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"taskID": 4})))
        .expect(0)
        .mount(&server)
        .await;
    for task in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/1/indexes/products_staging/task/{task}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "published"})))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/1/indexes/products/task/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "published"})))
        .expect(0)
        .mount(&server)
        .await;

    index_for(&server, PublishMode::Staging)
        .replace_all(&[product("a")])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let operation = requests
        .iter()
        .find(|r| r.url.path().ends_with("/operation"))
        .unwrap();
    let body: Value = serde_json::from_slice(&operation.body).unwrap();
    assert_eq!(body, json!({"operation": "move", "destination": "products"}));
}
