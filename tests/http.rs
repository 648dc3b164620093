//! CRUD API over a real server on an ephemeral port.

#![cfg(feature = "http")]

mod support;

use std::sync::Arc;

use outbox_relay::http::{self, EmployeeView, ErrorBody};
use outbox_relay::{EmployeeService, EventType, InMemoryStore, OutboxStore};
use serde_json::json;

async fn start_server() -> (String, InMemoryStore) {
    let store = InMemoryStore::new();
    let service = Arc::new(EmployeeService::new(store.clone()));
    let app = http::router(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), store)
}

fn ada() -> serde_json::Value {
    json!({
        "email": "ada@x.com",
        "fullName": "Ada Lovelace",
        "birthday": "1990-01-01",
        "hobbies": ["Reading", "Hiking"]
    })
}

#[tokio::test]
async fn health_check() {
    let (base, _) = start_server().await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn crud_lifecycle() {
    let (base, store) = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/employees"))
        .json(&ada())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: EmployeeView = resp.json().await.unwrap();
    assert_eq!(created.full_name, "Ada Lovelace");
    assert_eq!(created.hobbies, vec!["Reading", "Hiking"]);

    let fetched: EmployeeView = client
        .get(format!("{base}/employees/{}", created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched, created);

    let mut changed = ada();
    changed["fullName"] = json!("Augusta Ada King");
    let resp = client
        .put(format!("{base}/employees/{}", created.id))
        .json(&changed)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: EmployeeView = resp.json().await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.full_name, "Augusta Ada King");

    let list: Vec<EmployeeView> = client
        .get(format!("{base}/employees"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list, vec![updated]);

    let resp = client
        .delete(format!("{base}/employees/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{base}/employees/{}", created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let kinds: Vec<EventType> = store
        .outbox_for_aggregate(created.id)
        .unwrap()
        .iter()
        .map(|r| r.event_type)
        .collect();
    assert_eq!(
        kinds,
        vec![EventType::Created, EventType::Updated, EventType::Deleted]
    );
}

#[tokio::test]
async fn validation_errors_are_joined() {
    let (base, store) = start_server().await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/employees"))
        .json(&json!({ "email": "nope", "birthday": "2999-01-01" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.message,
        "Invalid email format, Full name is required, Birthday must be in the past"
    );
    assert_eq!(body.path, "/employees");
    assert!(store.outbox_records().unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_email_is_bad_request() {
    let (base, store) = start_server().await;
    let client = reqwest::Client::new();
    for expected in [201, 400] {
        let resp = client
            .post(format!("{base}/employees"))
            .json(&ada())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected);
        if expected == 400 {
            let body: ErrorBody = resp.json().await.unwrap();
            assert_eq!(body.message, "Email ada@x.com already exists!");
        }
    }
    assert_eq!(store.outbox_records().unwrap().len(), 1);
}

#[tokio::test]
async fn update_into_taken_email_names_the_other_employee() {
    let (base, store) = start_server().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/employees"))
        .json(&ada())
        .send()
        .await
        .unwrap();
    let mut bob = ada();
    bob["email"] = json!("bob@x.com");
    let bob: EmployeeView = client
        .post(format!("{base}/employees"))
        .json(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let resp = client
        .put(format!("{base}/employees/{}", bob.id))
        .json(&ada())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(
        body.message,
        "Email ada@x.com already exists for a different employee!"
    );
    assert_eq!(store.outbox_for_aggregate(bob.id).unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let (base, _) = start_server().await;
    let client = reqwest::Client::new();

    let missing = uuid::Uuid::new_v4();
    let resp = client
        .delete(format!("{base}/employees/{missing}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.message, format!("Employee with ID {missing} not found."));
    assert_eq!(body.path, format!("/employees/{missing}"));

    let resp = client
        .get(format!("{base}/employees/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn serve_until_stops_on_signal() {
    let store = InMemoryStore::new();
    let service = Arc::new(EmployeeService::new(store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(http::serve_until(service, listener, async move {
        let _ = rx.await;
    }));

    let resp = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    drop(resp);

    tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
