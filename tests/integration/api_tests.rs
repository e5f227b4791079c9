//! API integration tests
//!
//! These run against a live server with a migrated database:
//! `cargo test -- --ignored`

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:5000/api";

/// Badge UID that is unique per test run
fn unique_uid(prefix: &str) -> String {
    format!("{}{:X}", prefix, Utc::now().timestamp_micros())
}

async fn send(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.expect("Failed to send request");
    let status = response.status();
    let body: Value = response.json().await.expect("Failed to parse response");
    (status, body)
}

async fn register(client: &Client, uid: &str, roll_number: &str) -> Value {
    let (status, body) = send(
        client.post(format!("{}/students", BASE_URL)).json(&json!({
            "rfid_uid": uid,
            "name": "Test Student",
            "roll_number": roll_number,
            "department": "CSE"
        })),
    )
    .await;
    assert!(status.is_success(), "register failed: {}", body);
    body["student"].clone()
}

async fn scan(client: &Client, uid: &str, zone: &str) -> Value {
    let (status, body) = send(
        client
            .post(format!("{}/scan", BASE_URL))
            .json(&json!({ "rfid_uid": uid, "zone": zone, "device_id": "TEST_GATE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "scan failed: {}", body);
    body
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let (status, body) = send(client.get(format!("{}/health", BASE_URL))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_unknown_badge_is_auto_registered() {
    let client = Client::new();
    let uid = unique_uid("AB");

    let body = scan(&client, &uid, "Library").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "ENTRY");
    assert_eq!(body["new_registration"], true);
    assert_eq!(body["zone"], "Library");

    let id = body["student"]["id"].as_i64().unwrap();
    let (_, student) = send(client.get(format!("{}/students/{}", BASE_URL, id))).await;
    assert_eq!(student["student"]["is_placeholder"], true);
    assert_eq!(student["student"]["is_inside"], true);
    assert_eq!(student["student"]["roll_number"], format!("TEMP-{}", uid));
}

#[tokio::test]
#[ignore]
async fn test_scans_alternate_entry_and_exit() {
    let client = Client::new();
    let uid = unique_uid("CD");
    register(&client, &uid, &unique_uid("ROLL-")).await;

    let first = scan(&client, &uid, "Library").await;
    let second = scan(&client, &uid, "Library").await;
    let third = scan(&client, &uid, "Library").await;

    assert_eq!(first["action"], "ENTRY");
    assert_eq!(second["action"], "EXIT");
    assert_eq!(third["action"], "ENTRY");
    assert_eq!(first["new_registration"], false);

    let (status, latest) = send(client.get(format!("{}/scan/latest?zone=Library", BASE_URL))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["success"], true);
}

#[tokio::test]
#[ignore]
async fn test_registration_merges_placeholder() {
    let client = Client::new();
    let uid = unique_uid("EF");
    let roll_number = unique_uid("ROLL-");

    let entry = scan(&client, &uid, "Library").await;
    let placeholder_id = entry["student"]["id"].as_i64().unwrap();

    let (status, body) = send(
        client.post(format!("{}/students", BASE_URL)).json(&json!({
            "rfid_uid": uid,
            "name": "Merged Student",
            "roll_number": roll_number
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["merged"], true);
    assert_eq!(body["student"]["id"].as_i64().unwrap(), placeholder_id);
    assert_eq!(body["student"]["is_placeholder"], false);
    assert_eq!(body["student"]["name"], "Merged Student");
    assert_eq!(body["student"]["is_inside"], true);

    // A second registration of the same badge is now a conflict
    let (status, body) = send(
        client.post(format!("{}/students", BASE_URL)).json(&json!({
            "rfid_uid": uid,
            "name": "Someone Else",
            "roll_number": unique_uid("ROLL-")
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore]
async fn test_last_copy_cannot_be_borrowed_twice() {
    let client = Client::new();
    let first = register(&client, &unique_uid("GA"), &unique_uid("ROLL-")).await;
    let second = register(&client, &unique_uid("GB"), &unique_uid("ROLL-")).await;

    let (status, book) = send(
        client
            .post(format!("{}/library/books", BASE_URL))
            .json(&json!({ "title": "Operating Systems", "total_copies": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let book_id = book["book"]["id"].as_i64().unwrap();
    assert_eq!(book["book"]["available_copies"], 1);

    let (status, borrow) = send(
        client
            .post(format!("{}/borrow", BASE_URL))
            .json(&json!({ "item_id": book_id, "student_id": first["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(borrow["borrow"]["status"], "ACTIVE");

    let (_, book) = send(client.get(format!("{}/library/books/{}", BASE_URL, book_id))).await;
    assert_eq!(book["book"]["available_copies"], 0);

    let (status, body) = send(
        client
            .post(format!("{}/borrow", BASE_URL))
            .json(&json!({ "item_id": book_id, "student_id": second["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "No copies available");
}

#[tokio::test]
#[ignore]
async fn test_extension_limit_and_return() {
    let client = Client::new();
    let uid = unique_uid("HA");
    register(&client, &uid, &unique_uid("ROLL-")).await;

    let (_, book) = send(
        client
            .post(format!("{}/library/books", BASE_URL))
            .json(&json!({ "title": "Compilers", "total_copies": 2 })),
    )
    .await;
    let book_id = book["book"]["id"].as_i64().unwrap();

    let (_, borrow) = send(
        client
            .post(format!("{}/library/borrow", BASE_URL))
            .json(&json!({ "item_id": book_id, "rfid_uid": uid })),
    )
    .await;
    let loan_id = borrow["borrow"]["id"].as_i64().unwrap();

    let (status, body) = send(
        client.put(format!("{}/library/borrows/{}/extend", BASE_URL, loan_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["borrow"]["extensions_used"], 1);

    // The extended due date has not passed, so a second extension is refused
    let (status, body) = send(
        client.put(format!("{}/library/borrows/{}/extend", BASE_URL, loan_id)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, body) = send(client.put(format!("{}/borrow/{}/return", BASE_URL, loan_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["borrow"]["status"], "RETURNED");
    assert_eq!(body["borrow"]["fine_amount"].as_f64(), Some(0.0));

    let (status, _) = send(client.put(format!("{}/borrow/{}/return", BASE_URL, loan_id))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, book) = send(client.get(format!("{}/library/books/{}", BASE_URL, book_id))).await;
    assert_eq!(book["book"]["available_copies"], 2);
}

#[tokio::test]
#[ignore]
async fn test_damaged_apparatus_fine() {
    let client = Client::new();
    let student = register(&client, &unique_uid("JA"), &unique_uid("ROLL-")).await;

    let (status, apparatus) = send(
        client.post(format!("{}/labs/apparatus", BASE_URL)).json(&json!({
            "name": "Oscilloscope",
            "category": "Electronics",
            "total_quantity": 3,
            "damage_fine": 50
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let apparatus_id = apparatus["apparatus"]["id"].as_i64().unwrap();

    let (status, borrow) = send(
        client
            .post(format!("{}/labs/borrow", BASE_URL))
            .json(&json!({ "item_id": apparatus_id, "student_id": student["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let loan_id = borrow["borrow"]["id"].as_i64().unwrap();

    let (status, body) = send(
        client
            .put(format!("{}/labs/borrows/{}/return", BASE_URL, loan_id))
            .json(&json!({ "is_damaged": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["borrow"]["is_damaged"], true);
    assert_eq!(body["borrow"]["damage_fine"].as_f64(), Some(50.0));
    assert_eq!(body["borrow"]["fine_paid"], false);

    let (status, body) = send(
        client.post(format!("{}/labs/fines/{}/pay", BASE_URL, loan_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["borrow"]["fine_paid"], true);

    let (status, _) = send(client.post(format!("{}/labs/fines/{}/pay", BASE_URL, loan_id))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_return_at_a_later_date_charges_the_fine() {
    let client = Client::new();
    let student = register(&client, &unique_uid("KA"), &unique_uid("ROLL-")).await;

    let (_, book) = send(
        client
            .post(format!("{}/library/books", BASE_URL))
            .json(&json!({ "title": "Networks", "total_copies": 1 })),
    )
    .await;
    let book_id = book["book"]["id"].as_i64().unwrap();

    let (_, borrow) = send(
        client
            .post(format!("{}/borrow", BASE_URL))
            .json(&json!({ "item_id": book_id, "student_id": student["id"] })),
    )
    .await;
    let loan_id = borrow["borrow"]["id"].as_i64().unwrap();

    // Due at the end of day 14, so two days late
    let as_of = (Utc::now() + Duration::days(16)).to_rfc3339();
    let (status, body) = send(
        client
            .put(format!("{}/borrow/{}/return", BASE_URL, loan_id))
            .json(&json!({ "as_of": as_of })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "return failed: {}", body);
    assert_eq!(body["borrow"]["status"], "RETURNED");
    assert_eq!(body["borrow"]["fine_amount"].as_f64(), Some(2.0));
}

#[tokio::test]
#[ignore]
async fn test_return_on_the_borrow_day_by_date() {
    let client = Client::new();
    let student = register(&client, &unique_uid("KB"), &unique_uid("ROLL-")).await;

    let (_, apparatus) = send(
        client
            .post(format!("{}/labs/apparatus", BASE_URL))
            .json(&json!({ "name": "Multimeter", "category": "Electronics", "total_quantity": 1 })),
    )
    .await;
    let apparatus_id = apparatus["apparatus"]["id"].as_i64().unwrap();

    let (_, borrow) = send(
        client
            .post(format!("{}/labs/borrow", BASE_URL))
            .json(&json!({ "item_id": apparatus_id, "student_id": student["id"] })),
    )
    .await;
    let loan_id = borrow["borrow"]["id"].as_i64().unwrap();

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let (status, body) = send(
        client
            .put(format!("{}/labs/borrows/{}/return", BASE_URL, loan_id))
            .json(&json!({ "as_of": today })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "return failed: {}", body);
    assert_eq!(body["borrow"]["status"], "RETURNED");
}

#[tokio::test]
#[ignore]
async fn test_deleting_a_borrower_restores_stock() {
    let client = Client::new();
    let student = register(&client, &unique_uid("LA"), &unique_uid("ROLL-")).await;

    let (_, book) = send(
        client
            .post(format!("{}/library/books", BASE_URL))
            .json(&json!({ "title": "Databases", "total_copies": 2 })),
    )
    .await;
    let book_id = book["book"]["id"].as_i64().unwrap();

    let (status, _) = send(
        client
            .post(format!("{}/borrow", BASE_URL))
            .json(&json!({ "item_id": book_id, "student_id": student["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, book) = send(client.get(format!("{}/library/books/{}", BASE_URL, book_id))).await;
    assert_eq!(book["book"]["available_copies"], 1);

    let (status, _) = send(client.delete(format!("{}/students/{}", BASE_URL, student["id"]))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, book) = send(client.get(format!("{}/library/books/{}", BASE_URL, book_id))).await;
    assert_eq!(book["book"]["available_copies"], 2);
    assert_eq!(book["book"]["total_copies"], 2);
}

#[tokio::test]
#[ignore]
async fn test_total_cannot_drop_below_copies_on_loan() {
    let client = Client::new();
    let first = register(&client, &unique_uid("MA"), &unique_uid("ROLL-")).await;
    let second = register(&client, &unique_uid("MB"), &unique_uid("ROLL-")).await;

    let (_, book) = send(
        client
            .post(format!("{}/library/books", BASE_URL))
            .json(&json!({ "title": "Algorithms", "total_copies": 3 })),
    )
    .await;
    let book_id = book["book"]["id"].as_i64().unwrap();

    for student in [&first, &second] {
        let (status, _) = send(
            client
                .post(format!("{}/borrow", BASE_URL))
                .json(&json!({ "item_id": book_id, "student_id": student["id"] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        client
            .put(format!("{}/library/books/{}", BASE_URL, book_id))
            .json(&json!({ "total_copies": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    // Shrinking to exactly the copies on loan empties the shelf
    let (status, body) = send(
        client
            .put(format!("{}/library/books/{}", BASE_URL, book_id))
            .json(&json!({ "total_copies": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"]["total_copies"], 2);
    assert_eq!(body["book"]["available_copies"], 0);
}

#[tokio::test]
#[ignore]
async fn test_dashboard_stats() {
    let client = Client::new();

    let (status, body) = send(client.get(format!("{}/dashboard/stats", BASE_URL))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["hourly_entries"].as_array().map(Vec::len), Some(24));
    assert!(body["inside_count"].is_number());
    assert!(body["lending"]["active_book_loans"].is_number());
}
