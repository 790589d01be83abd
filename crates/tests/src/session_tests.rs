use crate::fixtures::seed::start_session;
use crate::fixtures::test_app::TestApp;
use bson::doc;
use serde_json::Value;

#[tokio::test]
async fn start_session_returns_recording_session() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .get(app.url(&format!("/api/session/{}", seeded.session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "recording");
    assert_eq!(json["stylistId"], seeded.stylist_id.to_hex());
    assert_eq!(
        json["channel"],
        format!("session:{}", seeded.session_id)
    );
    assert!(json["endedAt"].is_null());
}

#[tokio::test]
async fn second_active_session_for_stylist_conflicts() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    // Same stylist tries to start again while still recording.
    let resp = app
        .client
        .post(app.url("/api/session"))
        .json(&serde_json::json!({
            "salonId": seeded.salon_id.to_hex(),
            "stylistId": seeded.stylist_id.to_hex(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "conflict");

    // The unique index means exactly one recording session exists.
    let count = app
        .db
        .collection::<bson::Document>("sessions")
        .count_documents(doc! {
            "stylist_id": seeded.stylist_id,
            "status": "recording",
        })
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn ending_session_transitions_to_processing() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .post(app.url(&format!("/api/session/{}/end", seeded.session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "processing");
    assert!(json["endedAt"].is_string());
    assert!(json["totalDurationMs"].as_i64().unwrap() >= 0);

    // The stylist is free to start a new session immediately.
    let resp = app
        .client
        .post(app.url("/api/session"))
        .json(&serde_json::json!({
            "salonId": seeded.salon_id.to_hex(),
            "stylistId": seeded.stylist_id.to_hex(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn ending_twice_is_invalid_state() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .post(app.url(&format!("/api/session/{}/end", seeded.session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .client
        .post(app.url(&format!("/api/session/{}/end", seeded.session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn ending_unknown_session_is_not_found() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url(&format!(
            "/api/session/{}/end",
            bson::oid::ObjectId::new().to_hex()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn malformed_session_id_is_bad_request() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/session/not-an-oid"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn list_sessions_for_stylist_paginates() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    app.client
        .post(app.url(&format!("/api/session/{}/end", seeded.session_id)))
        .send()
        .await
        .unwrap();
    let resp = app
        .client
        .post(app.url("/api/session"))
        .json(&serde_json::json!({
            "salonId": seeded.salon_id.to_hex(),
            "stylistId": seeded.stylist_id.to_hex(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .client
        .get(app.url(&format!(
            "/api/session?stylistId={}",
            seeded.stylist_id.to_hex()
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
}
