use crate::fixtures::seed::{ingest_chunk, start_session};
use crate::fixtures::test_app::TestApp;
use bson::doc;
use serde_json::Value;

#[tokio::test]
async fn ingest_chunk_stores_transcript_and_audio() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = ingest_chunk(
        &app,
        &seeded.session_id,
        0,
        "How has your hair been since last time?",
        0,
        30_000,
    )
    .await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["transcriptId"].is_string());
    assert_eq!(json["chunkIndex"], 0);
    assert!(json["audioUrl"].as_str().unwrap().contains("/media/"));
    // No diarization service configured in tests.
    assert_eq!(json["diarizationTriggered"], false);

    let transcripts = app
        .db
        .collection::<bson::Document>("transcripts")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(transcripts, 1);
    let chunks = app
        .db
        .collection::<bson::Document>("audio_chunks")
        .count_documents(doc! { "chunk_index": 0 })
        .await
        .unwrap();
    assert_eq!(chunks, 1);
}

#[tokio::test]
async fn reingesting_same_chunk_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let first = ingest_chunk(&app, &seeded.session_id, 2, "take one", 60_000, 90_000).await;
    assert_eq!(first.status().as_u16(), 200);
    let second = ingest_chunk(&app, &seeded.session_id, 2, "take two", 60_000, 90_000).await;
    assert_eq!(second.status().as_u16(), 200);

    let transcripts = app.db.collection::<bson::Document>("transcripts");
    assert_eq!(transcripts.count_documents(doc! {}).await.unwrap(), 1);
    let row = transcripts.find_one(doc! {}).await.unwrap().unwrap();
    assert_eq!(row.get_str("text").unwrap(), "take two");
}

#[tokio::test]
async fn oversized_audio_is_rejected() {
    let app = TestApp::spawn_with_settings(|s| s.app.max_chunk_bytes = 8).await;
    let seeded = start_session(&app).await;

    let resp = ingest_chunk(&app, &seeded.session_id, 0, "hello", 0, 1000).await;
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "validation");
}

#[tokio::test]
async fn chunk_on_ended_session_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    app.client
        .post(app.url(&format!("/api/session/{}/end", seeded.session_id)))
        .send()
        .await
        .unwrap();

    let resp = ingest_chunk(&app, &seeded.session_id, 0, "too late", 0, 1000).await;
    assert_eq!(resp.status().as_u16(), 409);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "invalid_state");
}

#[tokio::test]
async fn missing_transcript_field_is_bad_request() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let form = reqwest::multipart::Form::new()
        .part(
            "audio",
            reqwest::multipart::Part::bytes(b"RIFF".to_vec()).file_name("c.wav"),
        )
        .text("chunkIndex", "0")
        .text("startTimeMs", "0")
        .text("endTimeMs", "1000");

    let resp = app
        .client
        .post(app.url(&format!("/api/session/{}/chunk", seeded.session_id)))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn inverted_time_range_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = ingest_chunk(&app, &seeded.session_id, 0, "oops", 5000, 1000).await;
    assert_eq!(resp.status().as_u16(), 422);
}
