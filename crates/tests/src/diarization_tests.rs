use crate::fixtures::seed::{ingest_chunk, start_session};
use crate::fixtures::test_app::TestApp;
use bson::doc;
use serde_json::Value;
use stylecoach_services::dao::ChunkDao;

fn callback_payload(session_id: &str, chunk_index: i32) -> serde_json::Value {
    serde_json::json!({
        "jobId": "job-123",
        "status": "completed",
        "metadata": { "sessionId": session_id, "chunkIndex": chunk_index },
        "segments": [
            { "speaker": "SPEAKER_00", "start": 0.0, "end": 1.5, "confidence": 0.95 },
            { "speaker": "SPEAKER_01", "start": 1.5, "end": 4.0, "confidence": 0.9 }
        ]
    })
}

#[tokio::test]
async fn callback_with_wrong_secret_is_unauthorized() {
    let app = TestApp::spawn_with_settings(|s| {
        s.diarization.callback_secret = Some("topsecret".to_string());
    })
    .await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .header("X-Callback-Secret", "wrong")
        .json(&callback_payload(&seeded.session_id, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .json(&callback_payload(&seeded.session_id, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn completed_callback_merges_segments_with_speaker_roles() {
    let app = TestApp::spawn_with_settings(|s| {
        s.diarization.callback_secret = Some("topsecret".to_string());
    })
    .await;
    let seeded = start_session(&app).await;

    // Transcript spans 1.0s..3.0s: 0.5s overlap with the first speaker,
    // 1.5s with the second, so the merged segment goes to the customer
    // (the first diarized speaker is assumed to be the stylist).
    let resp = ingest_chunk(&app, &seeded.session_id, 0, "It's been quite dry", 1000, 3000).await;
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .header("X-Callback-Secret", "topsecret")
        .json(&callback_payload(&seeded.session_id, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["mergedSegments"], 1);

    let segments = app.db.collection::<bson::Document>("speaker_segments");
    let row = segments.find_one(doc! {}).await.unwrap().unwrap();
    assert_eq!(row.get_str("speaker").unwrap(), "customer");
    assert_eq!(row.get_str("text").unwrap(), "It's been quite dry");
    assert_eq!(row.get_i64("start_time_ms").unwrap(), 1000);

    let chunk = app
        .db
        .collection::<bson::Document>("audio_chunks")
        .find_one(doc! { "chunk_index": 0 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chunk.get_str("status").unwrap(), "completed");
}

#[tokio::test]
async fn duplicate_callback_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    ingest_chunk(&app, &seeded.session_id, 0, "hello there", 0, 4000).await;

    for _ in 0..2 {
        let resp = app
            .client
            .post(app.url("/api/diarization/callback"))
            .json(&callback_payload(&seeded.session_id, 0))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let count = app
        .db
        .collection::<bson::Document>("speaker_segments")
        .count_documents(doc! {})
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn failed_callback_marks_chunk_errored_but_session_keeps_recording() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    ingest_chunk(&app, &seeded.session_id, 0, "hello", 0, 1000).await;

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .json(&serde_json::json!({
            "status": "failed",
            "metadata": { "sessionId": seeded.session_id, "chunkIndex": 0 },
            "error": "audio unreadable"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let chunk = app
        .db
        .collection::<bson::Document>("audio_chunks")
        .find_one(doc! { "chunk_index": 0 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chunk.get_str("status").unwrap(), "error");
    assert_eq!(chunk.get_str("error").unwrap(), "audio unreadable");

    let resp = app
        .client
        .get(app.url(&format!("/api/session/{}", seeded.session_id)))
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "recording");
}

#[tokio::test]
async fn late_poll_timeout_cannot_demote_a_completed_chunk() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    ingest_chunk(&app, &seeded.session_id, 0, "hello there", 0, 4000).await;

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .json(&callback_payload(&seeded.session_id, 0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // A poller that only notices the expired deadline after the webhook
    // already resolved the chunk must not overwrite the outcome.
    let chunks = ChunkDao::new(&app.db);
    let sid = bson::oid::ObjectId::parse_str(&seeded.session_id).unwrap();
    let modified = chunks
        .mark_error(sid, 0, "diarization poll timeout")
        .await
        .unwrap();
    assert!(!modified);

    let chunk = app
        .db
        .collection::<bson::Document>("audio_chunks")
        .find_one(doc! { "chunk_index": 0 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chunk.get_str("status").unwrap(), "completed");
}

#[tokio::test]
async fn callback_before_any_transcript_merges_nothing() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .post(app.url("/api/diarization/callback"))
        .json(&callback_payload(&seeded.session_id, 7))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["mergedSegments"], 0);
}
