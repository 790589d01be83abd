use crate::fixtures::seed::start_session;
use crate::fixtures::test_app::TestApp;
use bson::oid::ObjectId;
use serde_json::Value;
use stylecoach_db::models::Speaker;
use stylecoach_services::dao::SegmentDao;
use stylecoach_services::merge::MergedSegment;

async fn seed_segments(app: &TestApp, session_id: &str, chunk_index: i32) {
    let dao = SegmentDao::new(&app.db);
    let sid = ObjectId::parse_str(session_id).unwrap();
    let merged = vec![
        MergedSegment {
            speaker: Speaker::Stylist,
            text: "How has your hair been?".to_string(),
            start_time_ms: 0,
            end_time_ms: 2000,
            confidence: 0.95,
        },
        MergedSegment {
            speaker: Speaker::Customer,
            text: "Quite dry lately.".to_string(),
            start_time_ms: 2000,
            end_time_ms: 4000,
            confidence: 0.9,
        },
    ];
    dao.upsert_merged(sid, chunk_index, &merged).await.unwrap();
}

/// Serves the Claude messages API shape, always answering with the
/// given model text.
async fn spawn_ai_stub(model_text: String) -> String {
    use axum::{Json, Router, routing::post};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/v1/messages",
        post(move || {
            let text = model_text.clone();
            async move {
                Json(serde_json::json!({
                    "content": [{ "type": "text", "text": text }]
                }))
            }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

const STUB_ANALYSIS: &str = r#"Here is the analysis:
{"overallScore": 5,
 "metrics": {
   "talkRatio": {"score": 1, "stylistRatio": 42, "customerRatio": 58, "details": "balanced"},
   "questionQuality": {"score": 1, "openCount": 4, "closedCount": 2, "details": ""},
   "emotion": {"score": 1, "positiveRatio": 75, "negativeRatio": 5, "details": ""},
   "concernKeywords": {"score": 1, "keywords": ["dryness"], "details": ""},
   "proposalTiming": {"score": 1, "timingMs": 120000, "details": ""},
   "proposalQuality": {"score": 90, "matchRate": 0.9, "details": ""},
   "conversion": {"score": 100, "isConverted": true, "details": ""}
 },
 "suggestions": ["keep asking open questions"],
 "highlights": ["caught the dryness concern early"]}"#;

#[tokio::test]
async fn analyzing_a_chunk_produces_one_analysis_with_recomputed_score() {
    let stub = spawn_ai_stub(STUB_ANALYSIS.to_string()).await;
    let app = TestApp::spawn_with_settings(move |s| {
        s.claude.api_key = Some("test-key".to_string());
        s.claude.base_url = stub;
    })
    .await;
    let seeded = start_session(&app).await;
    seed_segments(&app, &seeded.session_id, 0).await;

    let analyze_url = app.url(&format!(
        "/api/session/{}/chunk/0/analyze",
        seeded.session_id
    ));
    let resp = app.client.post(&analyze_url).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["analyzed"], true);

    // The model's own overallScore (5) and indicator sub-scores are
    // overridden by the local formulas over the reported raw measures.
    let overall = json["analysis"]["overallScore"].as_i64().unwrap();
    assert!((0..=100).contains(&overall));
    assert_ne!(overall, 5);
    assert!(json["analysis"]["metrics"]["talkRatio"]["score"].as_f64().unwrap() > 1.0);
    assert_eq!(
        json["analysis"]["suggestions"][0],
        "keep asking open questions"
    );

    // Re-running upserts in place rather than appending.
    let resp = app.client.post(&analyze_url).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let count = app
        .db
        .collection::<bson::Document>("chunk_analyses")
        .count_documents(bson::doc! {})
        .await
        .unwrap();
    assert_eq!(count, 1);

    let resp = app
        .client
        .get(app.url(&format!(
            "/api/session/{}/chunk/0/analysis",
            seeded.session_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched["overallScore"].as_i64().unwrap(), overall);
}

#[tokio::test]
async fn analyzing_chunk_without_segments_is_a_noop() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .post(app.url(&format!(
            "/api/session/{}/chunk/0/analyze",
            seeded.session_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["analyzed"], false);
}

#[tokio::test]
async fn analyzing_without_ai_collaborator_is_unavailable() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;
    seed_segments(&app, &seeded.session_id, 0).await;

    let resp = app
        .client
        .post(app.url(&format!(
            "/api/session/{}/chunk/0/analyze",
            seeded.session_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 503);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "ai_unavailable");
}

#[tokio::test]
async fn missing_analysis_is_not_found() {
    let app = TestApp::spawn().await;
    let seeded = start_session(&app).await;

    let resp = app
        .client
        .get(app.url(&format!(
            "/api/session/{}/chunk/0/analysis",
            seeded.session_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .client
        .get(app.url(&format!("/api/session/{}/analysis", seeded.session_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["items"].as_array().unwrap().is_empty());
}
