use bson::oid::ObjectId;
use serde_json::Value;
use stylecoach_db::models::analysis::{
    AnalysisMetrics, ConcernKeywordsDetail, ConversionDetail, EmotionDetail,
    ProposalQualityDetail, ProposalTimingDetail, QuestionQualityDetail, TalkRatioDetail,
};

use super::test_app::TestApp;

pub struct SeededSession {
    pub session_id: String,
    pub salon_id: ObjectId,
    pub stylist_id: ObjectId,
}

/// Starts a fresh recording session for a new stylist.
pub async fn start_session(app: &TestApp) -> SeededSession {
    let salon_id = ObjectId::new();
    let stylist_id = ObjectId::new();

    let resp = app
        .client
        .post(app.url("/api/session"))
        .json(&serde_json::json!({
            "salonId": salon_id.to_hex(),
            "stylistId": stylist_id.to_hex(),
            "customerInfo": {
                "name": "Sato",
                "age_group": "30s",
                "gender": null,
                "visit_type": "repeat",
                "notes": null
            }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();

    SeededSession {
        session_id: json["sessionId"].as_str().unwrap().to_string(),
        salon_id,
        stylist_id,
    }
}

/// Ingests one chunk with a small audio payload and the given
/// transcript text, spanning `start_ms..end_ms`.
pub async fn ingest_chunk(
    app: &TestApp,
    session_id: &str,
    chunk_index: i32,
    transcript: &str,
    start_ms: i64,
    end_ms: i64,
) -> reqwest::Response {
    let form = reqwest::multipart::Form::new()
        .part(
            "audio",
            reqwest::multipart::Part::bytes(b"RIFF....WAVEfake".to_vec())
                .file_name(format!("chunk_{chunk_index}.wav"))
                .mime_str("audio/wav")
                .unwrap(),
        )
        .text("chunkIndex", chunk_index.to_string())
        .text("transcript", transcript.to_string())
        .text("startTimeMs", start_ms.to_string())
        .text("endTimeMs", end_ms.to_string());

    app.client
        .post(app.url(&format!("/api/session/{session_id}/chunk")))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

/// A plausible all-round-good metric snapshot with raw measures the
/// scoring engine can recompute from.
pub fn sample_metrics() -> AnalysisMetrics {
    AnalysisMetrics {
        talk_ratio: TalkRatioDetail {
            score: 0.0,
            stylist_ratio: 40.0,
            customer_ratio: 60.0,
            details: "balanced".to_string(),
        },
        question_quality: QuestionQualityDetail {
            score: 0.0,
            open_count: 4,
            closed_count: 2,
            details: String::new(),
        },
        emotion: EmotionDetail {
            score: 0.0,
            positive_ratio: 75.0,
            negative_ratio: 5.0,
            details: String::new(),
        },
        concern_keywords: ConcernKeywordsDetail {
            score: 0.0,
            keywords: vec!["dryness".to_string(), "frizz".to_string()],
            details: String::new(),
        },
        proposal_timing: ProposalTimingDetail {
            score: 0.0,
            timing_ms: Some(120_000),
            details: String::new(),
        },
        proposal_quality: ProposalQualityDetail {
            score: 85.0,
            match_rate: 0.85,
            details: String::new(),
        },
        conversion: ConversionDetail {
            score: 100.0,
            is_converted: true,
            details: String::new(),
        },
    }
}
