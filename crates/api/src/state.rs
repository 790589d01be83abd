use mongodb::Database;
use std::sync::Arc;
use stylecoach_config::Settings;
use stylecoach_services::dao::{
    AnalysisDao, ChunkDao, ReportDao, SegmentDao, SessionDao, TranscriptDao,
};
use stylecoach_services::pipeline::TaskStore;
use stylecoach_services::{
    ChunkAnalyzer, ConversationAi, DiarizationClient, DiarizationOrchestrator, MediaStore,
    Pipeline, ReportSynthesizer, SessionBroadcaster, SimilarCaseClient,
};

use crate::ws::dispatcher::WsBroadcaster;
use crate::ws::storage::WsStorage;

/// All services and DAOs, wired once at startup and handed to handlers
/// through axum state. Everything is behind an Arc so the state clones
/// per-request for free.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub db: Database,

    pub sessions: Arc<SessionDao>,
    pub chunks: Arc<ChunkDao>,
    pub transcripts: Arc<TranscriptDao>,
    pub segments: Arc<SegmentDao>,
    pub analyses: Arc<AnalysisDao>,
    pub reports: Arc<ReportDao>,

    pub media: Arc<MediaStore>,
    pub analyzer: Arc<ChunkAnalyzer>,
    pub diarization: Arc<DiarizationOrchestrator>,
    pub pipeline: Arc<Pipeline>,

    pub ws_storage: Arc<WsStorage>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let sessions = Arc::new(SessionDao::new(&db));
        let chunks = Arc::new(ChunkDao::new(&db));
        let transcripts = Arc::new(TranscriptDao::new(&db));
        let segments = Arc::new(SegmentDao::new(&db));
        let analyses = Arc::new(AnalysisDao::new(&db));
        let reports = Arc::new(ReportDao::new(&db));

        let ws_storage = Arc::new(WsStorage::new());
        let broadcaster: Arc<dyn SessionBroadcaster> =
            Arc::new(WsBroadcaster::new(Arc::clone(&ws_storage)));

        let ai = Arc::new(ConversationAi::new(&settings.claude, settings.retry.clone()));
        let similar = Arc::new(SimilarCaseClient::new(
            &settings.similarity,
            settings.retry.clone(),
        ));

        let analyzer = Arc::new(ChunkAnalyzer::new(
            Arc::clone(&segments),
            Arc::clone(&analyses),
            Arc::clone(&ai),
            similar,
            Arc::clone(&broadcaster),
        ));

        let diarization_client =
            DiarizationClient::new(&settings.diarization, settings.retry.clone());
        let diarization = Arc::new(DiarizationOrchestrator::new(
            diarization_client,
            Arc::clone(&chunks),
            Arc::clone(&transcripts),
            Arc::clone(&segments),
            Arc::clone(&analyzer),
            &settings.diarization,
        ));

        let synthesizer = Arc::new(ReportSynthesizer::new(
            Arc::clone(&sessions),
            Arc::clone(&analyses),
            Arc::clone(&segments),
            Arc::clone(&reports),
            ai,
            broadcaster,
        ));
        let pipeline = Arc::new(Pipeline::new(
            TaskStore::new(&db),
            synthesizer,
            &settings.pipeline,
        ));

        let media = Arc::new(MediaStore::new(
            settings.app.media_dir.clone(),
            settings.app.public_base_url.clone(),
        ));

        Self {
            settings,
            db,
            sessions,
            chunks,
            transcripts,
            segments,
            analyses,
            reports,
            media,
            analyzer,
            diarization,
            pipeline,
            ws_storage,
        }
    }
}
