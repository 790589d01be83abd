pub mod ai;
pub mod alerts;
pub mod coordinator;
pub mod dao;
pub mod diarization;
pub mod events;
pub mod media;
pub mod merge;
pub mod pipeline;
pub mod reporting;
pub mod retry;
pub mod scoring;
pub mod similarity;

pub use ai::ConversationAi;
pub use coordinator::ChunkAnalyzer;
pub use diarization::{DiarizationClient, DiarizationOrchestrator};
pub use events::SessionBroadcaster;
pub use media::MediaStore;
pub use pipeline::Pipeline;
pub use reporting::ReportSynthesizer;
pub use similarity::SimilarCaseClient;
