pub mod analysis;
pub mod audio_chunk;
pub mod base;
pub mod report;
pub mod segment;
pub mod session;
pub mod transcript;

pub use analysis::AnalysisDao;
pub use audio_chunk::ChunkDao;
pub use report::ReportDao;
pub use segment::SegmentDao;
pub use session::SessionDao;
pub use transcript::TranscriptDao;
