pub mod analysis;
pub mod audio_chunk;
pub mod pipeline_task;
pub mod report;
pub mod session;
pub mod speaker_segment;
pub mod transcript;

pub use analysis::{AnalysisMetrics, ChunkAnalysis};
pub use audio_chunk::{AudioChunk, ChunkStatus};
pub use pipeline_task::{PipelineStage, PipelineTask, TaskStatus};
pub use report::SessionReport;
pub use session::{CustomerInfo, Session, SessionStatus, VisitType};
pub use speaker_segment::{Speaker, SpeakerSegment};
pub use transcript::TranscriptSegment;
