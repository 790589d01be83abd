pub mod analysis;
pub mod chunk;
pub mod diarization;
pub mod report;
pub mod session;
