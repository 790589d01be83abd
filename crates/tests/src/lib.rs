pub mod fixtures;

#[cfg(test)]
mod session_tests;
#[cfg(test)]
mod chunk_tests;
#[cfg(test)]
mod diarization_tests;
#[cfg(test)]
mod analysis_tests;
#[cfg(test)]
mod report_tests;
