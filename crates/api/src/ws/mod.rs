pub mod dispatcher;
pub mod handler;
pub mod storage;
