//! Capture-side pipeline: encoding raw tracker samples into records and
//! persisting them as line-delimited JSON log files with rotation.

pub mod encoder;
pub mod loader;
pub mod naming;
pub mod recorder;
pub mod writer;
