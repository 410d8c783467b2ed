//! Property-based tests for structured-output recovery and retry bounds

mod recovery;
