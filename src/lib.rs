//! Coursegen: Resumable Study-Material Generation
//!
//! Drives a catalog of subjects and subtopics through LLM-backed content generation,
//! structured-output recovery, idempotent import into a relational store, and a
//! read-only completeness audit. Runs are checkpointed per subject so an interrupted
//! batch resumes where it stopped.

pub mod catalog;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod content;
pub mod emission;
pub mod error;
pub mod generator;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod recovery;
pub mod retry;
pub mod store;
pub mod validator;
