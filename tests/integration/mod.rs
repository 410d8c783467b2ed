//! Integration tests for the coursegen pipeline

mod batch_scenario;
mod emission_idempotence;
mod resume;
mod test_utils;
mod validator_checks;
