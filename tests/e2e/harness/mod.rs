//! E2E test harness for rewind.
//!
//! Scenarios drive a real repository on disk through discards, undos,
//! reopen and gc, then assert on files and history.

#![allow(dead_code)]

pub mod assertions;
pub mod runner;
pub mod steps;
pub mod workspace;

pub use assertions::Assertion;
pub use scenario::Scenario;
