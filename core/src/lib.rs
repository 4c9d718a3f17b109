//! charging-core: charge calculation, bill runs and settlement files for
//! regulated-activity charging regimes.
//!
//! RULE: workflows live in the `*_service` modules. They own the sequence
//! of steps and the transaction boundaries; the store owns the SQL.

pub mod attributes;
pub mod bill_run_service;
pub mod calendar;
pub mod charge;
pub mod config;
pub mod customer_service;
pub mod error;
pub mod file;
pub mod presenters;
pub mod records;
pub mod rules_service;
pub mod sequencer;
pub mod store;
pub mod tally;
pub mod transaction_service;
pub mod translator;
pub mod types;
pub mod upload;
