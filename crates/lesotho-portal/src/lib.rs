//! Eligibility matching and admission publication for the Lesotho Opportunities portal.
//!
//! Persistence lives in an external document store reached through [`store::DocumentStore`];
//! this crate owns the rules deciding who qualifies for a posting and the idempotent fan-out
//! that propagates reviewer decisions into each student's admission results.

pub mod clock;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;
pub mod workflows;
