//! Reconciles the local chunk plan with what the server already holds.

pub mod negotiator;

pub use negotiator::{Negotiation, ResumeNegotiator};
