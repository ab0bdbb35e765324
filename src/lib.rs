//! Progressive project estimation for a design agency's chat assistant.
//!
//! A conversation is classified, turned into a feature record by a hosted
//! language model, matched against completed projects and priced with
//! multipliers. The estimate widens early in the conversation and narrows
//! as more is known.

pub mod api;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod estimation;
pub mod llm;
pub mod service;

pub use config::Config;
pub use estimation::{EstimateReport, Estimator, ProjectEstimate, ProjectFeatureRecord};
pub use service::{ConversationEstimate, EstimationService};
