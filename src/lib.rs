//! Pressgate - Approval & Delivery Coordination for PR Campaigns
//!
//! Core library providing customer/team sign-off workflows, immutable
//! document versioning with derived edit locks, and approval-gated
//! pipeline stage transitions for press-release campaigns.

pub mod config;
pub mod core;
pub mod store;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
