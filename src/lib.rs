//! Calorie Compass - Calorie Tracking Backend
//!
//! This crate implements the billing and account core behind the Calorie
//! Compass clients: Stripe webhook reconciliation, checkout and billing-portal
//! session flows, and guarded account deletion.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
