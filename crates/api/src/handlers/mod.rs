//! API handlers for all routes
//!
//! This module contains the HTTP handlers for all API endpoints.

pub mod cache;
pub mod scan;
