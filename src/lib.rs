//! Library exports for the Ledgerly link service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod config;
pub mod database;
pub mod error;
pub mod exchange;
pub mod extractors;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod query;
pub mod route;
pub mod seed;
