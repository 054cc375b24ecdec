//! Survey Client Library
//!
//! Form catalog, wizard, diary and analytics logic of the survey app,
//! talking to the backend over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;
