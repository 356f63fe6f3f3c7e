//! PABX API Module
//! 
//! HTTP client and wire types for the PABX management API.

pub mod client;
pub mod types;

pub use client::PabxClient;
pub use types::*;
