//! Session Module
//! 
//! Bearer-token session with the PABX: initial login and silent refresh.

pub mod manager;
pub mod types;

pub use manager::SessionManager;
pub use types::Session;
