//! Polling Engine Module
//! 
//! Fast/slow timers, per-trunk bookkeeping and the restart supervisor.

pub mod poller;
pub mod supervisor;
pub mod tally;

pub use poller::{FastTickOutcome, PollingEngine};
pub use supervisor::{EngineEvent, EngineState, Supervisor};
pub use tally::{TrunkBook, TrunkTally};
