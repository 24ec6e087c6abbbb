// Per-session state: cost ledger, finished runs, workflow state and status line.
// Sessions live in memory only and never share mutable state.

pub mod handlers;
pub mod model;
pub mod store;

pub use model::{SessionContext, SessionSnapshot, SimulationRun};
pub use store::SessionStore;
