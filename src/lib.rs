pub mod app;
pub mod config;
pub mod dates;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod mutations;
pub mod roster;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::router;
pub use config::Config;
pub use errors::{AppError, LedgerError};
pub use ledger::Ledger;
pub use mutations::{Mutation, Outcome};
pub use state::AppState;
pub use storage::{load_data, persist_data};
