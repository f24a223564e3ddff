//! Command implementations.

mod config;
mod doctor;
mod models;
mod serve;
mod transcribe;

pub use config::run_config;
pub use doctor::run_doctor;
pub use models::run_models;
pub use serve::run_serve;
pub use transcribe::run_transcribe;
