//! Configuration management for Skriv.

mod settings;

pub use settings::{
    GeneralSettings, OutputSettings, ServerSettings, Settings, TranscriptionSettings,
};
