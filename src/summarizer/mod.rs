pub mod audit;
pub mod config;
pub mod notes;
pub mod paths;
pub mod provider;
pub mod save;
pub mod settings_store;
pub mod state;
pub mod summarize;
pub mod synthesize;
pub mod transcript;
pub mod util;
