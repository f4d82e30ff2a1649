pub mod api;
pub mod output;

pub use api::{ApiClient, EnvironmentKey};
pub use output::OutputFormat;
