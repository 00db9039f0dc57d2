pub mod config;
pub mod logging;
pub mod runtime;

pub use config::CliConfig;
pub use logging::init_tracing;
pub use runtime::{headless_backend, listen_backend, open_service, CommandRuntime};
