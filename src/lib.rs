#[macro_use]
extern crate tracing;

mod app;
mod errors;
pub mod logging;

pub use app::App;
pub use errors::init_errors;
pub use logging::init_logging;
pub use research_monitor_config::Args;
