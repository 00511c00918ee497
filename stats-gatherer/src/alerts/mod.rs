pub mod engine;
pub mod event;
pub mod rules;

pub use engine::{
    AlertEngine,
    AlertSummary,
};
pub use event::{
    AlertEvent,
    AlertKind,
    Severity,
};
