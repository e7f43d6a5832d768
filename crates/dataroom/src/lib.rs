pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;

pub use infra::logging::LogTarget;

/// Install the tracing subscriber for the given target.
pub fn init(target: LogTarget) -> anyhow::Result<()> {
    infra::logging::init(target)
}
