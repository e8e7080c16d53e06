pub mod logging;

pub use tracing;

/// Lifecycle signal broadcast by the controller to the services it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
