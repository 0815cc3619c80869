mod flags;
mod shutdown;
mod state;
mod supervisor;

pub use flags::OverrideFlags;
pub use shutdown::ShutdownGuard;
pub use state::ControllerState;
pub use supervisor::Supervisor;
