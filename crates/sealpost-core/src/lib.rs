pub mod config;
pub mod error;
pub mod frame;

pub use error::{SealpostError, SealpostResult};
pub use frame::{Frame, FrameError, FrameLimits, MessageType};
