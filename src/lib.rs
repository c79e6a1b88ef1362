// ================================
// src/lib.rs
// ================================
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod follower;
pub mod frame;
pub mod vision;

pub use config::LineFollowerParams;
pub use control::VelocityCommand;
pub use follower::{LineFollower, VelocityPublisher};
pub use frame::RawImage;
