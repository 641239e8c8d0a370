pub mod config;
pub mod console_display;
pub mod display;
pub mod geometry;
pub mod history;
pub mod pitch;
pub mod roll;
pub mod session;
pub mod simulator;
pub mod types;
