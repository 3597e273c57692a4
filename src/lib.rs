// src/lib.rs - Servo gait controller for a segmented snake robot
pub mod config;
pub mod control;
pub mod gait;
pub mod hardware;
pub mod ingestion;
pub mod params;
pub mod safety;
pub mod scheduler;
pub mod smoothing;
pub mod snake;
pub mod telemetry;
pub mod transport;
pub mod watchdog;
pub mod web;

pub use config::{Config, load_config};
pub use control::run_control_loop;
pub use snake::{Snake, SnakeError};
