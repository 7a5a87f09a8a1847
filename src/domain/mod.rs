// Domain layer - Pure models and calendar arithmetic
pub mod error;
pub mod filter;
pub mod telemetry;
pub mod time;
