// Application layer - Use cases and the seams to live backends
pub mod chart_cache;
pub mod chart_data_service;
pub mod series_generator;
pub mod telemetry_source;
