// Infrastructure layer - External dependencies and adapters
pub mod aggregate_source;
pub mod config;
pub mod feed_source;
pub mod http_client;

#[cfg(test)]
pub mod test_support;
