//! Shared test utilities for the pipeline workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Fixture documents (GeoJSON responses, CSV tables, configuration)
//! - An in-process HTTP server for mocking remote services
//! - Approximate floating-point assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, MockServer};
//! ```

pub mod fixtures;
pub mod mock_http;

pub use mock_http::MockServer;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  \
                 diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(0.0, 0.0, 0.0001);
        assert_approx_eq!(-5.5, -5.500001, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_config_fixture_mentions_sources() {
        let yaml = fixtures::config::pipeline_yaml("http://a/wfs", "http://b/subset");
        assert!(yaml.contains("marine_regions: \"http://a/wfs\""));
        assert!(yaml.contains("raw: data/raw"));
    }

    #[tokio::test]
    async fn test_mock_server_binds_localhost() {
        let server = MockServer::start(axum::Router::new()).await;
        assert!(server.addr().ip().is_loopback());
        assert!(server.url("/wfs").ends_with("/wfs"));
    }
}
