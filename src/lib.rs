//! Transparent response-caching gateway for sports-statistics dashboards.
//!
//! The dashboard issues GET requests described by method, URL, and resource
//! kind; the gateway classifies each one, serves cacheable API responses
//! under a per-endpoint TTL policy with background refresh and stale
//! fallback, keeps static assets cache-first, and leaves everything else
//! alone. See [`gateway::Gateway`] for the embedding surface and the `sbgw`
//! binary for the standalone daemon form.

pub mod cache;
pub mod config;
pub mod control;
pub mod gateway;
pub mod refresh;
pub mod router;
