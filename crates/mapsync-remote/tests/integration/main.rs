//! Integration tests for the project server client and provider
//!
//! Uses wiremock to stand in for the project server API.

mod common;
mod test_provider;
