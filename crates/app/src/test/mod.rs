//! Shared fixtures for database-backed service tests.
#![expect(
    clippy::expect_used,
    clippy::panic,
    reason = "fixture setup failures should abort the test"
)]

pub(crate) mod context;
pub(crate) mod db;
pub(crate) mod helpers;

pub(crate) use context::TestContext;
