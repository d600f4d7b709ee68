//! HTTP-level integration tests for the portal notification server.

mod helpers;

mod health_test;
mod push_test;
mod stats_test;
mod stream_test;
