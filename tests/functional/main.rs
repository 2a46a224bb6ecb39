//! Functional tests driving the complete migration workflow against an
//! in-memory control plane.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod mock_access;
mod workflow_tests;
