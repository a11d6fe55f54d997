//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod controller;
pub mod fake_host;
