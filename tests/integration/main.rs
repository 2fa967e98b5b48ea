//! Integration tests for crypto-alert

mod common;
mod monitor_test;
mod notify_test;
