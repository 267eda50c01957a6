//! Tests for domain entities

mod account_tests;
