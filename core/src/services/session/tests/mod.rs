//! Tests for the session token service

mod mocks;

mod concurrency_tests;
