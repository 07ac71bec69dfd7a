//! Sink module tests.

mod disk_tests;
