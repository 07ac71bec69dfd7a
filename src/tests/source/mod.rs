//! Source module tests.
