//! Unit tests for stepwright configuration types.
//!
//! - [`helpers`] - Shared fixtures and composer helpers
//! - [`types_tests`] - Defaults and TOML deserialisation
//! - [`validation`] - `RunnerConfig::validate` checks
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence

mod helpers;
