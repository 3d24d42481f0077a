//! # flowstack-schema — Flow Schema Validation
//!
//! Structural validation of flow schema documents before persistence.
//! A flow schema is a JSON document describing a tree of sections, each
//! optionally holding forms, each optionally holding fields. The builder
//! frontend produces these documents; the API refuses to store one that
//! is structurally unusable.
//!
//! ## Contract
//!
//! The [`SchemaValidator`] accepts an already-parsed [`serde_json::Value`],
//! a string of serialized JSON, or nothing at all, and returns a
//! [`Validation`] carrying every violation found in one pass. Messages
//! are positional and human-readable (`"Field 2 of form 1 of section 3
//! must have a type"`) so the builder can surface them directly.
//!
//! ## Crate Policy
//!
//! - Pure: no I/O, no shared state, never mutates its input.
//! - Violations are data, never panics — the validator runs inside a
//!   save attempt and the caller decides how to present the result.

pub mod validate;

pub use validate::{has_non_empty, SchemaCandidate, SchemaValidator, Validation};
