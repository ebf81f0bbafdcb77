// SPDX-License-Identifier: MIT OR Apache-2.0
//! Build-tool output parsing and error grouping.
//!
//! A family of per-tool parsers extracts structured [`ParsedError`]s from
//! raw compiler output. Parsers share one capability shape — a name, the
//! tools they understand, a cheap `can_parse` probe, and `parse` — and are
//! registered by name in a [`ParserRegistry`]; polymorphism is by data,
//! not by subclassing a tool hierarchy.
//!
//! Errors sharing a normalized signature fold into [`ErrorGroup`]s, which
//! is what makes build output compress well: a hundred instances of
//! `TS2304` are one group with a count.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod group;
pub mod parsed;
pub mod parsers;

pub use group::{group_errors, render_groups, ErrorGroup};
pub use parsed::{normalize_message, signature, ParsedError, Severity};
pub use parsers::{default_registry, ParserRegistry, ToolOutputParser};
