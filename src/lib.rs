// SPDX-License-Identifier: MIT OR Apache-2.0
//! CtxOpt — a context-engineering optimizer for LLM workflows.
//!
//! This crate is the facade over the workspace: it re-exports the member
//! crates so embedders can depend on one name. The interesting code lives
//! in the members — content detection ([`detect`]), the compressor family
//! ([`compress`]), the pipeline executor ([`pipeline`]), the source-tree
//! facade ([`ast`]), and the tool registry ([`tools`]) that binds them to
//! the JSON invocation surface.

#![deny(unsafe_code)]

pub use cxo_ast as ast;
pub use cxo_build as build;
pub use cxo_cache as cache;
pub use cxo_compress as compress;
pub use cxo_core as core;
pub use cxo_detect as detect;
pub use cxo_error as error;
pub use cxo_path as path;
pub use cxo_pipeline as pipeline;
pub use cxo_session as session;
pub use cxo_tokenizer as tokenizer;
pub use cxo_tools as tools;
