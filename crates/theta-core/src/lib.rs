//! Front matter extraction, directive rewriting, and render sessions.
//!
//! Copyright (c) 2026 Theta contributors
//!
//! This crate is the configuration-aware layer over [`theta_engine`]. A
//! [`ReaderSession`] hooks two passes into template compilation:
//!
//! - [`front_matter`] strips the `<%/*** Theta ... ***/%>` header from a
//!   unit's source and, for the root template of a render, merges it into
//!   the session's active [`TemplateConfiguration`](theta_config::TemplateConfiguration).
//! - [`DirectiveRewriter`] turns `@importJs` and legacy `@config`
//!   directives into script bindings, fetching module sources through a
//!   session-lived [`ModuleCache`].
//!
//! Callers either [`render`](ReaderSession::render) a template and receive
//! output plus its effective configuration, or
//! [`read_config`](ReaderSession::read_config) to probe the configuration
//! without producing output or touching script files.

pub mod front_matter;

mod error;
mod module_cache;
mod rewriter;
mod session;

pub use error::{ErrorKind, ThetaError, ThetaResult};
pub use module_cache::ModuleCache;
pub use rewriter::{DirectiveRewriter, RewriteMode};
pub use session::{ReaderSession, RenderOutcome};
