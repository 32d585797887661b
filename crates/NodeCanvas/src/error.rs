//! # Error Types
//!
//! Construction-time failures only. Dangling references at render time
//! (edge to a removed node, unknown port id) are not errors: those degrade
//! gracefully per the rendering rules and never surface here.

use thiserror::Error;

/// Errors raised while wiring up the canvas, before any frame is rendered.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A renderer was registered under an empty type tag.
    #[error("renderer type tag must not be empty")]
    EmptyTypeTag,

    /// A configuration field fails its basic sanity bound.
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}
