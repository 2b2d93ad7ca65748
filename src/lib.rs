//! Vector expansion for the Coble compiler.
//!
//! Coble programs operate on fixed-size arrays living in a flat array of
//! 16-bit words. This crate takes the type-checked statement tree, with
//! base addresses and declared sizes already resolved, and rewrites every
//! vector-valued operation into per-cell scalar operations. The bytecode
//! emitter downstream only accepts the scalarized shape.

pub mod diagnostic;
pub mod expand;
pub mod layout;
pub mod span;
pub mod tree;

// Re-export the public surface used by the host compiler and tests
pub use diagnostic::{render_diagnostics, Diagnostic};
pub use expand::Expander;
pub use span::Span;
pub use tree::{BinaryOp, Node, UnaryOp};
