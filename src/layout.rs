//! Memory layout queries over the compile tree.
//!
//! Expansion needs two facts about any expression: how many cells it
//! covers (`memory_size`) and where those cells start (`memory_address`).
//! Both are pure `&self` queries; neither ever rewrites the tree.

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::tree::Node;

impl Node {
    /// Number of memory cells this expression covers.
    ///
    /// `Ok(None)` means the node is a statement container with no vector
    /// width of its own. `Err` reports a size conflict between children;
    /// expansion surfaces it to the user unchanged.
    ///
    /// Subscript rules for `VarRef`: no subscript covers the whole
    /// declared array, a constant subscript covers one cell, a constant
    /// `[lo, hi]` pair covers `hi - lo + 1` cells, and a dynamic
    /// subscript covers one cell whose address is unknown until run time.
    pub fn memory_size(&self) -> Result<Option<u16>, Diagnostic> {
        match self {
            Node::Block { .. } | Node::If { .. } | Node::While { .. } => Ok(None),
            Node::Assign { target, value, span } => common_size(target, value, *span),
            Node::BinOp { lhs, rhs, span, .. } => common_size(lhs, rhs, *span),
            Node::UnOp { operand, .. } => operand.memory_size(),
            Node::VarRef {
                name,
                declared_size,
                index,
                ..
            } => match index.as_deref() {
                None => Ok(Some(*declared_size)),
                Some(Node::VectorLit { values, span }) => match values.as_slice() {
                    [_] => Ok(Some(1)),
                    [lo, hi] => {
                        if hi < lo {
                            Err(Diagnostic::error(
                                format!("reversed subscript range {}:{} on '{}'", lo, hi, name),
                                *span,
                            )
                            .with_note(
                                "the upper bound must not be less than the lower bound".to_string(),
                            ))
                        } else {
                            let cells = *hi as i32 - *lo as i32 + 1;
                            let cells = u16::try_from(cells).unwrap_or_else(|_| {
                                panic!(
                                    "internal compiler error: subscript range {}:{} covers {} cells",
                                    lo, hi, cells
                                )
                            });
                            Ok(Some(cells))
                        }
                    }
                    other => panic!(
                        "internal compiler error: subscript literal with {} values",
                        other.len()
                    ),
                },
                Some(_) => Ok(Some(1)),
            },
            Node::VectorLit { values, .. } => {
                let len = u16::try_from(values.len()).unwrap_or_else(|_| {
                    panic!(
                        "internal compiler error: vector literal with {} values",
                        values.len()
                    )
                });
                Ok(Some(len))
            }
            Node::Immediate { .. } | Node::Load { .. } | Node::Store { .. } => Ok(Some(1)),
        }
    }

    /// Base address of this expression's cells, when it is known at
    /// compile time.
    ///
    /// `None` means the address cannot be resolved: a dynamic subscript,
    /// a value with no storage (literals, immediates), or an address
    /// computation that leaves the 16-bit space. Composite expressions
    /// answer with the address of their leading operand.
    pub fn memory_address(&self) -> Option<u16> {
        match self {
            Node::Block { .. } | Node::If { .. } | Node::While { .. } => None,
            Node::Assign { target, .. } => target.memory_address(),
            Node::BinOp { lhs, .. } => lhs.memory_address(),
            Node::UnOp { operand, .. } => operand.memory_address(),
            Node::VarRef { base, index, .. } => {
                let shift = match index.as_deref() {
                    None => 0,
                    Some(Node::VectorLit { values, .. }) => match values.as_slice() {
                        [first] | [first, _] => *first,
                        other => panic!(
                            "internal compiler error: subscript literal with {} values",
                            other.len()
                        ),
                    },
                    Some(_) => return None,
                };
                base.checked_add_signed(shift)
            }
            Node::VectorLit { .. } | Node::Immediate { .. } => None,
            Node::Load { address, .. } | Node::Store { address, .. } => Some(*address),
        }
    }
}

/// Shared width of two children. A width conflict is a user error; a
/// child without a width (statement containers) does not constrain the
/// other side.
fn common_size(left: &Node, right: &Node, span: Span) -> Result<Option<u16>, Diagnostic> {
    let l = left.memory_size()?;
    let r = right.memory_size()?;
    match (l, r) {
        (Some(l), Some(r)) if l != r => Err(Diagnostic::error(
            format!("size mismatch between vectors: {} and {}", l, r),
            span,
        )),
        (Some(size), _) | (_, Some(size)) => Ok(Some(size)),
        (None, None) => Ok(None),
    }
}

// ─── Tests ────────────────────────────────────────────────────────
