//! The vector-expansion engine.
//!
//! Rewrites each statement tree so that every leaf works on a single
//! memory cell or immediate value. Vector-valued assignments become a
//! `Block` of one scalar assignment per cell; everything else keeps its
//! shape with children rewritten in place. The code generator consumes
//! the result and never sees a `VarRef` or `VectorLit` again.

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::tree::Node;

/// Drives expansion over one statement at a time.
///
/// The expander owns no tree state; it carries only the optional trace
/// sink, so one instance can be reused across all statements of a
/// compilation unit.
///
/// ```
/// use coble_expand::{Expander, Node, Span};
///
/// let sp = Span::dummy();
/// let stmt = Node::assign(
///     Node::var_ref("v", 10, 3, sp),
///     Node::var_ref("w", 20, 3, sp),
///     sp,
/// );
/// let expanded = Expander::new().expand(stmt).unwrap();
/// assert!(expanded.is_scalarized());
/// ```
pub struct Expander<'w> {
    trace: Option<&'w mut dyn io::Write>,
}

impl<'w> Expander<'w> {
    pub fn new() -> Self {
        Expander { trace: None }
    }

    /// Attach a sink that receives one human-readable record per
    /// expanded assignment. Tracing is best effort: write failures are
    /// ignored, and expansion behaves identically without a sink.
    pub fn with_trace(mut self, sink: &'w mut dyn io::Write) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Expand one statement. The input is consumed; on success the
    /// returned tree is fully scalarized, on error the statement is
    /// abandoned whole (no partially rewritten output escapes).
    pub fn expand(&mut self, stmt: Node) -> Result<Node, Diagnostic> {
        debug!(statement = %stmt, "expanding statement");
        let expanded = self.expand_node(stmt, 0)?;
        debug_assert!(
            expanded.is_scalarized(),
            "internal compiler error: expansion left vector-valued nodes behind: {}",
            expanded
        );
        Ok(expanded)
    }

    /// Rewrite `node` as element `index` of its enclosing vector
    /// operation. Statements pass the index through unchanged; the
    /// `Assign` arm is where one element index fans out into many.
    fn expand_node(&mut self, node: Node, index: u16) -> Result<Node, Diagnostic> {
        match node {
            Node::Block { stmts, span } => {
                let stmts = stmts
                    .into_iter()
                    .map(|stmt| self.expand_node(stmt, index))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Block { stmts, span })
            }
            Node::If {
                cond,
                then_body,
                else_body,
                span,
            } => {
                let cond = Box::new(self.expand_node(*cond, index)?);
                let then_body = Box::new(self.expand_node(*then_body, index)?);
                let else_body = match else_body {
                    Some(body) => Some(Box::new(self.expand_node(*body, index)?)),
                    None => None,
                };
                Ok(Node::If {
                    cond,
                    then_body,
                    else_body,
                    span,
                })
            }
            Node::While { cond, body, span } => {
                let cond = Box::new(self.expand_node(*cond, index)?);
                let body = Box::new(self.expand_node(*body, index)?);
                Ok(Node::While { cond, body, span })
            }
            Node::Assign {
                target,
                value,
                span,
            } => self.expand_assign(*target, *value, span),
            Node::BinOp { op, lhs, rhs, span } => {
                matching_size(&lhs, &rhs, span)?;
                let lhs = Box::new(self.expand_node(*lhs, index)?);
                let rhs = Box::new(self.expand_node(*rhs, index)?);
                Ok(Node::BinOp { op, lhs, rhs, span })
            }
            Node::UnOp { op, operand, span } => {
                let operand = Box::new(self.expand_node(*operand, index)?);
                Ok(Node::UnOp { op, operand, span })
            }
            Node::VectorLit { values, span } => {
                assert!(
                    (index as usize) < values.len(),
                    "internal compiler error: element {} out of range for vector of {} values",
                    index,
                    values.len()
                );
                Ok(Node::Immediate {
                    value: values[index as usize],
                    span,
                })
            }
            node @ Node::VarRef { .. } => {
                let Some(size) = node.memory_size()? else {
                    unreachable!("variable references always have a size")
                };
                assert!(
                    index < size,
                    "internal compiler error: element {} out of range for {} (size {})",
                    index,
                    node,
                    size
                );
                let Some(base) = node.memory_address() else {
                    return Err(Diagnostic::error(
                        format!("subscript of '{}' is not a compile-time constant", node),
                        node.span(),
                    )
                    .with_note(
                        "only constant subscripts can be expanded to absolute addresses"
                            .to_string(),
                    ));
                };
                let address = base.checked_add(index).unwrap_or_else(|| {
                    panic!(
                        "internal compiler error: address overflow at element {} of {}",
                        index, node
                    )
                });
                let span = node.span();
                if matches!(node, Node::VarRef { write: true, .. }) {
                    Ok(Node::Store { address, span })
                } else {
                    Ok(Node::Load { address, span })
                }
            }
            node @ (Node::Immediate { .. } | Node::Load { .. } | Node::Store { .. }) => Ok(node),
        }
    }

    /// One vector assignment becomes a `Block` of `size` scalar
    /// assignments, element index ascending. The target and value are
    /// re-expanded once per element, so evaluation order within each
    /// element matches the source.
    fn expand_assign(
        &mut self,
        mut target: Node,
        value: Node,
        span: Span,
    ) -> Result<Node, Diagnostic> {
        let size = matching_size(&target, &value, span)?;

        match &mut target {
            Node::VarRef { write, .. } => *write = true,
            other => panic!(
                "internal compiler error: assignment target must be a variable reference, found {}",
                other
            ),
        }

        debug!(elements = size, "scalarizing assignment");
        if let Some(sink) = self.trace.as_mut() {
            let _ = writeln!(sink, "expand {} = {} ({} elements)", target, value, size);
        }

        let mut stmts = Vec::with_capacity(size as usize);
        for i in 0..size {
            let element = Node::Assign {
                target: Box::new(self.expand_node(target.clone(), i)?),
                value: Box::new(self.expand_node(value.clone(), i)?),
                span,
            };
            trace!(index = i, element = %element, "synthesized element");
            if let Some(sink) = self.trace.as_mut() {
                let _ = writeln!(sink, "  [{}] {}", i, element);
            }
            stmts.push(element);
        }
        Ok(Node::Block { stmts, span })
    }
}

impl Default for Expander<'_> {
    fn default() -> Self {
        Expander::new()
    }
}

/// Both operands of an assignment or binary operator must cover the
/// same number of cells. Returns the agreed width.
fn matching_size(left: &Node, right: &Node, span: Span) -> Result<u16, Diagnostic> {
    let l = left.memory_size()?;
    let r = right.memory_size()?;
    match (l, r) {
        (Some(l), Some(r)) if l != r => Err(Diagnostic::error(
            format!("inconsistent size: left is {}, right is {}", l, r),
            span,
        )),
        (Some(size), _) | (_, Some(size)) => Ok(size),
        (None, None) => panic!("internal compiler error: operands have no vector size"),
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::BinaryOp;

    fn sp() -> Span {
        Span::dummy()
    }

    fn expand(stmt: Node) -> Result<Node, Diagnostic> {
        Expander::new().expand(stmt)
    }

    #[test]
    fn test_scalar_assignment() {
        let stmt = Node::assign(
            Node::var_ref("x", 3, 1, sp()),
            Node::scalar_lit(5, sp()),
            sp(),
        );
        let expanded = expand(stmt).unwrap();
        assert_eq!(format!("{}", expanded), "{ (store 3) = 5 }");
    }

    #[test]
    fn test_vector_assignment_fans_out() {
        let stmt = Node::assign(
            Node::var_ref("v", 10, 3, sp()),
            Node::var_ref("w", 20, 3, sp()),
            sp(),
        );
        let expanded = expand(stmt).unwrap();
        assert_eq!(
            format!("{}", expanded),
            "{ (store 10) = (load 20); (store 11) = (load 21); (store 12) = (load 22) }"
        );
        assert!(expanded.is_scalarized());
    }

    #[test]
    fn test_inconsistent_size_is_fatal() {
        let stmt = Node::assign(
            Node::var_ref_indexed("v", 10, 5, Node::vector_lit(vec![0, 2], sp()), sp()),
            Node::var_ref_indexed("w", 20, 5, Node::vector_lit(vec![0, 1], sp()), sp()),
            sp(),
        );
        let err = expand(stmt).unwrap_err();
        assert_eq!(err.message, "inconsistent size: left is 3, right is 2");
    }

    #[test]
    fn test_arithmetic_expands_per_element() {
        let sum = Node::bin_op(
            BinaryOp::Add,
            Node::var_ref("a", 30, 2, sp()),
            Node::var_ref("b", 40, 2, sp()),
            sp(),
        );
        let stmt = Node::assign(Node::var_ref("v", 10, 2, sp()), sum, sp());
        let expanded = expand(stmt).unwrap();
        assert_eq!(
            format!("{}", expanded),
            "{ (store 10) = ((load 30) + (load 40)); (store 11) = ((load 31) + (load 41)) }"
        );
    }

    #[test]
    fn test_statements_expand_in_place() {
        let cond = Node::bin_op(
            BinaryOp::Gt,
            Node::var_ref_indexed("v", 10, 3, Node::scalar_lit(0, sp()), sp()),
            Node::scalar_lit(0, sp()),
            sp(),
        );
        let body = Node::block(
            vec![Node::assign(
                Node::var_ref("w", 20, 2, sp()),
                Node::vector_lit(vec![1, 2], sp()),
                sp(),
            )],
            sp(),
        );
        let stmt = Node::while_stmt(cond, body, sp());
        let expanded = expand(stmt).unwrap();
        assert_eq!(
            format!("{}", expanded),
            "while (((load 10) > 0)) do ({ { (store 20) = 1; (store 21) = 2 } })"
        );
    }

    #[test]
    fn test_dynamic_subscript_is_rejected() {
        let stmt = Node::assign(
            Node::var_ref_indexed("v", 10, 3, Node::var_ref("i", 5, 1, sp()), sp()),
            Node::scalar_lit(4, sp()),
            sp(),
        );
        let err = expand(stmt).unwrap_err();
        assert_eq!(
            err.message,
            "subscript of 'v[i]' is not a compile-time constant"
        );
    }

    #[test]
    #[should_panic(expected = "assignment target must be a variable reference")]
    fn test_non_reference_target_panics() {
        let stmt = Node::assign(Node::scalar_lit(1, sp()), Node::scalar_lit(2, sp()), sp());
        let _ = expand(stmt);
    }

    #[test]
    #[should_panic(expected = "address overflow")]
    fn test_cells_past_memory_top_panic() {
        let stmt = Node::assign(
            Node::var_ref("v", u16::MAX, 2, sp()),
            Node::var_ref("w", 20, 2, sp()),
            sp(),
        );
        let _ = expand(stmt);
    }

    #[test]
    #[should_panic(expected = "subscript literal with 3 values")]
    fn test_malformed_subscript_literal_panics() {
        let stmt = Node::assign(
            Node::var_ref_indexed("v", 10, 5, Node::vector_lit(vec![0, 1, 2], sp()), sp()),
            Node::var_ref("w", 20, 3, sp()),
            sp(),
        );
        let _ = expand(stmt);
    }

    #[test]
    fn test_scalar_leaves_pass_through() {
        let mut expander = Expander::new();
        let node = expander.expand_node(Node::load(7, sp()), 0).unwrap();
        assert_eq!(node, Node::load(7, sp()));
        let node = expander.expand_node(Node::immediate(-4, sp()), 0).unwrap();
        assert_eq!(node, Node::immediate(-4, sp()));
    }

    #[test]
    fn test_trace_records_each_element() {
        let mut sink = Vec::new();
        let stmt = Node::assign(
            Node::var_ref("v", 10, 2, sp()),
            Node::var_ref("w", 20, 2, sp()),
            sp(),
        );
        Expander::new()
            .with_trace(&mut sink)
            .expand(stmt)
            .unwrap();
        let text = String::from_utf8(sink).unwrap();
        assert!(text.contains("expand v = w (2 elements)"));
        assert!(text.contains("  [0] (store 10) = (load 20)"));
        assert!(text.contains("  [1] (store 11) = (load 21)"));
    }
}
