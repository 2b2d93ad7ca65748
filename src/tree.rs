use std::fmt;

use crate::span::Span;

/// Binary operators carried through expansion unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    BitNot,
}

/// A statement or expression in the Coble compile tree.
///
/// The tree arrives from the symbol/type-check stage with every `VarRef`
/// carrying its resolved base address and declared cell count, and every
/// literal held as a `VectorLit` (scalar literals are length-1 vectors).
/// `Immediate`, `Load`, and `Store` exist only in expanded output: after
/// the expansion pass, every reachable leaf is one of those three.
///
/// Each node owns its children outright; the tree has no sharing and no
/// cycles, so rewriting a sub-tree is a single move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Statement sequence. Also the shape expansion leaves behind when a
    /// vector assignment becomes a run of scalar assignments.
    Block { stmts: Vec<Node>, span: Span },
    If {
        cond: Box<Node>,
        then_body: Box<Node>,
        else_body: Option<Box<Node>>,
        span: Span,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
        span: Span,
    },
    /// `target = value`. Before expansion the target is a `VarRef`;
    /// afterwards each synthesized element pairs a `Store` with a scalar
    /// expression.
    Assign {
        target: Box<Node>,
        value: Box<Node>,
        span: Span,
    },
    BinOp {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
        span: Span,
    },
    UnOp {
        op: UnaryOp,
        operand: Box<Node>,
        span: Span,
    },
    /// Reference to a named variable or array in flat VM memory.
    ///
    /// `base` and `declared_size` come resolved from the symbol table.
    /// `index` is the optional subscript sub-tree: a length-1 `VectorLit`
    /// selects one cell, a length-2 `VectorLit` selects the inclusive
    /// range `[lo, hi]`, anything else is a dynamic subscript. `write`
    /// is set by the expansion pass on assignment targets.
    VarRef {
        name: String,
        base: u16,
        declared_size: u16,
        index: Option<Box<Node>>,
        write: bool,
        span: Span,
    },
    /// Literal vector of compile-time constants.
    VectorLit { values: Vec<i16>, span: Span },
    /// A single constant value (expanded output only).
    Immediate { value: i16, span: Span },
    /// Read of one memory cell at an absolute address (expanded output only).
    Load { address: u16, span: Span },
    /// Write of one memory cell at an absolute address (expanded output only).
    Store { address: u16, span: Span },
}

impl Node {
    pub fn block(stmts: Vec<Node>, span: Span) -> Node {
        Node::Block { stmts, span }
    }

    pub fn if_stmt(cond: Node, then_body: Node, else_body: Option<Node>, span: Span) -> Node {
        Node::If {
            cond: Box::new(cond),
            then_body: Box::new(then_body),
            else_body: else_body.map(Box::new),
            span,
        }
    }

    pub fn while_stmt(cond: Node, body: Node, span: Span) -> Node {
        Node::While {
            cond: Box::new(cond),
            body: Box::new(body),
            span,
        }
    }

    pub fn assign(target: Node, value: Node, span: Span) -> Node {
        Node::Assign {
            target: Box::new(target),
            value: Box::new(value),
            span,
        }
    }

    pub fn bin_op(op: BinaryOp, lhs: Node, rhs: Node, span: Span) -> Node {
        Node::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        }
    }

    pub fn un_op(op: UnaryOp, operand: Node, span: Span) -> Node {
        Node::UnOp {
            op,
            operand: Box::new(operand),
            span,
        }
    }

    /// Whole-array reference (no subscript), read context.
    pub fn var_ref(name: &str, base: u16, declared_size: u16, span: Span) -> Node {
        Node::VarRef {
            name: name.to_string(),
            base,
            declared_size,
            index: None,
            write: false,
            span,
        }
    }

    /// Subscripted reference, read context.
    pub fn var_ref_indexed(
        name: &str,
        base: u16,
        declared_size: u16,
        index: Node,
        span: Span,
    ) -> Node {
        Node::VarRef {
            name: name.to_string(),
            base,
            declared_size,
            index: Some(Box::new(index)),
            write: false,
            span,
        }
    }

    pub fn vector_lit(values: Vec<i16>, span: Span) -> Node {
        Node::VectorLit { values, span }
    }

    /// Scalar literal: a length-1 `VectorLit`, the form the parser produces.
    pub fn scalar_lit(value: i16, span: Span) -> Node {
        Node::VectorLit {
            values: vec![value],
            span,
        }
    }

    pub fn immediate(value: i16, span: Span) -> Node {
        Node::Immediate { value, span }
    }

    pub fn load(address: u16, span: Span) -> Node {
        Node::Load { address, span }
    }

    pub fn store(address: u16, span: Span) -> Node {
        Node::Store { address, span }
    }

    pub fn span(&self) -> Span {
        match self {
            Node::Block { span, .. }
            | Node::If { span, .. }
            | Node::While { span, .. }
            | Node::Assign { span, .. }
            | Node::BinOp { span, .. }
            | Node::UnOp { span, .. }
            | Node::VarRef { span, .. }
            | Node::VectorLit { span, .. }
            | Node::Immediate { span, .. }
            | Node::Load { span, .. }
            | Node::Store { span, .. } => *span,
        }
    }

    /// True when every reachable leaf is scalar granularity: `Immediate`,
    /// `Load`, or `Store`. This is the post-condition of expansion; the
    /// code generator relies on it.
    pub fn is_scalarized(&self) -> bool {
        match self {
            Node::Block { stmts, .. } => stmts.iter().all(Node::is_scalarized),
            Node::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                cond.is_scalarized()
                    && then_body.is_scalarized()
                    && else_body.as_ref().map_or(true, |e| e.is_scalarized())
            }
            Node::While { cond, body, .. } => cond.is_scalarized() && body.is_scalarized(),
            Node::Assign { target, value, .. } => target.is_scalarized() && value.is_scalarized(),
            Node::BinOp { lhs, rhs, .. } => lhs.is_scalarized() && rhs.is_scalarized(),
            Node::UnOp { operand, .. } => operand.is_scalarized(),
            Node::VarRef { .. } | Node::VectorLit { .. } => false,
            Node::Immediate { .. } | Node::Load { .. } | Node::Store { .. } => true,
        }
    }
}

// ─── Pretty-printing ──────────────────────────────────────────────
//
// One-line textual form, shared by the expansion trace and by tests.

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Block { stmts, .. } => {
                if stmts.is_empty() {
                    return write!(f, "{{ }}");
                }
                write!(f, "{{ ")?;
                for (i, stmt) in stmts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", stmt)?;
                }
                write!(f, " }}")
            }
            Node::If {
                cond,
                then_body,
                else_body,
                ..
            } => match else_body {
                Some(else_body) => {
                    write!(f, "if ({}) then ({}) else ({})", cond, then_body, else_body)
                }
                None => write!(f, "if ({}) then ({})", cond, then_body),
            },
            Node::While { cond, body, .. } => write!(f, "while ({}) do ({})", cond, body),
            Node::Assign { target, value, .. } => write!(f, "{} = {}", target, value),
            Node::BinOp { op, lhs, rhs, .. } => {
                write!(f, "({} {} {})", lhs, op.as_str(), rhs)
            }
            Node::UnOp { op, operand, .. } => match op {
                UnaryOp::Neg => write!(f, "(-{})", operand),
                UnaryOp::Abs => write!(f, "(abs {})", operand),
                UnaryOp::BitNot => write!(f, "(~{})", operand),
            },
            Node::VarRef { name, index, .. } => match index.as_deref() {
                None => write!(f, "{}", name),
                Some(Node::VectorLit { values, .. }) if values.len() == 1 => {
                    write!(f, "{}[{}]", name, values[0])
                }
                Some(Node::VectorLit { values, .. }) if values.len() == 2 => {
                    write!(f, "{}[{}:{}]", name, values[0], values[1])
                }
                Some(index) => write!(f, "{}[{}]", name, index),
            },
            Node::VectorLit { values, .. } => {
                if values.len() == 1 {
                    write!(f, "{}", values[0])
                } else {
                    write!(f, "[")?;
                    for (i, v) in values.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", v)?;
                    }
                    write!(f, "]")
                }
            }
            Node::Immediate { value, .. } => write!(f, "{}", value),
            Node::Load { address, .. } => write!(f, "(load {})", address),
            Node::Store { address, .. } => write!(f, "(store {})", address),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::dummy()
    }

    #[test]
    fn test_print_assignment() {
        let stmt = Node::assign(
            Node::var_ref("v", 10, 3, sp()),
            Node::var_ref("w", 20, 3, sp()),
            sp(),
        );
        assert_eq!(format!("{}", stmt), "v = w");
    }

    #[test]
    fn test_print_indexed_and_range_refs() {
        let single = Node::var_ref_indexed("v", 10, 3, Node::scalar_lit(2, sp()), sp());
        assert_eq!(format!("{}", single), "v[2]");

        let range = Node::var_ref_indexed("v", 10, 3, Node::vector_lit(vec![0, 2], sp()), sp());
        assert_eq!(format!("{}", range), "v[0:2]");

        let dynamic = Node::var_ref_indexed("v", 10, 3, Node::var_ref("i", 5, 1, sp()), sp());
        assert_eq!(format!("{}", dynamic), "v[i]");
    }

    #[test]
    fn test_print_arithmetic() {
        let e = Node::bin_op(
            BinaryOp::Add,
            Node::var_ref("w", 20, 3, sp()),
            Node::un_op(UnaryOp::Neg, Node::scalar_lit(4, sp()), sp()),
            sp(),
        );
        assert_eq!(format!("{}", e), "(w + (-4))");
    }

    #[test]
    fn test_print_vector_literals() {
        assert_eq!(format!("{}", Node::vector_lit(vec![1, 2, 3], sp())), "[1, 2, 3]");
        // Scalar literals print bare, the way they were written.
        assert_eq!(format!("{}", Node::scalar_lit(7, sp())), "7");
    }

    #[test]
    fn test_print_scalar_ops() {
        let stmt = Node::assign(Node::store(10, sp()), Node::load(20, sp()), sp());
        assert_eq!(format!("{}", stmt), "(store 10) = (load 20)");
    }

    #[test]
    fn test_print_block_and_if() {
        let block = Node::block(
            vec![
                Node::assign(Node::store(10, sp()), Node::immediate(1, sp()), sp()),
                Node::assign(Node::store(11, sp()), Node::immediate(2, sp()), sp()),
            ],
            sp(),
        );
        assert_eq!(
            format!("{}", block),
            "{ (store 10) = 1; (store 11) = 2 }"
        );

        let cond = Node::bin_op(
            BinaryOp::Gt,
            Node::load(5, sp()),
            Node::immediate(0, sp()),
            sp(),
        );
        let stmt = Node::if_stmt(cond, block, None, sp());
        assert_eq!(
            format!("{}", stmt),
            "if (((load 5) > 0)) then ({ (store 10) = 1; (store 11) = 2 })"
        );
    }

    #[test]
    fn test_is_scalarized() {
        assert!(Node::load(3, sp()).is_scalarized());
        assert!(Node::assign(Node::store(1, sp()), Node::immediate(0, sp()), sp()).is_scalarized());
        assert!(!Node::var_ref("v", 10, 3, sp()).is_scalarized());
        assert!(!Node::assign(
            Node::store(1, sp()),
            Node::scalar_lit(0, sp()),
            sp()
        )
        .is_scalarized());
    }

    #[test]
    fn test_span_accessor() {
        let n = Node::immediate(1, Span::new(3, 4));
        assert_eq!(n.span(), Span::new(3, 4));
    }
}
