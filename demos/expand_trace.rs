//! Expand a two-statement Coble program with the trace sink on stdout.
//!
//! The first statement scalarizes cleanly; the second carries a size
//! mismatch and shows the rendered diagnostic.
//!
//! Run with `cargo run --example expand_trace`.

use std::io;

use coble_expand::{render_diagnostics, BinaryOp, Expander, Node, Span};

fn main() {
    let source = "speed[0:2] = target[0:2] + speed[0:2]\ngain[0:2] = bias[0:1]\n";

    // speed[0:2] = target[0:2] + speed[0:2]
    let copy = Node::assign(
        Node::var_ref_indexed(
            "speed",
            10,
            3,
            Node::vector_lit(vec![0, 2], Span::new(6, 9)),
            Span::new(0, 10),
        ),
        Node::bin_op(
            BinaryOp::Add,
            Node::var_ref_indexed(
                "target",
                20,
                3,
                Node::vector_lit(vec![0, 2], Span::new(20, 23)),
                Span::new(13, 24),
            ),
            Node::var_ref_indexed(
                "speed",
                10,
                3,
                Node::vector_lit(vec![0, 2], Span::new(33, 36)),
                Span::new(27, 37),
            ),
            Span::new(13, 37),
        ),
        Span::new(0, 37),
    );

    println!("before  {}", copy);
    let mut stdout = io::stdout();
    let expanded = Expander::new()
        .with_trace(&mut stdout)
        .expand(copy)
        .expect("sizes agree");
    println!("after   {}", expanded);
    println!();

    // gain[0:2] = bias[0:1], three cells against two
    let mismatched = Node::assign(
        Node::var_ref_indexed(
            "gain",
            30,
            3,
            Node::vector_lit(vec![0, 2], Span::new(43, 46)),
            Span::new(38, 47),
        ),
        Node::var_ref_indexed(
            "bias",
            40,
            2,
            Node::vector_lit(vec![0, 1], Span::new(55, 58)),
            Span::new(50, 59),
        ),
        Span::new(38, 59),
    );
    if let Err(err) = Expander::new().expand(mismatched) {
        render_diagnostics(&[err], "demo.coble", source);
    }
}
