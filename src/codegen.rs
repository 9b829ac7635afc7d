//! Code generation from AST
//!
//! This module handles converting (possibly mutated) ASTs back to source code.

use std::ops::ControlFlow;

use syn::Expr;

use crate::walker::walk_exprs;

/// Generate source code from AST
pub fn generate_source(ast: &syn::File) -> String {
    prettyplease::unparse(ast)
}

/// Clone `file` with the expression at `ordinal` replaced by `replacement`.
///
/// Returns `None` when the walk never reaches `ordinal`.
pub fn splice_expr(file: &syn::File, ordinal: usize, replacement: &Expr) -> Option<syn::File> {
    let mut spliced = file.clone();
    let mut found = false;

    walk_exprs(&mut spliced, |current, expr| {
        if current == ordinal {
            *expr = replacement.clone();
            found = true;
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    found.then_some(spliced)
}
