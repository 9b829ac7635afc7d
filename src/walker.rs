//! Deterministic traversal of the expressions of a source file
//!
//! Every expression gets an ordinal: its position in a pre-order, depth-first
//! walk of the file. Two walks over structurally equal trees hand out the
//! same ordinals, which is what lets a mutated node found in one copy of a
//! tree be put back into another copy.
//!
//! Test-only code (`#[test]` functions, `#[cfg(test)]` items) is never
//! visited, and neither are attributes or macro bodies.

use std::ops::ControlFlow;

use syn::spanned::Spanned;
use syn::visit_mut::{self, VisitMut};
use syn::{Attribute, Expr, ImplItemFn, ItemFn, ItemImpl, ItemMod, Meta};

/// Visit every mutable expression of `file` in pre-order.
///
/// `visit` receives the ordinal and the expression before its children are
/// visited. Returning [`ControlFlow::Break`] ends the walk.
pub fn walk_exprs<F>(file: &mut syn::File, visit: F)
where
    F: FnMut(usize, &mut Expr) -> ControlFlow<()>,
{
    let mut walker = ExprWalker {
        next: 0,
        stopped: false,
        visit,
    };
    walker.visit_file_mut(file);
}

/// Number of expressions a walk over `file` visits
pub fn count_exprs(file: &syn::File) -> usize {
    let mut file = file.clone();
    let mut count = 0;
    walk_exprs(&mut file, |_, _| {
        count += 1;
        ControlFlow::Continue(())
    });
    count
}

/// Source line (1-indexed) where `expr` starts
pub fn line_of(expr: &Expr) -> usize {
    expr.span().start().line
}

struct ExprWalker<F> {
    next: usize,
    stopped: bool,
    visit: F,
}

impl<F> VisitMut for ExprWalker<F>
where
    F: FnMut(usize, &mut Expr) -> ControlFlow<()>,
{
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.stopped {
            return;
        }

        let ordinal = self.next;
        self.next += 1;

        if (self.visit)(ordinal, expr).is_break() {
            self.stopped = true;
            return;
        }

        visit_mut::visit_expr_mut(self, expr);
    }

    fn visit_item_fn_mut(&mut self, item: &mut ItemFn) {
        if !is_test_only(&item.attrs) {
            visit_mut::visit_item_fn_mut(self, item);
        }
    }

    fn visit_impl_item_fn_mut(&mut self, item: &mut ImplItemFn) {
        if !is_test_only(&item.attrs) {
            visit_mut::visit_impl_item_fn_mut(self, item);
        }
    }

    fn visit_item_mod_mut(&mut self, item: &mut ItemMod) {
        if !is_test_only(&item.attrs) {
            visit_mut::visit_item_mod_mut(self, item);
        }
    }

    fn visit_item_impl_mut(&mut self, item: &mut ItemImpl) {
        if !is_test_only(&item.attrs) {
            visit_mut::visit_item_impl_mut(self, item);
        }
    }

    fn visit_attribute_mut(&mut self, _attr: &mut Attribute) {}
}

/// `#[test]`, `#[tokio::test]`, `#[cfg(test)]` and friends
pub(crate) fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| match &attr.meta {
        Meta::Path(path) => path.segments.last().is_some_and(|seg| seg.ident == "test"),
        Meta::List(list) => list.path.is_ident("cfg") && list.tokens.to_string().trim() == "test",
        Meta::NameValue(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quote::ToTokens;

    fn collect(source: &str) -> Vec<(usize, String)> {
        let mut file = syn::parse_file(source).unwrap();
        let mut seen = Vec::new();
        walk_exprs(&mut file, |ordinal, expr| {
            seen.push((ordinal, expr.to_token_stream().to_string()));
            ControlFlow::Continue(())
        });
        seen
    }

    #[test]
    fn test_pre_order() {
        let seen = collect("fn f(a: i32) -> i32 { a + 1 }");
        assert_eq!(
            seen,
            vec![
                (0, "a + 1".to_string()),
                (1, "a".to_string()),
                (2, "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_skips_test_code() {
        let source = r#"
            fn real(a: bool) -> u8 { if a { 1 } else { 2 } }

            #[test]
            fn unit() { if true { } else { } }

            #[cfg(test)]
            mod tests {
                fn helper() -> u8 { 3 }
            }

            #[tokio::test]
            async fn async_unit() { let _ = 4; }
        "#;
        let seen: Vec<String> = collect(source).into_iter().map(|(_, e)| e).collect();
        assert_eq!(seen.len(), 5, "{seen:?}");
        assert!(seen.iter().all(|e| !e.contains('3') && !e.contains('4')));
    }

    #[test]
    fn test_cfg_not_test_is_walked() {
        let seen = collect("#[cfg(not(test))] fn f() -> u8 { 7 }");
        assert_eq!(seen, vec![(0, "7".to_string())]);
    }

    #[test]
    fn test_break_stops_walk() {
        let mut file = syn::parse_file("fn f() { let _ = (1, 2, 3); }").unwrap();
        let mut visited = 0;
        walk_exprs(&mut file, |ordinal, _| {
            visited += 1;
            if ordinal == 1 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_count_and_line() {
        let source = "fn f(a: bool) -> u8 {\n    if a {\n        1\n    } else {\n        2\n    }\n}\n";
        let mut file = syn::parse_file(source).unwrap();
        assert_eq!(count_exprs(&file), 5);

        let mut lines = Vec::new();
        walk_exprs(&mut file, |_, expr| {
            lines.push(line_of(expr));
            ControlFlow::Continue(())
        });
        // `if`, its condition, `1`, the `else` block and `2`
        assert_eq!(lines, vec![2, 2, 3, 4, 5]);
    }
}
