//! Mutation operators
//!
//! An [`Operator`] looks at one expression, decides whether it can mutate it,
//! and if so edits it in place, hands the edited expression to a callback and
//! puts the original back before returning. The [`Catalog`] is the ordered
//! set of operators a run applies at every node.

use quote::ToTokens;
use serde::Deserialize;
use syn::{BinOp, Expr, ExprBlock, ExprIf};

/// A reversible, in-place edit of a single expression
pub trait Operator: Send + Sync {
    /// Stable identifier used in configuration and reports
    fn name(&self) -> &'static str;

    /// Mutate `expr` if eligible.
    ///
    /// Returns `false` without touching `expr` or calling `mutant` when the
    /// node is not eligible. Otherwise performs the edit, calls `mutant`
    /// exactly once with the edited node, undoes the edit and returns `true`.
    fn apply(&self, expr: &mut Expr, mutant: &mut dyn FnMut(&Expr)) -> bool;

    /// Human readable description of the mutation this operator would make to `expr`
    fn describe(&self, expr: &Expr) -> String;
}

/// Operators that can be selected from the command line or the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorKind {
    /// Exchange the `if` and `else` blocks of a two-branch conditional
    SwapBranch,
    /// Negate a comparison (`<` to `>=`, `==` to `!=`, ...)
    FlipComparison,
    /// Move an ordering boundary (`<` to `<=`, `>` to `>=` and back)
    ShiftBoundary,
}

impl OperatorKind {
    pub fn build(self) -> Box<dyn Operator> {
        match self {
            OperatorKind::SwapBranch => Box::new(SwapBranch),
            OperatorKind::FlipComparison => Box::new(BinOpSwap::FLIP_COMPARISON),
            OperatorKind::ShiftBoundary => Box::new(BinOpSwap::SHIFT_BOUNDARY),
        }
    }
}

/// Ordered list of operators applied at every node
pub struct Catalog {
    operators: Vec<Box<dyn Operator>>,
}

impl Catalog {
    /// Build a catalog from operator kinds, keeping the first occurrence of duplicates
    pub fn new(kinds: &[OperatorKind]) -> Self {
        let mut seen = Vec::new();
        let mut operators = Vec::new();
        for &kind in kinds {
            if !seen.contains(&kind) {
                seen.push(kind);
                operators.push(kind.build());
            }
        }
        Self { operators }
    }

    /// Register an additional operator after the existing ones
    pub fn with_operator(mut self, operator: Box<dyn Operator>) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Operator> {
        self.operators.iter().map(|op| op.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|op| op.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(&[OperatorKind::SwapBranch])
    }
}

/// Swaps the body of an `if` with its `else` block.
///
/// Else-if chains are left alone, as are conditionals without an `else` and
/// `if let` conditions, whose bindings are only in scope in the first block.
pub struct SwapBranch;

impl SwapBranch {
    fn is_eligible(expr_if: &ExprIf) -> bool {
        else_block(expr_if).is_some() && !binds_pattern(&expr_if.cond)
    }
}

impl Operator for SwapBranch {
    fn name(&self) -> &'static str {
        "swap-branch"
    }

    fn apply(&self, expr: &mut Expr, mutant: &mut dyn FnMut(&Expr)) -> bool {
        match expr {
            Expr::If(expr_if) if Self::is_eligible(expr_if) => swap_blocks(expr_if),
            _ => return false,
        }

        mutant(expr);

        if let Expr::If(expr_if) = expr {
            swap_blocks(expr_if);
        }
        true
    }

    fn describe(&self, expr: &Expr) -> String {
        match expr {
            Expr::If(expr_if) => format!("swap branches of `if {}`", snippet(&*expr_if.cond)),
            _ => "swap branches".to_string(),
        }
    }
}

/// The `else` branch of `expr_if` when it is a plain block
fn else_block(expr_if: &ExprIf) -> Option<&ExprBlock> {
    let (_, else_branch) = expr_if.else_branch.as_ref()?;
    match else_branch.as_ref() {
        Expr::Block(block) if block.label.is_none() && block.attrs.is_empty() => Some(block),
        _ => None,
    }
}

fn swap_blocks(expr_if: &mut ExprIf) {
    if let Some((_, else_branch)) = expr_if.else_branch.as_mut() {
        if let Expr::Block(else_block) = else_branch.as_mut() {
            std::mem::swap(&mut expr_if.then_branch, &mut else_block.block);
        }
    }
}

/// Whether a condition introduces bindings (`if let`, let chains)
fn binds_pattern(cond: &Expr) -> bool {
    match cond {
        Expr::Let(_) => true,
        Expr::Binary(binary) if matches!(binary.op, BinOp::And(_)) => {
            binds_pattern(&binary.left) || binds_pattern(&binary.right)
        }
        _ => false,
    }
}

/// Replaces the operator of a binary expression according to a fixed mapping
pub struct BinOpSwap {
    name: &'static str,
    replace: fn(&BinOp) -> Option<BinOp>,
}

impl BinOpSwap {
    pub const FLIP_COMPARISON: BinOpSwap = BinOpSwap {
        name: "flip-comparison",
        replace: flip_comparison,
    };

    pub const SHIFT_BOUNDARY: BinOpSwap = BinOpSwap {
        name: "shift-boundary",
        replace: shift_boundary,
    };
}

fn flip_comparison(op: &BinOp) -> Option<BinOp> {
    match op {
        BinOp::Lt(_) => Some(BinOp::Ge(Default::default())),
        BinOp::Ge(_) => Some(BinOp::Lt(Default::default())),
        BinOp::Gt(_) => Some(BinOp::Le(Default::default())),
        BinOp::Le(_) => Some(BinOp::Gt(Default::default())),
        BinOp::Eq(_) => Some(BinOp::Ne(Default::default())),
        BinOp::Ne(_) => Some(BinOp::Eq(Default::default())),
        _ => None,
    }
}

fn shift_boundary(op: &BinOp) -> Option<BinOp> {
    match op {
        BinOp::Lt(_) => Some(BinOp::Le(Default::default())),
        BinOp::Le(_) => Some(BinOp::Lt(Default::default())),
        BinOp::Gt(_) => Some(BinOp::Ge(Default::default())),
        BinOp::Ge(_) => Some(BinOp::Gt(Default::default())),
        _ => None,
    }
}

impl Operator for BinOpSwap {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, expr: &mut Expr, mutant: &mut dyn FnMut(&Expr)) -> bool {
        let original = match expr {
            Expr::Binary(binary) => match (self.replace)(&binary.op) {
                Some(replacement) => std::mem::replace(&mut binary.op, replacement),
                None => return false,
            },
            _ => return false,
        };

        mutant(expr);

        if let Expr::Binary(binary) = expr {
            binary.op = original;
        }
        true
    }

    fn describe(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary(binary) => match (self.replace)(&binary.op) {
                Some(replacement) => format!(
                    "replace `{}` with `{}` in `{}`",
                    snippet(&binary.op),
                    snippet(&replacement),
                    snippet(expr)
                ),
                None => self.name.to_string(),
            },
            _ => self.name.to_string(),
        }
    }
}

/// Short single-line rendering of a syntax fragment for reports
fn snippet(node: &dyn ToTokens) -> String {
    const MAX: usize = 60;
    let text = node.to_token_stream().to_string();
    if text.chars().count() > MAX {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    } else {
        text
    }
}
