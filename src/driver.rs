//! The mutation driver
//!
//! For every primary source file the driver walks the tree once, offering
//! every node to every operator of the catalog. An operator that applies
//! hands its edited node to the driver's callback, which keeps a copy, and
//! then restores the node. Each copy becomes one mutant: it is spliced into a
//! private clone of the file, written to a fresh directory and tested. The
//! shared tree is therefore only ever changed for the duration of an
//! `apply` call, and is checked to be identical once the call returns.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use syn::Expr;
use tracing::{debug, info, warn};

use crate::codegen::splice_expr;
use crate::error::{MutationError, Result};
use crate::materialize::Materializer;
use crate::mutator::{Catalog, Operator};
use crate::package::Package;
use crate::report::MutationReport;
use crate::runner::TestCommand;
use crate::score::Score;
use crate::walker::{line_of, walk_exprs};

/// What the test suite made of a mutant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutantOutcome {
    /// Tests failed - mutation was detected (good!)
    Killed,
    /// Tests passed - mutation was NOT detected (bad!)
    Survived,
    /// The tests could not be run or did not finish
    ExecutionError,
}

/// A mutant after its test cycle
#[derive(Debug, Clone)]
pub struct Mutant {
    pub id: usize,
    pub dir: PathBuf,
    /// Mutated file, relative to the package root
    pub file: PathBuf,
    pub line: usize,
    pub operator: &'static str,
    pub description: String,
    pub outcome: MutantOutcome,
    /// How the test command ended
    pub details: String,
    pub duration: Duration,
}

/// A mutation found during the walk, not yet tested
#[derive(Debug)]
struct Site {
    ordinal: usize,
    line: usize,
    operator: &'static str,
    description: String,
    mutated: Expr,
}

/// Runs every operator of a catalog over a package
pub struct Driver<'a> {
    catalog: &'a Catalog,
    materializer: &'a Materializer,
    command: &'a TestCommand,
    score: Score,
    mutants: Vec<Mutant>,
}

impl<'a> Driver<'a> {
    pub fn new(
        catalog: &'a Catalog,
        materializer: &'a Materializer,
        command: &'a TestCommand,
    ) -> Self {
        Self {
            catalog,
            materializer,
            command,
            score: Score::new(),
            mutants: Vec::new(),
        }
    }

    /// Generate and test every mutant of the primary sources of `package`
    pub fn run(mut self, package: &mut Package) -> Result<MutationReport> {
        let started = Instant::now();
        let primary: Vec<usize> = package.primary_files().map(|(index, _)| index).collect();

        for index in primary {
            let file = &mut package.sources[index];
            let sites = discover_sites(&file.path, &mut file.ast, self.catalog)?;
            debug!(file = %file.path.display(), sites = sites.len(), "walked file");

            for site in sites {
                self.test_site(package, index, site)?;
            }
        }

        let summary = self.score.summary();
        info!(
            generated = summary.generated,
            killed = summary.killed,
            errors = summary.errors,
            "mutation run finished"
        );
        Ok(MutationReport::new(
            package.name.clone(),
            self.mutants,
            summary,
            started.elapsed(),
        ))
    }

    /// Materialize, test and record one mutant
    fn test_site(&mut self, package: &Package, index: usize, site: Site) -> Result<()> {
        let file = &package.sources[index];
        let spliced = splice_expr(&file.ast, site.ordinal, &site.mutated).ok_or_else(|| {
            inconsistency(site.operator, &file.path, site.line, "mutated node has no counterpart")
        })?;

        let dir = self.materializer.materialize(package, Some((index, &spliced)))?;

        let started = Instant::now();
        let run = self.command.run(&dir.path);
        let duration = started.elapsed();
        let outcome = run.outcome();
        self.score.record(outcome);

        if outcome == MutantOutcome::ExecutionError {
            warn!(
                mutant = dir.id,
                file = %file.path.display(),
                line = site.line,
                "{}",
                run.describe()
            );
        } else {
            debug!(mutant = dir.id, ?outcome, "{}", site.description);
        }

        self.mutants.push(Mutant {
            id: dir.id,
            dir: dir.path,
            file: file.path.clone(),
            line: site.line,
            operator: site.operator,
            description: site.description,
            outcome,
            details: run.describe(),
            duration,
        });
        Ok(())
    }
}

/// Walk `ast` once, applying every operator at every node.
///
/// Fails if an operator breaks its contract: the callback must run exactly
/// once when it applies and never otherwise, and the node must be back to
/// its original state when `apply` returns.
fn discover_sites(path: &Path, ast: &mut syn::File, catalog: &Catalog) -> Result<Vec<Site>> {
    let mut sites = Vec::new();
    let mut failure = None;

    walk_exprs(ast, |ordinal, expr| {
        let before = expr.clone();

        for operator in catalog.iter() {
            let mut captured = Vec::with_capacity(1);
            let applied = operator.apply(expr, &mut |mutated| captured.push(mutated.clone()));

            if let Err(reason) = check_contract(applied, captured.len(), *expr == before) {
                failure = Some(inconsistency(operator.name(), path, line_of(expr), &reason));
                return ControlFlow::Break(());
            }

            if let Some(mutated) = captured.pop() {
                sites.push(site(operator, ordinal, expr, mutated));
            }
        }

        ControlFlow::Continue(())
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(sites),
    }
}

fn site(operator: &dyn Operator, ordinal: usize, expr: &Expr, mutated: Expr) -> Site {
    Site {
        ordinal,
        line: line_of(expr),
        operator: operator.name(),
        description: operator.describe(expr),
        mutated,
    }
}

fn check_contract(applied: bool, calls: usize, restored: bool) -> std::result::Result<(), String> {
    if !restored {
        return Err("node was not restored".to_string());
    }
    match (applied, calls) {
        (true, 1) | (false, 0) => Ok(()),
        (true, n) => Err(format!("mutant callback ran {n} times")),
        (false, _) => Err("mutant callback ran for an ineligible node".to_string()),
    }
}

fn inconsistency(operator: &str, file: &Path, line: usize, reason: &str) -> MutationError {
    MutationError::InternalConsistency {
        operator: operator.to_string(),
        file: file.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}
