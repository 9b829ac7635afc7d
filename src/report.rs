//! Report generation for mutation testing results
//!
//! The score line is the only thing a run writes to stdout. The detailed,
//! per-mutant report goes to stderr.

use colored::Colorize;
use std::time::Duration;

use crate::driver::{Mutant, MutantOutcome};
use crate::score::ScoreSummary;

/// Summary report of a mutation run
#[derive(Debug)]
pub struct MutationReport {
    pub package: String,
    pub mutants: Vec<Mutant>,
    pub summary: ScoreSummary,
    pub total_duration: Duration,
}

impl MutationReport {
    pub fn new(
        package: String,
        mutants: Vec<Mutant>,
        summary: ScoreSummary,
        total_duration: Duration,
    ) -> Self {
        Self {
            package,
            mutants,
            summary,
            total_duration,
        }
    }

    /// Count of mutants that were killed (detected by tests)
    pub fn killed(&self) -> usize {
        self.summary.killed
    }

    /// Count of mutants that survived (not detected by tests)
    pub fn survived(&self) -> usize {
        self.summary.survived()
    }

    /// Count of mutants whose tests could not be run
    pub fn execution_errors(&self) -> usize {
        self.summary.errors
    }

    /// Total number of mutants
    pub fn total(&self) -> usize {
        self.summary.generated
    }

    /// Killed over generated, NaN when no mutant was generated
    pub fn score(&self) -> f64 {
        self.summary.ratio()
    }

    /// The line printed on stdout at the end of a run
    pub fn score_line(&self) -> String {
        format!("Mutation score: {}", self.score())
    }

    /// Get surviving mutants (test gaps)
    pub fn surviving_mutants(&self) -> Vec<&Mutant> {
        self.with_outcome(MutantOutcome::Survived)
    }

    pub fn failed_executions(&self) -> Vec<&Mutant> {
        self.with_outcome(MutantOutcome::ExecutionError)
    }

    fn with_outcome(&self, outcome: MutantOutcome) -> Vec<&Mutant> {
        self.mutants
            .iter()
            .filter(|m| m.outcome == outcome)
            .collect()
    }

    /// Print the per-mutant report to stderr
    pub fn print_details(&self) {
        eprintln!();
        eprintln!("{} {}", "Mutation Testing Report:".bold(), self.package);
        eprintln!("{}", "=".repeat(60));
        eprintln!();

        for mutant in &self.mutants {
            let status_str = match mutant.outcome {
                MutantOutcome::Killed => "[KILLED]".green().bold(),
                MutantOutcome::Survived => "[SURVIVED]".red().bold(),
                MutantOutcome::ExecutionError => "[ERROR]".yellow().bold(),
            };

            eprintln!(
                "{} {} - {}",
                status_str,
                format!("#{}", mutant.id).dimmed(),
                mutant.description
            );
            eprintln!(
                "        {} {} ({})",
                format!("{}:{}", mutant.file.display(), mutant.line).dimmed(),
                mutant.operator,
                format_duration(mutant.duration)
            );
            if mutant.outcome == MutantOutcome::ExecutionError {
                eprintln!("        {}", mutant.details.yellow());
            }
        }

        eprintln!();
        eprintln!("{}", "Summary".bold());
        eprintln!("{}", "-".repeat(40));
        eprintln!("Total mutants:     {}", self.total());
        eprintln!(
            "Killed:            {} {}",
            self.killed(),
            "(good - tests caught the mutation)".dimmed()
        );
        eprintln!(
            "Survived:          {} {}",
            self.survived(),
            "(bad - tests missed the mutation)".dimmed()
        );
        if self.execution_errors() > 0 {
            eprintln!(
                "Execution errors:  {} {}",
                self.execution_errors(),
                "(tests could not be run)".dimmed()
            );
        }
        eprintln!("Duration:          {}", format_duration(self.total_duration));

        let survivors = self.surviving_mutants();
        if !survivors.is_empty() {
            eprintln!();
            eprintln!("{}", "Surviving Mutants (improve your tests!)".red().bold());
            eprintln!("{}", "-".repeat(40));
            for mutant in survivors {
                eprintln!("  • {}", mutant.description.yellow());
                eprintln!(
                    "    at {}:{} ({})",
                    mutant.file.display(),
                    mutant.line,
                    mutant.dir.display()
                );
            }
        }
        eprintln!();
    }
}

/// Format duration in a human-readable way
fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn mutant(id: usize, outcome: MutantOutcome) -> Mutant {
        Mutant {
            id,
            dir: PathBuf::from(format!("/tmp/mutants-x/{id}")),
            file: PathBuf::from("src/lib.rs"),
            line: 3,
            operator: "swap-branch",
            description: "swap branches of `if a > b`".to_string(),
            outcome,
            details: String::new(),
            duration: Duration::from_millis(10),
        }
    }

    fn report(outcomes: &[MutantOutcome]) -> MutationReport {
        let mut summary = ScoreSummary::default();
        for outcome in outcomes {
            summary.generated += 1;
            match outcome {
                MutantOutcome::Killed => summary.killed += 1,
                MutantOutcome::ExecutionError => summary.errors += 1,
                MutantOutcome::Survived => {}
            }
        }
        let mutants = outcomes
            .iter()
            .enumerate()
            .map(|(id, outcome)| mutant(id, *outcome))
            .collect();
        MutationReport::new("demo".to_string(), mutants, summary, Duration::ZERO)
    }

    #[test]
    fn test_score_line() {
        let report = report(&[
            MutantOutcome::Killed,
            MutantOutcome::Survived,
            MutantOutcome::Killed,
            MutantOutcome::Killed,
        ]);
        assert_eq!(report.score_line(), "Mutation score: 0.75");
    }

    #[test]
    fn test_score_line_without_mutants() {
        assert_eq!(report(&[]).score_line(), "Mutation score: NaN");
    }

    #[test]
    fn test_execution_errors_are_not_survivors() {
        let report = report(&[MutantOutcome::ExecutionError, MutantOutcome::Survived]);
        assert_eq!(report.survived(), 1);
        assert_eq!(report.execution_errors(), 1);
        assert_eq!(report.surviving_mutants().len(), 1);
        assert_eq!(report.failed_executions()[0].id, 0);
        assert_eq!(report.score(), 0.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
