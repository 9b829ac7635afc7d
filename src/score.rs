//! Mutation score counters

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::driver::MutantOutcome;

/// Counts generated and killed mutants. Safe to share between threads.
#[derive(Debug, Default)]
pub struct Score {
    generated: AtomicUsize,
    killed: AtomicUsize,
    errors: AtomicUsize,
}

/// Point-in-time copy of a [`Score`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreSummary {
    pub generated: usize,
    pub killed: usize,
    pub errors: usize,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one completed test cycle
    pub fn record(&self, outcome: MutantOutcome) {
        self.generated.fetch_add(1, Ordering::SeqCst);
        match outcome {
            MutantOutcome::Killed => {
                self.killed.fetch_add(1, Ordering::SeqCst);
            }
            MutantOutcome::ExecutionError => {
                self.errors.fetch_add(1, Ordering::SeqCst);
            }
            MutantOutcome::Survived => {}
        }
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            generated: self.generated.load(Ordering::SeqCst),
            killed: self.killed.load(Ordering::SeqCst),
            errors: self.errors.load(Ordering::SeqCst),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.summary().ratio()
    }
}

impl ScoreSummary {
    /// Killed over generated; NaN when nothing was generated
    pub fn ratio(&self) -> f64 {
        self.killed as f64 / self.generated as f64
    }

    pub fn survived(&self) -> usize {
        self.generated - self.killed - self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_score_is_undefined() {
        let score = Score::new();
        assert_eq!(score.summary(), ScoreSummary::default());
        assert!(score.ratio().is_nan());
    }

    #[test]
    fn test_record() {
        let score = Score::new();
        score.record(MutantOutcome::Killed);
        score.record(MutantOutcome::Survived);
        score.record(MutantOutcome::ExecutionError);
        score.record(MutantOutcome::Killed);

        let summary = score.summary();
        assert_eq!(
            summary,
            ScoreSummary {
                generated: 4,
                killed: 2,
                errors: 1,
            }
        );
        assert_eq!(summary.survived(), 1);
        assert_eq!(summary.ratio(), 0.5);
    }

    #[test]
    fn test_concurrent_records() {
        let score = Arc::new(Score::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let score = Arc::clone(&score);
                thread::spawn(move || {
                    for i in 0..250 {
                        score.record(if i % 2 == 0 {
                            MutantOutcome::Killed
                        } else {
                            MutantOutcome::Survived
                        });
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let summary = score.summary();
        assert_eq!(summary.generated, 1000);
        assert_eq!(summary.killed, 500);
    }
}
