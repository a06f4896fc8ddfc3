use crate::analysis::Outcome;
use crate::error::AnalysisError;
use std::fmt;

/// Per-outcome counts for one batch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub alerted: usize,
    pub no_change: usize,
    pub suppressed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the result of analysing one test entry
    pub fn record(&mut self, result: &Result<Outcome, AnalysisError>) {
        match result {
            Ok(Outcome::Alerted(_)) => self.alerted += 1,
            Ok(Outcome::NoChange(_)) => self.no_change += 1,
            Ok(Outcome::Suppressed) => self.suppressed += 1,
            Err(_) => self.failed += 1,
        }
    }

    /// Number of entries processed
    pub fn total(&self) -> usize {
        self.alerted + self.no_change + self.suppressed + self.failed
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} test(s) analysed: {} alerted, {} no change, {} suppressed, {} failed",
            self.total(),
            self.alerted,
            self.no_change,
            self.suppressed,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::IssueRef;
    use crate::analysis::NoChangeReason;
    use crate::error::FetchError;

    #[test]
    fn test_record_counts_each_outcome() {
        let mut summary = BatchSummary::new();

        summary.record(&Ok(Outcome::Alerted(IssueRef {
            number: 1,
            url: "log://issues/1".to_string(),
        })));
        summary.record(&Ok(Outcome::NoChange(NoChangeReason::NotDetected)));
        summary.record(&Ok(Outcome::NoChange(NoChangeReason::OutsideWindow {
            offset: 20,
            window: 14,
        })));
        summary.record(&Ok(Outcome::Suppressed));
        summary.record(&Err(AnalysisError::Fetch(FetchError::SourceNotFound(
            "t".to_string(),
        ))));

        assert_eq!(
            summary,
            BatchSummary {
                alerted: 1,
                no_change: 2,
                suppressed: 1,
                failed: 1,
            }
        );
        assert_eq!(summary.total(), 5);
    }

    #[test]
    fn test_display() {
        let summary = BatchSummary {
            alerted: 2,
            no_change: 3,
            suppressed: 0,
            failed: 1,
        };

        assert_eq!(
            summary.to_string(),
            "6 test(s) analysed: 2 alerted, 3 no change, 0 suppressed, 1 failed"
        );
    }
}
