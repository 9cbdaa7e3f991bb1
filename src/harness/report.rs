//! Run reports and their console rendering

use colored::Colorize;

use super::case::ExecutionOutcome;
use super::controller::GroupReport;

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
}

/// Case counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub blocked: usize,
}

impl Tally {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.blocked
    }
}

impl RunReport {
    pub fn extend(&mut self, other: RunReport) {
        self.groups.extend(other.groups);
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for case in self.groups.iter().flat_map(|g| g.cases.iter()) {
            match case.outcome {
                ExecutionOutcome::Passed => tally.passed += 1,
                ExecutionOutcome::Failed(_) => tally.failed += 1,
                ExecutionOutcome::Blocked => tally.blocked += 1,
            }
        }
        tally
    }

    /// True when every case passed
    pub fn success(&self) -> bool {
        self.groups.iter().all(|g| g.passed())
    }
}

/// Print one group's outcomes
pub fn print_group(report: &GroupReport, verbose: bool) {
    let label = if report.incremental {
        format!("{} (incremental)", report.id)
    } else {
        report.id.clone()
    };
    println!("\n{} {}", "Group:".cyan(), label.white().bold());

    for case in &report.cases {
        match &case.outcome {
            ExecutionOutcome::Passed => {
                if verbose {
                    println!(
                        "  {} {} {}",
                        "✓".green(),
                        case.name,
                        format!("({:.2?})", case.duration).dimmed()
                    );
                } else {
                    println!("  {} {}", "✓".green(), case.name);
                }
            }
            ExecutionOutcome::Failed(reason) => {
                println!("  {} {}: {}", "✗".red(), case.name, reason);
            }
            ExecutionOutcome::Blocked => {
                println!("  {} {} {}", "⊘".yellow(), case.name, "(blocked)".dimmed());
            }
        }
    }

    if verbose && !report.session.is_empty() {
        println!("  {}", "Session:".dimmed());
        for (key, value) in &report.session {
            println!("    {} = {}", key, value.to_string().dimmed());
        }
    }
}

/// Print the final summary line
pub fn print_summary(report: &RunReport) {
    let tally = report.tally();
    let counts = format!(
        "{} passed, {} failed, {} blocked ({} total)",
        tally.passed,
        tally.failed,
        tally.blocked,
        tally.total()
    );

    if report.success() {
        println!("\n{} {}\n", "✓".green().bold(), counts.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), counts.red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::case::FailureReason;
    use crate::harness::controller::CaseReport;
    use std::time::Duration;

    fn case(name: &str, outcome: ExecutionOutcome) -> CaseReport {
        CaseReport {
            name: name.to_string(),
            index: 0,
            outcome,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_tally_counts_every_outcome() {
        let report = RunReport {
            groups: vec![
                GroupReport {
                    id: "raw".to_string(),
                    incremental: true,
                    cases: vec![
                        case("a", ExecutionOutcome::Passed),
                        case("b", ExecutionOutcome::Failed(FailureReason::Assertion("x".into()))),
                        case("c", ExecutionOutcome::Blocked),
                        case("d", ExecutionOutcome::Blocked),
                    ],
                    session: Vec::new(),
                },
                GroupReport {
                    id: "solo".to_string(),
                    incremental: false,
                    cases: vec![case("e", ExecutionOutcome::Passed)],
                    session: Vec::new(),
                },
            ],
        };

        assert_eq!(
            report.tally(),
            Tally {
                passed: 2,
                failed: 1,
                blocked: 2
            }
        );
        assert_eq!(report.tally().total(), 5);
        assert!(!report.success());
        assert!(report.groups[1].passed());
    }

    #[test]
    fn test_empty_report_is_success() {
        assert!(RunReport::default().success());
    }
}
