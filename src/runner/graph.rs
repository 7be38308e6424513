//! Prerequisite edges between test cases.
//!
//! Each case names at most one prerequisite, so following the edges from a
//! case yields a chain. Chains are resolved before anything runs and a
//! repeated id aborts with [`RunnerError::PrerequisiteCycle`].

use crate::error::{Result, RunnerError};
use crate::suite::TestSuite;

/// `case_id` followed by its prerequisites, nearest first. The chain stops
/// at a prerequisite id that does not exist in the suite.
pub fn prerequisite_chain(suite: &TestSuite, case_id: &str) -> Result<Vec<String>> {
    let mut chain = vec![case_id.to_string()];
    let mut current = suite.case(case_id);

    while let Some(case) = current {
        let Some(next) = case.prerequisite_id() else {
            break;
        };
        if let Some(pos) = chain.iter().position(|id| id == next) {
            let mut cycle = chain[pos..].to_vec();
            cycle.push(next.to_string());
            return Err(RunnerError::PrerequisiteCycle(cycle));
        }
        chain.push(next.to_string());
        current = suite.case(next);
    }

    Ok(chain)
}

/// Fail fast if any case in the suite sits on a prerequisite cycle.
pub fn check_prerequisites(suite: &TestSuite) -> Result<()> {
    for case in suite.cases() {
        prerequisite_chain(suite, &case.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::TestCase;

    fn case(id: &str, prerequisite: Option<&str>) -> TestCase {
        let mut case = TestCase::new(id, &[]);
        case.prerequisite = prerequisite.map(str::to_string);
        case
    }

    fn suite(cases: Vec<TestCase>) -> TestSuite {
        let mut suite = TestSuite::new();
        for c in cases {
            suite.add_case(c);
        }
        suite
    }

    #[test]
    fn chain_follows_prerequisites() {
        let suite = suite(vec![
            case("C", Some("B")),
            case("B", Some("A")),
            case("A", None),
        ]);
        assert_eq!(prerequisite_chain(&suite, "C").unwrap(), vec!["C", "B", "A"]);
        assert!(check_prerequisites(&suite).is_ok());
    }

    #[test]
    fn missing_prerequisite_ends_the_chain() {
        let suite = suite(vec![case("B", Some("GHOST"))]);
        assert_eq!(prerequisite_chain(&suite, "B").unwrap(), vec!["B", "GHOST"]);
    }

    #[test]
    fn two_case_cycle_is_reported() {
        let suite = suite(vec![case("A", Some("B")), case("B", Some("A"))]);
        match prerequisite_chain(&suite, "A") {
            Err(RunnerError::PrerequisiteCycle(cycle)) => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert!(check_prerequisites(&suite).is_err());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let suite = suite(vec![case("A", Some("A"))]);
        assert!(matches!(
            prerequisite_chain(&suite, "A"),
            Err(RunnerError::PrerequisiteCycle(cycle)) if cycle == vec!["A", "A"]
        ));
    }

    #[test]
    fn cycle_behind_a_tail_names_only_the_loop() {
        let suite = suite(vec![
            case("X", Some("A")),
            case("A", Some("B")),
            case("B", Some("A")),
        ]);
        match prerequisite_chain(&suite, "X") {
            Err(RunnerError::PrerequisiteCycle(cycle)) => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }
}
