//! Session orchestration tests
//!
//! Drive the real orchestrator, tracker and run adapter against fake VCS,
//! analyzer and launcher implementations.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use affected::tracker::{CURRENT_RUN_NAME, HEAD_RUN_NAME};
use affected::{
    ImpactReport, Module, ModuleRegistry, RunScope, SessionState, TestMethodFilter, TestPattern,
    TestRunAdapter,
};
use common::{changed, test_method, two_test_report, Harness, LaunchMode};

fn core_registry() -> ModuleRegistry {
    ModuleRegistry::new(vec![Module {
        name: "core".to_string(),
        roots: vec![PathBuf::from("/p/core")],
    }])
}

fn expected_patterns() -> Vec<TestPattern> {
    vec![
        TestPattern::new("shop.CartTest", "totalsItems"),
        TestPattern::new("shop.CheckoutTest", "chargesTotal"),
    ]
}

// ===== Single-phase sessions =====

#[test]
fn test_current_state_only_single_module() {
    let mut h = Harness::new(two_test_report());
    h.adapter = TestRunAdapter::new("/p").with_module(Some("core".into()), core_registry());
    let done = h.run(1, false);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    assert_eq!(done.depths, vec![1]);
    assert_eq!(done.log.count("stash"), 0);
    assert_eq!(done.log.count("apply"), 0);

    let requests = done.launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, CURRENT_RUN_NAME);
    assert_eq!(requests[0].scope, RunScope::SingleModule("core".into()));
    assert_eq!(requests[0].patterns, expected_patterns());
    assert_eq!(done.report.patterns, expected_patterns());
    assert_eq!(done.runs.len(), 1);
    assert!(done.runs[0].success);
}

#[test]
fn test_current_state_only_whole_project() {
    let done = Harness::new(two_test_report()).run(1, false);

    let requests = done.launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].scope, RunScope::WholeProject);
    assert_eq!(requests[0].patterns.len(), 2);
}

#[test]
fn test_session_states_in_order() {
    let done = Harness::new(two_test_report()).run(1, false);
    assert_eq!(
        done.report.states,
        vec![
            SessionState::Idle,
            SessionState::ImpactComputed,
            SessionState::Phase1Skipped,
            SessionState::AwaitingBarrier,
            SessionState::Restoring,
            SessionState::Phase2Running,
            SessionState::Done,
        ]
    );
}

#[test]
fn test_listings_are_posted() {
    let done = Harness::new(two_test_report()).run(1, false);

    let titles = done.notifier.titles();
    assert_eq!(titles[0], affected::orchestrator::NOTICE_TITLE);
    let changed = done.notifier.body_of("Changed methods").unwrap();
    assert!(changed.starts_with("1) shop.Cart.total()"));
    let tests = done.notifier.body_of("Affected tests").unwrap();
    assert!(tests.contains("1) shop.CartTest.totalsItems"));
    assert!(tests.contains("2) shop.CheckoutTest.chargesTotal"));
}

#[test]
fn test_depth_reaches_analyzer() {
    let done = Harness::new(two_test_report()).run(3, false);
    assert_eq!(done.depths, vec![3]);
}

// ===== Early exits =====

#[test]
fn test_no_changes_aborts_without_side_effects() {
    let done = Harness::new(ImpactReport::default()).run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Aborted));
    assert!(done.log.events().is_empty());
    assert!(done.launcher.requests().is_empty());
    assert!(done.runs.is_empty());
}

#[test]
fn test_changes_without_tests_aborts() {
    let report = ImpactReport {
        changed: vec![changed("shop.Cart", "total")],
        ..Default::default()
    };
    let done = Harness::new(report).run(1, true);
    assert_eq!(done.report.final_state(), Some(SessionState::Aborted));
    assert_eq!(done.log.count("stash"), 0);
}

#[test]
fn test_analysis_failure_ends_in_error() {
    let mut h = Harness::new(two_test_report());
    h.analyzer.fail = true;
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert!(done.report.error.is_some());
    assert!(done.log.events().is_empty());
    assert!(done.notifier.titles().contains(&"Error".to_string()));
}

// ===== Two-phase sessions =====

#[test]
fn test_two_phase_ordering() {
    let mut h = Harness::new(two_test_report());
    h.adapter = TestRunAdapter::new("/p").with_module(Some("core".into()), core_registry());
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    let head_exit = format!("exit:{HEAD_RUN_NAME}");
    let current_launch = format!("launch:{CURRENT_RUN_NAME}");
    let events = done.log.events();
    assert_eq!(events[0], "stash");
    assert_eq!(events[1], format!("launch:{HEAD_RUN_NAME}"));

    // Phase 1 terminates before the restore, restore before phase 2
    let exit = done.log.position(&head_exit).unwrap();
    let apply = done.log.position("apply").unwrap();
    let launch = done.log.position(&current_launch).unwrap();
    assert!(exit < apply, "{events:?}");
    assert!(apply < launch, "{events:?}");
    assert_eq!(done.log.count("apply"), 1);

    let requests = done.launcher.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].patterns, requests[1].patterns);
    assert_eq!(requests[0].scope, requests[1].scope);
    assert_eq!(done.runs.len(), 2);
}

#[test]
fn test_nothing_to_stash_skips_restore() {
    let mut h = Harness::new(two_test_report());
    h.vcs.has_changes = false;
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    assert_eq!(done.log.count("stash"), 1);
    assert_eq!(done.log.count("apply"), 0);
    assert_eq!(done.launcher.requests().len(), 2);
}

#[test]
fn test_no_runnable_patterns_releases_barrier() {
    let mut report = two_test_report();
    for t in &mut report.tests {
        t.annotations = vec!["org.junit.Before".to_string()];
    }
    let done = Harness::new(report).run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    assert!(done.launcher.requests().is_empty());
    assert_eq!(done.log.count("apply"), 1);
    assert!(done.report.patterns.is_empty());
}

#[test]
fn test_excluded_base_class_filters_patterns() {
    let mut report = two_test_report();
    report.hierarchy.insert("shop.CheckoutTest", "shop.SpringBase");
    let mut h = Harness::new(report);
    h.adapter = TestRunAdapter::new("/p").with_filter(TestMethodFilter::new(
        vec!["org.junit.Test".into()],
        vec!["shop.SpringBase".into()],
    ));
    let done = h.run(1, false);

    assert_eq!(
        done.report.patterns,
        vec![TestPattern::new("shop.CartTest", "totalsItems")]
    );
}

#[test]
fn test_max_tests_bounds_selection() {
    let mut report = two_test_report();
    report
        .tests
        .push(test_method("core", "shop.AuditTest", "logsTotal"));
    let mut h = Harness::new(report);
    h.adapter = TestRunAdapter::new("/p").with_max_tests(2);
    let done = h.run(1, false);

    // Signature order: AuditTest, CartTest, CheckoutTest
    assert_eq!(
        done.report.patterns,
        vec![
            TestPattern::new("shop.AuditTest", "logsTotal"),
            TestPattern::new("shop.CartTest", "totalsItems"),
        ]
    );
}

// ===== Failure handling =====

#[test]
fn test_stash_failure_skips_phase_one() {
    let mut h = Harness::new(two_test_report());
    h.vcs.fail_stash = true;
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    assert!(done.report.states.contains(&SessionState::Phase1Skipped));
    assert!(!done.report.states.contains(&SessionState::Phase1Running));
    assert_eq!(done.log.count("apply"), 0);
    let requests = done.launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, CURRENT_RUN_NAME);
    assert!(done.notifier.titles().contains(&"Popping Error".to_string()));
}

#[test]
fn test_restore_failure_still_runs_phase_two() {
    let mut h = Harness::new(two_test_report());
    h.vcs.fail_apply = true;
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Done));
    assert!(done.notifier.titles().contains(&"Popping Error".to_string()));
    assert_eq!(done.launcher.requests().len(), 2);
}

#[test]
fn test_launch_failure_restores_then_errors() {
    let h = Harness::new(two_test_report()).with_launcher(Duration::ZERO, LaunchMode::Refuse);
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert!(!done.report.interrupted);
    assert_eq!(done.log.count("stash"), 1);
    assert_eq!(done.log.count("apply"), 1);
    assert!(!done.report.states.contains(&SessionState::Phase2Running));
    assert!(done.notifier.titles().contains(&"Run Error".to_string()));
}

#[test]
fn test_phase_two_launch_failure_is_error() {
    let h = Harness::new(two_test_report()).with_launcher(Duration::ZERO, LaunchMode::Refuse);
    let done = h.run(1, false);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert!(done.report.states.contains(&SessionState::Phase2Running));
}

#[test]
fn test_abandoned_barrier_restores_then_errors() {
    let h = Harness::new(two_test_report()).with_launcher(Duration::ZERO, LaunchMode::DropCallback);
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert_eq!(done.log.count("apply"), 1);
    assert_eq!(done.launcher.requests().len(), 1);
}

#[test]
fn test_unknown_module_is_reported() {
    let mut h = Harness::new(two_test_report());
    h.adapter = TestRunAdapter::new("/p").with_module(Some("web".into()), core_registry());
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert!(done
        .notifier
        .titles()
        .contains(&"Module Not Found".to_string()));
    assert!(done.launcher.requests().is_empty());
    assert_eq!(done.log.count("apply"), 1);
}

#[test]
fn test_interrupt_while_waiting() {
    let h = Harness::new(two_test_report())
        .with_launcher(Duration::from_millis(500), LaunchMode::Succeed);
    h.cancel.cancel();
    let done = h.run(1, true);

    assert_eq!(done.report.final_state(), Some(SessionState::Error));
    assert!(done.report.interrupted);
    // Working tree is put back even though phase 2 never starts
    assert_eq!(done.log.count("apply"), 1);
    let requests = done.launcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].name, HEAD_RUN_NAME);
}
