use crate::harness::{Assertion, Scenario};

#[test]
fn test_growth_and_new_kind_reported() {
    Scenario::new("growth_and_new_kind")
        .app_allocates("A", 10)
        .app_allocates("B", 5)
        .capture()
        .assert_no_growth()
        .app_allocates("A", 2)
        .app_allocates("C", 3)
        .capture()
        .assert_growth(&[("C", 3, 3), ("A", 2, 12)])
        .assert(Assertion::KindNotInGrowth("B".into()))
        .assert(Assertion::CaptureCount(2))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_shrinkage_not_reported() {
    Scenario::new("shrinkage")
        .app_allocates("A", 10)
        .capture()
        .app_releases_some("A", 4)
        .capture()
        .assert_no_growth()
        .assert(Assertion::LiveCount {
            kind: "A".into(),
            count: 6,
        })
        .run()
        .unwrap();
}

#[test]
fn test_garbage_cycles_reclaimed_before_counting() {
    Scenario::new("garbage_cycles")
        .app_allocates("Node", 1)
        .capture()
        .app_leaves_cycles("Node", 25)
        .app_allocates("Node", 2)
        .capture()
        .assert_growth(&[("Node", 2, 3)])
        .run()
        .unwrap();
}

#[test]
fn test_first_capture_treated_as_empty() {
    Scenario::new("first_capture_treat_as_empty")
        .with_config("[leaks]\nfirst_capture = \"treat_as_empty\"\n")
        .app_allocates("Job", 4)
        .capture()
        .assert_growth(&[("Job", 4, 4)])
        .run()
        .unwrap();
}

#[test]
fn test_view_leaks_does_not_capture() {
    Scenario::new("view_leaks")
        .capture()
        .app_allocates("Job", 3)
        .capture()
        .app_allocates("Job", 50)
        .request(&[("action", "view-leaks")])
        .assert(Assertion::CaptureCount(2))
        .assert_growth(&[("Job", 3, 3)])
        .run()
        .unwrap();
}

#[test]
fn test_leaked_objects_listing() {
    Scenario::new("leaked_objects")
        .app_allocates_into("old", "Session", 5)
        .capture()
        .app_allocates_into("new", "Session", 3)
        .capture()
        .request(&[("action", "list-leaked-objects"), ("type", "Session")])
        .assert(Assertion::NotRedirected)
        .assert_page_len(3)
        .assert(Assertion::PageTokensAscending)
        .request(&[("action", "list-leaked-objects"), ("type", "Unchanged")])
        .assert_redirected()
        .run()
        .unwrap();
}

#[test]
fn test_released_cohort_members_listed_as_collected() {
    Scenario::new("released_cohort")
        .capture()
        .app_allocates("Temp", 2)
        .capture()
        .app_releases("Temp")
        .request(&[("action", "list-leaked-objects"), ("type", "Temp")])
        .assert(Assertion::EverySummaryStartsWith("<collected object>".into()))
        .run()
        .unwrap();
}
