use crate::harness::{Assertion, Scenario};

#[test]
fn test_inspect_live_object() {
    Scenario::new("inspect_live")
        .app_allocates("User", 1)
        .app_allocates("Registry", 1)
        .app_links("Registry", "User")
        .remember("User", 0, "user")
        .inspect("user")
        .assert(Assertion::InspectedKind("User".into()))
        // `_pool` is private and hidden.
        .assert(Assertion::AttributeNames(vec!["index".into()]))
        .assert(Assertion::ReferrerKinds(vec!["Registry".into()]))
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_inspect_collected_object_redirects() {
    Scenario::new("inspect_collected")
        .app_allocates("Temp", 1)
        .remember("Temp", 0, "temp")
        .app_releases("Temp")
        .capture()
        .inspect("temp")
        .assert_redirected()
        .run()
        .unwrap();
}

#[test]
fn test_failing_formatter_degrades_to_marker() {
    Scenario::new("failing_formatter")
        .formatter_fails_for("Widget", "widget is half-built")
        .app_allocates("Widget", 5)
        .request(&[("action", "list-by-type"), ("type", "Widget")])
        .assert_page_len(5)
        .assert(Assertion::EverySummaryStartsWith(
            "Failed to format object: ".into(),
        ))
        .request(&[("action", "list-by-type"), ("type", "Widget"), ("sort", "1")])
        .assert(Assertion::EverySummaryStartsWith(
            "Failed to format object: ".into(),
        ))
        .run()
        .unwrap();
}

#[test]
fn test_reference_chains() {
    Scenario::new("reference_chains")
        .app_allocates("Leaf", 1)
        .app_allocates("Mid", 1)
        .app_allocates("Root", 1)
        .app_links("Root", "Mid")
        .app_links("Mid", "Leaf")
        .remember("Root", 0, "root")
        .remember("Leaf", 0, "leaf")
        .graph("root", false, 20)
        .assert(Assertion::GraphNodeCount(3))
        .graph("root", false, 1)
        .assert(Assertion::GraphNodeCount(2))
        .graph("leaf", true, 20)
        .assert(Assertion::GraphNodeCount(3))
        .run()
        .unwrap();
}

#[test]
fn test_bad_inspection_requests_redirect() {
    Scenario::new("bad_inspection_requests")
        .request(&[("action", "inspect-object")])
        .assert_redirected()
        .request(&[("action", "inspect-object"), ("id", "not-a-number")])
        .assert_redirected()
        .request(&[("action", "inspect-object"), ("id", "12345")])
        .assert_redirected()
        .request(&[("action", "ref-graph"), ("id", "12345")])
        .assert_redirected()
        .run()
        .unwrap();
}
