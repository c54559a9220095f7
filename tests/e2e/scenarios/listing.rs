use crate::harness::{Assertion, Scenario};
use heapview_core::{Profiler, SortDir, SortField};

#[test]
fn test_first_page_by_token_descending() {
    Scenario::new("token_desc_first_page")
        .app_allocates("A", 1200)
        .app_allocates("B", 10)
        .request(&[
            ("action", "list-by-type"),
            ("type", "A"),
            ("sort", "0"),
            ("dir", "1"),
            ("page", "0"),
        ])
        .assert_page_len(500)
        .assert(Assertion::PageHoldsHighestTokensOf { pool: "A".into() })
        .assert(Assertion::TotalItems(1200))
        .assert_total_pages(3)
        .run()
        .expect("scenario should pass");
}

#[test]
fn test_floor_rounding_from_config() {
    Scenario::new("floor_rounding")
        .with_config("[listing]\nrounding = \"floor\"\n")
        .app_allocates("A", 1200)
        .request(&[("action", "list-by-type"), ("type", "A"), ("dir", "1")])
        .assert_page_len(500)
        .assert_total_pages(2)
        .request(&[("action", "list-by-type"), ("type", "A"), ("page", "2")])
        .assert_page_len(200)
        .run()
        .unwrap();
}

#[test]
fn test_last_partial_page_and_beyond() {
    Scenario::new("partial_page")
        .with_config("[listing]\npage_size = 4\n")
        .app_allocates("A", 10)
        .request(&[("action", "list-by-type"), ("type", "A"), ("page", "2")])
        .assert_page_len(2)
        .assert_total_pages(3)
        .request(&[("action", "list-by-type"), ("type", "A"), ("page", "9")])
        .assert(Assertion::NotRedirected)
        .assert_page_len(0)
        .run()
        .unwrap();
}

#[test]
fn test_bad_paging_parameters_clamped() {
    Scenario::new("bad_paging")
        .app_allocates("A", 3)
        .request(&[
            ("action", "list-by-type"),
            ("type", "A"),
            ("sort", "5"),
            ("page", "-2"),
        ])
        .assert(Assertion::NotRedirected)
        .assert_page_len(3)
        .assert(Assertion::PageTokensAscending)
        .run()
        .unwrap();
}

#[test]
fn test_unknown_and_missing_type() {
    Scenario::new("unknown_type")
        .app_allocates("A", 3)
        .request(&[("action", "list-by-type"), ("type", "Ghost")])
        .assert_page_len(0)
        .assert(Assertion::TotalPages(0))
        .request(&[("action", "list-by-type")])
        .assert_redirected()
        .run()
        .unwrap();
}

#[test]
fn test_overview_most_common_first() {
    Scenario::new("overview")
        .app_allocates("Small", 2)
        .app_allocates("Large", 40)
        .app_allocates("Medium", 7)
        .request(&[("action", "view-overview")])
        .assert(Assertion::OverviewLeader {
            kind: "Large".into(),
            count: 40,
        })
        .run()
        .unwrap();
}

#[test]
fn test_summary_sort_orders_by_text() {
    Scenario::new("summary_sort")
        .app_allocates("A", 12)
        .request(&[("action", "list-by-type"), ("type", "A"), ("sort", "1")])
        .assert_page_len(12)
        .assert(Assertion::Custom(Box::new(|profiler: &mut Profiler| -> anyhow::Result<()> {
            let request = profiler.page_request(SortField::Summary, SortDir::Asc, 0);
            let page = profiler.list_by_kind("A", &request);
            let summaries: Vec<&String> = page.entries.iter().map(|(_, s)| s).collect();
            anyhow::ensure!(
                summaries.windows(2).all(|pair| pair[0] <= pair[1]),
                "Summaries not sorted: {:?}",
                summaries
            );
            Ok(())
        })))
        .run()
        .unwrap();
}
