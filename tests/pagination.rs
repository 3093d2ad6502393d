//! Windows, Pages and Approximate Counts
//!
//! - Offset/limit windows stream and stop fetching at the limit
//! - Unsorted pages stream, sorted pages materialize the collection
//! - Counts come from per-node object counts divided by replication

mod common;

use std::sync::Arc;

use common::{facade_with, names, person, Person};
use kvmapper::executor::Cursor;
use kvmapper::facade::FacadeConfig;
use kvmapper::observability::{Event, MemoryLogSink};
use kvmapper::store::{MemoryStore, ResultCode, StoreError, StoreOp};
use kvmapper::{AccessFacade, Order, PageRequest, Sort};

const NAMES: [&str; 7] = ["Gus", "Ann", "Fay", "Bob", "Eve", "Cid", "Dee"];

fn seed(facade: &AccessFacade<MemoryStore>) {
    for (i, name) in NAMES.iter().enumerate() {
        facade
            .save(&person(&format!("{:02}", i), name, 20 + i as i64, "X"))
            .unwrap();
    }
}

fn seeded() -> (AccessFacade<MemoryStore>, Arc<MemoryLogSink>) {
    let (facade, sink) = facade_with(MemoryStore::new("test"));
    seed(&facade);
    (facade, sink)
}

// =============================================================================
// Range Windows
// =============================================================================

#[test]
fn test_window_skips_and_limits() {
    let (facade, _sink) = seeded();
    let window = facade.find_in_range::<Person>(2, 3).unwrap();
    let found = window.collect_all().unwrap();
    assert_eq!(names(&found), vec!["Fay", "Bob", "Eve"]);
}

#[test]
fn test_window_stops_fetching_at_limit() {
    let (facade, _sink) = seeded();
    let mut window = facade.find_in_range::<Person>(1, 2).unwrap();

    assert!(window.try_next().unwrap().is_some());
    assert!(window.try_next().unwrap().is_some());
    assert_eq!(window.remaining(), 0);

    // source released as soon as the limit was reached
    assert_eq!(facade.store().open_scans(), 0);
    assert_eq!(facade.store().records_fetched(), 3);
    assert!(window.try_next().unwrap().is_none());
}

#[test]
fn test_window_zero_limit() {
    let (facade, _sink) = seeded();
    let mut window = facade.find_in_range::<Person>(0, 0).unwrap();
    assert_eq!(facade.store().open_scans(), 0);
    assert!(!window.has_next().unwrap());
    assert!(window.collect_all().unwrap().is_empty());
}

#[test]
fn test_window_offset_past_end() {
    let (facade, _sink) = seeded();
    let found = facade
        .find_in_range::<Person>(100, 5)
        .unwrap()
        .collect_all()
        .unwrap();
    assert!(found.is_empty());
    assert_eq!(facade.store().open_scans(), 0);
}

#[test]
fn test_window_close_then_next_is_illegal_state() {
    let (facade, _sink) = seeded();
    let mut window = facade.find_in_range::<Person>(0, 5).unwrap();
    window.close();
    assert_eq!(facade.store().open_scans(), 0);
    assert_eq!(window.try_next().unwrap_err().code(), "KV_ILLEGAL_STATE");
}

// =============================================================================
// Pages
// =============================================================================

#[test]
fn test_unsorted_page() {
    let (facade, sink) = seeded();
    let page = facade.find_page::<Person>(&PageRequest::of(1, 3)).unwrap();

    assert_eq!(names(&page.content), vec!["Bob", "Eve", "Cid"]);
    assert_eq!(page.total, 7);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());
    assert_eq!(sink.count(Event::PageSortMaterialized), 0);
}

#[test]
fn test_sorted_page_materializes() {
    let (facade, sink) = seeded();
    let request = PageRequest::of(0, 3).with_sort(Sort::by(Order::asc("name")));
    let page = facade.find_page::<Person>(&request).unwrap();

    assert_eq!(names(&page.content), vec!["Ann", "Bob", "Cid"]);
    let events = sink.events(Event::PageSortMaterialized);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].field("materialized"), Some("7"));
}

#[test]
fn test_sorted_last_page() {
    let (facade, _sink) = seeded();
    let request = PageRequest::of(2, 3).with_sort(Sort::by(Order::desc("name")));
    let page = facade.find_page::<Person>(&request).unwrap();

    assert_eq!(names(&page.content), vec!["Ann"]);
    assert!(!page.has_next());
}

#[test]
fn test_empty_sort_is_unsorted_page() {
    let (facade, sink) = seeded();
    let request = PageRequest::of(0, 2).with_sort(Sort::default());
    let page = facade.find_page::<Person>(&request).unwrap();
    assert_eq!(names(&page.content), vec!["Gus", "Ann"]);
    assert_eq!(sink.count(Event::PageSortMaterialized), 0);
}

// =============================================================================
// Approximate Count
// =============================================================================

#[test]
fn test_count_single_node() {
    let (facade, sink) = seeded();
    assert_eq!(facade.count::<Person>().unwrap(), 7);

    let events = sink.events(Event::CountApproximate);
    assert_eq!(events[0].field("nodes"), Some("1"));
    assert_eq!(events[0].field("replication"), Some("1"));
}

#[test]
fn test_count_divides_by_replication() {
    let store = MemoryStore::new("test")
        .with_nodes(3)
        .with_replication_factor(2);
    let (facade, sink) = facade_with(store);
    seed(&facade);

    assert_eq!(facade.count::<Person>().unwrap(), 7);
    let events = sink.events(Event::CountApproximate);
    assert_eq!(events[0].field("objects"), Some("14"));
    assert_eq!(events[0].field("replication"), Some("2"));
}

#[test]
fn test_replication_capped_by_node_count() {
    let store = MemoryStore::new("test")
        .with_nodes(2)
        .with_replication_factor(3);
    let (facade, _sink) = facade_with(store);
    seed(&facade);

    assert_eq!(facade.count::<Person>().unwrap(), 7);
}

#[test]
fn test_configured_replication_factor_wins() {
    let store = MemoryStore::new("test")
        .with_nodes(2)
        .with_replication_factor(2);
    let sink = Arc::new(MemoryLogSink::new());
    let config = FacadeConfig {
        replication_factor: Some(1),
        ..FacadeConfig::with_namespace("test")
    };
    let facade = AccessFacade::builder(store)
        .config(config)
        .log_sink(sink)
        .build()
        .unwrap();
    seed(&facade);

    // every record is held twice; trusting rf=1 doubles the count
    assert_eq!(facade.count::<Person>().unwrap(), 14);
}

#[test]
fn test_count_empty_collection() {
    let (facade, _sink) = facade_with(MemoryStore::new("test").with_nodes(3));
    assert_eq!(facade.count::<Person>().unwrap(), 0);
}

#[test]
fn test_count_info_failure() {
    let store = MemoryStore::new("test").with_nodes(2);
    store.fail_next(StoreOp::Info, StoreError::new(ResultCode::Connection, "node down"));
    let (facade, _sink) = facade_with(store);

    let err = facade.count::<Person>().unwrap_err();
    assert_eq!(err.code(), "KV_CONNECTIVITY");
}
