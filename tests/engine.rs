//! Properties of the step engine over many tree shapes.
//!
//! Trees are generated from a fixed seed so failures reproduce.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use stepchart::io::store::MemoryStore;
use stepchart::io::template::BuiltinTemplate;
use stepchart::model::config::TemplateConfig;
use stepchart::model::flat::Generation;
use stepchart::model::step::{DateRange, RawStep};
use stepchart::ops::build::{build, serialize_step};
use stepchart::ops::dates::{days_between, progress_dates};
use stepchart::ops::flatten::{flatten, parent_of, unflatten};
use stepchart::session::{ChartError, ChartSession};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange {
        start: d(start),
        end: d(end),
    }
}

/// Small xorshift generator; enough to vary tree shapes.
struct Shapes(u64);

impl Shapes {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0 % bound
    }
}

/// A random tree. Children omit dates about half the time so inheritance is
/// exercised too.
fn gen_tree(shapes: &mut Shapes, name: String, depth: usize) -> RawStep {
    let mut raw = RawStep::new(&name, shapes.next(101) as i32, range("2024-01-01", "2024-01-31"));
    if depth > 0 && shapes.next(2) == 0 {
        raw.dates = None;
    }
    if depth < 4 {
        let children = shapes.next(4);
        raw.steps = (0..children)
            .map(|i| gen_tree(shapes, format!("{}.{}", name, i), depth + 1))
            .collect();
    }
    raw
}

fn trees() -> Vec<RawStep> {
    (1..=40u64)
        .map(|seed| {
            let mut shapes = Shapes(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            gen_tree(&mut shapes, "root".to_string(), 0)
        })
        .collect()
}

/// (name, level) pairs in pre-order, read straight off the raw tree
fn preorder(raw: &RawStep, level: usize, out: &mut Vec<(String, usize)>) {
    out.push((raw.name.clone(), level));
    for child in &raw.steps {
        preorder(child, level + 1, out);
    }
}

/// Parent row index of every row, read straight off the raw tree
fn structural_parents(raw: &RawStep, parent: Option<usize>, out: &mut Vec<Option<usize>>) {
    let me = out.len();
    out.push(parent);
    for child in &raw.steps {
        structural_parents(child, Some(me), out);
    }
}

#[test]
fn flatten_lists_steps_in_preorder() {
    for raw in trees() {
        let view = flatten(&build(&raw, None).unwrap(), Generation::FIRST);
        let mut expected = Vec::new();
        preorder(&raw, 0, &mut expected);
        let actual: Vec<(String, usize)> = view
            .nodes()
            .iter()
            .map(|n| (n.name.clone(), n.level))
            .collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn parent_of_finds_structural_parent() {
    for raw in trees() {
        let view = flatten(&build(&raw, None).unwrap(), Generation::FIRST);
        let mut expected = Vec::new();
        structural_parents(&raw, None, &mut expected);
        let actual: Vec<Option<usize>> = (0..view.len())
            .map(|i| parent_of(view.nodes(), i))
            .collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn flatten_is_idempotent() {
    for raw in trees() {
        let root = build(&raw, None).unwrap();
        let first = flatten(&root, Generation::FIRST);
        let second = flatten(&root, Generation::FIRST);
        assert_eq!(first.nodes(), second.nodes());

        let rebuilt = unflatten(first.nodes()).unwrap();
        assert_eq!(rebuilt, root);
    }
}

#[test]
fn build_output_rebuilds_to_the_same_tree() {
    for raw in trees() {
        let root = build(&raw, None).unwrap();
        let again = build(&RawStep::from(&root), None).unwrap();
        assert_eq!(again, root);
    }
}

#[test]
fn progress_dates_are_a_prefix_of_the_range() {
    for raw in trees() {
        let root = build(&raw, None).unwrap();
        let days = days_between(root.dates.start, root.dates.end).unwrap();
        assert!(days.starts_with(root.progress_dates()));
        assert_eq!(root.progress_dates(), progress_dates(&days, root.progress).as_slice());
    }
}

#[test]
fn eight_day_range_at_half_progress() {
    let root = build(&RawStep::new("root", 50, range("2024-01-01", "2024-01-08")), None).unwrap();
    assert_eq!(days_between(root.dates.start, root.dates.end).unwrap().len(), 8);
    assert_eq!(
        root.progress_dates(),
        &[
            d("2024-01-01"),
            d("2024-01-02"),
            d("2024-01-03"),
            d("2024-01-04")
        ]
    );
}

#[test]
fn sibling_after_nested_subtree_has_root_as_parent() {
    let mut a = RawStep::new("A", 0, range("2024-01-01", "2024-01-08"));
    let mut b = RawStep::new("B", 0, range("2024-01-01", "2024-01-04"));
    b.steps = vec![RawStep::new("C", 0, range("2024-01-01", "2024-01-02"))];
    a.steps = vec![b, RawStep::new("D", 0, range("2024-01-05", "2024-01-08"))];

    let view = flatten(&build(&a, None).unwrap(), Generation::FIRST);
    let names: Vec<&str> = view.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C", "D"]);
    assert_eq!(parent_of(view.nodes(), 3), Some(0));
    assert_eq!(parent_of(view.nodes(), 2), Some(1));
}

fn session_for(raw: &RawStep) -> ChartSession<MemoryStore> {
    let payload = serialize_step(&build(raw, None).unwrap()).unwrap();
    let template = BuiltinTemplate::starting(TemplateConfig::default(), d("2024-01-01"));
    ChartSession::open(MemoryStore::new().with_chart("0", payload), &template, "0").unwrap()
}

#[test]
fn root_delete_is_rejected_for_any_shape() {
    for raw in trees() {
        let mut session = session_for(&raw);
        let before = session.root().clone();
        let root = session.view().handle(0).unwrap();
        assert!(!session.delete_step(root).unwrap());
        assert_eq!(session.root(), &before);
        assert_eq!(session.view().generation(), Generation::FIRST);
    }
}

#[test]
fn invalid_leaf_range_leaves_tree_unchanged() {
    for raw in trees() {
        let mut session = session_for(&raw);
        let last = session.view().len() - 1;
        let handle = session.view().handle(last).unwrap();
        let before = session.root().clone();

        let err = session
            .update_date_range(handle, range("2024-02-10", "2024-02-01"))
            .unwrap_err();
        assert!(matches!(err, ChartError::InvalidRange(_)));
        assert_eq!(session.root(), &before);
    }
}

#[test]
fn handles_from_before_a_structural_edit_are_stale() {
    let mut raw = RawStep::new("root", 0, range("2024-01-01", "2024-01-08"));
    raw.steps = vec![RawStep::new("a", 0, range("2024-01-01", "2024-01-04"))];
    let mut session = session_for(&raw);

    let old = session.view().handle(1).unwrap();
    let root = session.view().handle(0).unwrap();
    session.add_child_step(root).unwrap();

    assert!(matches!(
        session.rename_step(old, "renamed"),
        Err(ChartError::View(_))
    ));
    assert_eq!(session.root().steps[0].name, "a");

    // A fresh handle for the same row works
    let fresh = session.view().handle(1).unwrap();
    session.rename_step(fresh, "renamed").unwrap();
    assert_eq!(session.root().steps[0].name, "renamed");
}

#[test]
fn every_row_delete_removes_exactly_its_subtree() {
    for raw in trees() {
        let probe = session_for(&raw);
        let total = probe.view().len();
        for row in 1..total {
            let mut session = session_for(&raw);
            let handle = session.view().handle(row).unwrap();
            let subtree = session.step(handle).unwrap().subtree_len();
            assert!(session.delete_step(handle).unwrap());
            assert_eq!(session.view().len(), total - subtree);
            assert_eq!(session.root().subtree_len(), total - subtree);
        }
    }
}
