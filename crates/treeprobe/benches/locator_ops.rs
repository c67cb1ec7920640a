//! Locator Operations Benchmarks
//!
//! Benchmarks for path parsing, strategy searches and scroll convergence
//! against the in-memory tree.
//!
//! Run with: `cargo bench --bench locator_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::rc::Rc;
use treeprobe::mock::{scrolling_list, MockNode, MockTree};
use treeprobe::prelude::*;
use treeprobe::xpath;

/// A window holding `panes` panes of ten buttons each
fn wide_tree(panes: usize) -> Rc<MockTree> {
    let tree = Rc::new(MockTree::new());
    let window = tree.add(tree.root_key(), MockNode::new(ControlType::Window).with_name("Main"));
    for p in 0..panes {
        let pane = tree.add(window, MockNode::new(ControlType::Pane).with_name(format!("pane{p}")));
        for b in 0..10 {
            tree.add(
                pane,
                MockNode::new(ControlType::Button)
                    .with_name(format!("button{p}_{b}"))
                    .with_automation_id(format!("b{p}_{b}")),
            );
        }
    }
    tree
}

fn session(tree: &Rc<MockTree>) -> Rc<Session> {
    let provider: Rc<dyn TreeProvider> = tree.clone();
    Session::new(
        provider,
        Settings::default()
            .with_search_timeout_ms(0)
            .with_probe_timeout_ms(0),
    )
}

fn bench_path_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_parsing");

    let expressions = vec![
        ("descendant", "//Button"),
        ("attribute", "//Button[@Name='OK']"),
        ("absolute", "/Window/Pane/Button"),
        ("positional", "//Pane[2]/Button[last()]"),
        ("function", "//Button[starts-with(@Name, 'button1')]"),
        ("union", "//Button[@Name='a'] | //Edit[@AutomationId='b']"),
    ];

    for (name, expression) in expressions {
        group.bench_with_input(BenchmarkId::from_parameter(name), &expression, |bench, expr| {
            bench.iter(|| {
                let parsed = xpath::compile(black_box(expr));
                black_box(parsed)
            });
        });
    }

    group.finish();
}

fn bench_property_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("property_search");

    for panes in [1, 10, 50] {
        let tree = wide_tree(panes);
        let root = session(&tree).root();
        let last = format!("b{}_9", panes - 1);
        group.bench_with_input(BenchmarkId::from_parameter(panes), &last, |bench, uid| {
            bench.iter(|| {
                let found = root.find_element_by_uid(black_box(uid)).unwrap();
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_path_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_search");

    for panes in [1, 10, 50] {
        let tree = wide_tree(panes);
        let root = session(&tree).root();
        let expression = format!("//Pane[@Name='pane{}']/Button[last()]", panes - 1);
        group.bench_with_input(BenchmarkId::from_parameter(panes), &expression, |bench, expr| {
            bench.iter(|| {
                let found = root.find_element(By::path(expr.as_str())).unwrap();
                black_box(found)
            });
        });
    }

    group.finish();
}

fn bench_scroll_to(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_to");

    for items in [50, 500, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |bench, &items| {
            bench.iter(|| {
                let tree = Rc::new(MockTree::new());
                let list = scrolling_list(&tree, items, 20.0);
                let session = session(&tree);
                let container = Element::from_node(&session, tree.node(list).unwrap());
                let target = By::name(format!("Item {}", items - 1));
                let found = ViewportConvergence::new(&session)
                    .scroll_to(&container, target, Viewport::Container)
                    .unwrap();
                black_box(found)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_path_parsing,
    bench_property_search,
    bench_path_search,
    bench_scroll_to,
);
criterion_main!(benches);
