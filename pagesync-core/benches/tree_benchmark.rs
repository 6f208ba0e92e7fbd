use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pagesync_core::{Factories, MemoryDocument, Page, PageModel, Reference};
use serde_json::{json, Map, Value};

/// A root with `containers` containers of `items` items each. Every container
/// also references one shared item.
fn page_model(containers: usize, items: usize) -> PageModel {
    let mut page = Map::new();
    let mut root_children = Vec::new();

    page.insert(
        "shared".to_string(),
        json!({ "id": "shared", "type": "container-item", "name": "shared" }),
    );

    for c in 0..containers {
        let container_id = format!("c{c}");
        let mut children = vec![json!({ "$ref": "/page/shared" })];
        for i in 0..items {
            let item_id = format!("c{c}-i{i}");
            page.insert(
                item_id.clone(),
                json!({
                    "id": item_id,
                    "type": "container-item",
                    "name": item_id,
                    "meta": {
                        "begin": [{ "type": "comment", "data": "begin" }],
                        "end": [{ "type": "comment", "data": "end" }]
                    }
                }),
            );
            children.push(json!({ "$ref": format!("/page/{item_id}") }));
        }
        page.insert(
            container_id.clone(),
            json!({ "id": container_id, "type": "container", "name": container_id, "children": children }),
        );
        root_children.push(json!({ "$ref": format!("/page/{container_id}") }));
    }

    page.insert(
        "root".to_string(),
        json!({ "id": "root", "type": "component", "children": root_children }),
    );

    serde_json::from_value(json!({ "root": { "$ref": "/page/root" }, "page": Value::Object(page) }))
        .unwrap()
}

/// Benchmark: build a page tree of N container items
fn bench_build_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_page");
    let factories = Arc::new(Factories::default());

    for items in [10, 100, 1_000] {
        let model = page_model(10, items / 10);
        group.bench_with_input(BenchmarkId::from_parameter(items), &model, |b, model| {
            b.iter(|| Page::new(model.clone(), factories.clone()).unwrap());
        });
    }

    group.finish();
}

/// Benchmark: merge one fragment and propagate it to the matching item
fn bench_apply_update(c: &mut Criterion) {
    let page = Page::new(page_model(10, 100), Arc::new(Factories::default())).unwrap();
    let fragment: PageModel = serde_json::from_value(json!({
        "root": { "$ref": "/page/c5-i50" },
        "page": { "c5-i50": { "id": "c5-i50", "type": "container-item", "label": "updated" } }
    }))
    .unwrap();

    c.bench_function("apply_update_1000_items", |b| {
        b.iter(|| page.apply_update(&fragment).unwrap());
    });
}

/// Benchmark: bracket a rendered range and dispose it again
fn bench_meta_render(c: &mut Criterion) {
    let page = Page::new(page_model(1, 1), Arc::new(Factories::default())).unwrap();
    let meta = page.component_by_id("c0-i0").unwrap().meta();
    let mut document = MemoryDocument::new();
    let head = document.append("div");

    c.bench_function("meta_render_dispose", |b| {
        b.iter(|| meta.render(&mut document, head, head).dispose(&mut document));
    });
}

/// Benchmark: resolve a deep pointer
fn bench_resolve(c: &mut Criterion) {
    let model = page_model(10, 100);
    let reference = Reference::new("/page/c9/children/42/$ref");

    c.bench_function("resolve_deep_pointer", |b| {
        b.iter(|| pagesync_core::resolve(&model, &reference).is_some());
    });
}

criterion_group!(
    benches,
    bench_build_page,
    bench_apply_update,
    bench_meta_render,
    bench_resolve
);
criterion_main!(benches);
