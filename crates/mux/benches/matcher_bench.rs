use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use http::{Method, StatusCode};
use micro_mux::matcher::{extract_params, is_compatible};
use micro_mux::router::get;
use micro_mux::{Request, RequestBody, RequestExt, Router, handler_fn, plain_text};
use std::hint::black_box;

fn bench_matcher(c: &mut Criterion) {
    let mut group = c.benchmark_group("matcher");

    group.bench_function("is_compatible_literal", |b| {
        b.iter(|| is_compatible(black_box("/api/v1/users/list"), black_box("/api/v1/users/list")));
    });

    group.bench_function("is_compatible_captures", |b| {
        b.iter(|| is_compatible(black_box("/api/{version}/users/{id}/posts"), black_box("/api/v1/users/42/posts")));
    });

    group.bench_function("extract_params", |b| {
        b.iter(|| extract_params(black_box("/api/{version}/users/{id}/posts"), black_box("/api/v1/users/42/posts")));
    });

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut builder = Router::builder();
    for i in 0..50 {
        builder = builder.route(format!("/resource{i}/{{id}}"), get(handler_fn(|_req: Request| async { "ok" })));
    }
    let router = builder
        .route(
            "/users/{id}",
            get(handler_fn(|req: Request| async move {
                plain_text(StatusCode::OK, req.path_param("id").unwrap_or_default())
            })),
        )
        .build();

    c.bench_function("dispatch_51_routes", |b| {
        b.iter(|| {
            let req = http::Request::builder().method(Method::GET).uri("/users/42").body(RequestBody::empty()).unwrap();
            block_on(router.dispatch(black_box(req)))
        });
    });
}

criterion_group!(benches, bench_matcher, bench_dispatch);
criterion_main!(benches);
