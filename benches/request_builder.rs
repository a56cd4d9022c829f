//! 请求构建基准测试
//!
//! 测试探测请求合成和结果分类的性能

use api_pulse::model::{AuthConfig, Endpoint, HttpMethod, ParamSpec, ParamType, Project};
use api_pulse::probe::{build_request, build_url, classify, RuntimeOverrides, Transport};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn sample_project() -> Project {
    Project {
        id: "bench".to_string(),
        name: "Bench".to_string(),
        base_url: "https://api.example.com/v1/".to_string(),
        auth: AuthConfig::api_key("bench-key", None),
        enabled: true,
    }
}

fn sample_endpoint() -> Endpoint {
    let mut endpoint = Endpoint::new(
        "orders",
        "bench",
        HttpMethod::Post,
        "/users/{user_id}/orders/{order_id}",
    );
    endpoint.path_params = vec![
        ParamSpec::new("user_id", true, ParamType::Integer),
        ParamSpec::new("order_id", true, ParamType::String),
    ];
    endpoint.query_params = vec![
        ParamSpec::new("page", true, ParamType::Integer),
        ParamSpec::new("expand", false, ParamType::Boolean),
    ];
    endpoint
        .headers
        .insert("Accept".to_string(), "application/json".to_string());
    endpoint.sample_body = Some(r#"{"quantity": 1}"#.to_string());
    endpoint
}

/// 请求构建基准测试
fn request_builder_benchmark(c: &mut Criterion) {
    let project = sample_project();
    let endpoint = sample_endpoint();

    c.bench_function("build_request_defaults", |b| {
        b.iter(|| black_box(build_request(&project, &endpoint, None)))
    });

    let mut overrides = RuntimeOverrides::default();
    overrides
        .path_params
        .insert("user_id".to_string(), "42".to_string());
    overrides
        .query_params
        .insert("search".to_string(), "red shoes & socks".to_string());
    overrides
        .headers
        .insert("X-Trace".to_string(), "bench".to_string());

    c.bench_function("build_request_with_overrides", |b| {
        b.iter(|| black_box(build_request(&project, &endpoint, Some(&overrides))))
    });

    c.bench_function("build_url_only", |b| {
        b.iter(|| {
            black_box(build_url(
                &project.base_url,
                &endpoint.path,
                &endpoint.path_params,
                &endpoint.query_params,
                None,
            ))
        })
    });
}

/// 结果分类基准测试
fn classifier_benchmark(c: &mut Criterion) {
    let transports = [
        Transport::Completed { status_code: 200 },
        Transport::Completed { status_code: 204 },
        Transport::Completed { status_code: 404 },
        Transport::Completed { status_code: 0 },
        Transport::Failed,
        Transport::TimedOut,
    ];

    c.bench_function("classify_mixed", |b| {
        b.iter(|| {
            for transport in &transports {
                black_box(classify(*transport, black_box(201)));
            }
        })
    });
}

criterion_group!(benches, request_builder_benchmark, classifier_benchmark);
criterion_main!(benches);
