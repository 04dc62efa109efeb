mod common;

use axum::http::{header, HeaderValue, Method, StatusCode};
use common::{settle, TestCompiler};
use hotdev::{
    AssetRequest, BundleTarget, CompileStatus, Hotdev, HotdevConfig, IndexFile, Outcome,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn compiler() -> TestCompiler {
    TestCompiler::new(BundleTarget::new("/dist"))
        .with_file("/dist/app.js", "console.log('app')")
        .with_file("/dist/index.html", "<html></html>")
        .with_file("/dist/app.0123456789abcdef.js", "hashed")
}

fn start(config: HotdevConfig, compiler: TestCompiler) -> (Hotdev, Arc<TestCompiler>) {
    let compiler = Arc::new(compiler);
    let hotdev = Hotdev::new(&config, compiler.clone()).unwrap();
    hotdev.start().unwrap();
    (hotdev, compiler)
}

fn served(outcome: Outcome) -> axum::http::Response<bytes::Bytes> {
    match outcome {
        Outcome::Served(response) => response,
        Outcome::PassThrough(_) => panic!("expected the request to be served"),
    }
}

fn header_str<'a>(response: &'a axum::http::Response<bytes::Bytes>, name: header::HeaderName) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

#[tokio::test]
async fn test_serves_compiled_file() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();

    let response = served(hotdev.handle(&AssetRequest::get("/app.js?v=1")).await);
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"console.log('app')");
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "application/javascript; charset=UTF-8"
    );
    assert_eq!(header_str(&response, header::CONTENT_LENGTH), "18");
    assert_eq!(header_str(&response, header::ACCEPT_RANGES), "bytes");
}

#[tokio::test]
async fn test_request_waits_for_build() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.ctx().hooks.on_start();

    let waiting = {
        let hotdev = hotdev.clone();
        tokio::spawn(async move { hotdev.handle(&AssetRequest::get("/app.js")).await })
    };
    settle().await;
    assert!(!waiting.is_finished());

    compiler.compile();
    let response = served(waiting.await.unwrap());
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalidation_before_flush_keeps_request_waiting() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    let hooks = compiler.ctx().hooks;
    hooks.on_start();

    let waiting = {
        let hotdev = hotdev.clone();
        tokio::spawn(async move { hotdev.handle(&AssetRequest::get("/app.js")).await })
    };
    settle().await;

    // Done, then a change lands before the deferred flush gets to run.
    let stale = compiler.emit(&compiler.ctx());
    hooks.on_done(stale);
    hooks.on_invalid();
    settle().await;
    assert!(!waiting.is_finished());
    assert_eq!(hotdev.status(), CompileStatus::Invalid);

    compiler.set_file("/dist/app.js", "fresh");
    compiler.compile();
    let response = served(waiting.await.unwrap());
    assert_eq!(response.body().as_ref(), b"fresh");
}

#[tokio::test]
async fn test_ssr_pass_through_waits_for_result() {
    let config = HotdevConfig {
        server_side_render: true,
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    compiler.ctx().hooks.on_start();

    let waiting = {
        let hotdev = hotdev.clone();
        tokio::spawn(async move { hotdev.handle(&AssetRequest::get("/page/about")).await })
    };
    settle().await;
    assert!(!waiting.is_finished());

    compiler.compile();
    match waiting.await.unwrap() {
        Outcome::PassThrough(Some(result)) => {
            assert_eq!(result.bundles().len(), 1);
            assert!(result.hash().is_some());
        }
        other => panic!("expected pass-through with result, got {:?}", other),
    }
}

#[tokio::test]
async fn test_pass_through_without_ssr_has_no_result() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();

    let outcome = hotdev.handle(&AssetRequest::get("/missing.js")).await;
    assert!(matches!(outcome, Outcome::PassThrough(None)));
}

#[tokio::test]
async fn test_hashed_file_served_while_building() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();
    compiler.ctx().hooks.on_invalid();

    let hashed = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/app.0123456789abcdef.js")),
    )
    .await
    .expect("hashed asset must not wait for the build");
    assert_eq!(served(hashed).body().as_ref(), b"hashed");

    let plain = {
        let hotdev = hotdev.clone();
        tokio::spawn(async move { hotdev.handle(&AssetRequest::get("/app.js")).await })
    };
    settle().await;
    assert!(!plain.is_finished());
    plain.abort();
}

#[tokio::test]
async fn test_non_get_passes_through_immediately() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.ctx().hooks.on_start();

    let outcome = hotdev
        .handle(&AssetRequest::new(Method::POST, "/app.js"))
        .await;
    assert!(matches!(outcome, Outcome::PassThrough(None)));
}

#[tokio::test]
async fn test_directory_serves_index() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();

    let response = served(hotdev.handle(&AssetRequest::get("/")).await);
    assert_eq!(response.body().as_ref(), b"<html></html>");
    assert_eq!(
        header_str(&response, header::CONTENT_TYPE),
        "text/html; charset=UTF-8"
    );
}

#[tokio::test]
async fn test_disabled_index_passes_through() {
    let config = HotdevConfig {
        index: IndexFile::Disabled,
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    compiler.compile();

    let outcome = hotdev.handle(&AssetRequest::get("/")).await;
    assert!(matches!(outcome, Outcome::PassThrough(_)));
}

#[tokio::test]
async fn test_custom_index_name() {
    let config = HotdevConfig {
        index: IndexFile::Name("main.html".to_string()),
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(
        config,
        compiler().with_file("/dist/docs/main.html", "docs"),
    );
    compiler.compile();

    let response = served(hotdev.handle(&AssetRequest::get("/docs/")).await);
    assert_eq!(response.body().as_ref(), b"docs");
    // The root directory has no main.html.
    assert!(!hotdev.handle(&AssetRequest::get("/")).await.is_served());
}

#[tokio::test]
async fn test_range_requests() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();

    let partial = served(
        hotdev
            .handle(
                &AssetRequest::get("/app.js")
                    .with_header(header::RANGE, HeaderValue::from_static("bytes=0-6")),
            )
            .await,
    );
    assert_eq!(partial.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(partial.body().as_ref(), b"console");
    assert_eq!(header_str(&partial, header::CONTENT_RANGE), "bytes 0-6/18");
    assert_eq!(header_str(&partial, header::CONTENT_LENGTH), "7");

    let unsatisfiable = served(
        hotdev
            .handle(
                &AssetRequest::get("/app.js")
                    .with_header(header::RANGE, HeaderValue::from_static("bytes=18-28")),
            )
            .await,
    );
    assert_eq!(unsatisfiable.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert!(unsatisfiable.body().is_empty());
    assert_eq!(header_str(&unsatisfiable, header::CONTENT_RANGE), "bytes */18");

    let multiple = served(
        hotdev
            .handle(
                &AssetRequest::get("/app.js")
                    .with_header(header::RANGE, HeaderValue::from_static("bytes=0-2,5-7")),
            )
            .await,
    );
    assert_eq!(multiple.status(), StatusCode::OK);
    assert_eq!(multiple.body().len(), 18);
}

#[tokio::test]
async fn test_static_headers_applied() {
    let config = HotdevConfig {
        headers: BTreeMap::from([("X-Served-By".to_string(), "hotdev".to_string())]),
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    compiler.compile();

    let response = served(hotdev.handle(&AssetRequest::get("/app.js")).await);
    assert_eq!(header_str(&response, header::HeaderName::from_static("x-served-by")), "hotdev");
}

#[tokio::test]
async fn test_custom_mime_types() {
    let config = HotdevConfig {
        mime_types: BTreeMap::from([
            ("mdx".to_string(), "text/markdown".to_string()),
            ("js".to_string(), "text/javascript".to_string()),
        ]),
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler().with_file("/dist/intro.mdx", "# Intro"));
    compiler.compile();

    let response = served(hotdev.handle(&AssetRequest::get("/intro.mdx")).await);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/markdown; charset=UTF-8");
    let response = served(hotdev.handle(&AssetRequest::get("/app.js")).await);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/javascript; charset=UTF-8");
    let response = served(hotdev.handle(&AssetRequest::get("/index.html")).await);
    assert_eq!(header_str(&response, header::CONTENT_TYPE), "text/html; charset=UTF-8");
}

#[tokio::test]
async fn test_multi_bundle_routing() {
    let compiler = TestCompiler::new(BundleTarget::new("/dist").with_public_path("/"))
        .with_bundles(vec![
            BundleTarget::new("/dist/client")
                .with_name("client")
                .with_public_path("/client/"),
            BundleTarget::new("/dist/server")
                .with_name("server")
                .with_public_path("/server/"),
        ])
        .with_file("/dist/client/main.js", "client")
        .with_file("/dist/server/main.js", "server")
        .with_file("/dist/shared.js", "shared");
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler);
    compiler.compile();

    for (url, body) in [
        ("/client/main.js", "client"),
        ("/server/main.js", "server"),
        ("/shared.js", "shared"),
    ] {
        let response = served(hotdev.handle(&AssetRequest::get(url)).await);
        assert_eq!(response.body().as_ref(), body.as_bytes(), "{}", url);
    }
}

#[tokio::test]
async fn test_public_path_outside_passes_through() {
    let compiler = TestCompiler::new(BundleTarget::new("/dist").with_public_path("/assets/"))
        .with_file("/dist/app.js", "app");
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler);
    compiler.compile();

    assert!(hotdev.handle(&AssetRequest::get("/assets/app.js")).await.is_served());
    assert!(!hotdev.handle(&AssetRequest::get("/app.js")).await.is_served());
}

#[tokio::test]
async fn test_lazy_mode_runs_only_when_needed() {
    let config = HotdevConfig {
        lazy: true,
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    assert_eq!(compiler.runs(), 1);
    settle().await;

    // Cached artifacts never trigger another run.
    for _ in 0..3 {
        assert!(hotdev.handle(&AssetRequest::get("/app.js")).await.is_served());
    }
    assert_eq!(compiler.runs(), 1);

    // An artifact the store does not hold does.
    let outcome = hotdev.handle(&AssetRequest::get("/late.js")).await;
    assert!(!outcome.is_served());
    assert_eq!(compiler.runs(), 2);
}

#[tokio::test]
async fn test_failed_lazy_run_does_not_block_requests() {
    let config = HotdevConfig {
        lazy: true,
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    settle().await;
    compiler.fail_runs(1);

    let missing = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/late.js")),
    )
    .await
    .expect("request must not wait for a compile that never started");
    assert!(!missing.is_served());
    assert_eq!(compiler.runs(), 2);
    assert_eq!(hotdev.status(), CompileStatus::Valid);

    let cached = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/app.js")),
    )
    .await
    .expect("cached artifact must still be served");
    assert!(cached.is_served());

    // The next miss tries the compiler again.
    let retried = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/late.js")),
    )
    .await
    .expect("retried compile must complete");
    assert!(!retried.is_served());
    assert_eq!(compiler.runs(), 3);
}

#[tokio::test]
async fn test_failed_first_run_is_retried_on_request() {
    let compiler = Arc::new(compiler());
    compiler.fail_runs(1);
    let config = HotdevConfig {
        lazy: true,
        ..HotdevConfig::default()
    };
    let hotdev = Hotdev::new(&config, compiler.clone()).unwrap();
    assert!(hotdev.start().is_err());
    assert_eq!(hotdev.status(), CompileStatus::Idle);

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/app.js")),
    )
    .await
    .expect("request must trigger a fresh compile");
    assert!(outcome.is_served());
    assert_eq!(compiler.runs(), 2);
}

#[tokio::test]
async fn test_lazy_filter_limits_rebuilds() {
    let config = HotdevConfig {
        lazy: true,
        filename: Some("[name].bundle.js".to_string()),
        ..HotdevConfig::default()
    };
    let (hotdev, compiler) = start(config, compiler());
    assert_eq!(compiler.runs(), 1);

    hotdev.handle(&AssetRequest::get("/style.css")).await;
    assert_eq!(compiler.runs(), 1);

    hotdev.handle(&AssetRequest::get("/vendor.bundle.js")).await;
    assert_eq!(compiler.runs(), 2);
}

#[tokio::test]
async fn test_closed_session_serves_without_waiting() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    compiler.compile();
    compiler.ctx().hooks.on_invalid();
    hotdev.close();

    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        hotdev.handle(&AssetRequest::get("/app.js")),
    )
    .await
    .expect("closed session must not wait");
    assert!(outcome.is_served());
}

#[tokio::test]
async fn test_invalidate_reaches_watcher() {
    let (hotdev, compiler) = start(HotdevConfig::default(), compiler());
    hotdev.invalidate();
    hotdev.invalidate();
    assert_eq!(
        compiler
            .invalidations
            .load(std::sync::atomic::Ordering::SeqCst),
        2
    );
}
