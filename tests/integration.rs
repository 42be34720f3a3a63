use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot;

use volley::dispatch::{Dispatcher, DispatcherConfig};
use volley::http::{HttpResponse, MockHttpClient};
use volley::submit::Submitter;
use volley::upload::FailureReason;
use volley::{ApiTarget, MalformedPolicy, Product, UploadConfig, VolleyError, upload_feed};

fn write_feed(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp feed");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp feed");
    file
}

fn target() -> ApiTarget {
    ApiTarget {
        endpoint: "https://api.example.com".to_string(),
        path: "/v1/product/import".to_string(),
        api_key: "test-key".to_string(),
    }
}

fn dispatcher_config(concurrency: usize) -> DispatcherConfig {
    DispatcherConfig {
        concurrency,
        timeout_ms: 5_000,
        status_log_interval_ms: None, // Disable status logging in tests
    }
}

fn upload_config(feed_path: &std::path::Path, concurrency: usize) -> UploadConfig {
    UploadConfig {
        feed_path: feed_path.to_path_buf(),
        target: target(),
        dispatcher: dispatcher_config(concurrency),
        on_malformed: MalformedPolicy::Skip,
    }
}

fn product(sku: &str, line: u64) -> Product {
    Product {
        sku: sku.to_string(),
        price: 10.0,
        title: None,
        line,
    }
}

fn ok_response() -> volley::Result<HttpResponse> {
    Ok(HttpResponse {
        status: 200,
        body: r#"{"result":"imported"}"#.to_string(),
    })
}

#[test_log::test(tokio::test)]
async fn test_three_row_feed_all_success() {
    let feed = write_feed("sku-1,100.0,First\nsku-2,25.5,Second\nsku-3,7.0\n");

    let mock = MockHttpClient::new();
    mock.add_response("sku-1", ok_response());
    mock.add_response("sku-2", ok_response());
    mock.add_response("sku-3", ok_response());

    let report = upload_feed(&upload_config(feed.path(), 5), mock.clone())
        .await
        .expect("upload run should not abort");

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert!(report.is_complete());
    assert!(report.all_succeeded());

    // Every call carried the credential and a JSON body
    let calls = mock.get_calls();
    assert_eq!(calls.len(), 3);
    for call in &calls {
        assert_eq!(call.api_key, "test-key");
        assert_eq!(call.path, "/v1/product/import");
        let body: serde_json::Value =
            serde_json::from_str(&call.body).expect("body should be JSON");
        assert_eq!(body["sku"], call.sku.as_str());
    }
}

#[test_log::test(tokio::test)]
async fn test_dispatcher_bounds_in_flight_requests() {
    // 5 products, concurrency 2: peak observed in-flight must never exceed 2
    let mock = MockHttpClient::new();
    let skus = ["sku-1", "sku-2", "sku-3", "sku-4", "sku-5"];

    let mut triggers: HashMap<String, oneshot::Sender<()>> = HashMap::new();
    for sku in skus {
        triggers.insert(sku.to_string(), mock.add_response_with_trigger(sku, ok_response()));
    }

    let products: Vec<Product> = skus
        .iter()
        .enumerate()
        .map(|(i, sku)| product(sku, i as u64 + 1))
        .collect();

    let dispatcher = Dispatcher::new(Submitter::new(mock.clone(), target()), dispatcher_config(2));
    let handle = tokio::spawn(async move { dispatcher.run(products).await });

    // Wait for exactly 2 requests to be in flight
    let start = tokio::time::Instant::now();
    let timeout = Duration::from_secs(2);
    let mut reached_limit = false;

    while start.elapsed() < timeout {
        if mock.in_flight_count() == 2 {
            reached_limit = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(
        reached_limit,
        "expected exactly 2 requests in flight, got {}",
        mock.in_flight_count()
    );

    // Verify the limit holds (not more than 2 even after a settling period)
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        mock.in_flight_count(),
        2,
        "concurrency limit violated: more than 2 requests in flight"
    );
    assert_eq!(mock.call_count(), 2);

    // Complete whichever request started first; a third should be admitted
    let first_sku = mock.get_calls()[0].sku.clone();
    triggers
        .remove(&first_sku)
        .expect("trigger for first sku")
        .send(())
        .expect("request should be waiting on trigger");

    let start = tokio::time::Instant::now();
    let mut third_started = false;
    let mut peak = 0usize;

    while start.elapsed() < timeout {
        peak = peak.max(mock.in_flight_count());
        if mock.call_count() >= 3 {
            third_started = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(third_started, "third request should start after the first completed");
    assert!(peak <= 2, "observed {} concurrent requests, limit is 2", peak);

    // Release the rest and drain the batch
    for trigger in triggers.into_values() {
        let _ = trigger.send(());
    }

    let report = handle.await.expect("dispatcher task should not panic");
    assert_eq!(report.total, 5);
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.succeeded, 5);
    assert!(report.is_complete());
    assert_eq!(mock.call_count(), 5);
}

#[tokio::test]
async fn test_unparseable_price_is_uploaded_with_zero() {
    let feed = write_feed("sku-9,abc,Mystery widget\n");

    let mock = MockHttpClient::new();
    mock.add_response("sku-9", ok_response());

    let report = upload_feed(&upload_config(feed.path(), 2), mock.clone())
        .await
        .expect("upload run should not abort");

    // The row is still dispatched and receives an outcome
    assert_eq!(report.total, 1);
    assert_eq!(report.succeeded, 1);

    let calls = mock.get_calls();
    assert_eq!(calls.len(), 1);
    let body: serde_json::Value = serde_json::from_str(&calls[0].body).unwrap();
    assert_eq!(body["price"], 0.0);
}

#[tokio::test]
async fn test_missing_feed_aborts_before_any_call() {
    let mock = MockHttpClient::new();
    let config = upload_config(std::path::Path::new("/nonexistent/products.csv"), 2);

    let result = upload_feed(&config, mock.clone()).await;

    assert!(matches!(result, Err(VolleyError::SourceUnavailable { .. })));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_failures_do_not_shrink_admission_pool() {
    // Two products fail immediately; the admission slots they held must be
    // released so the remaining products can still reach full concurrency.
    let mock = MockHttpClient::new();
    mock.add_response(
        "sku-f1",
        Ok(HttpResponse {
            status: 500,
            body: "server error".to_string(),
        }),
    );
    mock.add_response(
        "sku-f2",
        Ok(HttpResponse {
            status: 500,
            body: "server error".to_string(),
        }),
    );
    let trigger_1 = mock.add_response_with_trigger("sku-t1", ok_response());
    let trigger_2 = mock.add_response_with_trigger("sku-t2", ok_response());

    let products = vec![
        product("sku-f1", 1),
        product("sku-f2", 2),
        product("sku-t1", 3),
        product("sku-t2", 4),
    ];

    let dispatcher = Dispatcher::new(Submitter::new(mock.clone(), target()), dispatcher_config(2));
    let handle = tokio::spawn(async move { dispatcher.run(products).await });

    // All 4 must start, and the 2 triggered ones must hold 2 slots at once -
    // impossible if a failing path leaked its permit
    let start = tokio::time::Instant::now();
    let timeout = Duration::from_secs(2);
    let mut full_concurrency_after_failures = false;

    while start.elapsed() < timeout {
        if mock.call_count() == 4 && mock.in_flight_count() == 2 {
            full_concurrency_after_failures = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(
        full_concurrency_after_failures,
        "admission pool shrank after failures: {} calls, {} in flight",
        mock.call_count(),
        mock.in_flight_count()
    );

    trigger_1.send(()).expect("sku-t1 should be in flight");
    trigger_2.send(()).expect("sku-t2 should be in flight");

    let report = handle.await.expect("dispatcher task should not panic");
    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 2);
    assert!(report.is_complete());
}

#[tokio::test]
async fn test_outcome_classification() {
    let mock = MockHttpClient::new();
    mock.add_response(
        "sku-created",
        Ok(HttpResponse {
            status: 201,
            body: "created".to_string(),
        }),
    );
    mock.add_response(
        "sku-missing",
        Ok(HttpResponse {
            status: 404,
            body: "not found".to_string(),
        }),
    );
    // sku-dark has no configured response: the mock fails at the client level

    let products = vec![
        product("sku-created", 1),
        product("sku-missing", 2),
        product("sku-dark", 3),
    ];

    let dispatcher = Dispatcher::new(Submitter::new(mock.clone(), target()), dispatcher_config(3));
    let report = dispatcher.run(products).await;

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 2);

    let by_sku = |sku: &str| {
        report
            .outcomes
            .iter()
            .find(|outcome| outcome.sku() == sku)
            .expect("every product has an outcome")
    };

    assert_eq!(by_sku("sku-created").status(), Some(201));
    assert_eq!(
        by_sku("sku-missing").failure_reason(),
        Some(&FailureReason::HttpStatus {
            status: 404,
            body: "not found".to_string(),
        })
    );
    assert!(matches!(
        by_sku("sku-dark").failure_reason(),
        Some(FailureReason::Transport { .. })
    ));
}

#[tokio::test]
async fn test_malformed_row_is_skipped_rest_uploaded() {
    let feed = write_feed("sku-1,10.0\nlonely-field\nsku-2,20.0\n");

    let mock = MockHttpClient::new();
    mock.add_response("sku-1", ok_response());
    mock.add_response("sku-2", ok_response());

    let report = upload_feed(&upload_config(feed.path(), 2), mock.clone())
        .await
        .expect("skip policy should not abort the run");

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 2);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_abort_policy_stops_before_any_call() {
    let feed = write_feed("sku-1,10.0\nlonely-field\nsku-2,20.0\n");

    let mock = MockHttpClient::new();
    let mut config = upload_config(feed.path(), 2);
    config.on_malformed = MalformedPolicy::Abort;

    let result = upload_feed(&config, mock.clone()).await;

    assert!(matches!(
        result,
        Err(VolleyError::MalformedRecord { line: 2, .. })
    ));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_empty_feed_yields_empty_report() {
    let feed = write_feed("");

    let mock = MockHttpClient::new();
    let report = upload_feed(&upload_config(feed.path(), 2), mock.clone())
        .await
        .expect("empty feed is not an error");

    assert_eq!(report.total, 0);
    assert!(report.is_complete());
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_batch_with_only_failures_still_completes() {
    // Preserved behavior: a fully failed batch is still a completed run
    let feed = write_feed("sku-1,10.0\nsku-2,20.0\n");

    let mock = MockHttpClient::new();
    mock.add_response(
        "sku-1",
        Ok(HttpResponse {
            status: 503,
            body: "unavailable".to_string(),
        }),
    );
    mock.add_response(
        "sku-2",
        Ok(HttpResponse {
            status: 503,
            body: "unavailable".to_string(),
        }),
    );

    let report = upload_feed(&upload_config(feed.path(), 2), mock.clone())
        .await
        .expect("per-product failures never abort the run");

    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 2);
    assert!(report.is_complete());
    assert!(!report.all_succeeded());
}
