//! Integration tests for `SheetClient` and `CachedSheetSource` using wiremock.

use std::time::Duration;

use rack_source::{CachedSheetSource, FetchError, SheetClient, SheetRef};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOOKS_CSV: &str = "No, Title ,Rate,Rack\n7,Atlas Shrugged,250,A3\n12,The Hobbit,nan,B1\n";

fn test_client(base_url: &str, max_retries: u32) -> SheetClient {
    SheetClient::with_base_url(5, "rack-test/0.1", max_retries, 0, base_url)
        .expect("client construction should not fail")
}

fn csv_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/csv; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn fetch_returns_parsed_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/abc/gviz/tq"))
        .and(query_param("tqx", "out:csv"))
        .and(query_param("sheet", "Sheet1"))
        .respond_with(csv_response(BOOKS_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let table = client.fetch("abc", "Sheet1").await.expect("should fetch");

    assert_eq!(table.columns(), ["No", "Title", "Rate", "Rack"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(1, 1), "The Hobbit");
}

#[tokio::test]
async fn not_found_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let err = client.fetch("missing", "Sheet1").await.unwrap_err();
    assert!(
        matches!(err, FetchError::NotFound { .. }),
        "expected NotFound, got: {err:?}"
    );
}

#[tokio::test]
async fn html_login_page_is_not_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Sign in</body></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client.fetch("private", "Sheet1").await.unwrap_err();
    assert!(
        matches!(err, FetchError::NotCsv { .. }),
        "expected NotCsv, got: {err:?}"
    );
}

#[tokio::test]
async fn html_body_with_plain_content_type_is_not_csv() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "\n<!DOCTYPE html>\n<html><body>Sign in</body></html>",
            "text/plain; charset=utf-8",
        ))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client.fetch("private", "Sheet1").await.unwrap_err();
    match err {
        FetchError::NotCsv { content_type, .. } => {
            assert!(content_type.starts_with("text/plain"), "got: {content_type}");
        }
        other => panic!("expected NotCsv, got: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_without_retries_fails_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 0);
    let err = client.fetch("abc", "Sheet1").await.unwrap_err();
    assert!(
        matches!(err, FetchError::UnexpectedStatus { status: 503, .. }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(csv_response(BOOKS_CSV))
        .mount(&server)
        .await;

    let client = test_client(&server.uri(), 2);
    let table = client.fetch("abc", "Sheet1").await.expect("retry succeeds");
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn cached_source_fetches_once_until_invalidated() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/abc/gviz/tq"))
        .respond_with(csv_response(BOOKS_CSV))
        .expect(2)
        .mount(&server)
        .await;

    let source = CachedSheetSource::new(test_client(&server.uri(), 0), Duration::from_secs(60));
    let sheet = SheetRef {
        sheet_id: "abc".to_string(),
        sheet_name: "Sheet1".to_string(),
    };

    let first = source.fetch(&sheet).await.expect("first fetch");
    let second = source.fetch(&sheet).await.expect("cached fetch");
    assert_eq!(first, second);

    source.invalidate().await;
    let third = source.fetch(&sheet).await.expect("refetch after invalidate");
    assert_eq!(third.len(), 2);
}

#[tokio::test]
async fn stale_entry_is_fetched_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/abc/gviz/tq"))
        .respond_with(csv_response(BOOKS_CSV))
        .expect(2)
        .mount(&server)
        .await;

    let source = CachedSheetSource::new(test_client(&server.uri(), 0), Duration::ZERO);
    let sheet = SheetRef {
        sheet_id: "abc".to_string(),
        sheet_name: "Sheet1".to_string(),
    };

    source.fetch(&sheet).await.expect("first fetch");
    let second = source.fetch(&sheet).await.expect("stale refetch");
    assert_eq!(second.len(), 2);
}

#[tokio::test]
async fn failed_refetch_keeps_stale_table() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(csv_response(BOOKS_CSV))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = CachedSheetSource::new(test_client(&server.uri(), 0), Duration::ZERO);
    let sheet = SheetRef {
        sheet_id: "abc".to_string(),
        sheet_name: "Sheet1".to_string(),
    };

    let first = source.fetch(&sheet).await.expect("first fetch");
    let err = source.fetch(&sheet).await.unwrap_err();
    assert!(
        matches!(err, FetchError::UnexpectedStatus { status: 500, .. }),
        "expected UnexpectedStatus(500), got: {err:?}"
    );

    let kept = source.cached(&sheet).await.expect("stale entry kept");
    assert!(kept.is_stale);
    assert_eq!(kept.value, first);
}
