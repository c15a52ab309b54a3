// Tests for SourceDownloader
// Uses mockito for HTTP mocking

use mockito::{Matcher, Server};
use salary_tracker::fetch_error::FetchError;
use salary_tracker::importers::downloader::{SourceDownloader, BROWSER_USER_AGENT};
use std::io::Write;
use std::time::Duration;

fn create_test_downloader() -> SourceDownloader {
    SourceDownloader::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_download_success() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/2._salario_de_bolsillo_mg10_25.xlsx")
        .with_status(200)
        .with_header(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )
        .with_body(b"fake excel data")
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let url = format!("{}/2._salario_de_bolsillo_mg10_25.xlsx", server.url());
    let bytes = downloader.download(&url).await.unwrap();

    assert_eq!(bytes, b"fake excel data");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_sends_browser_user_agent() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/basket.csv")
        .match_header("user-agent", Matcher::Exact(BROWSER_USER_AGENT.to_string()))
        .with_status(200)
        .with_body("indice_tiempo,cba\n2016-04-01,1000\n")
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let result = downloader
        .download(&format!("{}/basket.csv", server.url()))
        .await;

    assert!(result.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_404() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/sh_ipc_10_26.xls")
        .with_status(404)
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let result = downloader
        .download(&format!("{}/sh_ipc_10_26.xls", server.url()))
        .await;

    match result.unwrap_err() {
        FetchError::NotFound(url) => assert!(url.contains("sh_ipc_10_26.xls")),
        other => panic!("Expected NotFound error, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_server_error() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/table.xlsx")
        .with_status(503)
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let result = downloader
        .download(&format!("{}/table.xlsx", server.url()))
        .await;

    match result.unwrap_err() {
        FetchError::ServerError { status, url } => {
            assert_eq!(status, 503);
            assert!(url.contains("table.xlsx"));
        }
        other => panic!("Expected ServerError, got {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_forbidden_is_status_error() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/table.xlsx")
        .with_status(403)
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let result = downloader
        .download(&format!("{}/table.xlsx", server.url()))
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Status { status: 403, .. })
    ));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_is_not_retried() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/flaky.xlsx")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let downloader = create_test_downloader();
    let result = downloader
        .download(&format!("{}/flaky.xlsx", server.url()))
        .await;

    assert!(result.is_err());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_download_timeout() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/slow.xlsx")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(1500));
            w.write_all(b"too late")
        })
        .create_async()
        .await;

    let downloader = SourceDownloader::new(Duration::from_millis(200)).unwrap();
    let result = downloader
        .download(&format!("{}/slow.xlsx", server.url()))
        .await;

    match result.unwrap_err() {
        FetchError::Timeout(url) => assert!(url.contains("slow.xlsx")),
        other => panic!("Expected Timeout error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_download_connection_refused() {
    let downloader = create_test_downloader();
    // Port 9 (discard) is closed on test hosts
    let result = downloader.download("http://127.0.0.1:9/table.xlsx").await;

    assert!(matches!(result, Err(FetchError::Request(_))));
}
