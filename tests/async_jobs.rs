mod common;

use std::time::Duration;

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wpsclient::{Credential, Error, JobStatus, Sink, StatusSnapshot};

use common::*;

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/xml")
}

async fn mount_submit(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/ows"))
        .and(body_string_contains("vires:fetch_data"))
        .respond_with(xml(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_poll_once(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path(status_path()))
        .respond_with(xml(body))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_cleanup(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/ows"))
        .and(body_string_contains("vires:remove_job"))
        .and(body_string_contains(JOB_ID))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_output(server: &MockServer, data: &'static [u8]) {
    Mock::given(method("GET"))
        .and(path(output_path()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(data))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn finished_job_is_downloaded_and_removed() {
    let server = MockServer::start().await;
    mount_submit(&server, accepted()).await;
    mount_poll_once(&server, started(0)).await;
    mount_poll_once(&server, started(0)).await;
    mount_poll_once(&server, started(50)).await;
    mount_poll_once(&server, succeeded()).await;
    mount_output(&server, b"CDF payload").await;
    mount_cleanup(&server, 200).await;

    let uri = server.uri();
    let (result, data, seen) = tokio::task::spawn_blocking(move || {
        let client = client(&uri);
        let mut seen: Vec<(JobStatus, Option<u8>)> = Vec::new();
        let mut on_status = |s: &StatusSnapshot| seen.push((s.status, s.percent_completed));
        let mut sink = Sink::new(Vec::new());
        let result = client.execute_async(
            &fetch_request(),
            &mut sink,
            Some(&mut on_status as &mut dyn FnMut(&StatusSnapshot)),
        );
        (result, sink.into_inner(), seen)
    })
    .await
    .unwrap();

    assert_eq!(result.unwrap(), 11);
    assert_eq!(data, b"CDF payload");
    // The repeated 0% poll is not reported a second time.
    assert_eq!(
        seen,
        vec![
            (JobStatus::Accepted, Some(0)),
            (JobStatus::Started, Some(0)),
            (JobStatus::Started, Some(50)),
            (JobStatus::Finished, Some(100)),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_job_reports_ows_exception() {
    let server = MockServer::start().await;
    mount_submit(&server, accepted()).await;
    mount_poll_once(&server, started(10)).await;
    mount_poll_once(&server, failed("NoApplicableCode", "begin_time", "out of range")).await;
    mount_cleanup(&server, 200).await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri).execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    match result {
        Err(Error::Protocol(fault)) => {
            assert_eq!(fault.code, "NoApplicableCode");
            assert_eq!(fault.locator.as_deref(), Some("begin_time"));
            assert_eq!(fault.text.as_deref(), Some("out of range"));
        }
        other => panic!("expected protocol fault, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_poll_is_an_authentication_fault() {
    let server = MockServer::start().await;
    mount_submit(&server, accepted()).await;
    Mock::given(method("GET"))
        .and(path(status_path()))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    mount_cleanup(&server, 200).await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri).execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::Authentication)));
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_submit_runs_no_cleanup() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ows"))
        .and(body_string_contains("vires:fetch_data"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("vires:remove_job"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri).execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    assert!(result.unwrap_err().is_authentication());
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_output_reference_is_malformed() {
    let server = MockServer::start().await;
    mount_submit(&server, succeeded_with("something_else")).await;
    mount_cleanup(&server, 200).await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri).execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::MalformedResponse(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_failure_does_not_mask_success() {
    let server = MockServer::start().await;
    mount_submit(&server, accepted()).await;
    mount_poll_once(&server, succeeded()).await;
    mount_output(&server, b"data").await;
    mount_cleanup(&server, 500).await;

    let uri = server.uri();
    let (result, data) = tokio::task::spawn_blocking(move || {
        let mut sink = Sink::new(Vec::new());
        let result = client(&uri).execute_async(&fetch_request(), &mut sink, None);
        (result, sink.into_inner())
    })
    .await
    .unwrap();

    assert_eq!(result.unwrap(), 4);
    assert_eq!(data, b"data");
}

#[tokio::test(flavor = "multi_thread")]
async fn cleanup_failure_does_not_mask_fault() {
    let server = MockServer::start().await;
    mount_submit(&server, failed("InvalidParameterValue", "collection_ids", "bad")).await;
    mount_cleanup(&server, 500).await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri).execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    match result {
        Err(Error::Protocol(fault)) => assert_eq!(fault.code, "InvalidParameterValue"),
        other => panic!("expected protocol fault, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_request_carries_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("vires:fetch_data"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(xml(accepted()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(status_path()))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(xml(succeeded()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(output_path()))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"ok"[..]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("vires:remove_job"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let client = client_with(&uri, &Credential::Token("s3cret".into()));
        client.execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    assert_eq!(result.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn poll_deadline_stops_a_stuck_job() {
    let server = MockServer::start().await;
    mount_submit(&server, started(5)).await;
    Mock::given(method("GET"))
        .and(path(status_path()))
        .respond_with(xml(started(5)))
        .mount(&server)
        .await;
    mount_cleanup(&server, 200).await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(&uri)
            .with_poll_timeout(Some(Duration::from_millis(100)))
            .execute_async(&fetch_request(), &mut Sink::new(Vec::new()), None)
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::PollTimeout(_))));
}
