use std::time::Duration;

use convert_core::{JobHandle, JobId, JobRequest, JobStatus};
use convert_engine::{
    ClientSettings, JobService, LookupError, ReqwestJobClient, SubmissionError, TransportError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ReqwestJobClient {
    ReqwestJobClient::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .unwrap()
}

#[tokio::test]
async fn submit_posts_request_and_returns_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .and(header("X-CSRFToken", "session-1"))
        .and(body_json(json!({
            "url": "abc",
            "format_id": "mp4-720p",
            "filename": "holiday",
            "g-recaptcha-response": "proof",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"task_id": "t1", "status": "started"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ReqwestJobClient::new(ClientSettings {
        base_url: server.uri(),
        session_token: Some("session-1".into()),
        ..ClientSettings::default()
    })
    .unwrap();
    let request = JobRequest::new("abc", "mp4-720p")
        .with_verification_token("proof")
        .with_output_name("holiday");

    let handle = client.submit(&request).await.unwrap();
    assert_eq!(handle, JobHandle::new("t1"));
}

#[tokio::test]
async fn submit_surfaces_service_error_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "CAPTCHA verification failed"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&JobRequest::new("abc", "18"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SubmissionError::Rejected {
            status: 400,
            reason: "CAPTCHA verification failed".into(),
        }
    );
    assert_eq!(err.reason(), "CAPTCHA verification failed");
}

#[tokio::test]
async fn submit_without_error_body_reports_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&JobRequest::new("abc", "18"))
        .await
        .unwrap_err();
    match err {
        SubmissionError::Rejected { status, reason } => {
            assert_eq!(status, 429);
            assert!(reason.contains("429"), "{reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn submit_reply_without_task_id_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .submit(&JobRequest::new("abc", "18"))
        .await
        .unwrap_err();
    assert!(matches!(err, SubmissionError::InvalidResponse(_)));
}

#[tokio::test]
async fn status_maps_running_and_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Processing",
            "percentage": 10,
            "message": "Merging streams",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Completed",
            "percentage": 100,
            "download_link": "/dl/t1",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let job_id = JobId::new("t1");

    assert_eq!(
        client.status(&job_id).await.unwrap(),
        JobStatus::Running {
            percentage: Some(10),
            label: "Processing".into(),
        }
    );
    assert_eq!(
        client.status(&job_id).await.unwrap(),
        JobStatus::Completed {
            artifact_ref: "/dl/t1".into(),
        }
    );
}

#[tokio::test]
async fn status_of_unknown_job_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": "Not Found"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .status(&JobId::new("gone"))
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::HttpStatus(404));
}

#[tokio::test]
async fn status_with_unreadable_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .status(&JobId::new("t1"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::InvalidBody(_)));
}

#[tokio::test]
async fn status_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/t1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"status": "Processing"})),
        )
        .mount(&server)
        .await;

    let client = ReqwestJobClient::new(ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .unwrap();

    let err = client.status(&JobId::new("t1")).await.unwrap_err();
    assert_eq!(err, TransportError::Timeout);
}

#[tokio::test]
async fn status_without_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let client = ReqwestJobClient::new(ClientSettings {
        base_url: format!("http://127.0.0.1:{port}"),
        ..ClientSettings::default()
    })
    .unwrap();

    let err = client.status(&JobId::new("t1")).await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn lookup_lists_formats() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/download"))
        .and(body_json(json!({"url": "https://youtu.be/abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Clip",
            "uploader": "someone",
            "duration": 61,
            "view_count": 10,
            "formats": [
                {"format_id": "22", "ext": "mp4", "resolution": "1280x720", "note": "720p", "filesize": 1024},
                {"format_id": "140", "ext": "m4a", "resolution": "audio only", "note": "", "filesize": null},
            ],
        })))
        .mount(&server)
        .await;

    let info = client_for(&server)
        .lookup_formats("https://youtu.be/abc")
        .await
        .unwrap();
    assert_eq!(info.title, "Clip");
    assert_eq!(info.duration, Some(61.0));
    let ids: Vec<_> = info.formats.iter().map(|f| f.format_id.as_str()).collect();
    assert_eq!(ids, vec!["22", "140"]);
    assert_eq!(info.formats[0].describe(), "MP4 - 1280x720 (720p)");
    assert_eq!(info.formats[1].filesize, None);
}

#[tokio::test]
async fn lookup_rejection_carries_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/download"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "No URL provided"})))
        .mount(&server)
        .await;

    let err = client_for(&server).lookup_formats("").await.unwrap_err();
    assert_eq!(
        err,
        LookupError::Rejected {
            status: 400,
            reason: "No URL provided".into(),
        }
    );
}
