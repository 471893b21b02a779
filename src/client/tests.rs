use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use super::*;
use crate::params::{BuildRange, RollbackManifest};

const PROJECT: &str = "release-job";

fn client_for(server: &ServerGuard, token: &str) -> CiJobsClient {
    let credentials = Credentials::new(&server.url(), token).unwrap();
    CiJobsClient::new(credentials).unwrap()
}

/// Minimal valid call for each operation with the method and path it must hit.
fn valid_call(operation: Operation) -> (&'static str, &'static str, Params) {
    let base = Params::new().with("projectName", PROJECT);
    match operation {
        Operation::History => ("GET", "/api/cijobs/v1/history/release-job", base),
        Operation::Poll => ("GET", "/api/cijobs/v1/pollstatus/release-job", base),
        Operation::Trigger => ("POST", "/api/cijobs/v1/trigger", base),
        Operation::QuickDeploy => ("POST", "/api/cijobs/v1/triggerquickdeploy/release-job", base),
        Operation::Update => (
            "POST",
            "/api/cijobs/v1/update/baselinerevision",
            base.with("baseLineRevision", "1234567"),
        ),
        Operation::Rollback => (
            "POST",
            "/api/cijobs/v1/rollback/release-job/7",
            base.with("buildNumber", 7),
        ),
        Operation::RollbackDetails => ("GET", "/api/cijobs/v1/rollbackdetails/release-job", base),
        Operation::RollbackHistory => (
            "GET",
            "/api/cijobs/v1/rollbackhistory/release-job/7",
            base.with("buildNumber", 7),
        ),
    }
}

#[tokio::test]
async fn test_missing_required_param_sends_nothing() {
    let mut server = Server::new_async().await;
    let get = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let post = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let client = client_for(&server, "test-token");

    for operation in Operation::ALL {
        let (_, _, valid) = valid_call(operation);
        for required in operation.descriptor().required_params() {
            let mut params = valid.clone();
            params.remove(required);

            let err = client.execute(operation, params).await.unwrap_err();
            assert!(err.is_validation(), "{operation} without {required}: {err}");
            assert!(err.to_string().contains(required));
        }
    }

    get.assert_async().await;
    post.assert_async().await;
}

#[tokio::test]
async fn test_success_body_returned_unmodified() {
    let mut server = Server::new_async().await;
    let client = client_for(&server, "test-token");
    let body = json!({
        "status": "Inprogress",
        "cyclenum": 12,
        "nested": {"list": [1, "two", null], "flag": false},
    });

    for operation in Operation::ALL {
        let (method, path, params) = valid_call(operation);
        let mock = server
            .mock(method, path)
            .match_query(Matcher::Any)
            .match_header("token", "test-token")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let response = client.execute(operation, params).await.unwrap();
        assert_eq!(Value::Object(response), body, "{operation}");

        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_error_status_becomes_api_error() {
    let mut server = Server::new_async().await;
    let client = client_for(&server, "test-token");

    for (operation, status) in Operation::ALL.into_iter().zip([400, 401, 403, 404, 409, 422, 500, 503]) {
        let (method, path, params) = valid_call(operation);
        let error_body = format!(r#"{{"message":"{operation} rejected"}}"#);
        let mock = server
            .mock(method, path)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body(&error_body)
            .create_async()
            .await;

        let err = client.execute(operation, params).await.unwrap_err();
        assert!(err.is_api(), "{operation}: {err}");
        assert_eq!(err.status(), Some(u16::try_from(status).unwrap()));
        assert_eq!(err.body(), Some(error_body.as_str()));

        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_trigger_sends_job_name_verbatim() {
    let mut server = Server::new_async().await;
    let job = "Release Job/ü \"quoted\"";
    let mock = server
        .mock("POST", "/api/cijobs/v1/trigger")
        .match_header("token", "test-token")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "projectName": job,
            "title": "testing-rabit",
        })))
        .with_status(200)
        .with_body(r#"{"status":"Inprogress","cyclenum":3}"#)
        .create_async()
        .await;

    let client = client_for(&server, "test-token");
    let response = client
        .trigger(TriggerParams::new(job).title("testing-rabit"))
        .await
        .unwrap();

    assert_eq!(response["cyclenum"], json!(3));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_history_sends_build_window() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/cijobs/v1/history/release-job")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("from".into(), "5".into()),
            Matcher::UrlEncoded("to".into(), "5".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"ciJobHistoryList":[]}"#)
        .create_async()
        .await;

    let client = client_for(&server, "test-token");
    let response = client
        .history(HistoryParams::new(PROJECT).range(BuildRange::single(5)))
        .await
        .unwrap();

    assert_eq!(response["ciJobHistoryList"], json!([]));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rollback_sends_manifest_in_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/cijobs/v1/rollback/release-job/9")
        .match_body(Matcher::Json(json!({
            "validateDeployment": true,
            "destructiveChangesPre": {"CustomField": ["Account.Legacy__c"]},
        })))
        .with_status(200)
        .with_body(r#"{"revertId":4,"status":"Inprogress"}"#)
        .create_async()
        .await;

    let manifest = RollbackManifest {
        destructive_changes_pre: Some(json!({"CustomField": ["Account.Legacy__c"]})),
        ..RollbackManifest::default()
    };
    let client = client_for(&server, "test-token");
    let response = client
        .rollback(
            RollbackParams::new(PROJECT, 9)
                .validate_only(true)
                .manifest(manifest),
        )
        .await
        .unwrap();

    assert_eq!(response["revertId"], json!(4));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_quick_deploy_sends_no_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/cijobs/v1/triggerquickdeploy/release-job/21")
        .match_body("")
        .with_status(200)
        .with_body(r#"{"status":"Quick deploy initiated successfully for build 21"}"#)
        .create_async()
        .await;

    let client = client_for(&server, "test-token");
    client
        .quick_deploy(QuickDeployParams::new(PROJECT).build(21))
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_object_success_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/cijobs/v1/pollstatus/release-job")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server, "test-token");
    let err = client.poll(PollParams::new(PROJECT)).await.unwrap_err();
    assert!(matches!(err, RabitError::InvalidResponse { status: 200, .. }));
    assert_eq!(err.body(), Some("<html>maintenance</html>"));

    // Exactly one request per call: nothing is retried.
    let _ = client.poll(PollParams::new(PROJECT)).await;
    mock.assert_async().await;
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    // Accepts connections at the socket level but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let credentials = Credentials::new(&url, "test-token").unwrap();
    let client = CiJobsClient::with_timeout(credentials, Duration::from_millis(200)).unwrap();

    let err = client.poll(PollParams::new(PROJECT)).await.unwrap_err();
    match err {
        RabitError::Transport { operation, source } => {
            assert_eq!(operation, Operation::Poll);
            assert!(source.is_timeout(), "{source}");
        }
        other => panic!("expected transport error, got {other:?}"),
    }
    drop(listener);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let credentials = Credentials::new(&format!("http://{addr}"), "test-token").unwrap();
    let client = CiJobsClient::new(credentials).unwrap();

    let err = client
        .trigger(TriggerParams::new(PROJECT))
        .await
        .unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_concurrent_clients_keep_their_own_tokens() {
    let mut server_a = Server::new_async().await;
    let mut server_b = Server::new_async().await;

    let mock_a = server_a
        .mock("GET", "/api/cijobs/v1/pollstatus/job-a/1")
        .match_header("token", "token-a")
        .with_status(200)
        .with_body(r#"{"instance":"a"}"#)
        .expect(3)
        .create_async()
        .await;
    let mock_b = server_b
        .mock("POST", "/api/cijobs/v1/trigger")
        .match_header("token", "token-b")
        .with_status(200)
        .with_body(r#"{"instance":"b"}"#)
        .expect(3)
        .create_async()
        .await;

    let client_a = client_for(&server_a, "token-a");
    let client_b = client_for(&server_b, "token-b");

    let polls = (0..3).map(|_| client_a.poll(PollParams::new("job-a").build(1)));
    let triggers = (0..3).map(|_| client_b.trigger(TriggerParams::new("job-b")));
    let (polled, triggered) = futures::future::join(
        futures::future::join_all(polls),
        futures::future::join_all(triggers),
    )
    .await;

    for response in polled {
        assert_eq!(response.unwrap()["instance"], json!("a"));
    }
    for response in triggered {
        assert_eq!(response.unwrap()["instance"], json!("b"));
    }

    mock_a.assert_async().await;
    mock_b.assert_async().await;
}

#[tokio::test]
async fn test_shared_client_across_tasks() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Regex(r"^/api/cijobs/v1/pollstatus/job-\d$".into()))
        .match_header("token", "shared-token")
        .with_status(200)
        .with_body(r#"{"status":"Completed"}"#)
        .expect(4)
        .create_async()
        .await;

    let client = client_for(&server, "shared-token");
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.poll(PollParams::new(format!("job-{i}"))).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    mock.assert_async().await;
}

#[test]
fn test_unknown_logical_name_fails_before_sending() {
    let err = tokio_test::block_on(async {
        let operation: Operation = "cijobs.deploy".parse()?;
        let credentials = Credentials::new("http://127.0.0.1:9", "t")?;
        CiJobsClient::new(credentials)?
            .execute(operation, Params::new())
            .await
    })
    .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_zero_timeout_rejected() {
    let credentials = Credentials::new("https://rabit.example.com", "t").unwrap();
    let err = CiJobsClient::with_timeout(credentials, Duration::ZERO).unwrap_err();
    assert!(err.is_validation());
}
