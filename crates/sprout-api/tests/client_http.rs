//! Integration tests for the API client against a local HTTP server.
//!
//! Each test spins up an ephemeral axum listener, points a client at it
//! and asserts on the request the server captured or on the decoding of
//! a canned response.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use chrono::{TimeZone, Utc};
use url::Url;

use sprout_api::{
    ApiClient, ApiConfig, ApiError, CreateApplicationVersionParams, Credentials,
    DescribeApplicationVersionsParams, DescribeEnvironmentsParams, EpochSeconds, SourceBundle,
    UpdateEnvironmentParams,
};

/// What the handler saw, kept for assertions.
#[derive(Debug, Clone)]
struct Captured {
    method: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
}

#[derive(Clone)]
struct ServerState {
    captured: Arc<Mutex<Option<Captured>>>,
    status: StatusCode,
    body: &'static str,
}

async fn record(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> (StatusCode, &'static str) {
    let query = uri
        .query()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let mut captured_headers = HashMap::new();
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            captured_headers.insert(name.as_str().to_owned(), value.to_owned());
        }
    }

    *state.captured.lock().unwrap() = Some(Captured {
        method: method.to_string(),
        query,
        headers: captured_headers,
    });
    (state.status, state.body)
}

async fn spawn_server(
    status: StatusCode,
    body: &'static str,
) -> (SocketAddr, Arc<Mutex<Option<Captured>>>) {
    let captured = Arc::new(Mutex::new(None));
    let state = ServerState {
        captured: captured.clone(),
        status,
        body,
    };
    let app = Router::new().fallback(record).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, captured)
}

fn test_client(addr: SocketAddr) -> ApiClient {
    let endpoint = Url::parse(&format!("http://{addr}")).unwrap();
    let config = ApiConfig::new(endpoint, "us-east-1", Credentials::new("AKIDEXAMPLE", "secret"));
    ApiClient::new(config).unwrap()
}

fn take_captured(captured: &Arc<Mutex<Option<Captured>>>) -> Captured {
    captured.lock().unwrap().take().unwrap()
}

fn query_map(captured: &Captured) -> HashMap<String, String> {
    captured.query.iter().cloned().collect()
}

#[tokio::test]
async fn update_environment_sends_flattened_params() {
    let (addr, captured) = spawn_server(StatusCode::OK, "").await;
    let client = test_client(addr);

    let mut params = UpdateEnvironmentParams {
        environment_name: "env".to_owned(),
        version_label: None,
        option_settings: Vec::new(),
    };
    params.add_env("K0", "V0");
    params.add_env("K1", "V1");
    client.update_environment(&params).await.unwrap();

    let captured = take_captured(&captured);
    assert_eq!(captured.method, "POST");

    let query = query_map(&captured);
    assert_eq!(query["Operation"], "UpdateEnvironment");
    assert_eq!(query["EnvironmentName"], "env");
    assert_eq!(
        query["OptionSettings.member.1.Namespace"],
        "aws:elasticbeanstalk:application:environment"
    );
    assert_eq!(query["OptionSettings.member.1.OptionName"], "K0");
    assert_eq!(query["OptionSettings.member.1.Value"], "V0");
    assert_eq!(query["OptionSettings.member.2.OptionName"], "K1");
    assert_eq!(query["OptionSettings.member.2.Value"], "V1");
    assert!(!query.contains_key("VersionLabel"));
}

#[tokio::test]
async fn create_application_version_sends_bundle_location() {
    let (addr, captured) = spawn_server(StatusCode::OK, "").await;
    let client = test_client(addr);

    let params = CreateApplicationVersionParams {
        application_name: "app".to_owned(),
        version_label: "app-0".to_owned(),
        description: None,
        source_bundle: Some(SourceBundle {
            s3_bucket: "app-bundles".to_owned(),
            s3_key: "app-0.zip".to_owned(),
        }),
    };
    client.create_application_version(&params).await.unwrap();

    let captured = take_captured(&captured);
    assert_eq!(captured.method, "POST");

    let query = query_map(&captured);
    assert_eq!(query["Operation"], "CreateApplicationVersion");
    assert_eq!(query["ApplicationName"], "app");
    assert_eq!(query["VersionLabel"], "app-0");
    assert_eq!(query["Description"], "_");
    assert_eq!(query["SourceBundle.S3Bucket"], "app-bundles");
    assert_eq!(query["SourceBundle.S3Key"], "app-0.zip");
}

#[tokio::test]
async fn requests_carry_signature_headers() {
    let (addr, captured) = spawn_server(StatusCode::OK, "").await;
    let client = test_client(addr);

    let params = UpdateEnvironmentParams {
        environment_name: "env".to_owned(),
        version_label: Some("app-1".to_owned()),
        option_settings: Vec::new(),
    };
    client.update_environment(&params).await.unwrap();

    let captured = take_captured(&captured);
    assert_eq!(captured.headers["accept"], "application/json");

    let amz_date = &captured.headers["x-amz-date"];
    assert_eq!(amz_date.len(), 16, "unexpected timestamp: {amz_date}");
    assert!(amz_date.ends_with('Z'));

    let authorization = &captured.headers["authorization"];
    assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(authorization.contains("/us-east-1/elasticbeanstalk/aws4_request"));
    assert!(authorization.contains("SignedHeaders=host;x-amz-date"));
    assert!(authorization.contains("Signature="));
}

#[tokio::test]
async fn describe_environments_decodes_response() {
    let body = r#"{
        "Environments": [
            {
                "ApplicationName": "app",
                "CNAME": "app-env.elasticbeanstalk.com",
                "DateCreated": "2014-02-28T00:22:21.474Z",
                "DateUpdated": "2014-02-28T00:33:47.684Z",
                "EndpointURL": "lb-1234567.us-west-2.elb.amazonaws.com",
                "EnvironmentId": "e-abcdef1234",
                "EnvironmentName": "app-env",
                "Health": "Green",
                "SolutionStackName": "64bit Amazon Linux 2013.09 running Node.js",
                "Status": "Ready",
                "Tier": {"Name": "WebServer", "Type": "Standard", "Version": "1.0"},
                "VersionLabel": "app-123"
            }
        ]
    }"#;
    let (addr, captured) = spawn_server(StatusCode::OK, body).await;
    let client = test_client(addr);

    let params = DescribeEnvironmentsParams {
        application_name: None,
        environment_names: vec!["app-env".to_owned()],
        include_deleted: false,
    };
    let environments = client.describe_environments(&params).await.unwrap();

    let captured = take_captured(&captured);
    assert_eq!(captured.method, "GET");
    let query = query_map(&captured);
    assert_eq!(query["Operation"], "DescribeEnvironments");
    assert_eq!(query["EnvironmentNames.member.1"], "app-env");

    assert_eq!(environments.len(), 1);
    let env = &environments[0];
    assert_eq!(env.environment_name, "app-env");
    assert_eq!(env.version_label, "app-123");
    assert_eq!(env.health, "Green");
    assert_eq!(env.tier.name, "WebServer");
    assert_eq!(env.tier.tier_type, "Standard");
    assert_eq!(
        env.date_created,
        Utc.with_ymd_and_hms(2014, 2, 28, 0, 22, 21).unwrap() + chrono::Duration::milliseconds(474)
    );
}

#[tokio::test]
async fn describe_application_versions_decodes_epoch_dates() {
    let body = r#"{
        "ApplicationVersions": [
            {
                "ApplicationName": "app",
                "VersionLabel": "app-0",
                "Description": "_",
                "DateCreated": 1.415215656E9,
                "DateUpdated": 1.415215656E9,
                "SourceBundle": {"S3Bucket": "app-bundles", "S3Key": "app-0.zip"},
                "Status": "UNPROCESSED"
            }
        ]
    }"#;
    let (addr, captured) = spawn_server(StatusCode::OK, body).await;
    let client = test_client(addr);

    let params = DescribeApplicationVersionsParams {
        application_name: Some("app".to_owned()),
        version_labels: vec!["app-0".to_owned()],
    };
    let versions = client.describe_application_versions(&params).await.unwrap();

    let captured = take_captured(&captured);
    assert_eq!(captured.method, "GET");
    let query = query_map(&captured);
    assert_eq!(query["Operation"], "DescribeApplicationVersions");
    assert_eq!(query["VersionLabels.member.1"], "app-0");

    assert_eq!(versions.len(), 1);
    let version = &versions[0];
    assert_eq!(version.version_label, "app-0");
    let want = Utc.with_ymd_and_hms(2014, 11, 5, 19, 27, 36).unwrap();
    assert_eq!(version.date_created, Some(EpochSeconds(want)));
}

#[tokio::test]
async fn failed_requests_preserve_status_and_body() {
    let (addr, _captured) = spawn_server(
        StatusCode::SERVICE_UNAVAILABLE,
        "<Error><Code>Throttling</Code></Error>",
    )
    .await;
    let client = test_client(addr);

    let params = UpdateEnvironmentParams {
        environment_name: "env".to_owned(),
        version_label: Some("app-1".to_owned()),
        option_settings: Vec::new(),
    };
    let err = client.update_environment(&params).await.unwrap_err();

    match &err {
        ApiError::Status { code, status_text, body } => {
            assert_eq!(*code, 503);
            assert_eq!(status_text, "Service Unavailable");
            assert_eq!(body, "<Error><Code>Throttling</Code></Error>");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "http status 503 (Service Unavailable): <Error><Code>Throttling</Code></Error>"
    );
}
