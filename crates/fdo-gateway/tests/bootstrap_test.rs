//! Startup sequence against wiremock exchange and Owner Service.

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fdo_gateway::bootstrap::{
    bootstrap, register_defaults, write_shared_files, BootstrapError, GatewaySettings,
    EXCHANGE_CA_FILE,
};
use fdo_gateway::state::AppConfig;
use fdo_owner_client::{ExchangeConfig, OwnerClient, OwnerServiceConfig};
use fdo_store::ValuesDir;

const HUB_CERT: &[u8] = b"-----BEGIN CERTIFICATE-----\nhub\n-----END CERTIFICATE-----\n";

fn wrapper_script(dir: &std::path::Path) -> PathBuf {
    let script = dir.join("agent-install-wrapper.sh");
    std::fs::write(&script, "#!/bin/sh\necho install\n").unwrap();
    script
}

fn app_config() -> AppConfig {
    let mut config = AppConfig::new("https://hub.example:9443");
    config.to2_host = Some("owner.example".to_string());
    config
}

#[test]
fn shared_files_are_written_with_name_companions() {
    let dir = tempfile::tempdir().unwrap();
    let values = ValuesDir::open(dir.path()).unwrap();
    let exchange = ExchangeConfig::local("https://exchange.example/v1").unwrap();
    let mut app = app_config();
    app.mgmt_hub_cert = Some(HUB_CERT.to_vec());

    let written = write_shared_files(&values, &app, &exchange, &wrapper_script(dir.path())).unwrap();
    assert_eq!(
        written,
        ["agent-install.crt", "agent-install.cfg", "agent-install-wrapper.sh"]
    );

    let cfg = String::from_utf8(values.read("agent-install.cfg").unwrap()).unwrap();
    assert_eq!(
        cfg,
        "HZN_EXCHANGE_URL=https://exchange.example/v1\n\
         HZN_FSS_CSSURL=https://hub.example:9443\n\
         HZN_MGMT_HUB_CERT_PATH=agent-install.crt\n"
    );
    assert_eq!(values.read("agent-install.crt").unwrap(), HUB_CERT);
    assert_eq!(values.read("agent-install-crt_name").unwrap(), b"agent-install.crt");
    assert_eq!(values.read("agent-install-cfg_name").unwrap(), b"agent-install.cfg");
    assert_eq!(
        values.read("agent-install-wrapper-sh_name").unwrap(),
        b"agent-install-wrapper.sh"
    );
}

#[test]
fn config_omits_cert_path_without_a_hub_cert() {
    let dir = tempfile::tempdir().unwrap();
    let values = ValuesDir::open(dir.path()).unwrap();
    let exchange = ExchangeConfig::local("https://exchange.example/v1").unwrap();

    let written =
        write_shared_files(&values, &app_config(), &exchange, &wrapper_script(dir.path())).unwrap();
    assert_eq!(written, ["agent-install.cfg", "agent-install-wrapper.sh"]);
    let cfg = String::from_utf8(values.read("agent-install.cfg").unwrap()).unwrap();
    assert!(!cfg.contains("HZN_MGMT_HUB_CERT_PATH"));
    assert!(!values.contains("agent-install.crt"));
    assert!(!values.contains("agent-install-crt_name"));
}

#[test]
fn missing_wrapper_script_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let values = ValuesDir::open(dir.path()).unwrap();
    let exchange = ExchangeConfig::local("https://exchange.example/v1").unwrap();

    let err = write_shared_files(&values, &app_config(), &exchange, &dir.path().join("missing.sh"))
        .unwrap_err();
    assert!(matches!(err, BootstrapError::Read { .. }));
}

#[tokio::test]
async fn defaults_are_registered_with_the_owner_service() {
    let owner = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/redirect"))
        .and(body_string(r#"[[null,"owner.example",8042,3]]"#))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&owner)
        .await;
    for file in ["agent-install.cfg", "agent-install-wrapper.sh"] {
        Mock::given(method("POST"))
            .and(path("/api/v1/owner/resource"))
            .and(query_param("filename", file))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&owner)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let values = ValuesDir::open(dir.path()).unwrap();
    let exchange = ExchangeConfig::local("https://exchange.example/v1").unwrap();
    let app = app_config();
    let written = write_shared_files(&values, &app, &exchange, &wrapper_script(dir.path())).unwrap();

    let client =
        OwnerClient::new(OwnerServiceConfig::local(&owner.uri(), "apiUser", "pw").unwrap()).unwrap();
    register_defaults(&client, &values, &app, &written).await.unwrap();
}

#[tokio::test]
async fn registration_refusal_aborts() {
    let owner = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/redirect"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&owner)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let values = ValuesDir::open(dir.path()).unwrap();
    let client =
        OwnerClient::new(OwnerServiceConfig::local(&owner.uri(), "apiUser", "pw").unwrap()).unwrap();

    let err = register_defaults(&client, &values, &app_config(), &[]).await.unwrap_err();
    assert!(matches!(err, BootstrapError::Registration { status: 500, .. }));
}

#[tokio::test]
async fn full_startup_serves_requests() {
    let owner = MockServer::start().await;
    let exchange = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("2.110.0"))
        .expect(1)
        .mount(&exchange)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/redirect"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&owner)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/resource"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&owner)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_dir = dir.path().join("db");
    let mut exchange_config = ExchangeConfig::local(&exchange.uri()).unwrap();
    exchange_config.ca_cert_pem = None;

    let settings = GatewaySettings {
        db_dir: db_dir.clone(),
        wrapper_script: wrapper_script(dir.path()),
        app: app_config(),
        owner: OwnerServiceConfig::local(&owner.uri(), "apiUser", "pw").unwrap(),
        exchange: exchange_config,
    };
    let state = bootstrap(settings).await.unwrap();

    assert!(db_dir.join("devices").is_dir());
    assert!(db_dir.join("values").join("agent-install.cfg").is_file());
    assert!(!db_dir.join(EXCHANGE_CA_FILE).exists());

    let response = fdo_gateway::app(state)
        .oneshot(Request::builder().uri("/api/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stale_hub_cert_from_an_earlier_run_is_not_registered() {
    let owner = MockServer::start().await;
    let exchange = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("2.110.0"))
        .mount(&exchange)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/redirect"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&owner)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/owner/resource"))
        .and(query_param("filename", "agent-install.crt"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&owner)
        .await;
    for file in ["agent-install.cfg", "agent-install-wrapper.sh"] {
        Mock::given(method("POST"))
            .and(path("/api/v1/owner/resource"))
            .and(query_param("filename", file))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&owner)
            .await;
    }

    let dir = tempfile::tempdir().unwrap();
    let db_dir = dir.path().join("db");
    let earlier = ValuesDir::open(&db_dir).unwrap();
    earlier.write("agent-install.crt", HUB_CERT).unwrap();

    let settings = GatewaySettings {
        db_dir,
        wrapper_script: wrapper_script(dir.path()),
        app: app_config(),
        owner: OwnerServiceConfig::local(&owner.uri(), "apiUser", "pw").unwrap(),
        exchange: ExchangeConfig::local(&exchange.uri()).unwrap(),
    };
    bootstrap(settings).await.unwrap();
}

#[tokio::test]
async fn unreachable_exchange_aborts_startup() {
    let owner = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let settings = GatewaySettings {
        db_dir: dir.path().join("db"),
        wrapper_script: wrapper_script(dir.path()),
        app: app_config(),
        owner: OwnerServiceConfig::local(&owner.uri(), "apiUser", "pw").unwrap(),
        exchange: ExchangeConfig::local("http://127.0.0.1:1").unwrap(),
    };
    let err = bootstrap(settings).await.unwrap_err();
    assert!(matches!(err, BootstrapError::Exchange(_)));
}
