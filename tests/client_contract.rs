mod common;

use std::sync::Arc;

use common::ScriptedService;
use dynconf::{
    ChangeEvent, Client, ClientOptions, ConfigClient, ConfigError, ConfigType, CredentialsOptions, FileOptions,
    Provider, RemoteBackend, RemoteOptions, TypedAccessor,
};

async fn file_client(dir: &std::path::Path) -> ConfigClient {
    std::fs::write(dir.join("app.json"), r#"{"feature": {"enabled": "t"}, "ratio": 0.5}"#).unwrap();
    ConfigClient::new(ClientOptions::FileBased(FileOptions::new(dir, ["app"], ConfigType::Json)))
        .await
        .unwrap()
}

async fn remote_client() -> ConfigClient {
    let service = ScriptedService::new();
    service
        .session("app", "t0")
        .respond("t0", "t1", r#"{"feature": {"enabled": "t"}, "ratio": 0.5}"#);
    let options = RemoteOptions::new("contract", "us-east-1", "shop", "prod", ConfigType::Json, ["app"])
        .with_credentials(CredentialsOptions::Static {
            access_key_id: "AKID".into(),
            secret_key: "secret".into(),
            session_token: None,
        });
    RemoteBackend::with_service(options, service).await.unwrap().into()
}

fn assert_contract(client: &ConfigClient) {
    assert_eq!(client.config_names(), vec!["app"]);
    assert!(client.get_bool("app", "feature.enabled").unwrap());
    assert_eq!(client.get_float("app", "ratio").unwrap(), 0.5);
    assert_eq!(client.get_float_d("app", "missing", 1.5), 1.5);

    for result in [
        client.get_int("nope", "x").map(|_| ()),
        client.add_change_listener("nope", Arc::new(|_: &ChangeEvent| {})),
        client.remove_change_listener("nope"),
    ] {
        assert!(matches!(result, Err(ConfigError::ConfigNotAdded(ref name)) if name == "nope"));
    }

    client.add_change_listener("app", Arc::new(|_: &ChangeEvent| {})).unwrap();
    client.remove_change_listener("app").unwrap();

    client.close().unwrap();
    client.close().unwrap();
    assert!(client.get_bool("app", "feature.enabled").unwrap());
}

#[tokio::test]
async fn test_file_client_contract() {
    let dir = tempfile::tempdir().unwrap();
    let client = file_client(dir.path()).await;
    assert_eq!(client.provider(), Provider::FileBased);
    assert_contract(&client);
}

#[tokio::test]
async fn test_remote_client_contract() {
    let client = remote_client().await;
    assert_eq!(client.provider(), Provider::RemoteManaged);
    assert_contract(&client);
}

#[tokio::test]
async fn test_invalid_options_for_both_providers() {
    let file = ClientOptions::FileBased(FileOptions::new("", Vec::<String>::new(), ConfigType::Yaml));
    match ConfigClient::new(file).await {
        Err(ConfigError::InvalidOptions(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["configs_directory", "config_names"]);
        }
        other => panic!("expected invalid options, got {:?}", other),
    }

    let remote = ClientOptions::RemoteManaged(RemoteOptions::new(
        "svc",
        "",
        "",
        "prod",
        ConfigType::Yaml,
        Vec::<String>::new(),
    ));
    match ConfigClient::new(remote).await {
        Err(ConfigError::InvalidOptions(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert_eq!(fields, vec!["region", "app", "config_names"]);
        }
        other => panic!("expected invalid options, got {:?}", other),
    }
}
