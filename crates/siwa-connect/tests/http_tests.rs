/*
[INPUT]:  Mock chain node and verify endpoint responses
[OUTPUT]: Test results for the HTTP collaborators wired into adapters and storage
[POS]:    Integration tests - chain node, verifier and file-backed session
[UPDATE]: When node endpoints, the verify request, or persistence changes
*/

mod common;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{challenge_settings, local_wallet};
use siwa_connect::codec::{decode_signed_transaction, encode_challenge};
use siwa_connect::{
    AlgodClient, ChainNode, ClientConfig, DeflyAdapter, HttpVerifier, JsonFileStore, LuteAdapter,
    Provider, Session, SessionStore, SigningAdapter, SiwaError, SiwaVerifier, VerifyParams,
    WalletConnectionManager,
};
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_node(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/transactions/params"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fee": 0,
            "genesis-hash": "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=",
            "genesis-id": "testnet-v1.0",
            "last-round": 5000,
            "min-fee": 1000
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/genesis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "v1.0",
            "network": "testnet"
        })))
        .mount(server)
        .await;
}

fn node_for(server: &MockServer) -> Arc<dyn ChainNode> {
    Arc::new(AlgodClient::new(&server.uri(), &ClientConfig::default()).unwrap())
}

#[tokio::test]
async fn test_defly_carrier_uses_node_params() {
    let server = MockServer::start().await;
    mount_node(&server).await;

    let wallet = local_wallet(21);
    let adapter = DeflyAdapter::new(wallet.clone(), node_for(&server));
    let address = assert_ok!(adapter.connect().await);

    let encoded = encode_challenge("challenge");
    let result = assert_ok!(adapter.sign(&encoded, &address).await);
    let signed = decode_signed_transaction(&result.carrier_transaction.unwrap()).unwrap();

    assert_eq!(signed.transaction.first_valid, 5000);
    assert_eq!(signed.transaction.last_valid, 6000);
    assert_eq!(signed.transaction.genesis_id, "testnet-v1.0");
    assert_eq!(signed.transaction.fee, 1000);
    assert_eq!(signed.transaction.note, encoded);
}

#[tokio::test]
async fn test_params_failure_is_parameters_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/transactions/params"))
        .respond_with(ResponseTemplate::new(503).set_body_string("catching up"))
        .expect(1)
        .mount(&server)
        .await;

    let wallet = local_wallet(22);
    let adapter = DeflyAdapter::new(wallet.clone(), node_for(&server));

    let err = adapter
        .sign(&encode_challenge("challenge"), wallet.address())
        .await
        .unwrap_err();
    assert!(matches!(err, SiwaError::ParametersUnavailable(_)));
}

#[tokio::test]
async fn test_lute_connect_needs_genesis() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/genesis"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let wallet = local_wallet(23);
    let adapter = LuteAdapter::new(Some(wallet), node_for(&server));

    let err = adapter.connect().await.unwrap_err();
    assert!(matches!(err, SiwaError::Connection(_)));
}

#[tokio::test]
async fn test_verifier_forwards_carrier_transaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/verify"))
        .and(body_partial_json(serde_json::json!({
            "provider": "Defly",
            "encodedTransaction": BASE64.encode(b"signed-txn"),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "message": "Signature verified successfully",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = assert_ok!(HttpVerifier::new(
        &format!("{}/api/verify", server.uri()),
        &ClientConfig::default(),
    ));
    let params = VerifyParams {
        message: challenge_settings().issue("ADDR1"),
        signature: BASE64.encode([1u8; 64]),
        address: "ADDR1".to_string(),
        domain: "localhost:3000".to_string(),
        provider: Provider::Defly,
        carrier_transaction: Some(BASE64.encode(b"signed-txn")),
    };

    let result = assert_ok!(verifier.verify(&params).await);
    assert!(result.success);
}

#[tokio::test]
async fn test_file_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("session.json");
    let wallet = local_wallet(24);

    {
        let store = SessionStore::new(Arc::new(JsonFileStore::new(&file)));
        let manager = WalletConnectionManager::new(
            vec![Arc::new(siwa_connect::KibisisAdapter::new(Some(wallet.clone())))],
            store,
        );
        assert_ok!(manager.connect(Provider::Kibisis).await);
    }

    let store = SessionStore::new(Arc::new(JsonFileStore::new(&file)));
    let manager = WalletConnectionManager::new(
        vec![Arc::new(siwa_connect::KibisisAdapter::new(Some(wallet.clone())))],
        store,
    );
    let restored = manager.reconnect_session().await;
    assert_eq!(restored, Some(Session::new(wallet.address(), Provider::Kibisis)));

    manager.disconnect().await;
    assert!(SessionStore::new(Arc::new(JsonFileStore::new(&file))).load().is_none());
}
