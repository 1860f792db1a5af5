//! DLN create-tx request/response types and the HTTP transport.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    consts::{CREATE_TX_PATH, ORDER_STATUS_PATH},
    errors::TransportError,
    req::HttpClient,
    serde_utils::u256_dec_opt,
};

/// Query parameters of `GET /v1.0/dln/order/create-tx`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTxRequest {
    pub src_chain_id: String,
    pub src_chain_token_in: String,
    /// Base units, decimal string
    pub src_chain_token_in_amount: String,
    pub dst_chain_id: String,
    pub dst_chain_token_out: String,
    /// Always "auto": the service quotes the output
    pub dst_chain_token_out_amount: String,
    pub dst_chain_token_out_recipient: String,
    pub sender_address: String,
    pub src_chain_order_authority_address: String,
    pub dst_chain_order_authority_address: String,
    pub src_chain_priority_level: String,
}

/// Transaction prepared by the order service.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PreparedTx {
    pub to: Address,
    pub data: Bytes,
    #[serde(default, with = "u256_dec_opt")]
    pub value: Option<U256>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTxResponse {
    pub tx: PreparedTx,
    pub order_id: String,
}

/// DLN order lifecycle states as reported by `GET /v1.0/dln/order/{id}`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String")]
pub enum DlnOrderState {
    None,
    Created,
    Fulfilled,
    SentUnlock,
    OrderCancelled,
    SentOrderCancel,
    ClaimedUnlock,
    ClaimedOrderCancel,
    Failed,
    Unknown,
}

impl From<String> for DlnOrderState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "None" => DlnOrderState::None,
            "Created" => DlnOrderState::Created,
            "Fulfilled" | "FULFILLED" => DlnOrderState::Fulfilled,
            "SentUnlock" => DlnOrderState::SentUnlock,
            "OrderCancelled" => DlnOrderState::OrderCancelled,
            "SentOrderCancel" => DlnOrderState::SentOrderCancel,
            "ClaimedUnlock" => DlnOrderState::ClaimedUnlock,
            "ClaimedOrderCancel" => DlnOrderState::ClaimedOrderCancel,
            "Failed" | "FAILED" => DlnOrderState::Failed,
            _ => DlnOrderState::Unknown,
        }
    }
}

impl DlnOrderState {
    /// Taker filled the order on the destination chain.
    pub fn is_fulfilled(&self) -> bool {
        matches!(
            self,
            DlnOrderState::Fulfilled | DlnOrderState::SentUnlock | DlnOrderState::ClaimedUnlock
        )
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            DlnOrderState::Failed
                | DlnOrderState::OrderCancelled
                | DlnOrderState::SentOrderCancel
                | DlnOrderState::ClaimedOrderCancel
        )
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    pub status: DlnOrderState,
}

/// One HTTP exchange with a single DLN host.
///
/// Abstracts the network so the gateway's retry policy can be tested
/// against scripted hosts.
#[async_trait]
pub trait OrderTransport: Send + Sync {
    async fn create_tx(
        &self,
        host: &str,
        request: &CreateTxRequest,
    ) -> Result<CreateTxResponse, TransportError>;

    async fn order_status(
        &self,
        host: &str,
        order_id: &str,
    ) -> Result<OrderStatusResponse, TransportError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpOrderTransport {
    http_client: HttpClient,
}

impl HttpOrderTransport {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl OrderTransport for HttpOrderTransport {
    async fn create_tx(
        &self,
        host: &str,
        request: &CreateTxRequest,
    ) -> Result<CreateTxResponse, TransportError> {
        let url = format!("{}{CREATE_TX_PATH}", host.trim_end_matches('/'));
        let body = self.http_client.get(&url, request, &[]).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn order_status(
        &self,
        host: &str,
        order_id: &str,
    ) -> Result<OrderStatusResponse, TransportError> {
        let url = format!("{}{ORDER_STATUS_PATH}/{order_id}", host.trim_end_matches('/'));
        let no_query: [(&str, &str); 0] = [];
        let body = self.http_client.get(&url, &no_query, &[]).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };

    use super::*;

    const ROUTER_ADDRESS: &str = "0xeF4fB24aD0916217251F553c0596F8Edc630EB66";

    async fn spawn_dln() -> String {
        let app = Router::new()
            .route(
                "/ok/v1.0/dln/order/create-tx",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({
                        "tx": {"to": ROUTER_ADDRESS, "data": "0x4d8160ba", "value": "1000"},
                        "orderId": format!("order-{}", q.get("srcChainTokenInAmount").cloned().unwrap_or_default()),
                    }))
                }),
            )
            .route(
                "/ok/v1.0/dln/order/{id}",
                get(|Path(id): Path<String>| async move {
                    Json(serde_json::json!({"orderId": id, "status": "Fulfilled"}))
                }),
            )
            .route(
                "/garbled/v1.0/dln/order/create-tx",
                get(|| async { "<html>maintenance</html>" }),
            )
            .route(
                "/down/v1.0/dln/order/create-tx",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "unavailable") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn transport() -> HttpOrderTransport {
        HttpOrderTransport::new(HttpClient::new(Duration::from_secs(5)).unwrap())
    }

    fn request(amount: &str) -> CreateTxRequest {
        CreateTxRequest {
            src_chain_id: "56".into(),
            src_chain_token_in: "0x0000000000000000000000000000000000000000".into(),
            src_chain_token_in_amount: amount.into(),
            dst_chain_id: "1".into(),
            dst_chain_token_out: "0x45804880De22913dAFE09f4980848ECE6EcbAf78".into(),
            dst_chain_token_out_amount: "auto".into(),
            dst_chain_token_out_recipient: "0xabc".into(),
            sender_address: "0xdef".into(),
            src_chain_order_authority_address: "0xdef".into(),
            dst_chain_order_authority_address: "0xabc".into(),
            src_chain_priority_level: "normal".into(),
        }
    }

    #[tokio::test]
    async fn test_create_tx_over_http() {
        let base = spawn_dln().await;
        let resp = transport()
            .create_tx(&format!("{base}/ok/"), &request("6000000000000000"))
            .await
            .unwrap();
        assert_eq!(resp.order_id, "order-6000000000000000");
        assert_eq!(resp.tx.value, Some(U256::from(1000u64)));
    }

    #[tokio::test]
    async fn test_create_tx_classifies_failures() {
        let base = spawn_dln().await;
        let transport = transport();

        let err = transport
            .create_tx(&format!("{base}/garbled"), &request("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
        assert!(!err.is_transient());

        let err = transport
            .create_tx(&format!("{base}/down"), &request("1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_order_status_over_http() {
        let base = spawn_dln().await;
        let resp = transport()
            .order_status(&format!("{base}/ok"), "0x9a2b")
            .await
            .unwrap();
        assert_eq!(resp.order_id.as_deref(), Some("0x9a2b"));
        assert!(resp.status.is_fulfilled());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = CreateTxRequest {
            src_chain_id: "56".into(),
            src_chain_token_in: "0x0000000000000000000000000000000000000000".into(),
            src_chain_token_in_amount: "6000000000000000".into(),
            dst_chain_id: "1".into(),
            dst_chain_token_out: "0x45804880De22913dAFE09f4980848ECE6EcbAf78".into(),
            dst_chain_token_out_amount: "auto".into(),
            dst_chain_token_out_recipient: "0xabc".into(),
            sender_address: "0xdef".into(),
            src_chain_order_authority_address: "0xdef".into(),
            dst_chain_order_authority_address: "0xabc".into(),
            src_chain_priority_level: "normal".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["srcChainTokenInAmount"], "6000000000000000");
        assert_eq!(json["dstChainTokenOutAmount"], "auto");
        assert_eq!(json["srcChainOrderAuthorityAddress"], "0xdef");
        assert_eq!(json["srcChainPriorityLevel"], "normal");
    }

    #[test]
    fn test_response_value_optional() {
        let body = r#"{
            "estimation": {},
            "tx": {"to": "0xeF4fB24aD0916217251F553c0596F8Edc630EB66", "data": "0x4d8160ba"},
            "orderId": "0x9a2b"
        }"#;
        let resp: CreateTxResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.order_id, "0x9a2b");
        assert_eq!(resp.tx.value, None);
        assert_eq!(resp.tx.data.len(), 4);

        let body = r#"{"tx": {"to": "0xeF4fB24aD0916217251F553c0596F8Edc630EB66", "data": "0x", "value": "6005000000000000"}, "orderId": "x"}"#;
        let resp: CreateTxResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.tx.value, Some(U256::from(6_005_000_000_000_000u64)));
    }

    #[test]
    fn test_order_state_classification() {
        let resp: OrderStatusResponse =
            serde_json::from_str(r#"{"orderId": "0x1", "status": "ClaimedUnlock"}"#).unwrap();
        assert!(resp.status.is_fulfilled());

        let resp: OrderStatusResponse =
            serde_json::from_str(r#"{"status": "SomethingNew"}"#).unwrap();
        assert_eq!(resp.status, DlnOrderState::Unknown);
        assert!(!resp.status.is_fulfilled());
        assert!(!resp.status.is_failed());
        assert!(DlnOrderState::OrderCancelled.is_failed());
    }
}
