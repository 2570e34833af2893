use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::{
    clients::eth::errors::RpcRequestError,
    types::receipt::RpcReceipt,
    utils::{RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse},
};
use bytes::Bytes;
use errors::EthClientError;
use ethereum_types::{Address, H256, U64};
use reqwest::{Client, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

pub mod errors;

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RpcResponse {
    Success(RpcSuccessResponse),
    Error(RpcErrorResponse),
}

#[derive(Debug, Clone)]
pub struct EthClient {
    client: Client,
    pub urls: Vec<Url>,
    pub receipt_poll_interval: Duration,
    pub receipt_max_attempts: u64,
}

#[derive(Default, Clone, Debug)]
pub struct Overrides {
    pub from: Option<Address>,
}

pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(200);
// Dev nodes mine on submission, so the budget only matters for stalled nodes.
pub const RECEIPT_MAX_ATTEMPTS: u64 = 150;

impl EthClient {
    pub fn new(url: &str) -> Result<EthClient, EthClientError> {
        Self::new_with_config(vec![url], RECEIPT_POLL_INTERVAL, RECEIPT_MAX_ATTEMPTS)
    }

    pub fn new_with_config(
        urls: Vec<&str>,
        receipt_poll_interval: Duration,
        receipt_max_attempts: u64,
    ) -> Result<Self, EthClientError> {
        let urls = urls
            .iter()
            .map(|url| {
                Url::parse(url).map_err(|_| {
                    EthClientError::ParseUrlError(format!("Failed to parse url {url}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client: Client::new(),
            urls,
            receipt_poll_interval,
            receipt_max_attempts: receipt_max_attempts.max(1),
        })
    }

    /// Send a request to the RPC. Tries each URL until one succeeds.
    pub async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse, EthClientError> {
        let mut response = Err(EthClientError::FailedAllRPC);

        for url in self.urls.iter() {
            response = self.send_request_to_url(url, &request).await;
            // A node that answers with an error object may still be healthy, so try the others
            match &response {
                Ok(RpcResponse::Success(_)) => {
                    debug!(endpoint = %url, method = %request.method, "RPC request successful");
                    return response;
                }
                Ok(RpcResponse::Error(err)) => {
                    debug!(endpoint = %url, error = ?err.error, "RPC server returned an error");
                }
                Err(error) => {
                    warn!(endpoint = %url, %error, "Could not request RPC server");
                }
            }
        }

        response
    }

    /// Send a request to a specific URL.
    async fn send_request_to_url(
        &self,
        rpc_url: &Url,
        request: &RpcRequest,
    ) -> Result<RpcResponse, EthClientError> {
        trace!(endpoint = %rpc_url, ?request, "Sending RPC request");

        self.client
            .post(rpc_url.as_str())
            .header("content-type", "application/json")
            .body(serde_json::ser::to_string(&request).map_err(|error| {
                EthClientError::FailedToSerializeRequestBody(format!("{error}: {request:?}"))
            })?)
            .send()
            .await
            .inspect(|_| trace!(endpoint = %rpc_url, "Request finished successfully"))?
            .json::<RpcResponse>()
            .await
            .inspect(|body| {
                trace!(endpoint = %rpc_url, ?body, "Response deserialized successfully")
            })
            .inspect_err(|err| {
                trace!(endpoint = %rpc_url, %err, "Failed to deserialize response")
            })
            .map_err(EthClientError::from)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Vec<Value>>,
    ) -> Result<T, EthClientError> {
        let request = RpcRequest::new(
            RpcRequestId::Number(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            method,
            params,
        );

        match self.send_request(request).await? {
            RpcResponse::Success(result) => serde_json::from_value(result.result)
                .map_err(|source| RpcRequestError::SerdeJSONError {
                    method: method.to_owned(),
                    source,
                })
                .map_err(EthClientError::from),
            RpcResponse::Error(error_response) => Err(RpcRequestError::RPCError {
                method: method.to_owned(),
                message: error_response.error.message,
                data: error_response.error.data,
            }
            .into()),
        }
    }

    /// Accounts the node can sign for.
    pub async fn get_accounts(&self) -> Result<Vec<Address>, EthClientError> {
        self.request("eth_accounts", None).await
    }

    pub async fn get_block_number(&self) -> Result<U64, EthClientError> {
        self.request("eth_blockNumber", None).await
    }

    /// Submits a transaction signed by the node on behalf of `from`.
    /// `to == None` deploys `data` as init code.
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Option<Address>,
        data: &[u8],
    ) -> Result<H256, EthClientError> {
        let mut tx = json!({
            "from": format!("{from:#x}"),
            "data": format!("0x{}", hex::encode(data)),
        });
        if let (Some(to), Value::Object(map)) = (to, &mut tx) {
            map.insert("to".to_owned(), json!(format!("{to:#x}")));
        }

        self.request("eth_sendTransaction", Some(vec![tx])).await
    }

    pub async fn call(
        &self,
        to: Address,
        calldata: &[u8],
        overrides: Overrides,
    ) -> Result<Bytes, EthClientError> {
        let params = Some(vec![
            json!({
                "to": format!("{to:#x}"),
                "input": format!("0x{}", hex::encode(calldata)),
                "from": format!("{:#x}", overrides.from.unwrap_or_default()),
            }),
            json!("latest"),
        ]);

        let output: String = self.request("eth_call", params).await?;
        hex::decode(output.trim_start_matches("0x"))
            .map(Bytes::from)
            .map_err(|source| {
                RpcRequestError::HexError {
                    method: "eth_call".to_owned(),
                    source,
                }
                .into()
            })
    }

    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<RpcReceipt>, EthClientError> {
        self.request(
            "eth_getTransactionReceipt",
            Some(vec![json!(format!("{tx_hash:#x}"))]),
        )
        .await
    }

    /// Polls for the receipt of `tx_hash`. Never resubmits: exhausting the
    /// attempt budget surfaces as [`EthClientError::ReceiptTimeout`].
    pub async fn wait_for_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<RpcReceipt, EthClientError> {
        let max_attempts = self.receipt_max_attempts;
        for attempt in 1..=max_attempts {
            if let Some(receipt) = self.get_transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            trace!("[{attempt}/{max_attempts}] Receipt for {tx_hash:#x} not available yet");
            if attempt < max_attempts {
                tokio::time::sleep(self.receipt_poll_interval).await;
            }
        }

        Err(EthClientError::ReceiptTimeout {
            tx_hash: format!("{tx_hash:#x}"),
            attempts: max_attempts,
        })
    }
}
