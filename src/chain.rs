// JSON-RPC chain reader: the fixed read-only query plan, executed
// concurrently against one Ethereum endpoint.

use crate::decode;
use crate::registry::Registry;
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Names one read operation in the plan. Operator queries carry the index
/// into the registry's operator list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKey {
    TotalSupply,
    ExchangeRate,
    Tvl,
    Paused,
    DepositQueueBalance,
    WithdrawQueueBalance,
    CoolDownPeriod,
    WithdrawRequestNonce,
    PodBalance(usize),
    PodRewards(usize),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::TotalSupply => write!(f, "total_supply"),
            QueryKey::ExchangeRate => write!(f, "exchange_rate"),
            QueryKey::Tvl => write!(f, "tvl"),
            QueryKey::Paused => write!(f, "paused"),
            QueryKey::DepositQueueBalance => write!(f, "deposit_queue_balance"),
            QueryKey::WithdrawQueueBalance => write!(f, "withdraw_queue_balance"),
            QueryKey::CoolDownPeriod => write!(f, "cool_down_period"),
            QueryKey::WithdrawRequestNonce => write!(f, "withdraw_request_nonce"),
            QueryKey::PodBalance(i) => write!(f, "pod_balance[{i}]"),
            QueryKey::PodRewards(i) => write!(f, "pod_rewards[{i}]"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryKind {
    /// eth_getBalance of an address.
    Balance { address: String },
    /// eth_call of a view function (calldata prebuilt from the signature).
    Call { to: String, data: String },
}

/// One immutable entry of the query plan.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub key: QueryKey,
    pub kind: QueryKind,
    /// A failed required query aborts the cycle; an optional one decodes
    /// to absent.
    pub required: bool,
}

fn call(key: QueryKey, to: &str, signature: &str) -> QuerySpec {
    QuerySpec {
        key,
        kind: QueryKind::Call {
            to: to.to_string(),
            data: decode::calldata(signature),
        },
        required: true,
    }
}

fn balance(key: QueryKey, address: &str) -> QuerySpec {
    QuerySpec {
        key,
        kind: QueryKind::Balance {
            address: address.to_string(),
        },
        required: true,
    }
}

/// Builds the fixed query plan for one aggregation cycle. Plan order is the
/// correlation key: result i in `ChainClient::execute` belongs to plan[i].
pub fn query_plan(registry: &Registry) -> Vec<QuerySpec> {
    let contracts = &registry.contracts;
    let mut plan = vec![
        call(QueryKey::TotalSupply, &contracts.ezeth_token, "totalSupply()"),
        call(QueryKey::ExchangeRate, &contracts.rate_provider, "getRate()"),
        call(QueryKey::Tvl, &contracts.restake_manager, "calculateTVLs()"),
        call(QueryKey::Paused, &contracts.restake_manager, "paused()"),
        balance(QueryKey::DepositQueueBalance, &contracts.deposit_queue),
        balance(QueryKey::WithdrawQueueBalance, &contracts.withdraw_queue),
        call(
            QueryKey::CoolDownPeriod,
            &contracts.withdraw_queue,
            "coolDownPeriod()",
        ),
        call(
            QueryKey::WithdrawRequestNonce,
            &contracts.withdraw_queue,
            "withdrawRequestNonce()",
        ),
    ];
    for (i, op) in registry.operators.iter().enumerate() {
        plan.push(balance(QueryKey::PodBalance(i), &op.pod_address));
        // Not every pod exposes this call; expected to fail for some.
        plan.push(QuerySpec {
            key: QueryKey::PodRewards(i),
            kind: QueryKind::Call {
                to: op.pod_address.clone(),
                data: decode::calldata("withdrawableRestakedExecutionLayerGwei()"),
            },
            required: false,
        });
    }
    plan
}

#[derive(Debug, Error)]
pub enum ChainReadError {
    #[error("RPC transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("RPC response has no result field")]
    MissingResult,
    #[error("mandatory query {key} failed: {source}")]
    Mandatory {
        key: String,
        #[source]
        source: Box<ChainReadError>,
    },
}

/// Read-only JSON-RPC client. Never issues write or transaction methods.
pub struct ChainClient {
    http: reqwest::Client,
    url: String,
}

impl ChainClient {
    pub fn connect(url: &str, request_timeout_secs: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<String, ChainReadError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let resp = self.http.post(&self.url).json(&body).send().await?;
        let v: Value = resp.json().await?;
        if let Some(err) = v.get("error") {
            return Err(ChainReadError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        v.get("result")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ChainReadError::MissingResult)
    }

    /// eth_getBalance at block tag "latest".
    pub async fn get_balance(&self, address: &str) -> Result<String, ChainReadError> {
        self.rpc("eth_getBalance", json!([address, "latest"])).await
    }

    /// eth_call at block tag "latest".
    pub async fn call(&self, to: &str, data: &str) -> Result<String, ChainReadError> {
        self.rpc("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    /// Runs all plan queries concurrently. Result i corresponds to plan[i]
    /// regardless of completion order. Queries are independent; the endpoint
    /// may serve them at slightly different chain heights (accepted
    /// best-effort consistency).
    pub async fn execute(&self, plan: &[QuerySpec]) -> Result<Vec<Option<String>>, ChainReadError> {
        let pending = plan.iter().map(|spec| async move {
            let result = match &spec.kind {
                QueryKind::Balance { address } => self.get_balance(address).await,
                QueryKind::Call { to, data } => self.call(to, data).await,
            };
            (spec, result)
        });
        let settled = futures_util::future::join_all(pending).await;

        let mut results = Vec::with_capacity(plan.len());
        for (spec, result) in settled {
            match result {
                Ok(raw) => results.push(Some(raw)),
                Err(e) if spec.required => {
                    return Err(ChainReadError::Mandatory {
                        key: spec.key.to_string(),
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    warn!(
                        query = %spec.key,
                        error = %e,
                        "optional query failed; decoding as absent"
                    );
                    results.push(None);
                }
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_has_two_queries_per_operator() {
        let registry = Registry::default();
        let plan = query_plan(&registry);
        assert_eq!(plan.len(), 8 + 2 * registry.operators.len());
    }

    #[test]
    fn pod_rewards_queries_are_optional_everything_else_required() {
        let plan = query_plan(&Registry::default());
        for spec in &plan {
            match spec.key {
                QueryKey::PodRewards(_) => assert!(!spec.required),
                _ => assert!(spec.required, "{} should be required", spec.key),
            }
        }
    }

    #[test]
    fn plan_uses_known_selectors() {
        let plan = query_plan(&Registry::default());
        let QueryKind::Call { data, .. } = &plan[0].kind else {
            panic!("total_supply should be a call");
        };
        assert_eq!(data, "0x18160ddd");
    }
}
