// Shared test helper: a local stub Ethereum JSON-RPC endpoint.

use axum::{Json, Router, extract::State, routing::post};
use restakewatch::decode;
use restakewatch::registry::Registry;
use serde_json::{Value, json};

pub const WEI: u128 = 1_000_000_000_000_000_000;

/// Canned chain state behind the stub endpoint. Defaults reproduce the
/// reference scenario: supply 1000, rate 1.05, TVL 1050, deposit 10,
/// withdraw 20, five pods of 100 ETH, 1 ETH rewards each.
#[derive(Clone)]
pub struct StubChain {
    pub registry: Registry,
    pub fail_total_supply: bool,
    /// Pod address (lowercased) whose rewards call reverts.
    pub revert_rewards_for: Option<String>,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            fail_total_supply: false,
            revert_rewards_for: None,
        }
    }
}

fn word(v: u128) -> String {
    format!("0x{v:064x}")
}

/// `calculateTVLs()` payload: two dynamic-array offsets, the scalar total,
/// then empty tails.
fn tvls_payload(total: u128) -> String {
    format!("0x{:064x}{:064x}{:064x}{:064x}{:064x}", 0x60, 0x80, total, 0, 0)
}

impl StubChain {
    fn balance_of(&self, address: &str) -> u128 {
        let address = address.to_lowercase();
        let c = &self.registry.contracts;
        if address == c.deposit_queue.to_lowercase() {
            return 10 * WEI;
        }
        if address == c.withdraw_queue.to_lowercase() {
            return 20 * WEI;
        }
        for op in &self.registry.operators {
            if address == op.pod_address.to_lowercase() {
                return 100 * WEI;
            }
        }
        0
    }

    fn call_result(&self, to: &str, data: &str) -> Result<String, &'static str> {
        let to = to.to_lowercase();
        if data == decode::calldata("totalSupply()") {
            if self.fail_total_supply {
                return Err("execution reverted");
            }
            return Ok(word(1000 * WEI));
        }
        if data == decode::calldata("getRate()") {
            return Ok(word(1_050_000_000_000_000_000));
        }
        if data == decode::calldata("calculateTVLs()") {
            return Ok(tvls_payload(1050 * WEI));
        }
        if data == decode::calldata("paused()") {
            return Ok(word(0));
        }
        if data == decode::calldata("coolDownPeriod()") {
            return Ok(word(604_800));
        }
        if data == decode::calldata("withdrawRequestNonce()") {
            return Ok(word(1234));
        }
        if data == decode::calldata("withdrawableRestakedExecutionLayerGwei()") {
            if self.revert_rewards_for.as_deref() == Some(to.as_str()) {
                return Err("execution reverted");
            }
            return Ok(word(1_000_000_000));
        }
        Err("unknown selector")
    }
}

async fn rpc_handler(State(stub): State<StubChain>, Json(req): Json<Value>) -> Json<Value> {
    let id = req.get("id").cloned().unwrap_or(json!(1));
    let method = req["method"].as_str().unwrap_or_default();
    let params = &req["params"];
    let result = match method {
        "eth_getBalance" => {
            let address = params[0].as_str().unwrap_or_default();
            Ok(format!("0x{:x}", stub.balance_of(address)))
        }
        "eth_call" => {
            let to = params[0]["to"].as_str().unwrap_or_default();
            let data = params[0]["data"].as_str().unwrap_or_default();
            stub.call_result(to, data)
        }
        _ => Err("unsupported method"),
    };
    match result {
        Ok(hex) => Json(json!({ "jsonrpc": "2.0", "id": id, "result": hex })),
        Err(message) => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": 3, "message": message },
        })),
    }
}

/// Binds the stub on an ephemeral port and returns its URL.
pub async fn spawn_stub_rpc(stub: StubChain) -> String {
    let app = Router::new().route("/", post(rpc_handler)).with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
