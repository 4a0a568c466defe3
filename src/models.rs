// Snapshot models served to consumers (JSON camelCase).

use crate::registry::{Contracts, Registry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreMetrics {
    pub total_supply: f64,
    pub total_tvl: f64,
    pub exchange_rate: f64,
    pub is_paused: bool,
}

/// ETH per custody bucket. `beacon_chain` is a residual, never measured:
/// totalTvl - depositQueue - withdrawQueue - totalPods. It may fall outside
/// [0, totalTvl] when reads land on different chain heights; that state is
/// reported through `ConsistencyFlags`, not clamped away.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketBalances {
    pub deposit_queue: f64,
    pub withdraw_queue: f64,
    pub total_pods: f64,
    pub beacon_chain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalStats {
    pub cool_down_period_secs: u64,
    pub cool_down_days: f64,
    pub total_requests: u64,
}

/// Validator estimate from the beacon-chain residual. Negative values are
/// possible and mean "inconsistent read", not a domain error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorEstimate {
    pub estimated: i64,
    pub total_staked: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStatus {
    pub name: String,
    pub delegator_address: String,
    pub pod_address: String,
    pub pod_balance: f64,
    /// Withdrawable execution-layer rewards in ETH; None when the pod does
    /// not expose the call (optional query failed).
    pub withdrawable_rewards: Option<f64>,
}

/// Bucket share of total TVL, in percent. NaN when totalTvl is zero
/// (serialized as null; `ConsistencyFlags::zero_tvl` is set alongside).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub beacon_chain_pct: f64,
    pub withdraw_queue_pct: f64,
    pub deposit_queue_pct: f64,
    pub pods_pct: f64,
}

/// Observable read-inconsistency conditions (kept detectable, not clamped).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyFlags {
    pub residual_out_of_range: bool,
    pub zero_tvl: bool,
}

/// One aggregation cycle's output. Built fresh per cycle, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSnapshot {
    /// Capture time, ISO-8601.
    pub timestamp: String,
    pub core: CoreMetrics,
    pub balances: BucketBalances,
    pub withdrawal: WithdrawalStats,
    pub validators: ValidatorEstimate,
    pub operators: Vec<OperatorStatus>,
    pub contracts: Contracts,
    pub distribution: Distribution,
    pub flags: ConsistencyFlags,
}

/// Single error indicator for a failed cycle (message + underlying cause).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleFailure {
    pub error: String,
    pub details: String,
    pub timestamp: String,
}

/// `/api/snapshot` body: the latest snapshot plus the most recent cycle
/// failure, if any. Consumers decide whether a stale snapshot is usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: ProtocolSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<CycleFailure>,
}

/// `/api/registry` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryResponse {
    pub registry: Registry,
}
