// Metric aggregation: decoded chain reads -> derived snapshot.
// Pure and synchronous; all I/O happens before this module runs.

use crate::chain::{QueryKey, QuerySpec};
use crate::decode::{self, DecodeError};
use crate::models::*;
use crate::registry::Registry;
use chrono::{DateTime, SecondsFormat, Utc};

const SECS_PER_DAY: f64 = 86_400.0;
const ETH_PER_VALIDATOR: i64 = 32;

/// One operator's decoded readings.
#[derive(Debug, Clone, Default)]
pub struct PodReading {
    pub balance_wei: u128,
    /// Raw gwei; None when the pod's rewards call failed (optional query).
    pub rewards_gwei: Option<u128>,
}

/// Fully decoded cycle inputs. Raw amounts stay u128 until the final ETH
/// scaling so ~10^27-wei balances never round-trip through f64.
#[derive(Debug, Clone, Default)]
pub struct DecodedInputs {
    pub total_supply_wei: u128,
    pub exchange_rate_wei: u128,
    pub total_tvl_wei: u128,
    pub is_paused: bool,
    pub deposit_queue_wei: u128,
    pub withdraw_queue_wei: u128,
    pub cool_down_period_secs: u64,
    pub withdraw_request_nonce: u64,
    pub pods: Vec<PodReading>,
}

/// Decodes the raw plan results, correlated by index. The aggregator needs
/// every result (or its absent fallback) up front; nothing is computed
/// incrementally.
pub fn decode_inputs(
    plan: &[QuerySpec],
    raw: &[Option<String>],
    operator_count: usize,
) -> Result<DecodedInputs, DecodeError> {
    let mut inputs = DecodedInputs {
        pods: vec![PodReading::default(); operator_count],
        ..Default::default()
    };
    for (spec, result) in plan.iter().zip(raw) {
        let result = result.as_deref();
        match spec.key {
            QueryKey::TotalSupply => inputs.total_supply_wei = decode::parse_uint(result)?,
            QueryKey::ExchangeRate => inputs.exchange_rate_wei = decode::parse_uint(result)?,
            QueryKey::Tvl => inputs.total_tvl_wei = decode::tvl_total(result)?,
            QueryKey::Paused => inputs.is_paused = decode::parse_bool(result)?,
            QueryKey::DepositQueueBalance => {
                inputs.deposit_queue_wei = decode::parse_uint(result)?
            }
            QueryKey::WithdrawQueueBalance => {
                inputs.withdraw_queue_wei = decode::parse_uint(result)?
            }
            QueryKey::CoolDownPeriod => inputs.cool_down_period_secs = decode::parse_u64(result)?,
            QueryKey::WithdrawRequestNonce => {
                inputs.withdraw_request_nonce = decode::parse_u64(result)?
            }
            QueryKey::PodBalance(i) => {
                if let Some(pod) = inputs.pods.get_mut(i) {
                    pod.balance_wei = decode::parse_uint(result)?;
                }
            }
            QueryKey::PodRewards(i) => {
                if let Some(pod) = inputs.pods.get_mut(i) {
                    pod.rewards_gwei = match result {
                        None => None,
                        some => Some(decode::parse_uint(some)?),
                    };
                }
            }
        }
    }
    Ok(inputs)
}

/// floor(beaconChain / 32). Negative residuals floor toward zero validators
/// or below; that is a read-inconsistency signal, not an error.
pub fn estimated_validators(beacon_chain_eth: f64) -> i64 {
    (beacon_chain_eth / ETH_PER_VALIDATOR as f64).floor() as i64
}

/// Bucket share of TVL in percent. NaN when tvl is zero (for zero and
/// nonzero buckets alike); callers surface the undefined state via
/// ConsistencyFlags rather than clamping here.
fn pct(bucket_eth: f64, total_tvl_eth: f64) -> f64 {
    if total_tvl_eth == 0.0 {
        return f64::NAN;
    }
    bucket_eth / total_tvl_eth * 100.0
}

/// Derives the snapshot from decoded inputs and stamps it with the capture
/// time. The four bucket balances sum to totalTvl by construction: the
/// beacon-chain bucket is the residual.
pub fn build_snapshot(
    registry: &Registry,
    inputs: &DecodedInputs,
    captured_at: DateTime<Utc>,
) -> ProtocolSnapshot {
    let total_tvl = decode::wei_to_eth(inputs.total_tvl_wei);
    let deposit_queue = decode::wei_to_eth(inputs.deposit_queue_wei);
    let withdraw_queue = decode::wei_to_eth(inputs.withdraw_queue_wei);

    let operators: Vec<OperatorStatus> = registry
        .operators
        .iter()
        .zip(&inputs.pods)
        .map(|(record, pod)| OperatorStatus {
            name: record.name.clone(),
            delegator_address: record.delegator_address.clone(),
            pod_address: record.pod_address.clone(),
            pod_balance: decode::wei_to_eth(pod.balance_wei),
            withdrawable_rewards: pod.rewards_gwei.map(decode::gwei_to_eth),
        })
        .collect();

    // Commutative sum; operator order does not matter.
    let total_pods: f64 = operators.iter().map(|op| op.pod_balance).sum();
    let beacon_chain = total_tvl - deposit_queue - withdraw_queue - total_pods;
    let estimated = estimated_validators(beacon_chain);

    let flags = ConsistencyFlags {
        residual_out_of_range: beacon_chain < 0.0 || beacon_chain > total_tvl,
        zero_tvl: total_tvl == 0.0,
    };

    ProtocolSnapshot {
        timestamp: captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        core: CoreMetrics {
            total_supply: decode::wei_to_eth(inputs.total_supply_wei),
            total_tvl,
            exchange_rate: decode::wei_to_eth(inputs.exchange_rate_wei),
            is_paused: inputs.is_paused,
        },
        balances: BucketBalances {
            deposit_queue,
            withdraw_queue,
            total_pods,
            beacon_chain,
        },
        withdrawal: WithdrawalStats {
            cool_down_period_secs: inputs.cool_down_period_secs,
            cool_down_days: inputs.cool_down_period_secs as f64 / SECS_PER_DAY,
            total_requests: inputs.withdraw_request_nonce,
        },
        validators: ValidatorEstimate {
            estimated,
            total_staked: estimated * ETH_PER_VALIDATOR,
        },
        operators,
        contracts: registry.contracts.clone(),
        distribution: Distribution {
            beacon_chain_pct: pct(beacon_chain, total_tvl),
            withdraw_queue_pct: pct(withdraw_queue, total_tvl),
            deposit_queue_pct: pct(deposit_queue, total_tvl),
            pods_pct: pct(total_pods, total_tvl),
        },
        flags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEI: u128 = 1_000_000_000_000_000_000;

    fn reference_inputs() -> DecodedInputs {
        // 5 pods of 100 ETH each
        let pods = (0..5)
            .map(|_| PodReading {
                balance_wei: 100 * WEI,
                rewards_gwei: Some(1_000_000_000), // 1 ETH
            })
            .collect();
        DecodedInputs {
            total_supply_wei: 1000 * WEI,
            exchange_rate_wei: 1_050_000_000_000_000_000, // 1.05
            total_tvl_wei: 1050 * WEI,
            is_paused: false,
            deposit_queue_wei: 10 * WEI,
            withdraw_queue_wei: 20 * WEI,
            cool_down_period_secs: 604_800,
            withdraw_request_nonce: 1234,
            pods,
        }
    }

    #[test]
    fn reference_scenario_residual_and_validators() {
        let snapshot = build_snapshot(
            &Registry::default(),
            &reference_inputs(),
            Utc::now(),
        );
        assert_eq!(snapshot.core.total_supply, 1000.0);
        assert_eq!(snapshot.core.exchange_rate, 1.05);
        assert_eq!(snapshot.balances.beacon_chain, 520.0);
        assert_eq!(snapshot.validators.estimated, 16);
        assert_eq!(snapshot.validators.total_staked, 512);
        assert!(!snapshot.flags.residual_out_of_range);
        assert!(!snapshot.flags.zero_tvl);
    }

    #[test]
    fn reference_scenario_distribution() {
        let snapshot = build_snapshot(
            &Registry::default(),
            &reference_inputs(),
            Utc::now(),
        );
        let d = &snapshot.distribution;
        assert!((d.beacon_chain_pct - 49.5238).abs() < 0.001);
        assert!((d.withdraw_queue_pct - 1.9048).abs() < 0.001);
        assert!((d.deposit_queue_pct - 0.9524).abs() < 0.001);
        assert!((d.pods_pct - 47.6190).abs() < 0.001);
        let sum =
            d.beacon_chain_pct + d.withdraw_queue_pct + d.deposit_queue_pct + d.pods_pct;
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn buckets_sum_to_tvl_by_construction() {
        let snapshot = build_snapshot(
            &Registry::default(),
            &reference_inputs(),
            Utc::now(),
        );
        let b = &snapshot.balances;
        let sum = b.deposit_queue + b.withdraw_queue + b.total_pods + b.beacon_chain;
        assert!((sum - snapshot.core.total_tvl).abs() < 1e-9);
    }

    #[test]
    fn negative_residual_is_flagged_not_clamped() {
        let mut inputs = reference_inputs();
        inputs.total_tvl_wei = 100 * WEI; // buckets now exceed TVL
        let snapshot = build_snapshot(&Registry::default(), &inputs, Utc::now());
        assert!(snapshot.balances.beacon_chain < 0.0);
        assert!(snapshot.validators.estimated <= 0);
        assert!(snapshot.flags.residual_out_of_range);
    }

    #[test]
    fn zero_tvl_yields_nan_percentages_and_flag() {
        let mut inputs = reference_inputs();
        inputs.total_tvl_wei = 0;
        let snapshot = build_snapshot(&Registry::default(), &inputs, Utc::now());
        assert!(snapshot.flags.zero_tvl);
        // A nonzero bucket over zero TVL must be NaN, not +infinity.
        assert!(snapshot.balances.deposit_queue > 0.0);
        assert!(snapshot.distribution.deposit_queue_pct.is_nan());
        assert!(!snapshot.distribution.deposit_queue_pct.is_infinite());
        assert!(snapshot.distribution.pods_pct.is_nan());
    }

    #[test]
    fn cooldown_604800_seconds_is_seven_days() {
        let snapshot = build_snapshot(
            &Registry::default(),
            &reference_inputs(),
            Utc::now(),
        );
        assert_eq!(snapshot.withdrawal.cool_down_days, 7.0);
        assert_eq!(snapshot.withdrawal.cool_down_period_secs, 604_800);
    }

    #[test]
    fn absent_rewards_stay_absent_per_operator() {
        let mut inputs = reference_inputs();
        inputs.pods[2].rewards_gwei = None;
        let snapshot = build_snapshot(&Registry::default(), &inputs, Utc::now());
        assert!(snapshot.operators[2].withdrawable_rewards.is_none());
        assert_eq!(snapshot.operators[0].withdrawable_rewards, Some(1.0));
        assert_eq!(snapshot.operators[2].pod_balance, 100.0);
    }

    #[test]
    fn estimated_validators_floors_including_negatives() {
        assert_eq!(estimated_validators(520.0), 16);
        assert_eq!(estimated_validators(63.9), 1);
        assert_eq!(estimated_validators(0.0), 0);
        assert_eq!(estimated_validators(-1.0), -1);
        assert_eq!(estimated_validators(-33.0), -2);
    }

    #[test]
    fn timestamp_is_iso_8601() {
        let at = DateTime::parse_from_rfc3339("2026-08-30T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = build_snapshot(&Registry::default(), &reference_inputs(), at);
        assert_eq!(snapshot.timestamp, "2026-08-30T12:00:00.000Z");
    }
}
