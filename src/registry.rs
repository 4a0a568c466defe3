// Static on-chain address registry (mainnet reference deployment).
// Overridable from config.toml; not runtime-mutable.

use serde::{Deserialize, Serialize};

/// Protocol contract addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contracts {
    pub ezeth_token: String,
    pub restake_manager: String,
    pub deposit_queue: String,
    pub withdraw_queue: String,
    pub rate_provider: String,
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            ezeth_token: "0xbf5495Efe5DB9ce00f80364C8B423567e58d2110".into(),
            restake_manager: "0x74a09653A083691711cF8215a6ab074BB4e99ef5".into(),
            deposit_queue: "0xf2F305D14DCD8aaef887E0428B3c9534795D0d60".into(),
            withdraw_queue: "0x5efc9D10E42FB517456f4ac41EB5e2eBe42C8918".into(),
            rate_provider: "0x387dBc0fB00b26fb085aa658527D5BE98302c84C".into(),
        }
    }
}

/// One node operator: delegator contract plus its EigenPod.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecord {
    pub name: String,
    pub delegator_address: String,
    pub pod_address: String,
}

impl OperatorRecord {
    fn new(name: &str, delegator: &str, pod: &str) -> Self {
        Self {
            name: name.into(),
            delegator_address: delegator.into(),
            pod_address: pod.into(),
        }
    }
}

/// Address registry: contracts plus the configured operator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub contracts: Contracts,
    #[serde(default = "mainnet_operators")]
    pub operators: Vec<OperatorRecord>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            contracts: Contracts::default(),
            operators: mainnet_operators(),
        }
    }
}

fn mainnet_operators() -> Vec<OperatorRecord> {
    vec![
        OperatorRecord::new(
            "Figment",
            "0x78524bEeAc12368e600457478738c233f436e9f6",
            "0x35Cb1491dCf4C0AB6b413AfC42298e32f13FF524",
        ),
        OperatorRecord::new(
            "P2P.org",
            "0x125B367C16C5858f11e12948404F7a1371a0FDa3",
            "0xd4018Ce9A041a9c110A9d0383d2b5E1c66Ae1513",
        ),
        OperatorRecord::new(
            "Luganodes",
            "0x0B1981a9Fcc24A445dE15141390d3E46DA0e425c",
            "0x093f6C270aC22EC240f0C6fd7414Ea774ca8d3e5",
        ),
        OperatorRecord::new(
            "HashKey Cloud",
            "0xbaf5f3a05bd7af6f3a0bba207803bf77e2657c8f",
            "0x2641C2ded63a0C640629F5eDF1189e0f53C06561",
        ),
        OperatorRecord::new(
            "Pier Two",
            "0x38cDB1A8207264C1A07c42c43A4c3ED4bfab7CEA",
            "0xDD0212d0da33a2235d1952dA390a0A18EAcc7af5",
        ),
    ]
}
