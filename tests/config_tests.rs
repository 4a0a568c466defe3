// Config parsing and validation tests

use restakewatch::config::AppConfig;

const VALID_CONFIG: &str = r#"
[server]
port = 8080
host = "0.0.0.0"

[chain]
rpc_url = "https://rpc.mevblocker.io"

[publishing]
broadcast_capacity = 16

[monitoring]
poll_interval_secs = 60
stats_log_interval_secs = 300
"#;

#[test]
fn valid_config_parses_with_defaults() {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.chain.rpc_url, "https://rpc.mevblocker.io");
    assert_eq!(config.chain.request_timeout_secs, 30);
    assert_eq!(config.chain.cycle_timeout_secs, 45);
    // Registry defaults to the mainnet deployment.
    assert_eq!(config.registry.operators.len(), 5);
    assert!(config.registry.contracts.restake_manager.starts_with("0x"));
}

#[test]
fn non_http_rpc_url_is_rejected() {
    let bad = VALID_CONFIG.replace("https://rpc.mevblocker.io", "wss://rpc.mevblocker.io");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("rpc_url"));
}

#[test]
fn zero_poll_interval_is_rejected() {
    let bad = VALID_CONFIG.replace("poll_interval_secs = 60", "poll_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("poll_interval_secs"));
}

#[test]
fn zero_broadcast_capacity_is_rejected() {
    let bad = VALID_CONFIG.replace("broadcast_capacity = 16", "broadcast_capacity = 0");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn missing_chain_section_is_rejected() {
    let bad = VALID_CONFIG.replace("[chain]", "[chainx]");
    assert!(AppConfig::load_from_str(&bad).is_err());
}

#[test]
fn registry_can_be_overridden() {
    let config_str = format!(
        r#"{VALID_CONFIG}
[registry.contracts]
ezethToken = "0x0000000000000000000000000000000000000001"
restakeManager = "0x0000000000000000000000000000000000000002"
depositQueue = "0x0000000000000000000000000000000000000003"
withdrawQueue = "0x0000000000000000000000000000000000000004"
rateProvider = "0x0000000000000000000000000000000000000005"

[[registry.operators]]
name = "TestOp"
delegatorAddress = "0x0000000000000000000000000000000000000006"
podAddress = "0x0000000000000000000000000000000000000007"
"#
    );
    let config = AppConfig::load_from_str(&config_str).unwrap();
    assert_eq!(config.registry.operators.len(), 1);
    assert_eq!(config.registry.operators[0].name, "TestOp");
    assert!(config.registry.contracts.ezeth_token.ends_with("01"));
}

#[test]
fn empty_operator_list_is_rejected() {
    let config_str = format!("{VALID_CONFIG}\n[registry]\noperators = []\n");
    let err = AppConfig::load_from_str(&config_str).unwrap_err();
    assert!(err.to_string().contains("operators"));
}
