//! Binary-level checks that need no network.

use assert_cmd::Command;
use predicates::prelude::*;
use sparknet_client::{Address, AddressKind};

fn sparknet() -> Command {
    let mut cmd = Command::cargo_bin("sparknet").expect("binary builds");
    for var in [
        "SPARKNET_CONFIG",
        "SPARKNET_NETWORK",
        "SPARKNET_RPC_URL",
        "SPARKNET_CONTRACT_ID",
        "SPARKNET_TOKEN_ID",
        "SPARKNET_SECRET",
        "ADMIN_SECRET",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_commands() {
    sparknet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("providers"))
        .stdout(predicate::str::contains("rent"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn keygen_prints_address_and_secret() {
    sparknet()
        .arg("keygen")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address: G"))
        .stdout(predicate::str::contains("Secret:  S"));
}

#[test]
fn init_without_admin_secret_fails() {
    sparknet().arg("init").assert().failure();
}

#[test]
fn init_with_bad_secret_exits_nonzero() {
    sparknet()
        .args(["init", "--admin-secret", "garbage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

fn contract(byte: u8) -> String {
    Address::from_key(AddressKind::Contract, &[byte; 32]).to_string()
}

#[test]
fn plain_http_rpc_is_refused() {
    sparknet()
        .env("SPARKNET_CONTRACT_ID", contract(2))
        .env("SPARKNET_TOKEN_ID", contract(3))
        .args(["--rpc-url", "http://localhost:1", "providers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("allow_http"));
}

#[test]
fn unconfigured_gateway_is_reported() {
    sparknet()
        .args(["providers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is required"));
}
