//! CLI scenarios that need no database.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn hdk() -> Command {
    let mut cmd = Command::cargo_bin("hdk").expect("hdk binary");
    cmd.env_remove("HDK_DATABASE_URL").env("RUST_LOG", "off");
    cmd
}

#[test]
fn config_hash_prints_hash_and_canonical_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("dev.yaml");
    fs::write(&base, "kitchen:\n  timezone: Europe/Paris\n  store: postgres\n")?;
    fs::write(&over, "kitchen:\n  store: memory\n")?;

    hdk()
        .arg("config-hash")
        .arg(&base)
        .arg(&over)
        .assert()
        .success()
        .stdout(predicate::str::is_match("config_hash=[0-9a-f]{64}")?)
        .stdout(predicate::str::contains(r#""store":"memory""#))
        .stdout(predicate::str::contains(r#""timezone":"Europe/Paris""#));
    Ok(())
}

#[test]
fn config_hash_refuses_secret_literal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bad = dir.path().join("bad.yaml");
    fs::write(
        &bad,
        "database:\n  url_env: \"postgres://kitchen:hunter2@db/kitchen\"\n",
    )?;

    hdk()
        .arg("config-hash")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
    Ok(())
}

#[test]
fn order_commands_name_the_missing_url_variable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("kitchen.yaml");
    fs::write(&cfg, "database:\n  url_env: HDK_CLI_TEST_NO_SUCH_VAR\n")?;

    hdk()
        .env_remove("HDK_CLI_TEST_NO_SUCH_VAR")
        .arg("order")
        .arg("--config")
        .arg(&cfg)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("HDK_CLI_TEST_NO_SUCH_VAR"));
    Ok(())
}

#[test]
fn order_commands_refuse_the_memory_store() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = dir.path().join("kitchen.yaml");
    fs::write(&cfg, "kitchen:\n  store: memory\n")?;

    hdk()
        .arg("order")
        .arg("--config")
        .arg(&cfg)
        .arg("claim")
        .arg("--preparer")
        .arg("chef-a")
        .assert()
        .failure()
        .stderr(predicate::str::contains("kitchen.store=postgres"))
        .stderr(predicate::str::contains("config selects memory"));
    Ok(())
}
