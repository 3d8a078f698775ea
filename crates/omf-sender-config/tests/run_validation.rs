//! Run and transport section tests for omf-sender-config.
// crates/omf-sender-config/tests/run_validation.rs
// =============================================================================
// Module: Run Section Validation Tests
// Description: Defaults and bounds for `[run]` and `[transport]`.
// Purpose: Ensure pacing and token policy settings map onto runtime options.
// =============================================================================

mod common;

use std::time::Duration;

use common::EDGE_ENTRY;
use common::RunDir;
use common::TestResult;
use common::assert_invalid;
use omf_sender_core::CycleLimit;

/// Tests the defaults applied when `[run]` and `[transport]` are omitted.
#[test]
fn omitted_sections_use_defaults() -> TestResult {
    let dir = RunDir::new()?;
    let config = dir.load(EDGE_ENTRY).map_err(|err| err.to_string())?;
    let options = config.run_options();
    if options.cycles != CycleLimit::UntilStopped {
        return Err("omitted cycles should run until stopped".to_string());
    }
    if options.cycle_interval != Duration::from_secs(1) || options.test_mode || !options.cleanup {
        return Err(format!("unexpected run defaults: {options:?}"));
    }
    let dispatcher = config.dispatcher_config();
    if dispatcher.omf_version != "1.1" {
        return Err(format!("unexpected omf version {}", dispatcher.omf_version));
    }
    if dispatcher.token_policy.refresh_skew != Duration::from_secs(300)
        || dispatcher.token_policy.allow_http_token_endpoint
    {
        return Err("unexpected token policy defaults".to_string());
    }
    if !dispatcher.user_agent.starts_with("omf-sender/") {
        return Err(format!("unexpected user agent {}", dispatcher.user_agent));
    }
    Ok(())
}

/// Tests that explicit run settings flow into orchestrator options.
#[test]
fn explicit_run_settings_are_applied() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!(
        "[run]\ncycles = 2\ncycle_interval_ms = 0\ntest_mode = true\ncleanup = false\n\
         omf_version = \"1.2\"\n\n[transport]\nallow_http_token_endpoint = true\n\
         token_refresh_skew_seconds = 60\nuser_agent = \"plant-7\"\n{EDGE_ENTRY}"
    );
    let config = dir.load(&toml).map_err(|err| err.to_string())?;
    let options = config.run_options();
    if options.cycles != CycleLimit::Fixed(2)
        || !options.cycle_interval.is_zero()
        || !options.test_mode
        || options.cleanup
    {
        return Err(format!("unexpected run options: {options:?}"));
    }
    let dispatcher = config.dispatcher_config();
    if dispatcher.omf_version != "1.2" || dispatcher.user_agent != "plant-7" {
        return Err("dispatcher settings not applied".to_string());
    }
    if dispatcher.token_policy.refresh_skew != Duration::from_secs(60)
        || !dispatcher.token_policy.allow_http_token_endpoint
    {
        return Err("token policy not applied".to_string());
    }
    Ok(())
}

/// Tests that padded header values are stored trimmed.
#[test]
fn padded_header_values_are_trimmed() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!(
        "[run]\nomf_version = \" 1.2\\t\"\n\n[transport]\nuser_agent = \"  plant-7 \"\n{EDGE_ENTRY}"
    );
    let config = dir.load(&toml).map_err(|err| err.to_string())?;
    if config.run.omf_version != "1.2" {
        return Err(format!("omf version not trimmed: {:?}", config.run.omf_version));
    }
    let dispatcher = config.dispatcher_config();
    if dispatcher.omf_version != "1.2" || dispatcher.user_agent != "plant-7" {
        return Err(format!(
            "dispatcher received untrimmed values: {:?} {:?}",
            dispatcher.omf_version, dispatcher.user_agent
        ));
    }
    Ok(())
}

/// Tests that a zero cycle count is rejected.
#[test]
fn zero_cycles_rejected() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!("[run]\ncycles = 0\n{EDGE_ENTRY}");
    assert_invalid(dir.load(&toml), "run.cycles must be greater than zero")
}

/// Tests the cycle interval upper bound.
#[test]
fn oversized_cycle_interval_rejected() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!("[run]\ncycle_interval_ms = 86400001\n{EDGE_ENTRY}");
    assert_invalid(dir.load(&toml), "run.cycle_interval_ms")
}

/// Tests that header-unsafe OMF versions are rejected.
#[test]
fn malformed_omf_version_rejected() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!("[run]\nomf_version = \"1.1\\r\\nx: y\"\n{EDGE_ENTRY}");
    assert_invalid(dir.load(&toml), "run.omf_version")
}

/// Tests the refresh skew upper bound.
#[test]
fn oversized_refresh_skew_rejected() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!("[transport]\ntoken_refresh_skew_seconds = 7200\n{EDGE_ENTRY}");
    assert_invalid(dir.load(&toml), "transport.token_refresh_skew_seconds")
}

/// Tests that blank user agents are rejected.
#[test]
fn blank_user_agent_rejected() -> TestResult {
    let dir = RunDir::new()?;
    let toml = format!("[transport]\nuser_agent = \"  \"\n{EDGE_ENTRY}");
    assert_invalid(dir.load(&toml), "transport.user_agent")
}
