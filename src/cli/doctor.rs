//! `artemis doctor` - active health diagnostics.
//!
//! Probes the three oracles and validates configuration to surface problems
//! before they bite during normal operation. Each check reports pass/fail
//! with actionable guidance on failures.

use std::path::Path;
use std::time::Duration;

use crate::attestation::VtpmClient;
use crate::chain::FlareClient;
use crate::config::{AttestationConfig, ChainConfig, Config, GatewayConfig, LlmConfig};

/// Timeout for network probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run diagnostic checks and print results.
pub async fn run_doctor_command(strict: bool) -> anyhow::Result<()> {
    println!("Artemis Doctor");
    println!("==============\n");

    let mut passed = 0u32;
    let mut failed = 0u32;

    // ── Configuration checks ──────────────────────────────────

    let config = match Config::from_env() {
        Ok(config) => {
            check(
                "Configuration",
                CheckResult::Pass("resolved".to_string()),
                &mut passed,
                &mut failed,
            );
            Some(config)
        }
        Err(e) => {
            check(
                "Configuration",
                CheckResult::Fail(e.to_string()),
                &mut passed,
                &mut failed,
            );
            None
        }
    };

    match &config {
        Some(config) => {
            check(
                "Gemini API key",
                check_gemini_key(&config.llm),
                &mut passed,
                &mut failed,
            );
            check(
                "Chain RPC",
                check_chain_rpc(&config.chain).await,
                &mut passed,
                &mut failed,
            );
            check(
                "Attestation socket",
                check_attestation_socket(&config.attestation),
                &mut passed,
                &mut failed,
            );
            check(
                "Gateway port",
                check_gateway_port_available(&config.gateway),
                &mut passed,
                &mut failed,
            );
        }
        None => {
            for name in ["Gemini API key", "Chain RPC", "Attestation socket", "Gateway port"] {
                check(
                    name,
                    CheckResult::Skip("configuration did not resolve".to_string()),
                    &mut passed,
                    &mut failed,
                );
            }
        }
    }

    // ── Summary ───────────────────────────────────────────────

    println!();
    println!("  {passed} passed, {failed} failed");

    if failed > 0 {
        println!("\n  Some checks failed. Fix the listed checks before serving traffic.");
        if strict {
            anyhow::bail!("doctor strict mode failed with {failed} check(s)");
        }
    }

    Ok(())
}

// ── Individual checks ───────────────────────────────────────

fn check(name: &str, result: CheckResult, passed: &mut u32, failed: &mut u32) {
    match result {
        CheckResult::Pass(detail) => {
            *passed += 1;
            println!("  [pass] {name}: {detail}");
        }
        CheckResult::Fail(detail) => {
            *failed += 1;
            println!("  [FAIL] {name}: {detail}");
        }
        CheckResult::Skip(reason) => {
            println!("  [skip] {name}: {reason}");
        }
    }
}

enum CheckResult {
    Pass(String),
    Fail(String),
    Skip(String),
}

fn check_gemini_key(config: &LlmConfig) -> CheckResult {
    match config.require_api_key() {
        Ok(_) => CheckResult::Pass(format!("set (model {})", config.model)),
        Err(e) => CheckResult::Fail(e.to_string()),
    }
}

async fn check_chain_rpc(config: &ChainConfig) -> CheckResult {
    let client = FlareClient::new(config);
    let display = redact_url_for_display(client.rpc_url());
    match tokio::time::timeout(PROBE_TIMEOUT, client.chain_id()).await {
        Ok(Ok(chain_id)) => CheckResult::Pass(format!("chain id {chain_id} at {display}")),
        Ok(Err(e)) => CheckResult::Fail(format!("{display} unreachable: {e}")),
        Err(_) => CheckResult::Fail(format!(
            "{display} did not answer within {}s",
            PROBE_TIMEOUT.as_secs()
        )),
    }
}

fn check_attestation_socket(config: &AttestationConfig) -> CheckResult {
    let client = VtpmClient::new(config);
    if client.is_simulated() {
        return CheckResult::Skip("simulation enabled (SIMULATE_ATTESTATION=true)".to_string());
    }
    check_socket_path(client.socket_path())
}

fn check_socket_path(path: &Path) -> CheckResult {
    if path.exists() {
        CheckResult::Pass(path.display().to_string())
    } else {
        CheckResult::Fail(format!(
            "{} not found; run inside Confidential Space or set SIMULATE_ATTESTATION=true",
            path.display()
        ))
    }
}

fn check_gateway_port_available(config: &GatewayConfig) -> CheckResult {
    let bind_addr = format!("{}:{}", config.host, config.port);
    match std::net::TcpListener::bind(&bind_addr) {
        Ok(listener) => {
            drop(listener);
            CheckResult::Pass(format!("{} is available", bind_addr))
        }
        Err(error) => CheckResult::Fail(format!(
            "{} is unavailable ({}); free the port or change GATEWAY_PORT",
            bind_addr, error
        )),
    }
}

fn redact_url_for_display(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) => {
            if !url.username().is_empty() {
                let _ = url.set_username("redacted");
            }
            if url.password().is_some() {
                let _ = url.set_password(Some("redacted"));
            }
            url.to_string()
        }
        Err(_) => "<invalid-url>".to_string(),
    }
}
