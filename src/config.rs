//! Configuration module for the curve trader
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and turns the loaded values into the typed
//! settings the engine components take.

use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{TraderResult, ValidationError};
use crate::retry::{PolicyOverrides, RetryPolicy};
use crate::tx::{ManagerSettings, ProgramAccounts};

pub const ENV_RPC_URL: &str = "CURVE_TRADER_RPC_URL";
pub const ENV_DATA_URL: &str = "CURVE_TRADER_DATA_URL";

/// Solana's per-transaction compute ceiling
const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraderConfig {
    /// Ledger node
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Pool price/reserve service
    #[serde(default)]
    pub data: DataConfig,

    /// Trade defaults
    #[serde(default)]
    pub trading: TradingConfig,

    /// Finality tracking
    #[serde(default)]
    pub confirm: ConfirmConfig,

    /// Retry policy overrides applied on top of the built-in default
    #[serde(default)]
    pub retry: PolicyOverrides,

    /// Program address overrides (mainnet addresses when unset)
    #[serde(default)]
    pub program: ProgramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// processed | confirmed | finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_url")]
    pub base_url: String,

    #[serde(default = "default_data_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Fraction in [0, 1]
    #[serde(default = "default_slippage")]
    pub default_slippage: f64,

    /// Priority fee in SOL
    #[serde(default)]
    pub default_priority_fee: f64,

    #[serde(default = "default_compute_unit_limit")]
    pub compute_unit_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_confirm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub program_id: Option<String>,
    pub global: Option<String>,
    pub fee_recipient: Option<String>,
    pub event_authority: Option<String>,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_data_url() -> String { "https://frontend-api.pump.fun".to_string() }
fn default_data_timeout() -> u64 { 10 }
fn default_slippage() -> f64 { 0.01 }
fn default_compute_unit_limit() -> u32 { 200_000 }
fn default_poll_interval_ms() -> u64 { 2_000 }
fn default_confirm_timeout() -> u64 { 60 }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_url: default_data_url(),
            timeout_secs: default_data_timeout(),
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            default_slippage: default_slippage(),
            default_priority_fee: 0.0,
            compute_unit_limit: default_compute_unit_limit(),
        }
    }
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_confirm_timeout(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidConfig(message.into())
}

fn parse_override(field: &str, value: &Option<String>, fallback: Pubkey) -> TraderResult<Pubkey> {
    match value {
        Some(raw) => Pubkey::from_str(raw.trim())
            .map_err(|e| invalid(format!("program.{field} '{raw}' is not an address: {e}")).into()),
        None => Ok(fallback),
    }
}

impl TraderConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> TraderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| invalid(format!("cannot read {}: {e}", path.display())))?;
        let config: TraderConfig = toml::from_str(&content)
            .map_err(|e| invalid(format!("cannot parse {}: {e}", path.display())))?;
        Ok(config)
    }

    /// Load from file, then apply `.env` and environment overrides and validate
    pub fn from_file_with_env(path: impl AsRef<Path>) -> TraderResult<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_RPC_URL) {
            if !url.trim().is_empty() {
                self.rpc.url = url;
            }
        }
        if let Ok(url) = std::env::var(ENV_DATA_URL) {
            if !url.trim().is_empty() {
                self.data.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> TraderResult<()> {
        if self.rpc.url.trim().is_empty() {
            return Err(invalid("rpc.url is empty").into());
        }
        if self.data.base_url.trim().is_empty() {
            return Err(invalid("data.base_url is empty").into());
        }
        self.commitment()?;

        let slippage = self.trading.default_slippage;
        if !(0.0..=1.0).contains(&slippage) {
            return Err(invalid(format!(
                "trading.default_slippage must be within [0, 1], got {slippage}"
            ))
            .into());
        }
        let fee = self.trading.default_priority_fee;
        if !fee.is_finite() || fee < 0.0 {
            return Err(invalid(format!(
                "trading.default_priority_fee must be non-negative, got {fee}"
            ))
            .into());
        }
        let cu_limit = self.trading.compute_unit_limit;
        if cu_limit == 0 || cu_limit > MAX_COMPUTE_UNIT_LIMIT {
            return Err(invalid(format!(
                "trading.compute_unit_limit must be within 1..={MAX_COMPUTE_UNIT_LIMIT}, got {cu_limit}"
            ))
            .into());
        }

        if self.confirm.poll_interval_ms == 0 {
            return Err(invalid("confirm.poll_interval_ms must be positive").into());
        }
        if self.confirm.timeout_secs == 0 {
            return Err(invalid("confirm.timeout_secs must be positive").into());
        }

        self.retry_policy()?;
        self.program_accounts()?;
        Ok(())
    }

    pub fn commitment(&self) -> TraderResult<CommitmentConfig> {
        match self.rpc.commitment.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(invalid(format!("rpc.commitment '{other}' is not a commitment level")).into()),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn data_timeout(&self) -> Duration {
        Duration::from_secs(self.data.timeout_secs)
    }

    /// Built-in default policy with `[retry]` merged on top
    pub fn retry_policy(&self) -> TraderResult<RetryPolicy> {
        RetryPolicy::default().merged(&self.retry)
    }

    pub fn program_accounts(&self) -> TraderResult<ProgramAccounts> {
        let defaults = ProgramAccounts::default();
        Ok(ProgramAccounts {
            program_id: parse_override("program_id", &self.program.program_id, defaults.program_id)?,
            global: parse_override("global", &self.program.global, defaults.global)?,
            fee_recipient: parse_override(
                "fee_recipient",
                &self.program.fee_recipient,
                defaults.fee_recipient,
            )?,
            event_authority: parse_override(
                "event_authority",
                &self.program.event_authority,
                defaults.event_authority,
            )?,
        })
    }

    pub fn manager_settings(&self) -> TraderResult<ManagerSettings> {
        Ok(ManagerSettings {
            compute_unit_limit: self.trading.compute_unit_limit,
            default_slippage: self.trading.default_slippage,
            default_priority_fee: self.trading.default_priority_fee,
            poll_interval: Duration::from_millis(self.confirm.poll_interval_ms),
            confirm_timeout: Duration::from_secs(self.confirm.timeout_secs),
            program: self.program_accounts()?,
        })
    }
}
