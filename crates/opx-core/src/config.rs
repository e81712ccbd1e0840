//! Configuration parsing for the operations gateway.
//!
//! All modules read their settings from a single JSON config file: broker
//! connection details, the repo fee rate tables, and sync bookkeeping.
//!
//! # Example config
//!
//! ```json
//! {
//!   "module_name": "opx",
//!   "log_path": "/var/log/opx",
//!   "broker": {
//!     "base_url": "https://api.broker.example",
//!     "username": "user",
//!     "password": "secret",
//!     "page_size": 50
//!   },
//!   "fees": {
//!     "arancel_caucion_colocadora": { "ARS": 1.5, "USD": 1.5 },
//!     "arancel_caucion_tomadora": { "ARS": 4.5, "USD": 4.5 },
//!     "derechos_de_mercado_daily_rate": { "ARS": 0.0045, "USD": 0.0045 },
//!     "gastos_garantia_daily_rate": { "ARS": 0.0045, "USD": 0.0045 },
//!     "iva_repo_rate": 0.21
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::{RepoRole, Rounding, RoundingMode};

/// Default reconciliation tolerance (monetary units).
pub const DEFAULT_RECONCILE_TOLERANCE: f64 = 0.01;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module name used as the log-file prefix.
    pub module_name: Option<String>,

    /// Directory for daily-rotating log files.
    pub log_path: Option<String>,

    /// Broker connection settings.
    pub broker: BrokerSection,

    /// Repo fee rate tables.
    pub fees: RepoFeeConfig,

    /// Sync bookkeeping (refresh watermark).
    pub sync: Option<SyncSection>,
}

impl AppConfig {
    pub fn module_name(&self) -> String {
        self.module_name.clone().unwrap_or_else(|| "opx".to_string())
    }
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSection {
    /// REST base URL (e.g. `https://api.broker.example`).
    pub base_url: String,

    pub username: String,
    pub password: String,

    /// Venue account to scope operation listings to.
    pub account_id: Option<String>,

    /// Page size for operation listings (default: 50).
    pub page_size: Option<u32>,

    /// Backoff schedule in milliseconds (default: 2000, 5000, 10000).
    pub retry_schedule_ms: Option<Vec<u64>>,
}

impl BrokerSection {
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.unwrap_or(50)
    }

    pub fn effective_retry_schedule_ms(&self) -> Vec<u64> {
        self.retry_schedule_ms
            .clone()
            .unwrap_or_else(|| vec![2000, 5000, 10000])
    }
}

/// Sync bookkeeping.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SyncSection {
    /// Trade timestamp (ms) of the last successful sync. Refresh mode
    /// drops operations at or before this watermark.
    pub last_sync_timestamp_ms: Option<u64>,

    /// JSON file holding the committed operation set. Doubles as the
    /// merge baseline on the next sync.
    pub store_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Repo fee configuration
// ---------------------------------------------------------------------------

/// Rate names resolved per `(currency, role)` when computing a breakdown.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRepoRates {
    /// Annualized arancel percentage for the operation's role.
    pub arancel_pct: f64,
    /// Market-rights daily percentage.
    pub derechos_daily_pct: f64,
    /// Guarantee-expense daily percentage (borrower only; 0 for lenders).
    pub gastos_daily_pct: f64,
    /// VAT as a fraction (0.21 = 21 %).
    pub iva_rate: f64,
}

/// Repo fee rate tables, keyed by currency code.
///
/// Role selection is enum-driven: the two arancel tables are explicit
/// fields, never string-keyed lookups. A zero or missing rate is treated
/// as incomplete configuration and blocks the calculation instead of
/// silently computing zero fees.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoFeeConfig {
    /// Annualized arancel (percent) for the lender side, per currency.
    #[serde(default)]
    pub arancel_caucion_colocadora: HashMap<String, f64>,

    /// Annualized arancel (percent) for the borrower side, per currency.
    #[serde(default)]
    pub arancel_caucion_tomadora: HashMap<String, f64>,

    /// Market-rights daily rate (percent per day), per currency.
    #[serde(default)]
    pub derechos_de_mercado_daily_rate: HashMap<String, f64>,

    /// Guarantee-expense daily rate (percent per day), per currency.
    /// Only required when the role is tomadora.
    #[serde(default)]
    pub gastos_garantia_daily_rate: HashMap<String, f64>,

    /// VAT over the expense components, as a fraction (0.21 = 21 %).
    #[serde(default)]
    pub iva_repo_rate: f64,

    /// Reconciliation tolerance override (default: 0.01).
    pub reconcile_tolerance: Option<f64>,

    /// Display decimals override (default: 2).
    pub display_decimals: Option<u8>,
}

impl RepoFeeConfig {
    pub fn effective_tolerance(&self) -> f64 {
        self.reconcile_tolerance.unwrap_or(DEFAULT_RECONCILE_TOLERANCE)
    }

    pub fn rounding(&self) -> Rounding {
        Rounding {
            decimals: self.display_decimals.unwrap_or(2),
            mode: RoundingMode::HalfUp,
        }
    }

    fn table_rate(table: &HashMap<String, f64>, currency: &str) -> f64 {
        table.get(currency).copied().unwrap_or(0.0)
    }

    /// Resolve every rate required for `(currency, role)`.
    ///
    /// Returns the missing rate names when any required rate is absent or
    /// non-positive. The guarantee-expense rate is only required for the
    /// borrower side.
    pub fn resolve(&self, currency: &str, role: RepoRole) -> Result<ResolvedRepoRates, Vec<String>> {
        let (arancel_name, arancel_table) = match role {
            RepoRole::Colocadora => ("arancel_caucion_colocadora", &self.arancel_caucion_colocadora),
            RepoRole::Tomadora => ("arancel_caucion_tomadora", &self.arancel_caucion_tomadora),
        };

        let arancel_pct = Self::table_rate(arancel_table, currency);
        let derechos_daily_pct = Self::table_rate(&self.derechos_de_mercado_daily_rate, currency);
        let gastos_daily_pct = Self::table_rate(&self.gastos_garantia_daily_rate, currency);

        let mut missing = Vec::new();
        if arancel_pct <= 0.0 {
            missing.push(format!("{arancel_name} ({currency})"));
        }
        if derechos_daily_pct <= 0.0 {
            missing.push(format!("derechos_de_mercado_daily_rate ({currency})"));
        }
        if role == RepoRole::Tomadora && gastos_daily_pct <= 0.0 {
            missing.push(format!("gastos_garantia_daily_rate ({currency})"));
        }
        if self.iva_repo_rate <= 0.0 {
            missing.push("iva_repo_rate".to_string());
        }

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(ResolvedRepoRates {
            arancel_pct,
            derechos_daily_pct,
            gastos_daily_pct: match role {
                RepoRole::Tomadora => gastos_daily_pct,
                RepoRole::Colocadora => 0.0,
            },
            iva_rate: self.iva_repo_rate,
        })
    }

    /// Exhaustive load-time check: report every missing rate across every
    /// configured currency and both roles, so gaps surface at startup
    /// instead of as per-row blocks later.
    pub fn validate(&self) -> Vec<String> {
        let mut currencies: Vec<&String> = self
            .arancel_caucion_colocadora
            .keys()
            .chain(self.arancel_caucion_tomadora.keys())
            .chain(self.derechos_de_mercado_daily_rate.keys())
            .chain(self.gastos_garantia_daily_rate.keys())
            .collect();
        currencies.sort();
        currencies.dedup();

        let mut missing = Vec::new();
        for currency in currencies {
            for role in [RepoRole::Colocadora, RepoRole::Tomadora] {
                if let Err(names) = self.resolve(currency, role) {
                    for name in names {
                        if !missing.contains(&name) {
                            missing.push(name);
                        }
                    }
                }
            }
        }
        if self.iva_repo_rate <= 0.0 && !missing.iter().any(|m| m == "iva_repo_rate") {
            missing.push("iva_repo_rate".to_string());
        }
        missing
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}
