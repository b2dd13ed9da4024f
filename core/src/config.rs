use serde::{Deserialize, Serialize};

/// Tunables for quote resolution and the amortization simulator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinanceConfig {
    /// Vehicles at most this many months old are classified `vn`.
    pub new_vehicle_max_age_months: u32,
    /// Guarantee added to the loan amount when the caller supplies none.
    #[serde(default)]
    pub default_guarantee: f64,
    /// Opening commission folded into principal by the amortization path.
    pub opening_commission_pct: f64,
    /// Flat monthly insurance added by the amortization path.
    pub insurance_monthly_addon: f64,
    /// Decimal places kept on displayed monthly fees.
    #[serde(default = "default_fee_decimals")]
    pub fee_decimals: u32,
}

fn default_fee_decimals() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
struct FinanceConfigFile {
    finance: FinanceConfig,
}

impl FinanceConfig {
    /// Load from the data/ directory.
    /// In tests, use FinanceConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/finance/finance_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: FinanceConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        file.finance.validate()?;
        Ok(file.finance)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            new_vehicle_max_age_months: 12,
            default_guarantee: 0.0,
            opening_commission_pct: 2.5,
            insurance_monthly_addon: 25.0,
            fee_decimals: 2,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.opening_commission_pct < 0.0 {
            anyhow::bail!("opening_commission_pct must be non-negative");
        }
        if self.insurance_monthly_addon < 0.0 {
            anyhow::bail!("insurance_monthly_addon must be non-negative");
        }
        if self.default_guarantee < 0.0 {
            anyhow::bail!("default_guarantee must be non-negative");
        }
        Ok(())
    }

    /// Round a monthly fee to the configured number of decimals.
    pub fn round_fee(&self, fee: f64) -> f64 {
        let scale = 10f64.powi(self.fee_decimals as i32);
        (fee * scale).round() / scale
    }
}
