/// Protocol constants for the AGT ledger
///
/// Amounts are integer base units of the asset they are denominated in. Asset
/// decimals are display metadata and never enter ledger arithmetic.
///
/// Reward paid to the miner of a block without a commitment
pub const BASE_MINING_REWARD: u64 = 100;

/// Asset every mining reward is paid in, whatever was committed
pub const REWARD_ASSET: &str = "AGT";

/// Asset fees are denominated in unless a transaction says otherwise
pub const DEFAULT_FEE_ASSET: &str = "BTCYT";

/// Leading zero hex digits a block hash needs without a commitment
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Hard ceiling: a SHA-256 hex digest has 64 digits
pub const MAX_DIFFICULTY: u32 = 64;

/// 2024-01-01T00:00:00Z in milliseconds
pub const GENESIS_TIMESTAMP: i64 = 1_704_067_200_000;

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Minimum fee in base units of the fee asset
pub const MIN_TRANSACTION_FEE: u64 = 1;

/// Fee per 1024 serialized bytes at normal priority
pub const BASE_FEE_RATE: u64 = 10;

/// Minimum commitment, and the amount that maps to a mining power of 1
pub const COMMITMENT_THRESHOLD: u64 = 8_000;

/// Years-equivalent granted per unit of mining power
pub const COMMITMENT_REFERENCE_UNIT: f64 = 8_000.0;

/// Years-equivalent at which the reward bonus reaches 100%
pub const COMMITMENT_REFERENCE_YEARS: f64 = 8_000.0;

pub mod conversions {
    /// Render a base-unit amount with the asset's decimals, trimming trailing zeros
    ///
    /// # Examples
    /// ```
    /// use agt_chain::core::monetary::conversions::format_units;
    /// assert_eq!(format_units(1_500, 3), "1.5");
    /// assert_eq!(format_units(100, 0), "100");
    /// assert_eq!(format_units(-25, 2), "-0.25");
    /// ```
    pub fn format_units(amount: i128, decimals: u8) -> String {
        if decimals == 0 {
            return amount.to_string();
        }
        let sign = if amount < 0 { "-" } else { "" };
        let magnitude = amount.unsigned_abs();
        let scale = 10u128.pow(decimals as u32);
        let whole = magnitude / scale;
        let fraction = magnitude % scale;
        if fraction == 0 {
            return format!("{sign}{whole}");
        }
        let fraction = format!("{fraction:0width$}", width = decimals as usize);
        format!("{sign}{whole}.{}", fraction.trim_end_matches('0'))
    }
}
