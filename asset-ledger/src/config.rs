//! Configuration for the asset ledger

use crate::numeric::CoercionPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Storage backend
    pub backend: Backend,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Document keys
    pub storage: StorageKeys,

    /// Marketplace policies
    pub marketplace: MarketplaceConfig,

    /// Transaction simulation parameters
    pub recorder: RecorderConfig,

    /// Actor configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/asset-ledger"),
            service_name: "asset-ledger".to_string(),
            backend: Backend::RocksDb,
            rocksdb: RocksDBConfig::default(),
            storage: StorageKeys::default(),
            marketplace: MarketplaceConfig::default(),
            recorder: RecorderConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process memory, lost on exit
    Memory,
    /// RocksDB under `data_dir`
    RocksDb,
}

impl Backend {
    /// Parse from a config string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Some(Backend::Memory),
            "rocksdb" => Some(Backend::RocksDb),
            _ => None,
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 16, // documents are small
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Keys the two collections are stored under
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Listings and trades
    pub marketplace_key: String,

    /// Recorded transactions
    pub transactions_key: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            marketplace_key: "asset_ledger_marketplace_v1".to_string(),
            transactions_key: "asset_ledger_transactions_v1".to_string(),
        }
    }
}

/// What happens when a terminal listing is bought again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fail with `ListingUnavailable`
    #[default]
    RejectTerminal,
    /// Fill again, appending another trade and overwriting `filledAt`
    Overwrite,
}

impl FillPolicy {
    /// Parse from a config string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "reject_terminal" | "reject" => Some(FillPolicy::RejectTerminal),
            "overwrite" => Some(FillPolicy::Overwrite),
            _ => None,
        }
    }
}

/// Marketplace configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Numeric input handling
    pub coercion: CoercionPolicy,

    /// Re-fill handling
    pub fill_policy: FillPolicy,
}

/// Transaction recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Simulated block interval (milliseconds)
    pub block_interval_ms: u64,

    /// Confirmation count ceiling
    pub max_confirmations: u32,

    /// Lower bound of simulated gas (inclusive)
    pub gas_used_min: u64,

    /// Upper bound of simulated gas (exclusive)
    pub gas_used_max: u64,

    /// Lower bound of simulated fee (inclusive)
    pub gas_fee_min: Decimal,

    /// Upper bound of simulated fee (exclusive)
    pub gas_fee_max: Decimal,

    /// Fee currency suffix
    pub fee_symbol: String,

    /// Block explorer base URL
    pub explorer_base_url: String,

    /// Address used as the counterparty of listing receipts
    pub venue_address: String,

    /// Seed for hashes and gas; entropy when unset
    pub rng_seed: Option<u64>,

    /// Numeric input handling for amounts
    pub coercion: CoercionPolicy,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            block_interval_ms: 15_000,
            max_confirmations: 12,
            gas_used_min: 21_000,
            gas_used_max: 71_000,
            gas_fee_min: Decimal::new(1, 3),  // 0.001
            gas_fee_max: Decimal::new(11, 3), // 0.011
            fee_symbol: "ETH".to_string(),
            explorer_base_url: "https://etherscan.io".to_string(),
            venue_address: "marketplace".to_string(),
            rng_seed: None,
            coercion: CoercionPolicy::Permissive,
        }
    }
}

impl RecorderConfig {
    /// Reject settings that would make recording panic or report zero confirmations
    pub fn validate(&self) -> crate::Result<()> {
        if self.block_interval_ms == 0 {
            return Err(crate::Error::Config("block_interval_ms must be > 0".to_string()));
        }
        if self.max_confirmations == 0 {
            return Err(crate::Error::Config("max_confirmations must be > 0".to_string()));
        }
        if self.gas_used_min >= self.gas_used_max {
            return Err(crate::Error::Config("gas_used range is empty".to_string()));
        }
        // Fees are drawn in millionths
        if (self.gas_fee_max - self.gas_fee_min) * Decimal::from(1_000_000) < Decimal::ONE
            || self.gas_fee_min.is_sign_negative()
        {
            return Err(crate::Error::Config("gas_fee range is empty".to_string()));
        }
        Ok(())
    }
}

/// Actor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("ASSET_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(backend) = std::env::var("ASSET_LEDGER_BACKEND") {
            config.backend = Backend::parse(&backend)
                .ok_or_else(|| crate::Error::Config(format!("Unknown backend: {}", backend)))?;
        }

        if let Ok(coercion) = std::env::var("ASSET_LEDGER_COERCION") {
            let policy = CoercionPolicy::parse(&coercion).ok_or_else(|| {
                crate::Error::Config(format!("Unknown coercion policy: {}", coercion))
            })?;
            config.marketplace.coercion = policy;
            config.recorder.coercion = policy;
        }

        if let Ok(fill) = std::env::var("ASSET_LEDGER_FILL_POLICY") {
            config.marketplace.fill_policy = FillPolicy::parse(&fill)
                .ok_or_else(|| crate::Error::Config(format!("Unknown fill policy: {}", fill)))?;
        }

        if let Ok(seed) = std::env::var("ASSET_LEDGER_RNG_SEED") {
            let seed = seed
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid RNG seed: {}", e)))?;
            config.recorder.rng_seed = Some(seed);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the components cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        self.recorder.validate()?;
        if self.storage.marketplace_key == self.storage.transactions_key {
            return Err(crate::Error::Config(
                "marketplace and transaction keys must differ".to_string(),
            ));
        }
        Ok(())
    }
}
