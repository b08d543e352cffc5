//! Public parameters and the process-wide parameter store
//!
//! A [`ParameterStore`] moves from unloaded to loaded exactly once. The first
//! successful [`ParameterStore::load`] runs setup (or reads the on-disk cache);
//! every later call returns the same `Arc<PublicParams>`. Concurrent first
//! calls serialize on an init lock, so setup runs once per store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use illium_core::types::hex_array;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Result, ZkError};

/// Default number of chained hash rounds in setup
pub const DEFAULT_SETUP_ROUNDS: u32 = 1 << 16;

/// Default number of trace openings per proof
pub const DEFAULT_OPENINGS: u8 = 12;

const PARAMS_DOMAIN: &[u8] = b"illium.zk.params.v1";

/// Setup configuration; two stores with equal configs derive equal parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Rounds of the setup hash chain
    pub rounds: u32,
    /// Trace openings sampled per proof
    pub openings: u8,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_SETUP_ROUNDS,
            openings: DEFAULT_OPENINGS,
        }
    }
}

/// A loaded parameter set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicParams {
    #[serde(with = "hex_array")]
    id: [u8; 32],
    #[serde(with = "hex_array")]
    binding_key: [u8; 32],
    config: SetupConfig,
}

impl PublicParams {
    /// Run setup: an iterated SHA-256 chain seeded by the config
    pub fn generate(config: SetupConfig) -> Self {
        let mut state: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(PARAMS_DOMAIN);
            hasher.update(config.rounds.to_be_bytes());
            hasher.update([config.openings]);
            hasher.finalize().into()
        };
        for _ in 0..config.rounds {
            state = Sha256::digest(state).into();
        }

        let binding_key: [u8; 32] = {
            let mut hasher = Sha256::new();
            hasher.update(PARAMS_DOMAIN);
            hasher.update(b"/binding");
            hasher.update(state);
            hasher.finalize().into()
        };

        Self {
            id: params_id(&binding_key, &config),
            binding_key,
            config,
        }
    }

    /// Digest identifying this parameter set
    pub fn id(&self) -> &[u8; 32] {
        &self.id
    }

    /// Key the proof seal is computed under
    pub fn binding_key(&self) -> &[u8; 32] {
        &self.binding_key
    }

    pub fn config(&self) -> SetupConfig {
        self.config
    }

    /// Check the id against the binding key and config
    pub fn validate(&self) -> Result<()> {
        if params_id(&self.binding_key, &self.config) != self.id {
            return Err(ZkError::InvalidParams("id does not match contents".into()));
        }
        if self.config.openings == 0 {
            return Err(ZkError::InvalidParams("zero openings".into()));
        }
        Ok(())
    }

    /// Read a bincode-encoded parameter set
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let params: Self = bincode::deserialize(&bytes)?;
        params.validate()?;
        Ok(params)
    }

    /// Write the parameter set with bincode, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bincode::serialize(self)?)?;
        Ok(())
    }
}

fn params_id(binding_key: &[u8; 32], config: &SetupConfig) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(PARAMS_DOMAIN);
    hasher.update(b"/id");
    hasher.update(config.rounds.to_be_bytes());
    hasher.update([config.openings]);
    hasher.update(binding_key);
    hasher.finalize().into()
}

/// Lazily loaded, shareable parameter set
///
/// The global store lives for the process. Stores built with [`ParameterStore::new`]
/// are ordinary values; their parameters are released when the store and
/// every `Arc` handed out by it are dropped.
#[derive(Debug)]
pub struct ParameterStore {
    params: OnceLock<Arc<PublicParams>>,
    init: Mutex<()>,
    setup_runs: AtomicUsize,
    config: SetupConfig,
    cache_path: Option<PathBuf>,
}

static GLOBAL: OnceLock<ParameterStore> = OnceLock::new();

impl ParameterStore {
    pub fn new(config: SetupConfig) -> Self {
        Self {
            params: OnceLock::new(),
            init: Mutex::new(()),
            setup_runs: AtomicUsize::new(0),
            config,
            cache_path: None,
        }
    }

    /// Store that reads parameters from `path`, or generates and writes them there
    pub fn with_cache(config: SetupConfig, path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: Some(path.into()),
            ..Self::new(config)
        }
    }

    /// The process-wide store, default config and no cache unless
    /// [`ParameterStore::install_global`] ran first
    pub fn global() -> &'static ParameterStore {
        GLOBAL.get_or_init(|| ParameterStore::new(SetupConfig::default()))
    }

    /// Install `store` as the process-wide store
    ///
    /// Fails with `InvalidInput` once the global store exists.
    pub fn install_global(store: ParameterStore) -> Result<&'static ParameterStore> {
        GLOBAL
            .set(store)
            .map_err(|_| ZkError::InvalidInput("global parameter store already exists".into()))?;
        Ok(Self::global())
    }

    /// Load the parameter set, running setup at most once
    pub fn load(&self) -> Result<Arc<PublicParams>> {
        if let Some(params) = self.params.get() {
            return Ok(params.clone());
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(params) = self.params.get() {
            return Ok(params.clone());
        }

        let params = Arc::new(self.obtain()?);
        info!(id = %hex::encode(params.id()), "public parameters loaded");
        Ok(self.params.get_or_init(|| params).clone())
    }

    /// The loaded parameter set, if any
    pub fn get(&self) -> Option<Arc<PublicParams>> {
        self.params.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.params.get().is_some()
    }

    /// How many times the expensive setup path has run
    pub fn setup_runs(&self) -> usize {
        self.setup_runs.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> SetupConfig {
        self.config
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    fn obtain(&self) -> Result<PublicParams> {
        if let Some(path) = &self.cache_path {
            if path.exists() {
                match PublicParams::read_from(path) {
                    Ok(params) if params.config() == self.config => {
                        debug!(path = %path.display(), "using cached parameters");
                        return Ok(params);
                    }
                    Ok(_) => warn!(path = %path.display(), "cached parameters use another config, regenerating"),
                    Err(e) => warn!(path = %path.display(), error = %e, "unreadable parameter cache, regenerating"),
                }
            }
        }

        info!(rounds = self.config.rounds, "running parameter setup");
        self.setup_runs.fetch_add(1, Ordering::SeqCst);
        let params = PublicParams::generate(self.config);

        if let Some(path) = &self.cache_path {
            if let Err(e) = params.write_to(path) {
                warn!(path = %path.display(), error = %e, "failed to write parameter cache");
            }
        }
        Ok(params)
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(SetupConfig::default())
    }
}
