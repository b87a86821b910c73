use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use ckb_types::packed::Script;
use lm_config::Config;
use lm_migrator::{CellDepRegistry, ChainBroadcaster, MigrationBuilder, StopHandle};
use lm_rpc_client::{
    ckb_client::CKBClient,
    indexer_client::CKBIndexerClient,
    traits::{CellSource, Submitter},
};
use lm_utils::{fee::SizeFeeEstimator, wallet::Wallet};

pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read(&path)
        .with_context(|| format!("read config file from {}", path.as_ref().to_string_lossy()))?;
    let config = toml::from_slice(&content).with_context(|| "parse config file")?;
    Ok(config)
}

/// Clients and keys of one run.
pub struct MigrationContext {
    pub config: Config,
    pub wallet: Arc<Wallet>,
    pub indexer: Arc<CKBIndexerClient>,
    pub ckb: Arc<CKBClient>,
}

impl MigrationContext {
    pub fn from_config(config: Config) -> Result<Self> {
        let wallet = Wallet::from_config(&config).with_context(|| "init wallet")?;
        let indexer = CKBIndexerClient::with_url(&config.rpc.indexer_url)?;
        let ckb = CKBClient::with_url(&config.rpc.ckb_url)?;
        Ok(MigrationContext {
            config,
            wallet: Arc::new(wallet),
            indexer: Arc::new(indexer),
            ckb: Arc::new(ckb),
        })
    }

    pub fn source_lock(&self) -> &Script {
        self.wallet.lock_script()
    }

    pub fn cell_limit(&self, cli_cell_limit: Option<usize>) -> usize {
        cli_cell_limit.unwrap_or(self.config.migration.cell_limit)
    }

    pub fn builder(&self) -> MigrationBuilder {
        self.builder_with_source(self.indexer.clone())
    }

    pub fn broadcaster(&self, stop: StopHandle) -> ChainBroadcaster {
        self.broadcaster_with_submitter(self.ckb.clone(), stop)
    }

    fn builder_with_source(&self, source: Arc<dyn CellSource>) -> MigrationBuilder {
        let registry = CellDepRegistry::from_entries(&self.config.registry_entries());
        log::debug!(
            "{} type scripts known on {}",
            registry.len(),
            self.config.network
        );
        MigrationBuilder::new(
            source,
            self.source_lock().clone(),
            self.config.migration.destination.clone().into(),
            registry,
            Arc::new(SizeFeeEstimator::new(self.config.migration.fee_rate)),
        )
    }

    fn broadcaster_with_submitter(
        &self,
        submitter: Arc<dyn Submitter>,
        stop: StopHandle,
    ) -> ChainBroadcaster {
        ChainBroadcaster::new(self.wallet.clone(), submitter)
            .detach_cell_deps_when_signing(self.config.migration.detach_cell_deps_when_signing)
            .with_stop_handle(stop)
    }
}
