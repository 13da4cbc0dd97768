//! `load-keys`: list the private key files of a directory

use crate::action::{decode, Action, ActionContext};
use crate::cache::StepOutput;
use crate::error::ActionError;
use async_trait::async_trait;
use netdrill_core::params::KeyloaderParams;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Private key files in `dir`, sorted by path
pub async fn private_keys(dir: &Path) -> Result<Vec<PathBuf>, ActionError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut keys = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "pub") {
            continue;
        }
        keys.push(path);
    }
    keys.sort();
    Ok(keys)
}

pub struct KeyloaderAction;

#[async_trait]
impl Action for KeyloaderAction {
    fn name(&self) -> &'static str {
        "load-keys"
    }

    async fn run(&self, _ctx: &ActionContext, params: Value, output: &StepOutput) -> Result<(), ActionError> {
        let params: KeyloaderParams = decode(params)?;
        let keys = private_keys(Path::new(&params.dir)).await?;
        info!("Loaded {} keys from {}", keys.len(), params.dir);
        let keys: Vec<String> = keys
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        output.emit_all("key", keys.iter(), true)?;
        Ok(())
    }
}
