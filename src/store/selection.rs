use crate::controller::DisplaySelection;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

/// Fixed key the displayed-currency selection is stored under.
pub const SELECTION_KEY: &str = "selectedCurrencies";

const PARTITION: &str = "preferences";

/// Persists the user's displayed-currency selection across runs.
pub struct SelectionStore {
    keyspace: Keyspace,
    preferences: PartitionHandle,
}

impl SelectionStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("store"))
            .open()
            .with_context(|| format!("Failed to open preference store at {}", path.display()))?;
        let preferences = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open preferences partition")?;
        Ok(Self {
            keyspace,
            preferences,
        })
    }

    pub fn load(&self) -> Result<Option<DisplaySelection>> {
        let Some(bytes) = self
            .preferences
            .get(SELECTION_KEY)
            .context("Failed to read saved selection")?
        else {
            debug!("No saved selection");
            return Ok(None);
        };
        let selection = serde_json::from_slice(&bytes).context("Saved selection is corrupt")?;
        debug!("Loaded saved selection");
        Ok(Some(selection))
    }

    pub fn save(&self, selection: &DisplaySelection) -> Result<()> {
        let bytes = serde_json::to_vec(selection)?;
        self.preferences
            .insert(SELECTION_KEY, bytes)
            .context("Failed to write selection")?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to flush preference store")?;
        debug!("Saved selection");
        Ok(())
    }
}
