use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};
use crate::models::DeploymentRecord;

use super::files;

pub struct DeploymentStateStore {
    state_file_path: PathBuf,
}

impl DeploymentStateStore {
    pub fn new(state_directory: &Path) -> Self {
        Self {
            state_file_path: state_directory.join("state.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_file_path
    }

    pub async fn load(&self) -> Result<Option<DeploymentRecord>> {
        if !self.state_file_path.exists() {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.state_file_path)
            .await
            .map_err(|e| DeployError::State(format!("failed to read state file: {e}")))?;
        let record: DeploymentRecord = serde_json::from_str(&json)?;
        Ok(Some(record))
    }

    pub async fn save(&self, record: &DeploymentRecord) -> Result<()> {
        if let Some(parent) = self.state_file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeployError::State(format!("failed to create state dir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(record)?;
        files::write_atomic(&self.state_file_path, json.as_bytes())
            .await
            .map_err(|e| DeployError::State(format!("failed to write state file: {e}")))?;
        Ok(())
    }
}
