use async_trait::async_trait;
use log::warn;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::model::ViewPosition;
use crate::prelude::{SyncError, SyncResult};

/// Where the last settled map position is kept between sessions.
#[async_trait]
pub trait ViewStore: Send + Sync {
    async fn load(&self) -> SyncResult<Option<ViewPosition>>;
    async fn save(&mut self, position: &ViewPosition) -> SyncResult<()>;

    /// Stored position, or the default when nothing usable is stored.
    async fn load_or_default(&self) -> ViewPosition {
        match self.load().await {
            Ok(Some(position)) => position,
            Ok(None) => ViewPosition::default(),
            Err(err) => {
                warn!("{}; using default view", err);
                ViewPosition::default()
            }
        }
    }
}

/// JSON file holding `{"center": [lat, lon], "zoom": z}`.
pub struct FileViewStore {
    path: PathBuf,
}

impl FileViewStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, action: &str, err: impl std::fmt::Display) -> SyncError {
        SyncError::Persistence(format!("{} {}: {}", action, self.path.display(), err))
    }
}

#[async_trait]
impl ViewStore for FileViewStore {
    async fn load(&self) -> SyncResult<Option<ViewPosition>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.error("reading", err)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|err| self.error("parsing", err))
    }

    async fn save(&mut self, position: &ViewPosition) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.error("writing", err))?;
        }
        let text = serde_json::to_string(position).map_err(|err| self.error("encoding", err))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)
            .await
            .map_err(|err| self.error("writing", err))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| self.error("writing", err))?;
        Ok(())
    }
}

/// In-process store, for embedding without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryViewStore {
    position: Option<ViewPosition>,
    saves: usize,
}

impl MemoryViewStore {
    pub fn saves(&self) -> usize {
        self.saves
    }
}

#[async_trait]
impl ViewStore for MemoryViewStore {
    async fn load(&self) -> SyncResult<Option<ViewPosition>> {
        Ok(self.position)
    }

    async fn save(&mut self, position: &ViewPosition) -> SyncResult<()> {
        self.position = Some(*position);
        self.saves += 1;
        Ok(())
    }
}
