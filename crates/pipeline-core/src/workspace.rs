use crate::ai::HttpProvider;
use crate::config::{Config, ProviderConfig, WarnLevel};
use crate::error::Result;
use crate::objects::LocalObjectStore;
use crate::paths;
use crate::store::RedbStore;
use std::path::{Path, PathBuf};

/// An opened pipeline workspace: configuration, record store and object
/// store rooted at one directory.
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
    pub store: RedbStore,
    pub objects: LocalObjectStore,
}

/// Which configured AI provider to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiPurpose {
    Extract,
    Generate,
}

impl Workspace {
    /// Create `.pipeline/` with a default config if it is missing, then open.
    /// An existing config is left untouched.
    pub fn init(root: &Path, project_name: &str) -> Result<Self> {
        let config_path = paths::config_path(root);
        if config_path.exists() {
            tracing::info!(root = %root.display(), "workspace already initialized");
        } else {
            crate::io::ensure_dir(&paths::pipeline_dir(root))?;
            Config::new(project_name).save(root)?;
            tracing::info!(root = %root.display(), project = project_name, "workspace initialized");
        }
        Self::open(root)
    }

    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load(root)?;
        for w in config.validate() {
            match w.level {
                WarnLevel::Error => tracing::error!("config: {}", w.message),
                WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            }
        }

        let store = RedbStore::open(&paths::resolve(root, &config.storage.database))?;
        let upload_dir = paths::resolve(root, &config.objects.dir);
        crate::io::ensure_dir(&upload_dir)?;
        let objects = LocalObjectStore::new(upload_dir, config.objects.public_base_url(root));

        Ok(Self {
            root: root.to_path_buf(),
            config,
            store,
            objects,
        })
    }

    pub fn provider_config(&self, purpose: AiPurpose) -> &ProviderConfig {
        match purpose {
            AiPurpose::Extract => &self.config.ai.extract,
            AiPurpose::Generate => &self.config.ai.generate,
        }
    }

    pub fn provider(&self, purpose: AiPurpose) -> Result<HttpProvider> {
        HttpProvider::from_config(self.provider_config(purpose))
    }
}
