//! Startup wiring and diagram lifecycle.

use std::path::Path;
use std::sync::Arc;

use atoll_core::analysis::ModelAnalysis;
use atoll_core::config::LoadedConfig;
use atoll_core::domain::DiagramDomainState;
use atoll_mermaid::DocumentGenerator;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::Result;
use crate::store::{Diagram, DiagramMetadata, DocumentStore, DomainStore};

/// Serializes read-modify-write cycles at diagram granularity. Commands on different
/// diagrams never contend.
#[derive(Default)]
pub(crate) struct LockRegistry {
    inner: Mutex<FxHashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub(crate) fn diagram(&self, diagram_id: &str) -> Arc<Mutex<()>> {
        let mut inner = self.inner.lock();
        inner
            .entry(diagram_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// The facade: configuration, analysis and generator are built once at startup and shared
/// read-only afterwards. All async entry points are thin wrappers over the `_sync`
/// variants; the work is CPU- and store-bound and needs no specific executor.
pub struct Engine {
    config: Arc<LoadedConfig>,
    analysis: Arc<ModelAnalysis>,
    generator: DocumentGenerator,
    pub(crate) domains: Arc<dyn DomainStore>,
    pub(crate) documents: Arc<dyn DocumentStore>,
    pub(crate) locks: LockRegistry,
}

impl Engine {
    /// Validates the configuration and analyzes the schema eagerly. Any configuration
    /// problem aborts startup.
    pub fn new(
        config: LoadedConfig,
        domains: Arc<dyn DomainStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let analysis = Arc::new(ModelAnalysis::analyze(&config.schema)?);
        let generator = DocumentGenerator::new(config.clone());

        Ok(Self {
            config,
            analysis,
            generator,
            domains,
            documents,
            locks: LockRegistry::default(),
        })
    }

    pub fn from_config_dir(
        dir: &Path,
        domains: Arc<dyn DomainStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        Self::new(LoadedConfig::load_dir(dir)?, domains, documents)
    }

    pub fn config(&self) -> &LoadedConfig {
        &self.config
    }

    pub fn analysis(&self) -> &ModelAnalysis {
        &self.analysis
    }

    pub fn generator(&self) -> &DocumentGenerator {
        &self.generator
    }

    /// Loads the diagram's domain state and re-checks its invariants against the schema.
    pub(crate) fn load_state(&self, diagram_id: &str) -> Result<DiagramDomainState> {
        let state = self.domains.load(diagram_id)?;
        state.validate_parents(&self.config.schema, diagram_id)?;
        Ok(state)
    }

    pub fn create_diagram_sync(&self, name: &str, theme: &str) -> Result<Diagram> {
        let diagram = Diagram {
            id: generate_diagram_id(),
            name: name.to_string(),
            content: self.generator.initial_document(name, theme)?,
        };
        self.documents.create(&diagram)?;
        tracing::info!(diagram = %diagram.id, %name, "created diagram");
        Ok(diagram)
    }

    pub async fn create_diagram(&self, name: &str, theme: &str) -> Result<Diagram> {
        self.create_diagram_sync(name, theme)
    }

    pub fn get_diagram_sync(&self, diagram_id: &str) -> Result<Diagram> {
        self.documents.get(diagram_id)
    }

    pub async fn get_diagram(&self, diagram_id: &str) -> Result<Diagram> {
        self.get_diagram_sync(diagram_id)
    }

    pub fn list_diagrams_sync(&self) -> Result<Vec<DiagramMetadata>> {
        self.documents.list()
    }

    pub async fn list_diagrams(&self) -> Result<Vec<DiagramMetadata>> {
        self.list_diagrams_sync()
    }

    pub fn rename_diagram_sync(&self, diagram_id: &str, name: &str) -> Result<()> {
        let lock = self.locks.diagram(diagram_id);
        let _guard = lock.lock();
        self.documents.rename(diagram_id, name)
    }

    pub async fn rename_diagram(&self, diagram_id: &str, name: &str) -> Result<()> {
        self.rename_diagram_sync(diagram_id, name)
    }

    /// Deletes the diagram and its domain state together.
    pub fn delete_diagram_sync(&self, diagram_id: &str) -> Result<()> {
        let lock = self.locks.diagram(diagram_id);
        let _guard = lock.lock();

        // Surface a NotFound for unknown ids before touching anything.
        self.documents.get(diagram_id)?;

        self.documents.delete(diagram_id)?;
        self.domains.delete(diagram_id)?;
        tracing::info!(diagram = diagram_id, "deleted diagram and domain state");
        Ok(())
    }

    pub async fn delete_diagram(&self, diagram_id: &str) -> Result<()> {
        self.delete_diagram_sync(diagram_id)
    }
}

/// Diagram ids are 16-char hex tokens, URL-friendly and stable.
fn generate_diagram_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..16].to_string()
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entities", &self.config.schema.entities.len())
            .field("roots", &self.config.schema.roots.len())
            .finish_non_exhaustive()
    }
}
