//! Store contracts and the two reference implementations.
//!
//! Durability is an external concern; the contracts are the core. Any backend must satisfy
//! the same behavior: loading an unseen diagram id yields empty domain state, and `save` is
//! atomic from the caller's view. The flat-file store writes through a temp-file-then-rename
//! cycle to honor that.

use std::path::{Path, PathBuf};

use atoll_core::domain::DiagramDomainState;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagram {
    pub id: String,
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramMetadata {
    pub id: String,
    pub name: String,
}

/// Structured per-diagram domain state.
pub trait DomainStore: Send + Sync {
    /// Loading an unseen diagram id yields empty state.
    fn load(&self, diagram_id: &str) -> Result<DiagramDomainState>;
    fn save(&self, diagram_id: &str, state: &DiagramDomainState) -> Result<()>;
    fn delete(&self, diagram_id: &str) -> Result<()>;
}

/// The opaque diagram text plus its metadata.
pub trait DocumentStore: Send + Sync {
    fn create(&self, diagram: &Diagram) -> Result<()>;
    fn get(&self, diagram_id: &str) -> Result<Diagram>;
    fn update_content(&self, diagram_id: &str, content: &str) -> Result<()>;
    fn rename(&self, diagram_id: &str, name: &str) -> Result<()>;
    fn delete(&self, diagram_id: &str) -> Result<()>;
    fn list(&self) -> Result<Vec<DiagramMetadata>>;
}

fn not_found(diagram_id: &str) -> Error {
    Error::DiagramNotFound {
        diagram_id: diagram_id.to_string(),
    }
}

/// In-memory store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    domains: RwLock<FxHashMap<String, DiagramDomainState>>,
    diagrams: RwLock<FxHashMap<String, Diagram>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainStore for MemoryStore {
    fn load(&self, diagram_id: &str) -> Result<DiagramDomainState> {
        Ok(self
            .domains
            .read()
            .get(diagram_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, diagram_id: &str, state: &DiagramDomainState) -> Result<()> {
        self.domains
            .write()
            .insert(diagram_id.to_string(), state.clone());
        Ok(())
    }

    fn delete(&self, diagram_id: &str) -> Result<()> {
        self.domains.write().remove(diagram_id);
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn create(&self, diagram: &Diagram) -> Result<()> {
        self.diagrams
            .write()
            .insert(diagram.id.clone(), diagram.clone());
        Ok(())
    }

    fn get(&self, diagram_id: &str) -> Result<Diagram> {
        self.diagrams
            .read()
            .get(diagram_id)
            .cloned()
            .ok_or_else(|| not_found(diagram_id))
    }

    fn update_content(&self, diagram_id: &str, content: &str) -> Result<()> {
        let mut diagrams = self.diagrams.write();
        let diagram = diagrams.get_mut(diagram_id).ok_or_else(|| not_found(diagram_id))?;
        diagram.content = content.to_string();
        Ok(())
    }

    fn rename(&self, diagram_id: &str, name: &str) -> Result<()> {
        let mut diagrams = self.diagrams.write();
        let diagram = diagrams.get_mut(diagram_id).ok_or_else(|| not_found(diagram_id))?;
        diagram.name = name.to_string();
        Ok(())
    }

    fn delete(&self, diagram_id: &str) -> Result<()> {
        self.diagrams.write().remove(diagram_id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<DiagramMetadata>> {
        let mut out: Vec<DiagramMetadata> = self
            .diagrams
            .read()
            .values()
            .map(|d| DiagramMetadata {
                id: d.id.clone(),
                name: d.name.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DiagramFile {
    id: String,
    name: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DomainFile {
    #[serde(flatten)]
    state: DiagramDomainState,
    updated_at: DateTime<Utc>,
}

/// Flat-file store: one JSON document per diagram under `diagrams/`, one per domain state
/// under `domains/`.
#[derive(Debug)]
pub struct FsStore {
    diagrams_dir: PathBuf,
    domains_dir: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let diagrams_dir = root.join("diagrams");
        let domains_dir = root.join("domains");
        for dir in [&diagrams_dir, &domains_dir] {
            std::fs::create_dir_all(dir).map_err(|source| Error::StoreIo {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(Self {
            diagrams_dir,
            domains_dir,
        })
    }

    fn diagram_path(&self, diagram_id: &str) -> PathBuf {
        self.diagrams_dir.join(format!("{diagram_id}.json"))
    }

    fn domain_path(&self, diagram_id: &str) -> PathBuf {
        self.domains_dir.join(format!("{diagram_id}.json"))
    }

    fn read_diagram(&self, diagram_id: &str) -> Result<Option<DiagramFile>> {
        let path = self.diagram_path(diagram_id);
        let Some(raw) = read_optional(&path)? else {
            return Ok(None);
        };
        let file = serde_json::from_str(&raw).map_err(|source| Error::StoreEncoding {
            diagram_id: diagram_id.to_string(),
            source,
        })?;
        Ok(Some(file))
    }

    fn write_diagram(&self, file: &DiagramFile) -> Result<()> {
        let path = self.diagram_path(&file.id);
        let raw = serde_json::to_string_pretty(file).map_err(|source| Error::StoreEncoding {
            diagram_id: file.id.clone(),
            source,
        })?;
        atomic_write(&path, raw.as_bytes())
    }
}

impl DomainStore for FsStore {
    fn load(&self, diagram_id: &str) -> Result<DiagramDomainState> {
        let path = self.domain_path(diagram_id);
        let Some(raw) = read_optional(&path)? else {
            return Ok(DiagramDomainState::empty());
        };

        // A decode failure here means a persisted parent reference no longer passes shape
        // validation: the whole diagram's domain state is corrupt.
        let file: DomainFile =
            serde_json::from_str(&raw).map_err(|err| {
                tracing::error!(diagram = diagram_id, %err, "corrupt domain state");
                Error::Consistency(atoll_core::ConsistencyError {
                    diagram_id: diagram_id.to_string(),
                    message: err.to_string(),
                })
            })?;
        Ok(file.state)
    }

    fn save(&self, diagram_id: &str, state: &DiagramDomainState) -> Result<()> {
        let file = DomainFile {
            state: state.clone(),
            updated_at: Utc::now(),
        };
        let raw = serde_json::to_string_pretty(&file).map_err(|source| Error::StoreEncoding {
            diagram_id: diagram_id.to_string(),
            source,
        })?;
        atomic_write(&self.domain_path(diagram_id), raw.as_bytes())
    }

    fn delete(&self, diagram_id: &str) -> Result<()> {
        remove_if_present(&self.domain_path(diagram_id))
    }
}

impl DocumentStore for FsStore {
    fn create(&self, diagram: &Diagram) -> Result<()> {
        let now = Utc::now();
        self.write_diagram(&DiagramFile {
            id: diagram.id.clone(),
            name: diagram.name.clone(),
            content: diagram.content.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, diagram_id: &str) -> Result<Diagram> {
        let file = self
            .read_diagram(diagram_id)?
            .ok_or_else(|| not_found(diagram_id))?;
        Ok(Diagram {
            id: file.id,
            name: file.name,
            content: file.content,
        })
    }

    fn update_content(&self, diagram_id: &str, content: &str) -> Result<()> {
        let mut file = self
            .read_diagram(diagram_id)?
            .ok_or_else(|| not_found(diagram_id))?;
        file.content = content.to_string();
        file.updated_at = Utc::now();
        self.write_diagram(&file)
    }

    fn rename(&self, diagram_id: &str, name: &str) -> Result<()> {
        let mut file = self
            .read_diagram(diagram_id)?
            .ok_or_else(|| not_found(diagram_id))?;
        file.name = name.to_string();
        file.updated_at = Utc::now();
        self.write_diagram(&file)
    }

    fn delete(&self, diagram_id: &str) -> Result<()> {
        remove_if_present(&self.diagram_path(diagram_id))
    }

    fn list(&self) -> Result<Vec<DiagramMetadata>> {
        let entries = std::fs::read_dir(&self.diagrams_dir).map_err(|source| Error::StoreIo {
            path: self.diagrams_dir.display().to_string(),
            source,
        })?;

        let mut out: Vec<DiagramMetadata> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::StoreIo {
                path: self.diagrams_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(file) = self.read_diagram(stem)? {
                out.push(DiagramMetadata {
                    id: file.id,
                    name: file.name,
                });
            }
        }

        out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(out)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::StoreIo {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::StoreIo {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Write-to-temp-then-rename so a save is atomic from the caller's view.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let io_err = |source: std::io::Error| Error::StoreIo {
        path: path.display().to_string(),
        source,
    };

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("store");
    let tmp = dir.join(format!(
        ".{base}.{}.{}.tmp",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ));

    std::fs::write(&tmp, data).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)
}
