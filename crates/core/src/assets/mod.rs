use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AvatarModel, MorphMesh, Result};

/// Describes a single mesh and the morph targets it exposes, in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshAsset {
    pub name: String,
    #[serde(default)]
    pub morph_targets: Vec<String>,
}

/// Descriptor for the avatar asset loaded once before the render loop
/// starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AvatarAsset {
    #[serde(default)]
    pub name: String,
    pub meshes: Vec<MeshAsset>,
}

impl AvatarAsset {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the runtime scene graph, assigning morph indices.
    pub fn instantiate(&self) -> Result<AvatarModel> {
        let meshes = self
            .meshes
            .iter()
            .map(|mesh| MorphMesh::new(mesh.name.clone(), &mesh.morph_targets))
            .collect::<Result<Vec<_>>>()?;

        for mesh in &meshes {
            tracing::debug!(mesh = mesh.name(), targets = mesh.influences().len(), "morph targets");
        }
        Ok(AvatarModel::new(self.name.clone(), meshes))
    }
}

/// Loads avatar descriptors from disk.
#[derive(Debug, Default)]
pub struct AssetStore;

impl AssetStore {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<AvatarAsset> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let asset = AvatarAsset::from_json(&text)?;
        tracing::info!(path = %path.display(), meshes = asset.meshes.len(), "loaded avatar asset");
        Ok(asset)
    }

    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<AvatarModel> {
        self.load(path)?.instantiate()
    }
}
