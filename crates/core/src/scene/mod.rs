use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{AvatarError, Pose, Result};

/// A mesh with named morph targets. The name → index mapping is fixed when
/// the mesh is built.
#[derive(Debug, Clone)]
pub struct MorphMesh {
    name: String,
    dictionary: HashMap<String, usize>,
    influences: Vec<f32>,
}

impl MorphMesh {
    /// Builds a mesh whose morph targets all start at weight 0. Duplicate
    /// target names are rejected.
    pub fn new(name: impl Into<String>, targets: &[String]) -> Result<Self> {
        let name = name.into();
        let mut dictionary = HashMap::with_capacity(targets.len());
        for (index, target) in targets.iter().enumerate() {
            if dictionary.insert(target.clone(), index).is_some() {
                return Err(AvatarError::msg(format!(
                    "mesh `{name}` declares morph target `{target}` twice"
                )));
            }
        }
        Ok(Self {
            name,
            dictionary,
            influences: vec![0.0; targets.len()],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_of(&self, target: &str) -> Option<usize> {
        self.dictionary.get(target).copied()
    }

    pub fn has_target(&self, target: &str) -> bool {
        self.dictionary.contains_key(target)
    }

    pub fn weight(&self, target: &str) -> Option<f32> {
        self.index_of(target).map(|index| self.influences[index])
    }

    /// Sets a weight clamped to `[0, 1]`. Unknown targets are ignored and
    /// reported as `false`.
    pub fn set_weight(&mut self, target: &str, weight: f32) -> bool {
        match self.index_of(target) {
            Some(index) => {
                self.influences[index] = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    pub fn influences(&self) -> &[f32] {
        &self.influences
    }

    /// Current weights keyed by target name.
    pub fn weights(&self) -> HashMap<String, f32> {
        self.dictionary
            .iter()
            .map(|(name, &index)| (name.clone(), self.influences[index]))
            .collect()
    }
}

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Resolved position of a mesh inside the [`AvatarModel`] that issued it.
/// Handles from another model are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshHandle {
    model: u64,
    index: usize,
}

/// The avatar's scene graph: one transform and its meshes.
#[derive(Debug, Clone)]
pub struct AvatarModel {
    pub name: String,
    pub rotation: Vec3,
    id: u64,
    meshes: Vec<MorphMesh>,
}

impl AvatarModel {
    pub fn new(name: impl Into<String>, meshes: Vec<MorphMesh>) -> Self {
        Self {
            name: name.into(),
            rotation: Vec3::ZERO,
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            meshes,
        }
    }

    pub fn meshes(&self) -> &[MorphMesh] {
        &self.meshes
    }

    /// Looks a mesh up by name. Absence is an error so a misconfigured
    /// asset is caught at load instead of animating the wrong mesh.
    pub fn resolve_mesh(&self, name: &str) -> Result<MeshHandle> {
        self.meshes
            .iter()
            .position(|mesh| mesh.name == name)
            .map(|index| MeshHandle {
                model: self.id,
                index,
            })
            .ok_or_else(|| AvatarError::MissingMesh(name.to_string()))
    }

    pub fn mesh(&self, handle: MeshHandle) -> Result<&MorphMesh> {
        if handle.model != self.id {
            return Err(foreign_handle());
        }
        self.meshes.get(handle.index).ok_or_else(foreign_handle)
    }

    pub fn mesh_mut(&mut self, handle: MeshHandle) -> Result<&mut MorphMesh> {
        if handle.model != self.id {
            return Err(foreign_handle());
        }
        self.meshes.get_mut(handle.index).ok_or_else(foreign_handle)
    }

    /// Writes a pose into the scene. Channels the mesh lacks are skipped.
    /// Nothing is written when `handle` belongs to another model.
    pub fn apply_pose(&mut self, handle: MeshHandle, pose: &Pose) -> Result<()> {
        let mesh = self.mesh_mut(handle)?;
        for update in &pose.weights {
            mesh.set_weight(&update.target, update.value);
        }
        self.rotation = pose.rotation;
        Ok(())
    }

    pub fn snapshot(&self, handle: MeshHandle) -> Result<SceneSnapshot> {
        Ok(SceneSnapshot {
            rotation: self.rotation,
            weights: self.mesh(handle)?.weights(),
        })
    }
}

fn foreign_handle() -> AvatarError {
    AvatarError::InvalidInput("mesh handle does not belong to this model")
}

/// Copy of the state that a draw call consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub rotation: Vec3,
    pub weights: HashMap<String, f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightUpdate;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn rejects_duplicate_targets() {
        let err = MorphMesh::new("Face", &targets(&["smile", "smile"])).unwrap_err();
        assert!(format!("{err}").contains("smile"));
    }

    #[test]
    fn clamps_and_skips_unknown_weights() {
        let mut mesh = MorphMesh::new("Face", &targets(&["blink", "smile"])).unwrap();
        assert!(mesh.set_weight("smile", 1.5));
        assert!(!mesh.set_weight("mouthOpen", 0.5));

        assert_eq!(mesh.weight("smile"), Some(1.0));
        assert_eq!(mesh.weight("mouthOpen"), None);
        assert_eq!(mesh.influences(), &[0.0, 1.0]);
    }

    #[test]
    fn resolves_face_mesh_by_name() {
        let body = MorphMesh::new("Body", &[]).unwrap();
        let face = MorphMesh::new("Face", &targets(&["blink"])).unwrap();
        let model = AvatarModel::new("avatar", vec![body, face]);

        let handle = model.resolve_mesh("Face").unwrap();
        assert_eq!(model.mesh(handle).unwrap().name(), "Face");
        assert!(matches!(
            model.resolve_mesh("Head"),
            Err(AvatarError::MissingMesh(name)) if name == "Head"
        ));
    }

    #[test]
    fn rejects_handles_from_other_models() {
        let face = || MorphMesh::new("Face", &targets(&["blink"])).unwrap();
        let mut first = AvatarModel::new("first", vec![face()]);
        let second = AvatarModel::new("second", vec![MorphMesh::new("Body", &[]).unwrap(), face()]);
        let foreign = second.resolve_mesh("Face").unwrap();

        assert!(matches!(first.mesh(foreign), Err(AvatarError::InvalidInput(_))));
        assert!(first.snapshot(foreign).is_err());

        let pose = Pose {
            rotation: Vec3::ONE,
            weights: vec![WeightUpdate::new("blink", 1.0)],
        };
        assert!(first.apply_pose(foreign, &pose).is_err());
        assert_eq!(first.rotation, Vec3::ZERO);

        let own = first.resolve_mesh("Face").unwrap();
        assert_eq!(first.mesh(own).unwrap().weight("blink"), Some(0.0));
    }

    #[test]
    fn applies_pose_to_transform_and_weights() {
        let face = MorphMesh::new("Face", &targets(&["blink"])).unwrap();
        let mut model = AvatarModel::new("avatar", vec![face]);
        let handle = model.resolve_mesh("Face").unwrap();

        let pose = Pose {
            rotation: Vec3::new(0.01, 0.02, 0.03),
            weights: vec![
                WeightUpdate::new("blink", 1.0),
                WeightUpdate::new("mouthOpen", 0.4),
            ],
        };
        model.apply_pose(handle, &pose).unwrap();

        let snapshot = model.snapshot(handle).unwrap();
        assert_eq!(snapshot.rotation, Vec3::new(0.01, 0.02, 0.03));
        assert_eq!(snapshot.weights.get("blink"), Some(&1.0));
        assert_eq!(snapshot.weights.len(), 1);
    }
}
