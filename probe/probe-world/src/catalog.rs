//! Asset catalogs.
//!
//! The catalog is constructed explicitly and passed to whoever assembles
//! scenes; there is no process-wide registry. [`ManifestCatalog`] loads asset
//! descriptions from a JSON manifest or falls back to a small built-in set of
//! primitive assets.
//!
//! # Manifest format
//!
//! ```json
//! {
//!   "assets": [
//!     { "id": "ball_small", "class": "small",
//!       "shape": { "type": "sphere", "radius": 0.08 }, "mass": 0.3 },
//!     { "id": "table_wide", "class": "table",
//!       "shape": { "type": "cuboid", "half_extents": [0.8, 0.5, 0.04] } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use probe_types::{ProbeError, Result, Shape, Vector3};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SceneObject;

/// Coarse size class used when picking assets for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Objects that fit in a hand; test objects and clutter.
    Small,
    /// Objects large enough to hide a small one.
    Big,
    /// Support surfaces.
    Table,
}

/// Physical description of one asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Catalog identifier.
    pub id: String,
    /// Size class.
    pub class: AssetClass,
    /// Geometry at unit scale.
    pub shape: Shape,
    /// Mass (kg).
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Coulomb friction coefficient.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Coefficient of restitution.
    #[serde(default = "default_restitution")]
    pub restitution: f64,
}

fn default_mass() -> f64 {
    1.0
}

fn default_friction() -> f64 {
    0.5
}

fn default_restitution() -> f64 {
    0.5
}

impl AssetSpec {
    /// Create a spec with default material parameters.
    #[must_use]
    pub fn new(id: impl Into<String>, class: AssetClass, shape: Shape) -> Self {
        Self {
            id: id.into(),
            class,
            shape,
            mass: default_mass(),
            friction: default_friction(),
            restitution: default_restitution(),
        }
    }

    /// Set the mass.
    #[must_use]
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }
}

/// Source of scene objects.
pub trait AssetCatalog {
    /// Instantiate `asset_id` as an object named `name`.
    ///
    /// The returned object's bounds are available immediately, before it is
    /// placed in a scene.
    fn create(&self, asset_id: &str, name: &str) -> Result<SceneObject>;

    /// Identifiers of all assets in `class`, in a stable order.
    fn asset_ids(&self, class: AssetClass) -> Vec<String>;
}

#[derive(Debug, Deserialize)]
struct Manifest {
    assets: Vec<AssetSpec>,
}

/// Catalog backed by a list of [`AssetSpec`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestCatalog {
    assets: BTreeMap<String, AssetSpec>,
}

impl ManifestCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitive assets covering every class.
    #[must_use]
    pub fn builtin() -> Self {
        let specs = [
            AssetSpec::new("ball_small", AssetClass::Small, Shape::sphere(0.08)).with_mass(0.3),
            AssetSpec::new("ball_medium", AssetClass::Small, Shape::sphere(0.12)).with_mass(0.6),
            AssetSpec::new("cube_small", AssetClass::Small, Shape::cuboid(Vector3::repeat(0.06)))
                .with_mass(0.4),
            AssetSpec::new(
                "crate_big",
                AssetClass::Big,
                Shape::cuboid(Vector3::new(0.22, 0.22, 0.3)),
            )
            .with_mass(4.0),
            AssetSpec::new("ball_big", AssetClass::Big, Shape::sphere(0.28)).with_mass(3.0),
            AssetSpec::new(
                "table_wide",
                AssetClass::Table,
                Shape::cuboid(Vector3::new(0.8, 0.5, 0.04)),
            )
            .with_mass(20.0),
            AssetSpec::new(
                "table_narrow",
                AssetClass::Table,
                Shape::cuboid(Vector3::new(0.5, 0.4, 0.04)),
            )
            .with_mass(15.0),
        ];
        specs.into_iter().fold(Self::new(), Self::with_asset)
    }

    /// Add or replace an asset.
    #[must_use]
    pub fn with_asset(mut self, spec: AssetSpec) -> Self {
        self.assets.insert(spec.id.clone(), spec);
        self
    }

    /// Parse a JSON manifest.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(json).map_err(|e| ProbeError::serialization(e.to_string()))?;
        let mut catalog = Self::new();
        for spec in manifest.assets {
            if !spec.shape.is_valid() {
                return Err(ProbeError::asset(spec.id, "invalid shape dimensions"));
            }
            catalog = catalog.with_asset(spec);
        }
        Ok(catalog)
    }

    /// Load a JSON manifest from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), assets = catalog.len(), "loaded asset manifest");
        Ok(catalog)
    }

    /// Spec for `asset_id`.
    #[must_use]
    pub fn spec(&self, asset_id: &str) -> Option<&AssetSpec> {
        self.assets.get(asset_id)
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetCatalog for ManifestCatalog {
    fn create(&self, asset_id: &str, name: &str) -> Result<SceneObject> {
        let spec = self
            .assets
            .get(asset_id)
            .ok_or_else(|| ProbeError::asset(asset_id, "not in catalog"))?;
        Ok(SceneObject::new(name, asset_id, spec.shape)
            .with_mass(spec.mass)
            .with_friction(spec.friction)
            .with_restitution(spec.restitution))
    }

    fn asset_ids(&self, class: AssetClass) -> Vec<String> {
        self.assets
            .values()
            .filter(|s| s.class == class)
            .map(|s| s.id.clone())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_covers_every_class() {
        let catalog = ManifestCatalog::builtin();
        for class in [AssetClass::Small, AssetClass::Big, AssetClass::Table] {
            assert!(!catalog.asset_ids(class).is_empty(), "{class:?}");
        }
    }

    #[test]
    fn test_create_copies_material() {
        let catalog = ManifestCatalog::builtin();
        let obj = catalog.create("crate_big", "crate").unwrap();
        assert_eq!(obj.mass, 4.0);
        assert_eq!(obj.asset_id, "crate_big");
        assert!(obj.local_aabb().height() > 0.5);
    }

    #[test]
    fn test_unknown_asset_is_resource_failure() {
        let err = ManifestCatalog::builtin().create("piano", "p").unwrap_err();
        assert!(err.is_resource_failure());
    }

    #[test]
    fn test_manifest_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"assets": [
                {{"id": "mug", "class": "small", "shape": {{"type": "sphere", "radius": 0.05}}}},
                {{"id": "desk", "class": "table",
                  "shape": {{"type": "cuboid", "half_extents": [0.7, 0.4, 0.03]}}, "mass": 25.0}}
            ]}}"#
        )
        .unwrap();
        let catalog = ManifestCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.asset_ids(AssetClass::Table), vec!["desk".to_string()]);
        assert_eq!(catalog.spec("mug").unwrap().friction, 0.5);
    }

    #[test]
    fn test_manifest_rejects_bad_shape() {
        let json = r#"{"assets": [{"id": "flat", "class": "big",
            "shape": {"type": "sphere", "radius": 0.0}}]}"#;
        assert!(matches!(
            ManifestCatalog::from_json(json),
            Err(ProbeError::Asset { .. })
        ));
        assert!(matches!(
            ManifestCatalog::from_json("not json"),
            Err(ProbeError::Serialization(_))
        ));
    }
}
