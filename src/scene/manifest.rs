//! The declarative list of models the scene loads at startup.
//!
//! The manifest ships inside the binary (`assets/scene.toml`) and is
//! validated before any load is issued.

use anyhow::{Context as _, bail};
use cgmath::{Rad, Vector3};
use serde::Deserialize;

use crate::{
    data_structures::{instance::Instance, scene_graph::ShadowFlags},
    scene::controller::TrackedObject,
};

const BUILTIN: &str = include_str!("../../assets/scene.toml");

/// What the scene does with a model once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    Sky,
    /// Animated along the car path and tracked by the follow camera.
    Car,
    Prop,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetEntry {
    pub path: String,
    pub role: AssetRole,
    /// Uniform scale.
    pub scale: f32,
    #[serde(default)]
    pub position: [f32; 3],
    /// Rotation about +Y in radians.
    #[serde(default)]
    pub rotation_y: f32,
    #[serde(default)]
    pub cast_shadow: bool,
    #[serde(default)]
    pub receive_shadow: bool,
}

impl AssetEntry {
    /// The one-time placement of the model, as an animatable pose.
    pub fn tracked_object(&self) -> TrackedObject {
        TrackedObject::new(Vector3::from(self.position), Rad(self.rotation_y), self.scale)
    }

    pub fn transform(&self) -> Instance {
        self.tracked_object().to_instance()
    }

    pub fn shadow(&self) -> ShadowFlags {
        ShadowFlags {
            cast: self.cast_shadow,
            receive: self.receive_shadow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetManifest {
    #[serde(rename = "asset", default)]
    pub assets: Vec<AssetEntry>,
}

impl AssetManifest {
    /// Parses and validates a manifest.
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(source).context("parsing the asset manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// The manifest compiled into the crate.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::parse(BUILTIN)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (idx, entry) in self.assets.iter().enumerate() {
            if entry.path.trim().is_empty() {
                bail!("asset #{idx} has an empty path");
            }
            if !entry.scale.is_finite() || entry.scale <= 0.0 {
                bail!("asset {} has invalid scale {}", entry.path, entry.scale);
            }
        }
        let cars = self
            .assets
            .iter()
            .filter(|entry| entry.role == AssetRole::Car)
            .count();
        if cars > 1 {
            bail!("the manifest declares {cars} cars, at most one is supported");
        }
        Ok(())
    }

    pub fn car(&self) -> Option<&AssetEntry> {
        self.assets.iter().find(|entry| entry.role == AssetRole::Car)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn builtin_manifest_lists_the_scene() {
        let manifest = AssetManifest::builtin().unwrap();
        assert_eq!(manifest.assets.len(), 4);

        let sky = &manifest.assets[0];
        assert_eq!(sky.role, AssetRole::Sky);
        assert_eq!(sky.scale, 4.0);
        assert_eq!(sky.position, [0.0, 0.0, 0.0]);
        assert_eq!(sky.shadow(), ShadowFlags { cast: false, receive: true });

        let car = manifest.car().unwrap();
        assert_eq!(car.path, "/models/fallout_car.glb");
        assert_eq!(car.scale, 0.01);
        assert_eq!(car.position, [-9.0, -2.0, 2.0]);
        assert_eq!(car.shadow(), ShadowFlags { cast: true, receive: false });

        let soldiers: Vec<_> = manifest
            .assets
            .iter()
            .filter(|entry| entry.role == AssetRole::Prop)
            .collect();
        assert_eq!(soldiers.len(), 2);
        for soldier in soldiers {
            assert_eq!(soldier.path, "/models/polish_soldier.glb");
            assert!((soldier.rotation_y + FRAC_PI_2).abs() < 1e-6);
            assert!(soldier.cast_shadow);
        }
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let manifest = AssetManifest::parse(
            r#"
            [[asset]]
            path = "/models/box.glb"
            role = "prop"
            scale = 1.0
            "#,
        )
        .unwrap();
        let entry = &manifest.assets[0];
        assert_eq!(entry.position, [0.0; 3]);
        assert_eq!(entry.rotation_y, 0.0);
        assert_eq!(entry.shadow(), ShadowFlags::default());
        assert_eq!(entry.transform(), Instance::new());
    }

    #[test]
    fn rejects_bad_scale() {
        for scale in ["0.0", "-1.0", "nan", "inf"] {
            let source = format!(
                "[[asset]]\npath = \"/models/a.glb\"\nrole = \"prop\"\nscale = {scale}\n"
            );
            assert!(AssetManifest::parse(&source).is_err(), "scale {scale} accepted");
        }
    }

    #[test]
    fn rejects_second_car() {
        let source = r#"
            [[asset]]
            path = "/models/a.glb"
            role = "car"
            scale = 1.0

            [[asset]]
            path = "/models/b.glb"
            role = "car"
            scale = 1.0
        "#;
        let err = AssetManifest::parse(source).unwrap_err();
        assert!(err.to_string().contains("2 cars"));
    }

    #[test]
    fn rejects_empty_path_and_unknown_role() {
        assert!(AssetManifest::parse("[[asset]]\npath = \"\"\nrole = \"sky\"\nscale = 1.0\n").is_err());
        assert!(
            AssetManifest::parse("[[asset]]\npath = \"/a.glb\"\nrole = \"boat\"\nscale = 1.0\n")
                .is_err()
        );
    }
}
