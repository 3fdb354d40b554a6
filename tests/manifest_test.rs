use cgmath::{InnerSpace, Vector3};
use helipad_scene::{
    data_structures::{instance::Instance, scene_graph::ShadowFlags},
    scene::{AssetManifest, AssetRole},
};

use crate::common::EPS;

mod common;

#[test]
fn every_builtin_asset_is_a_model_under_models() {
    let manifest = AssetManifest::builtin().unwrap();
    for entry in &manifest.assets {
        assert!(entry.path.starts_with("/models/"), "{}", entry.path);
        assert!(entry.path.ends_with(".glb"), "{}", entry.path);
    }
}

#[test]
fn sky_receives_and_props_cast() {
    let manifest = AssetManifest::builtin().unwrap();
    for entry in &manifest.assets {
        let expected = match entry.role {
            AssetRole::Sky => ShadowFlags {
                cast: false,
                receive: true,
            },
            AssetRole::Car | AssetRole::Prop => ShadowFlags {
                cast: true,
                receive: false,
            },
        };
        assert_eq!(entry.shadow(), expected, "{}", entry.path);
    }
}

#[test]
fn soldier_placement_turns_them_a_quarter() {
    let manifest = AssetManifest::builtin().unwrap();
    let soldier = manifest
        .assets
        .iter()
        .find(|entry| entry.role == AssetRole::Prop)
        .unwrap();
    let transform = soldier.transform();

    assert!((transform.position - Vector3::new(-4.0, -15.6, -12.0)).magnitude() < EPS);
    assert_eq!(transform.scale, Vector3::new(4.0, 4.0, 4.0));
    // A negative quarter turn about +Y takes +X to +Z.
    let turned = transform.rotation * Vector3::unit_x();
    assert!((turned - Vector3::unit_z()).magnitude() < EPS);
}

#[test]
fn placement_composes_with_model_transform() {
    let manifest = AssetManifest::builtin().unwrap();
    let car = manifest.car().unwrap();
    let model_local = Instance {
        position: Vector3::new(100.0, 0.0, 0.0),
        ..Default::default()
    };
    let world = &car.transform() * &model_local;
    // Centimetre scale shrinks the model's own offset to a metre.
    assert!((world.position - Vector3::new(-8.0, -2.0, 2.0)).magnitude() < EPS);
}

#[test]
fn manifest_errors_carry_context() {
    let err = AssetManifest::parse("[[asset]]\npath = 3\n").unwrap_err();
    assert!(format!("{err:#}").contains("asset manifest"));
}
