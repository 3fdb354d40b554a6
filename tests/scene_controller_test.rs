use std::f32::consts::{PI, TAU};

use cgmath::{Deg, InnerSpace, Point3, Rad, Vector2};
use helipad_scene::{
    camera::{Camera, OrbitController, Projection, Viewport},
    context::apply_viewport,
    scene::{
        CameraDirective, CameraMode, SceneController,
        controller::{POINTER_OFF_SCREEN, apply_camera_directive},
    },
};
use winit::dpi::PhysicalPosition;

use crate::common::{EPS, config, parked_car, surface_config};

mod common;

#[test]
fn car_stays_on_its_circle() {
    let mut controller = SceneController::default();
    let mut car = parked_car();
    let height = car.position.y;

    for step in 0..2000 {
        let t = step as f32 * 0.037;
        controller.tick_at(t, Some(&mut car));
        let dx = car.position.x + 10.0;
        let dz = car.position.z - 4.0;
        assert!((dx * dx + dz * dz - 36.0).abs() < 1e-3, "off the circle at t={t}");
        assert_eq!(car.position.y, height);
    }
}

#[test]
fn car_yaw_stays_in_one_turn() {
    let mut controller = SceneController::default();
    let mut car = parked_car();

    for step in 0..2000 {
        let t = step as f32 * 0.25;
        controller.tick_at(t, Some(&mut car));
        let yaw = car.rotation.y.0;
        assert!((0.0..TAU).contains(&yaw), "yaw {yaw} at t={t}");
        let expected = (0.2 * t).rem_euclid(TAU);
        assert!((yaw - expected).abs() < 1e-3);
    }
}

#[test]
fn leaving_follow_mode_returns_camera_to_default() {
    let config = config();
    let mut controller = SceneController::new(&config);
    let mut orbit = OrbitController::new(&config.camera);
    let mut camera = Camera::new(config.camera.default_position);
    let mut car = parked_car();

    controller.set_camera_mode(CameraMode::Follow);
    for step in 0..50 {
        let directive = controller.tick_at(step as f32 * 0.1, Some(&mut car));
        apply_camera_directive(directive, &mut camera, &mut orbit);
    }
    assert_ne!(camera.position, Point3::new(5.0, 3.0, 0.0));

    // Input gathered while following must not leak into the reset.
    orbit.handle_mouse(300.0, -120.0);
    orbit.handle_scroll(4.0);

    controller.set_camera_mode(CameraMode::Free);
    let directive = controller.tick_at(5.0, Some(&mut car));
    apply_camera_directive(directive, &mut camera, &mut orbit);
    assert_eq!(camera.position, Point3::new(5.0, 3.0, 0.0));

    // The next frames orbit from there without drifting.
    let directive = controller.tick_at(5.1, Some(&mut car));
    assert_eq!(directive, CameraDirective::Orbit);
    apply_camera_directive(directive, &mut camera, &mut orbit);
    assert_eq!(camera.position, Point3::new(5.0, 3.0, 0.0));
}

#[test]
fn resize_sets_aspect_and_surface_size() {
    let mut controller = SceneController::default();
    let mut surface = surface_config(640, 480);
    let mut projection = Projection::new(640, 480, Deg(70.0), 0.1, 100.0);

    for (w, h) in [(1920, 1080), (800, 600), (333, 999)] {
        let viewport = Viewport::new(w, h);
        assert!(apply_viewport(&mut surface, &mut projection, viewport));
        assert!(controller.on_resize(viewport));
        assert_eq!((surface.width, surface.height), (w, h));
        assert!((projection.aspect() - w as f32 / h as f32).abs() < EPS);
        assert_eq!(controller.viewport(), viewport);
    }
}

#[test]
fn pointer_corners_map_to_ndc_corners() {
    let mut controller = SceneController::default();
    assert_eq!(controller.pointer(), POINTER_OFF_SCREEN);

    controller.on_resize(Viewport::new(1920, 1080));
    controller.on_pointer_move(PhysicalPosition::new(0.0, 0.0));
    assert_eq!(controller.pointer(), Vector2::new(-1.0, 1.0));
    controller.on_pointer_move(PhysicalPosition::new(1920.0, 1080.0));
    assert_eq!(controller.pointer(), Vector2::new(1.0, -1.0));
}

#[test]
fn full_hd_scene_after_pi_seconds() {
    let config = config();
    let mut controller = SceneController::new(&config);
    let mut surface = surface_config(1, 1);
    let mut projection = Projection::new(
        1,
        1,
        Deg(config.camera.fovy),
        config.camera.znear,
        config.camera.zfar,
    );
    let viewport = Viewport::new(1920, 1080);
    apply_viewport(&mut surface, &mut projection, viewport);
    controller.on_resize(viewport);
    assert!((projection.aspect() - 1.778).abs() < 1e-3);

    let mut car = parked_car();
    let height = car.position.y;
    controller.tick_at(PI, Some(&mut car));
    assert!((car.position.x + 10.0).abs() < EPS);
    assert_eq!(car.position.y, height);
    assert!((car.position.z + 2.0).abs() < EPS);
    assert!((car.rotation.y.0 - 0.628).abs() < 1e-3);
}

#[test]
fn loop_runs_without_the_car() {
    let config = config();
    let mut controller = SceneController::new(&config);
    let mut orbit = OrbitController::new(&config.camera);
    let mut camera = Camera::new(config.camera.default_position);

    for step in 0..10_000 {
        let t = step as f32 / 60.0;
        if step == 5_000 {
            controller.toggle_camera_mode();
        }
        let directive = controller.tick_at(t, None);
        assert!(!matches!(directive, CameraDirective::Chase { .. }));
        apply_camera_directive(directive, &mut camera, &mut orbit);
    }
    assert_eq!(controller.camera_mode(), CameraMode::Follow);
    assert_eq!(camera.position, config.camera.default_position);
}

#[test]
fn follow_picks_up_the_car_when_it_arrives() {
    let mut controller = SceneController::default();
    controller.set_camera_mode(CameraMode::Follow);
    for step in 0..120 {
        let directive = controller.tick_at(step as f32 / 60.0, None);
        assert_eq!(directive, CameraDirective::Hold);
    }

    let mut car = parked_car();
    let height = car.position.y;
    let t: f32 = 2.5;
    let directive = controller.tick_at(t, Some(&mut car));

    let on_circle = Point3::new(6.0 * t.sin() - 10.0, height, 6.0 * t.cos() + 4.0);
    let expected = Point3::new(on_circle.x, on_circle.y + 2.0, on_circle.z + 4.0);
    match directive {
        CameraDirective::Chase { position, rotation } => {
            assert!((position - expected).magnitude() < EPS, "camera at {position:?}");
            assert_eq!(rotation.x, car.rotation.x);
            assert_eq!(rotation.y, car.rotation.z);
            assert_eq!(rotation.z, Rad(0.0));
        }
        other => panic!("expected a chase camera, got {other:?}"),
    }
}
