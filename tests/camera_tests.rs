use glam::Vec3;
use tumbler_preview::camera::{OrbitControls, PerspectiveCamera};
use tumbler_preview::config::{CameraConfig, ControlsConfig};

fn rig(controls: ControlsConfig) -> (PerspectiveCamera, OrbitControls) {
    let controls = OrbitControls::new(&controls);
    let mut camera = PerspectiveCamera::new(&CameraConfig::default(), 1.6);
    camera.target = controls.target;
    (camera, controls)
}

fn distance(camera: &PerspectiveCamera, controls: &OrbitControls) -> f32 {
    (camera.position - controls.target).length()
}

#[test]
fn viewport_changes_update_aspect() {
    let mut camera = PerspectiveCamera::new(&CameraConfig::default(), 1.0);
    camera.set_viewport(800, 400);
    assert_eq!(camera.aspect(), 2.0);
    camera.set_viewport(0, 400);
    assert_eq!(camera.aspect(), 2.0, "zero width is ignored");
}

#[test]
fn non_positive_aspect_falls_back_to_square() {
    let camera = PerspectiveCamera::new(&CameraConfig::default(), 0.0);
    assert_eq!(camera.aspect(), 1.0);
}

#[test]
fn zoom_is_clamped_to_distance_range() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    controls.zoom(-1000.0);
    controls.update(&mut camera, 0.016);
    assert!((distance(&camera, &controls) - 20.0).abs() < 1e-3);

    controls.zoom(1000.0);
    controls.update(&mut camera, 0.016);
    assert!((distance(&camera, &controls) - 1.0).abs() < 1e-3);
}

#[test]
fn idle_camera_orbits_on_its_own() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    assert!(controls.is_idle());
    let start = camera.position;
    let radius = distance(&camera, &controls);

    for _ in 0..60 {
        controls.update(&mut camera, 1.0 / 60.0);
    }
    assert!((camera.position - start).length() > 1e-3);
    assert!((distance(&camera, &controls) - radius).abs() < 1e-3);
    assert!((camera.position.y - start.y).abs() < 1e-3, "orbit is horizontal");
}

#[test]
fn disabled_auto_rotate_keeps_camera_still() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        auto_rotate: false,
        ..ControlsConfig::default()
    });
    let start = camera.position;
    for _ in 0..30 {
        controls.update(&mut camera, 0.1);
    }
    assert!((camera.position - start).length() < 1e-5);
}

#[test]
fn drag_pauses_idle_rotation_until_delay_passes() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    controls.drag(10.0, 0.0, 800.0);
    assert!(!controls.is_idle());
    controls.update(&mut camera, 1.0);
    assert!(!controls.is_idle());
    controls.update(&mut camera, 2.5);
    assert!(controls.is_idle());
}

#[test]
fn damping_spreads_a_drag_over_frames() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        auto_rotate: false,
        ..ControlsConfig::default()
    });
    controls.drag(100.0, 0.0, 800.0);
    controls.update(&mut camera, 0.016);
    let after_first = camera.position;
    controls.update(&mut camera, 0.016);
    assert!((camera.position - after_first).length() > 1e-4);
}

#[test]
fn polar_angle_never_flips_over_the_pole() {
    let (mut camera, mut controls) = rig(ControlsConfig {
        damping: 0.0,
        auto_rotate: false,
        ..ControlsConfig::default()
    });
    controls.rotate_up(10.0);
    controls.update(&mut camera, 0.016);
    let offset = camera.position - controls.target;
    assert!(offset.y > 0.0);
    assert!(camera.view().is_finite());
}

#[test]
fn camera_looks_at_the_orbit_target() {
    let (mut camera, mut controls) = rig(ControlsConfig::default());
    controls.update(&mut camera, 0.0);
    assert_eq!(camera.target, Vec3::new(0.0, 1.0, 0.0));
    let clip = camera.view_proj() * camera.target.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
}
