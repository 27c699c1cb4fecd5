//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use scenecache::prelude::*;

/// Route library logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn translate(x: f64) -> DMat4 {
    DMat4::from_translation(DVec3::new(x, 0.0, 0.0))
}

pub fn bbox(min: [f64; 3], max: [f64; 3]) -> Box3d {
    Box3d::new(DVec3::from_array(min), DVec3::from_array(max))
}

pub fn assert_bound(actual: Box3d, expected: Box3d) {
    assert!(
        actual.approx_eq(&expected, 1e-5),
        "bound {:?} != {:?}",
        actual,
        expected
    );
}

fn corners(min: [f64; 3], max: [f64; 3]) -> SceneObject {
    SceneObject::points(vec![DVec3::from_array(min), DVec3::from_array(max)])
}

/// Two animated point clouds.
///
/// `A` moves along X (transform samples at 0 and 1) and grows at time 2;
/// `B` stays put and grows every frame. The root ends up with four bound
/// samples at times 0..=3.
pub fn write_animated_spheres(path: &Path) {
    let root = SceneCache::open(path, OpenMode::WRITE).expect("Failed to create scene");

    let a = root.create_child("A").unwrap();
    a.write_transform(&translate(1.0), 0.0).unwrap();
    a.write_transform(&translate(2.0), 1.0).unwrap();
    a.write_object(&corners([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]), 0.0).unwrap();
    a.write_object(&corners([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]), 1.0).unwrap();
    a.write_object(&corners([0.0, -1.0, -1.0], [2.0, 1.0, 1.0]), 2.0).unwrap();
    a.write_attribute("user:speed", &Value::Double(1.0), 0.0).unwrap();
    a.write_attribute("user:speed", &Value::Double(2.0), 1.0).unwrap();
    a.write_tags(&["moving"]).unwrap();

    let b = root.create_child("B").unwrap();
    b.write_object(&corners([-1.0, -1.0, -1.0], [0.0, 2.0, 1.0]), 0.0).unwrap();
    b.write_object(&corners([-1.0, -1.0, -1.0], [0.0, 3.0, 1.0]), 1.0).unwrap();
    b.write_object(&corners([-2.0, -1.0, -2.0], [0.0, 5.0, 2.0]), 2.0).unwrap();
    b.write_object(&corners([-3.0, -1.0, -3.0], [0.0, 6.0, 3.0]), 3.0).unwrap();
    b.write_attribute("user:label", &Value::from("static"), 0.0).unwrap();

    drop((a, b));
    root.close().expect("Failed to close scene");
}

/// Overlay with three instances of `spheres` plus plain branches.
pub fn write_instanced_spheres(path: &Path, spheres: &Path) {
    let m = SceneCache::open(spheres, OpenMode::READ).expect("Failed to open spheres");
    let a = m.child("A").unwrap();

    let l = LinkedScene::open(path, OpenMode::WRITE).expect("Failed to create overlay");
    let i0 = l.create_child("instance0").unwrap();
    i0.write_link(&m).unwrap();
    let i1 = l.create_child("instance1").unwrap();
    i1.write_link(&m).unwrap();
    i1.write_attribute("testAttr", &Value::from("test"), 0.0).unwrap();
    i1.write_transform(&translate(1.0), 0.0).unwrap();
    let i2 = l.create_child("instance2").unwrap();
    i2.write_link(a.as_ref()).unwrap();
    i2.write_transform(&translate(2.0), 0.0).unwrap();
    let b1 = l.create_child("branch1").unwrap();
    b1.write_object(&SceneObject::sphere(1.0), 0.0).unwrap();
    let b2 = l.create_child("branch2").unwrap();
    b2.create_child("child2").unwrap();

    drop((i0, i1, i2, b1, b2));
    l.close().expect("Failed to close overlay");
}

/// Second level overlay linking into `instanced`.
pub fn write_environment(path: &Path, instanced: &Path) {
    let l = LinkedScene::open(instanced, OpenMode::READ).expect("Failed to open overlay");
    let i0 = l.child("instance0").unwrap();
    let i1 = l.child("instance1").unwrap();
    let i2 = l.child("instance2").unwrap();
    let a = i0.child("A").unwrap();

    let env = LinkedScene::open(path, OpenMode::WRITE).expect("Failed to create environment");
    let base = env.create_child("base").unwrap();
    let targets: [&dyn SceneInterface; 5] = [&l, i0.as_ref(), i1.as_ref(), i2.as_ref(), a.as_ref()];
    for (i, target) in targets.into_iter().enumerate() {
        base.create_child(&format!("test{}", i + 1))
            .unwrap()
            .write_link(target)
            .unwrap();
    }

    drop(base);
    env.close().expect("Failed to close environment");
}

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub spheres: PathBuf,
    pub instanced: PathBuf,
    pub environment: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let spheres = dir.path().join("animatedSpheres.scc");
        let instanced = dir.path().join("instancedSpheres.lscc");
        let environment = dir.path().join("environment.lscc");
        write_animated_spheres(&spheres);
        write_instanced_spheres(&instanced, &spheres);
        write_environment(&environment, &instanced);
        Self {
            dir,
            spheres,
            instanced,
            environment,
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
