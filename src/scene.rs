//! Scene state: a growing branch with leaves, and the camera that views it.
//!
//! Growth advances one tick per rendered frame. Every transform produced here
//! ends up as an instance matrix for the scene pipeline.

use glam::{DVec3, Mat4, Vec3};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{camera::Camera, config::Config};

pub const MAX_LEAVES: usize = 4;
const HEIGHT_STEP: f32 = 0.01;
/// Modelled height of the branch mesh; scale is relative to this.
const BASE_HEIGHT: f32 = 4.0;
const LEAF_RING_RADIUS: f32 = 0.8;
const LEAF_HEADINGS: u32 = 20;

/// Which mesh and material an instance is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
  Branch,
  Leaf,
}

/// Position plus Euler angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entity {
  pub position: Vec3,
  pub eulers:   Vec3,
}

impl Entity {
  pub fn new(position: Vec3, eulers: Vec3) -> Self {
    Self { position, eulers }
  }

  /// Rotates about X, then Y, then Z, then translates.
  pub fn model_transform(&self) -> Mat4 {
    let radians = Vec3::new(
      self.eulers.x.to_radians(),
      self.eulers.y.to_radians(),
      self.eulers.z.to_radians(),
    );
    Mat4::from_translation(self.position)
      * Mat4::from_rotation_z(radians.z)
      * Mat4::from_rotation_y(radians.y)
      * Mat4::from_rotation_x(radians.x)
  }
}

/// A leaf hanging off the top of its branch, in the branch's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf {
  pub local: Entity,
  pub scale: f32,
}

impl Leaf {
  /// Places a leaf on the ring at the top of the branch mesh, turned to
  /// face outwards along `heading` degrees.
  pub fn at_heading(heading: f32) -> Self {
    let (sin, cos) = heading.to_radians().sin_cos();
    Self {
      local: Entity::new(
        Vec3::new(LEAF_RING_RADIUS * sin, LEAF_RING_RADIUS * cos, BASE_HEIGHT),
        Vec3::new(0.0, 0.0, heading),
      ),
      scale: 1.0,
    }
  }

  pub fn model_transform(&self, branch: &Mat4) -> Mat4 {
    *branch * self.local.model_transform() * Mat4::from_scale(Vec3::splat(self.scale))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
  pub entity: Entity,
  pub radius: f32,
  pub height: f32,
  pub age:    u64,
  pub leaves: Vec<Leaf>,
}

impl Branch {
  pub fn new(entity: Entity) -> Self {
    Self {
      entity,
      radius: 1.0,
      height: BASE_HEIGHT,
      age: 0,
      leaves: Vec::new(),
    }
  }

  /// Advances growth by one tick. Returns `true` if a leaf sprouted.
  ///
  /// Every 100th tick the branch gets taller. Ticks one past a multiple of
  /// 200 are reserved for widening, which is switched off. Ticks one past a
  /// multiple of 300 that are not already taken grow a leaf, up to
  /// `MAX_LEAVES`.
  pub fn update(&mut self, rng: &mut impl Rng) -> bool {
    self.age += 1;

    if self.age % 100 == 0 {
      self.height += HEIGHT_STEP;
    } else if self.age % 200 == 1 {
      // widening disabled
    } else if self.age % 300 == 1 && self.leaves.len() < MAX_LEAVES {
      let step = rng.random_range(0..LEAF_HEADINGS);
      let heading = 360.0 * step as f32 / LEAF_HEADINGS as f32;
      self.leaves.push(Leaf::at_heading(heading));
      return true;
    }
    false
  }

  pub fn model_transform(&self) -> Mat4 {
    self.entity.model_transform()
      * Mat4::from_scale(Vec3::new(self.radius, self.radius, self.height / BASE_HEIGHT))
  }
}

/// Instance transforms for one kind of object.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBatch {
  pub kind:       ObjectKind,
  pub transforms: Vec<Mat4>,
}

pub struct Scene {
  pub camera: Camera,
  branches:   Vec<Branch>,
  rng:        StdRng,
}

impl Scene {
  pub fn new(config: &Config) -> Self {
    let mut camera = Camera::new(DVec3::from_array(config.camera.position));
    camera.fov = config.camera.fov;
    camera.near = config.camera.near;
    camera.far = config.camera.far;

    let trunk = Branch::new(Entity::new(
      Vec3::ZERO,
      Vec3::new(config.scene.branch_tilt, 0.0, 0.0),
    ));

    Self {
      camera,
      branches: vec![trunk],
      rng: StdRng::seed_from_u64(config.scene.seed),
    }
  }

  pub fn branches(&self) -> &[Branch] {
    &self.branches
  }

  /// One growth tick for every branch, then a camera basis refresh.
  pub fn update(&mut self) {
    for branch in &mut self.branches {
      if branch.update(&mut self.rng) {
        log::debug!(
          "branch sprouted leaf {} at age {}",
          branch.leaves.len(),
          branch.age
        );
      }
    }
    self.camera.update_vectors();
  }

  /// Walks the camera for a WASD key mask; see [`crate::camera::walk_offset`].
  pub fn walk_camera(&mut self, keys: u8, distance: f64) {
    if let Some(offset) = crate::camera::walk_offset(keys) {
      self.camera.walk(offset, distance);
    }
  }

  /// Groups instance transforms by kind. Kinds with no instances are left out.
  pub fn render_batches(&self) -> Vec<RenderBatch> {
    let branch_transforms: Vec<Mat4> = self.branches.iter().map(Branch::model_transform).collect();
    let leaf_transforms: Vec<Mat4> = self
      .branches
      .iter()
      .zip(&branch_transforms)
      .flat_map(|(branch, model)| branch.leaves.iter().map(|leaf| leaf.model_transform(model)))
      .collect();

    [
      (ObjectKind::Branch, branch_transforms),
      (ObjectKind::Leaf, leaf_transforms),
    ]
    .into_iter()
    .filter(|(_, transforms)| !transforms.is_empty())
    .map(|(kind, transforms)| RenderBatch { kind, transforms })
    .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPSILON: f32 = 1e-5;

  fn grow(branch: &mut Branch, ticks: u64, rng: &mut StdRng) {
    for _ in 0..ticks {
      branch.update(rng);
    }
  }

  #[test]
  fn entity_rotates_before_translating() {
    let entity = Entity::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 90.0));
    let p = entity.model_transform().transform_point3(Vec3::X);
    assert!(p.abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), EPSILON));
  }

  #[test]
  fn entity_applies_x_before_z() {
    let entity = Entity::new(Vec3::ZERO, Vec3::new(90.0, 0.0, 90.0));
    // X turn sends +Y to +Z, which the Z turn leaves alone
    let p = entity.model_transform().transform_point3(Vec3::Y);
    assert!(p.abs_diff_eq(Vec3::Z, EPSILON));
  }

  #[test]
  fn branch_grows_taller_every_hundred_ticks() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut branch = Branch::new(Entity::new(Vec3::ZERO, Vec3::ZERO));

    grow(&mut branch, 99, &mut rng);
    assert_eq!(branch.height, BASE_HEIGHT);
    grow(&mut branch, 1, &mut rng);
    assert!((branch.height - 4.01).abs() < EPSILON);
    assert_eq!(branch.radius, 1.0);
  }

  #[test]
  fn leaves_sprout_on_schedule_and_stop_at_limit() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut branch = Branch::new(Entity::new(Vec3::ZERO, Vec3::ZERO));

    grow(&mut branch, 300, &mut rng);
    assert!(branch.leaves.is_empty());
    assert!(branch.update(&mut rng));
    assert_eq!(branch.leaves.len(), 1);

    // 601 is one past a multiple of 200 as well, so no leaf there
    grow(&mut branch, 599, &mut rng);
    assert_eq!(branch.age, 900);
    assert_eq!(branch.leaves.len(), 1);

    grow(&mut branch, 1201, &mut rng);
    assert_eq!(branch.age, 2101);
    assert_eq!(branch.leaves.len(), MAX_LEAVES);

    grow(&mut branch, 1000, &mut rng);
    assert_eq!(branch.leaves.len(), MAX_LEAVES);
  }

  #[test]
  fn leaf_sits_on_the_ring_at_the_top() {
    let leaf = Leaf::at_heading(90.0);
    let origin = leaf.model_transform(&Mat4::IDENTITY).transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(0.8, 0.0, 4.0), EPSILON));
  }

  #[test]
  fn leaves_ride_up_with_the_branch() {
    let mut branch = Branch::new(Entity::new(Vec3::ZERO, Vec3::ZERO));
    branch.leaves.push(Leaf::at_heading(0.0));
    branch.height = 8.0;

    let leaf_origin = branch.leaves[0]
      .model_transform(&branch.model_transform())
      .transform_point3(Vec3::ZERO);
    assert!(leaf_origin.abs_diff_eq(Vec3::new(0.0, 0.8, 8.0), EPSILON));
  }

  #[test]
  fn leaves_carry_branch_tilt_once() {
    let branch = Branch::new(Entity::new(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)));
    let branch_model = branch.model_transform();
    let leaf_model = Leaf::at_heading(0.0).model_transform(&branch_model);

    // heading 0 adds no turn of its own, so the leaf is oriented like the branch
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
      assert!(leaf_model
        .transform_vector3(axis)
        .abs_diff_eq(branch_model.transform_vector3(axis), EPSILON));
    }
  }

  #[test]
  fn same_seed_grows_the_same_tree() {
    let config = Config::default();
    let mut a = Scene::new(&config);
    let mut b = Scene::new(&config);
    for _ in 0..2200 {
      a.update();
      b.update();
    }
    assert_eq!(a.branches(), b.branches());
    assert_eq!(a.branches()[0].leaves.len(), MAX_LEAVES);
  }

  #[test]
  fn batches_group_by_kind() {
    let mut scene = Scene::new(&Config::default());
    let batches = scene.render_batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].kind, ObjectKind::Branch);
    assert_eq!(batches[0].transforms.len(), 1);

    for _ in 0..301 {
      scene.update();
    }
    let batches = scene.render_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].kind, ObjectKind::Leaf);
    assert_eq!(batches[1].transforms.len(), 1);
  }

  #[test]
  fn default_scene_matches_config() {
    let scene = Scene::new(&Config::default());
    assert_eq!(scene.camera.position, DVec3::new(-10.0, 0.0, 4.0));
    assert_eq!(scene.branches()[0].entity.eulers, Vec3::new(10.0, 0.0, 0.0));
  }

  #[test]
  fn walking_uses_key_mask() {
    let mut scene = Scene::new(&Config::default());
    let start = scene.camera.position;

    scene.walk_camera(1 | 4, 1.0);
    assert_eq!(scene.camera.position, start);

    scene.walk_camera(1, 1.0);
    assert!(scene.camera.position.abs_diff_eq(start + DVec3::X, 1e-9));
  }
}
