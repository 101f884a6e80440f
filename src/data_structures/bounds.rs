//! Axis-aligned bounding boxes and size normalisation.
//!
//! Meshes keep their local [`Aabb`] after upload so that a scene node can be
//! measured in world space without reading geometry back from the GPU. The
//! world box is the box around the eight transformed corners of each local box.

use cgmath::{Matrix4, Transform, Vector3};

use crate::data_structures::scene_graph::SceneNode;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    /// A box that contains nothing. `union` with it is the identity.
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vector3<f32>>,
    {
        points
            .into_iter()
            .fold(Self::empty(), |aabb, p| aabb.expand(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(self, p: Vector3<f32>) -> Self {
        Self {
            min: Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn union(self, other: Aabb) -> Self {
        if other.is_empty() {
            return self;
        }
        self.expand(other.min).expand(other.max)
    }

    /// Extent along each axis. An empty box has zero size.
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }

    pub fn corners(&self) -> [Vector3<f32>; 8] {
        [
            Vector3::new(self.min.x, self.min.y, self.min.z),
            Vector3::new(self.max.x, self.min.y, self.min.z),
            Vector3::new(self.min.x, self.max.y, self.min.z),
            Vector3::new(self.max.x, self.max.y, self.min.z),
            Vector3::new(self.min.x, self.min.y, self.max.z),
            Vector3::new(self.max.x, self.min.y, self.max.z),
            Vector3::new(self.min.x, self.max.y, self.max.z),
            Vector3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    pub fn transform(&self, matrix: &Matrix4<f32>) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points(self.corners().into_iter().map(|corner| {
            let p = matrix.transform_point(cgmath::Point3::new(corner.x, corner.y, corner.z));
            Vector3::new(p.x, p.y, p.z)
        }))
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Uniform scale that makes the largest dimension of `size` equal `target_size`.
///
/// Degenerate boxes (largest dimension zero or negative) keep a scale of `1.0`.
pub fn fit_scale(size: Vector3<f32>, target_size: f32) -> f32 {
    let max_dim = size.x.max(size.y).max(size.z);
    if max_dim > 0.0 {
        target_size / max_dim
    } else {
        1.0
    }
}

/// Rescales the root of `node` so that its world bounds fit `target_size`.
///
/// The node is measured at neutral scale so that repeated calls with a new
/// target do not compound. Returns the applied factor, or `None` when the
/// factor was unusable and the previous scale was kept.
pub fn auto_scale(node: &mut dyn SceneNode, target_size: f32) -> Option<f32> {
    let previous = node.get_local_transform(0)?;

    let mut neutral = previous.clone();
    neutral.scale = Vector3::new(1.0, 1.0, 1.0);
    node.set_local_transform(0, neutral.clone());
    node.update_world_transform_all();

    let size = node.world_bounds().size();
    let factor = fit_scale(size, target_size);

    if !factor.is_finite() || factor <= 0.0 {
        log::warn!(
            "Auto-scale produced an unusable factor {} for target size {}; keeping previous scale.",
            factor,
            target_size
        );
        node.set_local_transform(0, previous);
        node.update_world_transform_all();
        return None;
    }

    neutral.scale = Vector3::new(factor, factor, factor);
    node.set_local_transform(0, neutral);
    node.update_world_transform_all();
    Some(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        instance::Instance,
        scene_graph::{ContainerNode, testing::BoxNode},
    };
    use approx::assert_relative_eq;
    use cgmath::{Deg, Matrix4};

    #[test]
    fn fit_scale_uses_largest_dimension() {
        let size = Vector3::new(2.0, 10.0, 4.0);
        assert_relative_eq!(fit_scale(size, 1.0), 0.1);
        assert_relative_eq!(fit_scale(size, 30.0), 3.0);
    }

    #[test]
    fn fit_scale_guards_degenerate_boxes() {
        assert_eq!(fit_scale(Vector3::new(0.0, 0.0, 0.0), 5.0), 1.0);
        assert_eq!(Aabb::empty().size(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(fit_scale(Aabb::empty().size(), 5.0), 1.0);
    }

    fn scaled_box(scale: f32) -> ContainerNode {
        let mut root = ContainerNode::new(1);
        root.add_child(Box::new(BoxNode::new([0.0, 0.0, 0.0], [2.0, 10.0, 4.0])));
        let mut placed = Instance::from_euler_xyz([40.0, -5.0, 0.0], [0.0, 0.5, 0.0]);
        placed.scale = Vector3::new(scale, scale, scale);
        root.set_local_transform(0, placed);
        root
    }

    #[test]
    fn unusable_targets_restore_the_previous_scale() {
        for target in [0.0, -30.0, f32::NAN] {
            let mut root = scaled_box(7.0);
            let before = root.get_local_transform(0);

            assert_eq!(auto_scale(&mut root, target), None, "target {target}");
            assert_eq!(root.get_local_transform(0), before, "target {target}");
            // world transforms were refreshed with the restored scale
            let world = root.get_children()[0].get_world_transforms();
            assert_relative_eq!(world[0].scale.y, 7.0);
        }
    }

    #[test]
    fn rescaling_does_not_compound() {
        let mut root = scaled_box(7.0);
        assert_relative_eq!(auto_scale(&mut root, 30.0).unwrap_or_default(), 30.0 / root_extent());
        let first = root.get_local_transform(0);
        auto_scale(&mut root, 30.0);
        assert_eq!(root.get_local_transform(0), first);
    }

    /// Largest world extent of the box in `scaled_box` at unit scale.
    fn root_extent() -> f32 {
        let mut root = scaled_box(1.0);
        root.update_world_transform_all();
        let size = root.world_bounds().size();
        size.x.max(size.y).max(size.z)
    }

    #[test]
    fn union_ignores_empty_boxes() {
        let a = Aabb::from_points([Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 3.0)]);
        assert_eq!(a.union(Aabb::empty()), a);
        assert_eq!(Aabb::empty().union(a), a);
    }

    #[test]
    fn rotated_box_grows_to_cover_corners() {
        let unit = Aabb::from_points([Vector3::new(-1.0, -1.0, -1.0), Vector3::new(1.0, 1.0, 1.0)]);
        let rotated = unit.transform(&Matrix4::from_angle_z(Deg(45.0)));
        let size = rotated.size();
        assert_relative_eq!(size.x, 2.0 * 2f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(size.z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn translation_moves_without_resizing() {
        let aabb = Aabb::from_points([Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 3.0)]);
        let moved = aabb.transform(&Matrix4::from_translation(Vector3::new(10.0, 0.0, 0.0)));
        assert_relative_eq!(moved.min.x, 10.0);
        assert_eq!(moved.size(), aabb.size());
    }
}
