//! Scene graph and hierarchical scene organization.
//!
//! Every node keeps a list of `(local, world)` [`Instance`] pairs. World
//! transforms are pushed down from the root with
//! [`SceneNode::update_world_transform_all`], after which a node can be
//! measured in world space with [`SceneNode::world_bounds`].

use std::ops::Range;

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        bounds::Aabb,
        instance::{Instance, InstanceRaw},
        model::{self, Material},
    },
    render::Instanced,
};

pub trait SceneNode {
    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    /**
     * Multiple instances of a parent can be passed down to multiple instances of multiple children.
     * The argument `parents_world_transform` with a matching `range` size provides control over which instances are transformed.
     */
    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]);

    fn update_world_transform_all(&mut self);

    /// Bounds of the geometry owned by this node alone, in its local space.
    fn local_bounds(&self) -> Aabb {
        Aabb::empty()
    }

    /// Bounds of this node and all of its descendants in world space.
    ///
    /// Only meaningful after the world transforms have been updated.
    fn world_bounds(&self) -> Aabb {
        let local = self.local_bounds();
        let own = self
            .get_world_transforms()
            .iter()
            .fold(Aabb::empty(), |aabb, world| {
                aabb.union(local.transform(&world.to_matrix()))
            });
        self.get_children()
            .iter()
            .fold(own, |aabb, child| aabb.union(child.world_bounds()))
    }

    /// Visits every mesh of this subtree together with its material.
    fn for_each_mesh_material_mut(&mut self, f: &mut dyn FnMut(&str, &mut Material)) {
        for child in self.get_children_mut() {
            child.for_each_mesh_material_mut(f);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

fn propagate(
    instances: &mut [(Instance, Instance)],
    children: &mut [Box<dyn SceneNode>],
    range: Range<usize>,
    parents_world_transform: &[Instance],
) {
    if parents_world_transform.len() > instances.len() {
        warn!(
            "You tried to transform with len {}, but there are only {} instances to transform.",
            parents_world_transform.len(),
            instances.len()
        );
        return;
    }
    let Some(targets) = instances.get_mut(range.clone()) else {
        warn!(
            "You tried to transform range {}..{}, which is out of bounds for parent len {}.",
            range.start,
            range.end,
            instances.len(),
        );
        return;
    };
    let world_transforms = targets
        .iter_mut()
        .zip(parents_world_transform)
        .map(|((local, world), parent)| {
            *world = parent * &*local;
            world.clone()
        })
        .collect::<Vec<_>>();
    for child in children.iter_mut() {
        child.update_world_transforms(range.clone(), &world_transforms);
    }
}

/// A node without geometry. Groups children under a shared transform.
pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(amount: usize) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect();
        Self {
            instances,
            children: Vec::new(),
        }
    }
}

impl SceneNode for ContainerNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let default_instances: Vec<Instance> = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &default_instances);
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A node that draws a [`model::Model`] once per instance.
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    model: model::Model,
}

impl ModelNode {
    pub fn from_model(amount: usize, device: &wgpu::Device, model: model::Model) -> Self {
        let instances = (0..amount)
            .map(|_| (Instance::default(), Instance::default()))
            .collect::<Vec<_>>();

        let instance_data = instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            children: Vec::new(),
            instance_buffer,
            instances,
            model,
        }
    }
}

impl SceneNode for ModelNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let default_instances: Vec<Instance> = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &default_instances);
    }

    fn local_bounds(&self) -> Aabb {
        self.model.bounds()
    }

    fn for_each_mesh_material_mut(&mut self, f: &mut dyn FnMut(&str, &mut Material)) {
        let model::Model { meshes, materials } = &mut self.model;
        for mesh in meshes.iter() {
            match materials.get_mut(mesh.material) {
                Some(material) => f(&mesh.name, material),
                None => warn!("Mesh {} has no material {}.", mesh.name, mesh.material),
            }
        }
        for child in &mut self.children {
            child.for_each_mesh_material_mut(f);
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: self.instances.len(),
            }])
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Geometry-free stand-in for a model node with fixed local bounds.
    pub(crate) struct BoxNode {
        bounds: Aabb,
        inner: ContainerNode,
    }

    impl BoxNode {
        pub(crate) fn new(min: [f32; 3], max: [f32; 3]) -> Self {
            Self {
                bounds: Aabb::from_points([cgmath::Vector3::from(min), cgmath::Vector3::from(max)]),
                inner: ContainerNode::new(1),
            }
        }
    }

    impl SceneNode for BoxNode {
        fn get_world_transforms(&self) -> Vec<Instance> {
            self.inner.get_world_transforms()
        }
        fn get_local_transform(&self, idx: usize) -> Option<Instance> {
            self.inner.get_local_transform(idx)
        }
        fn set_local_transform(&mut self, idx: usize, instance: Instance) {
            self.inner.set_local_transform(idx, instance)
        }
        fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
            self.inner.get_children()
        }
        fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
            self.inner.get_children_mut()
        }
        fn add_child(&mut self, child: Box<dyn SceneNode>) {
            self.inner.add_child(child)
        }
        fn write_to_buffers(&mut self, _: &wgpu::Queue, _: &wgpu::Device) {}
        fn update_world_transforms(&mut self, range: Range<usize>, parents: &[Instance]) {
            self.inner.update_world_transforms(range, parents)
        }
        fn update_world_transform_all(&mut self) {
            self.inner.update_world_transform_all()
        }
        fn local_bounds(&self) -> Aabb {
            self.bounds
        }
        fn get_render(&self) -> Vec<Instanced<'_>> {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing::BoxNode, *};
    use approx::assert_relative_eq;

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut root = ContainerNode::new(1);
        root.set_local_transform(0, Instance::from(cgmath::Vector3::new(1.0, 0.0, 0.0)));
        let mut child = ContainerNode::new(1);
        child.set_local_transform(0, Instance::from(cgmath::Vector3::new(0.0, 2.0, 0.0)));
        root.add_child(Box::new(child));

        root.update_world_transform_all();
        let world = root.get_children()[0].get_world_transforms();
        assert_relative_eq!(world[0].position.x, 1.0);
        assert_relative_eq!(world[0].position.y, 2.0);
    }

    #[test]
    fn world_bounds_include_descendants() {
        let mut root = ContainerNode::new(1);
        let mut child = BoxNode::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        child.set_local_transform(0, Instance::from(cgmath::Vector3::new(10.0, 0.0, 0.0)));
        root.add_child(Box::new(child));
        root.add_child(Box::new(BoxNode::new([-1.0, -1.0, -1.0], [0.0, 0.0, 0.0])));

        root.update_world_transform_all();
        let bounds = root.world_bounds();
        assert_relative_eq!(bounds.min.x, -1.0);
        assert_relative_eq!(bounds.max.x, 11.0);
    }

    #[test]
    fn auto_scale_fits_largest_dimension() {
        let mut root = ContainerNode::new(1);
        root.add_child(Box::new(BoxNode::new([0.0, 0.0, 0.0], [2.0, 10.0, 4.0])));
        let mut placed = Instance::from(cgmath::Vector3::new(40.0, -5.0, 0.0));
        placed.scale = [7.0, 7.0, 7.0].into();
        root.set_local_transform(0, placed);

        let factor = crate::data_structures::bounds::auto_scale(&mut root, 30.0);
        assert_relative_eq!(factor.unwrap_or_default(), 3.0);
        assert_relative_eq!(root.world_bounds().size().y, 30.0, epsilon = 1e-4);
        // position survives rescaling
        assert_relative_eq!(root.get_local_transform(0).map(|i| i.position.x).unwrap_or_default(), 40.0);
    }

    #[test]
    fn auto_scale_keeps_scale_of_empty_nodes() {
        let mut root = ContainerNode::new(1);
        let factor = crate::data_structures::bounds::auto_scale(&mut root, 30.0);
        // empty bounds give the neutral factor
        assert_eq!(factor, Some(1.0));
    }

    #[test]
    fn out_of_range_updates_are_ignored() {
        let mut node = ContainerNode::new(1);
        node.update_world_transforms(3..4, &[Instance::default()]);
        assert_eq!(node.get_world_transforms(), vec![Instance::default()]);
    }
}
