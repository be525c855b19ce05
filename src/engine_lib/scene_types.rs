// src/engine_lib/scene_types.rs
use glam::{Mat4, Vec3, Vec4Swizzles};

pub type ObjectId = u32;

/// Built-in meshes the renderer knows how to draw. All are unit-sized and centred on the
/// origin; `SceneObject::size` scales them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshKind {
    Cube,
    /// XY-plane quad facing +Z.
    Quad,
}

#[derive(Clone, Debug)]
pub struct SceneObject {
    pub id: ObjectId,
    pub name: String,
    pub mesh: MeshKind,
    /// Rigid placement (rotation + translation).
    pub transform: Mat4,
    /// Mesh extent along local X/Y/Z, applied before `transform`.
    pub size: Vec3,
    pub color: [f32; 4],
}

impl SceneObject {
    pub fn model_matrix(&self) -> Mat4 {
        self.transform * Mat4::from_scale(self.size)
    }

    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.xyz()
    }

    /// Radius of a sphere around `position()` containing the whole mesh.
    pub fn bounding_radius(&self) -> f32 {
        match self.mesh {
            MeshKind::Cube => (self.size * 0.5).length(),
            MeshKind::Quad => (self.size.truncate() * 0.5).length(),
        }
    }
}

/// Flat list of drawable objects, in insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
    next_id: ObjectId,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        mesh: MeshKind,
        transform: Mat4,
        size: Vec3,
        color: [f32; 4],
    ) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.push(SceneObject { id, name: name.into(), mesh, transform, size, color });
        id
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Everything that should be drawn in a pass that leaves out `exclude`.
    pub fn drawable(&self, exclude: Option<ObjectId>) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(move |o| Some(o.id) != exclude)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
