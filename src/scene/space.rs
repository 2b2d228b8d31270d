//! Affine-space tree.
//!
//! Every space carries the transform from its local coordinates into its
//! parent's coordinates. The parent itself is a [`Field::Parent`] link, so
//! child spaces are found through inlinks.

use super::{EntityKind, Field, ObjectId, Scene};
use crate::error::{Result, SynthError};
use crate::geometry::{Point, Transform};

/// A node of the coordinate-system tree.
#[derive(Debug, Clone)]
pub struct AffineSpace {
    /// Local → parent.
    pub transform: Transform,
}

impl AffineSpace {
    pub fn new(transform: Transform) -> Self {
        Self { transform }
    }
}

/// A point expressed in the coordinates of the space it is linked to.
#[derive(Debug, Clone)]
pub struct ScenePoint {
    pub position: Point,
}

impl Scene {
    pub fn create_space(&mut self, parent: Option<ObjectId>, transform: Transform) -> Result<ObjectId> {
        if let Some(parent) = parent {
            self.space(parent)?;
        }
        let id = self.insert(AffineSpace::new(transform));
        self.set_link(id, Field::Parent, parent)?;
        Ok(id)
    }

    pub fn parent_space(&self, space: ObjectId) -> Option<ObjectId> {
        self.linked_one(space, Field::Parent)
    }

    /// Re-parents a space. Fails if `parent` is the space itself or one of
    /// its descendants.
    pub fn set_parent_space(&mut self, space: ObjectId, parent: Option<ObjectId>) -> Result<()> {
        self.space(space)?;
        if let Some(parent) = parent {
            self.space(parent)?;
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == space {
                    return Err(SynthError::SpaceCycle { space, parent });
                }
                cursor = self.parent_space(current);
            }
        }
        self.set_link(space, Field::Parent, parent)
    }

    pub fn space_transform(&self, space: ObjectId) -> Result<Transform> {
        Ok(self.space(space)?.transform)
    }

    pub fn set_space_transform(&mut self, space: ObjectId, transform: Transform) -> Result<()> {
        self.space_mut(space)?.transform = transform;
        Ok(())
    }

    pub fn child_spaces(&self, space: ObjectId) -> Result<Vec<ObjectId>> {
        self.get_inlinked(space, EntityKind::Space, Field::Parent)
    }

    /// Transform from `sub_space` coordinates into `space` coordinates,
    /// accumulated along the parent chain. Identity when both are equal.
    pub fn transform_from(&self, space: ObjectId, sub_space: ObjectId) -> Result<Transform> {
        self.space(space)?;
        let mut transform = Transform::identity();
        let mut current = sub_space;
        while current != space {
            transform = transform.then(&self.space(current)?.transform);
            current = self
                .parent_space(current)
                .ok_or(SynthError::NotADescendant { space, sub_space })?;
        }
        Ok(transform)
    }

    pub fn create_point(&mut self, space: ObjectId, position: Point) -> Result<ObjectId> {
        self.space(space)?;
        let id = self.insert(ScenePoint { position });
        self.set_link(id, Field::Space, Some(space))?;
        Ok(id)
    }

    pub fn point_space(&self, point: ObjectId) -> Result<ObjectId> {
        self.point(point)?;
        self.require_linked(point, Field::Space)
    }

    /// Position of a scene point expressed in an ancestor space.
    pub fn point_transform_to(&self, point: ObjectId, space: ObjectId) -> Result<Point> {
        let position = self.point(point)?.position;
        let local = self.point_space(point)?;
        Ok(self.transform_from(space, local)?.apply_to(position))
    }
}
