//! Glyph construction, sprite traversal and glyph geometry queries.

use super::{EntityKind, Field, Glyph, GlyphKind, ObjectId, Scene, Sprite};
use crate::error::{Result, SynthError};
use crate::geometry::{Point, Quad, Rectangle, Transform};

impl Scene {
    /// Creates a glyph together with its own, still unparented, space.
    pub fn create_glyph(&mut self, glyph_class: impl Into<String>, kind: GlyphKind) -> Result<ObjectId> {
        let space = self.create_space(None, Transform::identity())?;
        let glyph = self.insert(Glyph {
            glyph_class: glyph_class.into(),
            kind,
        });
        self.set_link(glyph, Field::Space, Some(space))?;
        Ok(glyph)
    }

    pub fn glyph_space(&self, glyph: ObjectId) -> Result<ObjectId> {
        self.glyph(glyph)?;
        self.require_linked(glyph, Field::Space)
    }

    /// Places a sprite into `space`.
    pub fn add_sprite(&mut self, space: ObjectId, sprite: Sprite) -> Result<ObjectId> {
        self.space(space)?;
        let id = self.insert(sprite);
        self.set_link(id, Field::Space, Some(space))?;
        Ok(id)
    }

    /// Places a sprite into the glyph's space and lists it on the glyph.
    pub fn add_glyph_sprite(&mut self, glyph: ObjectId, sprite: Sprite) -> Result<ObjectId> {
        let space = self.glyph_space(glyph)?;
        let id = self.add_sprite(space, sprite)?;
        self.push_link(glyph, Field::Sprites, id)?;
        Ok(id)
    }

    pub fn glyph_sprites(&self, glyph: ObjectId) -> Vec<ObjectId> {
        self.linked(glyph, Field::Sprites)
    }

    /// Sets the endpoints of a line glyph, given in its own space.
    pub fn set_line_points(&mut self, glyph: ObjectId, start: Point, end: Point) -> Result<()> {
        let space = self.glyph_space(glyph)?;
        for field in [Field::StartPoint, Field::EndPoint] {
            if let Some(old) = self.linked_one(glyph, field) {
                self.remove(old)?;
            }
        }
        let start = self.create_point(space, start)?;
        let end = self.create_point(space, end)?;
        self.set_link(glyph, Field::StartPoint, Some(start))?;
        self.set_link(glyph, Field::EndPoint, Some(end))
    }

    /// Line endpoints expressed in an ancestor space of the glyph.
    pub fn line_endpoints(&self, glyph: ObjectId, space: ObjectId) -> Result<(Point, Point)> {
        let start = self.require_linked(glyph, Field::StartPoint)?;
        let end = self.require_linked(glyph, Field::EndPoint)?;
        Ok((
            self.point_transform_to(start, space)?,
            self.point_transform_to(end, space)?,
        ))
    }

    /// Every sprite inside `space` and its descendants, with the transform
    /// from sprite pixels to the local coordinates of `space`. With
    /// `include_root` the transform of `space` itself is appended, so the
    /// result lands in the parent of `space`.
    pub fn traverse_sprites(&self, space: ObjectId, include_root: bool) -> Result<Vec<(ObjectId, Transform)>> {
        let outer = if include_root {
            self.space_transform(space)?
        } else {
            Transform::identity()
        };
        let mut found = Vec::new();
        self.collect_sprites(space, outer, &mut found)?;
        Ok(found)
    }

    fn collect_sprites(
        &self,
        space: ObjectId,
        to_output: Transform,
        found: &mut Vec<(ObjectId, Transform)>,
    ) -> Result<()> {
        for id in self.get_inlinked(space, EntityKind::Sprite, Field::Space)? {
            let sprite = self.sprite(id)?;
            let t = sprite
                .pixels_to_scene()
                .then(&sprite.transform)
                .then(&to_output);
            found.push((id, t));
        }
        for child in self.child_spaces(space)? {
            let t = self.space_transform(child)?.then(&to_output);
            self.collect_sprites(child, t, found)?;
        }
        Ok(())
    }

    /// Bounding box of every sprite of the glyph, expressed in `space`
    /// (the glyph space itself or any of its ancestors). `None` when the
    /// glyph has no sprites.
    pub fn glyph_bbox_in_space(&self, glyph: ObjectId, space: ObjectId) -> Result<Option<Rectangle>> {
        let glyph_space = self.glyph_space(glyph)?;
        let sprites = if glyph_space == space {
            self.traverse_sprites(glyph_space, false)?
        } else {
            let parent = self.parent_space(glyph_space).ok_or(SynthError::NotADescendant {
                space,
                sub_space: glyph_space,
            })?;
            let to_space = self.transform_from(space, parent)?;
            self.traverse_sprites(glyph_space, true)?
                .into_iter()
                .map(|(id, t)| (id, t.then(&to_space)))
                .collect()
        };

        let mut bbox: Option<Rectangle> = None;
        for (id, t) in sprites {
            let pixels = self.sprite(id)?.bitmap.pixels_bbox();
            let r = t.apply_to(Quad::from_rectangle(&pixels)).bbox();
            bbox = Some(match bbox {
                Some(b) => b.union_with(&r),
                None => r,
            });
        }
        Ok(bbox)
    }

    /// Removes a glyph with its whole space subtree and everything placed
    /// in it: sprites, points and nested glyphs.
    pub fn remove_glyph(&mut self, glyph: ObjectId) -> Result<()> {
        let root = self.glyph_space(glyph)?;
        let mut spaces = vec![root];
        let mut i = 0;
        while i < spaces.len() {
            spaces.extend(self.child_spaces(spaces[i])?);
            i += 1;
        }

        let mut doomed = vec![glyph];
        for &space in &spaces {
            for kind in [EntityKind::Sprite, EntityKind::Point, EntityKind::Glyph] {
                for id in self.get_inlinked(space, kind, Field::Space)? {
                    if !doomed.contains(&id) {
                        doomed.push(id);
                    }
                }
            }
        }
        for id in doomed {
            self.remove(id)?;
        }
        for space in spaces.into_iter().rev() {
            self.remove(space)?;
        }
        Ok(())
    }
}
