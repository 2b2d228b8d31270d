//! Named, directed links between scene objects.
//!
//! A link `(source, target, field)` is recorded twice: as an outlink on the
//! source and as an inlink on the target. Mutators always update both sides,
//! so the two lists stay mirror images of each other. Setting a field first
//! removes every existing link of that field on the source.

use super::{EntityKind, ObjectId, Scene};
use crate::error::{Result, SynthError};
use serde::Serialize;

/// Name of the field a link is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    /// Space → parent space.
    Parent,
    /// Glyph, sprite, point, stafflines, page or beam coordinates → its space.
    Space,
    Sprites,
    StartPoint,
    EndPoint,
    Notes,
    Rest,
    Chord,
    Chords,
    BeamedGroup,
    AffectedNoteheads,
    AffectedRest,
    Parts,
    Measures,
    Events,
    Staves,
    Durables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub source: ObjectId,
    pub target: ObjectId,
    pub field: Field,
}

impl Scene {
    /// Replaces all targets of `field` on `source`.
    pub fn set_links(&mut self, source: ObjectId, field: Field, targets: &[ObjectId]) -> Result<()> {
        self.slot(source)?;
        for &target in targets {
            self.slot(target)?;
        }
        self.unlink_field(source, field);
        for &target in targets {
            self.add_link(Link { source, target, field });
        }
        Ok(())
    }

    /// Replaces the single-valued `field` on `source`; `None` clears it.
    pub fn set_link(&mut self, source: ObjectId, field: Field, target: Option<ObjectId>) -> Result<()> {
        self.set_links(source, field, target.as_slice())
    }

    /// Appends one more target to a list-valued field.
    pub fn push_link(&mut self, source: ObjectId, field: Field, target: ObjectId) -> Result<()> {
        self.slot(source)?;
        self.slot(target)?;
        self.add_link(Link { source, target, field });
        Ok(())
    }

    /// Targets of `field` on `source`, in insertion order.
    pub fn linked(&self, source: ObjectId, field: Field) -> Vec<ObjectId> {
        match self.slot(source) {
            Ok(slot) => slot
                .outlinks
                .iter()
                .filter(|l| l.field == field)
                .map(|l| l.target)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// First target of `field` on `source`, if any.
    pub fn linked_one(&self, source: ObjectId, field: Field) -> Option<ObjectId> {
        self.slot(source)
            .ok()?
            .outlinks
            .iter()
            .find(|l| l.field == field)
            .map(|l| l.target)
    }

    /// Like [`Scene::linked_one`] but a missing link is an error.
    pub fn require_linked(&self, source: ObjectId, field: Field) -> Result<ObjectId> {
        self.slot(source)?;
        self.linked_one(source, field)
            .ok_or(SynthError::MissingOutlink { owner: source, field })
    }

    pub fn outlinks(&self, id: ObjectId) -> Result<&[Link]> {
        Ok(&self.slot(id)?.outlinks)
    }

    pub fn inlinks(&self, id: ObjectId) -> Result<&[Link]> {
        Ok(&self.slot(id)?.inlinks)
    }

    /// All objects of `kind` linking to `target` through `field`,
    /// without duplicates, in link order.
    pub fn get_inlinked(&self, target: ObjectId, kind: EntityKind, field: Field) -> Result<Vec<ObjectId>> {
        let mut found = Vec::new();
        for link in &self.slot(target)?.inlinks {
            if link.field != field || found.contains(&link.source) {
                continue;
            }
            if self.kind_of(link.source)? == kind {
                found.push(link.source);
            }
        }
        Ok(found)
    }

    /// Like [`Scene::get_inlinked`], but finding nothing is an error.
    pub fn get_inlinked_nonempty(&self, target: ObjectId, kind: EntityKind, field: Field) -> Result<Vec<ObjectId>> {
        let found = self.get_inlinked(target, kind, field)?;
        if found.is_empty() {
            return Err(SynthError::MissingInlink { target, kind, field });
        }
        Ok(found)
    }

    /// Zero or one inlinked object; more than one is an error.
    pub fn inlinked_at_most_one(
        &self,
        target: ObjectId,
        kind: EntityKind,
        field: Field,
    ) -> Result<Option<ObjectId>> {
        let found = self.get_inlinked(target, kind, field)?;
        match found.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            _ => Err(SynthError::TooManyInlinks {
                target,
                kind,
                field,
                found: found.len(),
            }),
        }
    }

    /// Exactly one inlinked object; zero or more than one is an error.
    pub fn inlinked_exactly_one(&self, target: ObjectId, kind: EntityKind, field: Field) -> Result<ObjectId> {
        self.inlinked_at_most_one(target, kind, field)?
            .ok_or(SynthError::MissingInlink { target, kind, field })
    }

    /// Removes every link the object participates in, in both directions.
    pub fn detach(&mut self, id: ObjectId) -> Result<()> {
        let slot = self.slot(id)?;
        let links: Vec<Link> = slot.outlinks.iter().chain(slot.inlinks.iter()).copied().collect();
        for link in links {
            self.remove_link(link);
        }
        Ok(())
    }

    /// Checks that every outlink has exactly one mirrored inlink and vice versa.
    pub fn is_link_index_consistent(&self) -> bool {
        let live = || self.slots.iter().flatten();
        let count = |links: &[Link], link: &Link| links.iter().filter(|l| *l == link).count();

        for slot in live() {
            for link in &slot.outlinks {
                let Ok(target) = self.slot(link.target) else {
                    return false;
                };
                if count(&target.inlinks, link) != count(&slot.outlinks, link) {
                    return false;
                }
            }
            for link in &slot.inlinks {
                let Ok(source) = self.slot(link.source) else {
                    return false;
                };
                if count(&source.outlinks, link) != count(&slot.inlinks, link) {
                    return false;
                }
            }
        }
        true
    }

    fn add_link(&mut self, link: Link) {
        if let Some(Some(slot)) = self.slots.get_mut(link.source.0) {
            slot.outlinks.push(link);
        }
        if let Some(Some(slot)) = self.slots.get_mut(link.target.0) {
            slot.inlinks.push(link);
        }
    }

    fn remove_link(&mut self, link: Link) {
        if let Some(Some(slot)) = self.slots.get_mut(link.source.0) {
            if let Some(i) = slot.outlinks.iter().position(|l| *l == link) {
                slot.outlinks.remove(i);
            }
        }
        if let Some(Some(slot)) = self.slots.get_mut(link.target.0) {
            if let Some(i) = slot.inlinks.iter().position(|l| *l == link) {
                slot.inlinks.remove(i);
            }
        }
    }

    fn unlink_field(&mut self, source: ObjectId, field: Field) {
        let Ok(slot) = self.slot(source) else {
            return;
        };
        let old: Vec<Link> = slot.outlinks.iter().filter(|l| l.field == field).copied().collect();
        for link in old {
            self.remove_link(link);
        }
    }
}
