//! Scene object graph.
//!
//! Every object synthesized for one sample lives in a [`Scene`] arena and is
//! addressed by a stable [`ObjectId`]. Relationships between objects are not
//! stored inside the objects themselves: they are named, directed links kept
//! in a bidirectional adjacency index (see [`links`]), so that any object can
//! be asked who points at it and so that detaching an object can never leave
//! a dangling half-link behind.

mod glyph;
pub mod links;
mod space;
mod visual;

pub use links::{Field, Link};
pub use space::{AffineSpace, ScenePoint};
pub use visual::{
    BeamCoordinateSystem, Bitmap, Glyph, GlyphKind, GlyphType, LineKind, LinearStaffCoordinates,
    NoteheadSide, Page, Sprite, StaffCoordinateSystem, Stafflines, System, ViewBox,
};

use crate::error::{Result, SynthError};
use crate::geometry::Transform;
use crate::semantic::{
    BeamedGroup, Chord, Event, Measure, MeasureRest, Note, Part, Rest, Score, Staff,
};
use serde::Serialize;
use std::fmt;

/// Stable handle of an object in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Slot {
    entity: Entity,
    outlinks: Vec<Link>,
    inlinks: Vec<Link>,
}

/// Arena owning every object created for one sample.
pub struct Scene {
    slots: Vec<Option<Slot>>,
    root: ObjectId,
}

// Generates the `Entity` sum type, its kind tag, conversions and the typed
// accessors on `Scene`.
macro_rules! entities {
    ($($variant:ident($ty:ty) => $get:ident, $get_mut:ident;)*) => {
        /// Any object stored in the scene.
        #[derive(Debug)]
        pub enum Entity {
            $($variant($ty),)*
        }

        /// Type tag of an [`Entity`], used to filter link queries.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum EntityKind {
            $($variant,)*
        }

        impl Entity {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Entity::$variant(_) => EntityKind::$variant,)*
                }
            }
        }

        $(
            impl From<$ty> for Entity {
                fn from(value: $ty) -> Self {
                    Entity::$variant(value)
                }
            }
        )*

        impl Scene {
            $(
                pub fn $get(&self, id: ObjectId) -> Result<&$ty> {
                    match self.entity(id)? {
                        Entity::$variant(value) => Ok(value),
                        other => Err(SynthError::WrongKind {
                            id,
                            expected: EntityKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }

                pub fn $get_mut(&mut self, id: ObjectId) -> Result<&mut $ty> {
                    match self.entity_mut(id)? {
                        Entity::$variant(value) => Ok(value),
                        other => Err(SynthError::WrongKind {
                            id,
                            expected: EntityKind::$variant,
                            actual: other.kind(),
                        }),
                    }
                }
            )*
        }
    };
}

entities! {
    Space(AffineSpace) => space, space_mut;
    Point(ScenePoint) => point, point_mut;
    Sprite(Sprite) => sprite, sprite_mut;
    Glyph(Glyph) => glyph, glyph_mut;
    Stafflines(Stafflines) => stafflines, stafflines_mut;
    BeamCoordinates(BeamCoordinateSystem) => beam_coordinates, beam_coordinates_mut;
    Page(Page) => page, page_mut;
    System(System) => system, system_mut;
    Score(Score) => score, score_mut;
    Part(Part) => part, part_mut;
    Measure(Measure) => measure, measure_mut;
    Staff(Staff) => staff, staff_mut;
    Event(Event) => event, event_mut;
    Note(Note) => note, note_mut;
    Rest(Rest) => rest, rest_mut;
    MeasureRest(MeasureRest) => measure_rest, measure_rest_mut;
    Chord(Chord) => chord, chord_mut;
    BeamedGroup(BeamedGroup) => beamed_group, beamed_group_mut;
}

impl EntityKind {
    /// Notes, rests and measure rests: everything that occupies time on a staff.
    pub fn is_durable(&self) -> bool {
        matches!(self, EntityKind::Note | EntityKind::Rest | EntityKind::MeasureRest)
    }
}

impl Scene {
    /// Creates an empty scene holding only the global root space.
    pub fn new() -> Self {
        let mut scene = Scene {
            slots: Vec::new(),
            root: ObjectId(0),
        };
        scene.root = scene.insert(AffineSpace::new(Transform::identity()));
        scene
    }

    /// The global space, ancestor of every attached space.
    pub fn root_space(&self) -> ObjectId {
        self.root
    }

    pub fn insert(&mut self, entity: impl Into<Entity>) -> ObjectId {
        let id = ObjectId(self.slots.len());
        self.slots.push(Some(Slot {
            entity: entity.into(),
            outlinks: Vec::new(),
            inlinks: Vec::new(),
        }));
        id
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entity(&self, id: ObjectId) -> Result<&Entity> {
        Ok(&self.slot(id)?.entity)
    }

    pub fn entity_mut(&mut self, id: ObjectId) -> Result<&mut Entity> {
        Ok(&mut self.slot_mut(id)?.entity)
    }

    pub fn kind_of(&self, id: ObjectId) -> Result<EntityKind> {
        Ok(self.entity(id)?.kind())
    }

    /// All live objects of the given kind, in creation order.
    pub fn find(&self, kind: EntityKind) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Some(slot) if slot.entity.kind() == kind => Some(ObjectId(i)),
                _ => None,
            })
            .collect()
    }

    /// Detaches the object from every link and drops it from the arena.
    pub fn remove(&mut self, id: ObjectId) -> Result<Entity> {
        if id == self.root {
            return Err(SynthError::Layout("the root space cannot be removed".into()));
        }
        self.detach(id)?;
        match self.slots.get_mut(id.0).and_then(Option::take) {
            Some(slot) => Ok(slot.entity),
            None => Err(SynthError::MissingObject(id)),
        }
    }

    fn slot(&self, id: ObjectId) -> Result<&Slot> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SynthError::MissingObject(id))
    }

    fn slot_mut(&mut self, id: ObjectId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SynthError::MissingObject(id))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("objects", &self.len())
            .field("root", &self.root)
            .finish()
    }
}
