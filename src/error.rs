//! Crate-wide error type.

use crate::scene::{EntityKind, Field, ObjectId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("object {0} does not exist in the scene")]
    MissingObject(ObjectId),

    #[error("object {id} is a {actual:?}, expected a {expected:?}")]
    WrongKind {
        id: ObjectId,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("expected at most one {kind:?} linking to {target} via {field:?}, found {found}")]
    TooManyInlinks {
        target: ObjectId,
        kind: EntityKind,
        field: Field,
        found: usize,
    },

    #[error("expected a {kind:?} linking to {target} via {field:?}, found none")]
    MissingInlink {
        target: ObjectId,
        kind: EntityKind,
        field: Field,
    },

    #[error("object {owner} has no {field:?} link")]
    MissingOutlink { owner: ObjectId, field: Field },

    #[error("space {sub_space} is not a descendant of space {space}")]
    NotADescendant { space: ObjectId, sub_space: ObjectId },

    #[error("parenting space {space} under {parent} would create a cycle")]
    SpaceCycle { space: ObjectId, parent: ObjectId },

    #[error("glyph class '{0}' is not supported by the synthesizer")]
    UnsupportedGlyphClass(String),

    #[error("glyph class '{glyph_class}' synthesizes a {actual:?}, expected a {expected:?}")]
    GlyphTypeMismatch {
        glyph_class: String,
        expected: crate::scene::GlyphType,
        actual: crate::scene::GlyphType,
    },

    #[error(
        "stem orientation inference is not supported (measure index {measure_index}, \
         onset {onset}); provide explicit stem orientation in the semantic data"
    )]
    StemInferenceUnsupported { measure_index: usize, onset: String },

    #[error("style domain error: {0}")]
    Style(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SynthError>;
