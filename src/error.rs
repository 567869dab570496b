//! Error types for the annotation core.

use thiserror::Error;

/// Errors raised while encoding or decoding the positional annotation
/// format.
///
/// Decode failures are hard errors: a token that does not parse indicates
/// corrupted stored data, and skipping it silently would shift word indices
/// and feed wrong evidence into annotation ranking downstream.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A stored token did not match the expected `index:field[:field]` shape.
    #[error("malformed annotation token '{token}': {reason}")]
    Malformed { token: String, reason: String },

    /// A grammar payload was asked to encode with no analyses.
    #[error("grammar payload for word {index} has no analyses")]
    EmptyPayload { index: usize },

    /// A payload field contains one of the reserved separator characters.
    #[error("field '{field}' for word {index} contains reserved character '{separator}'")]
    ReservedCharacter {
        index: usize,
        field: String,
        separator: &'static str,
    },
}

/// Errors raised while loading the tag-order schema.
///
/// All of these abort the load: the schema is read once at startup and an
/// inconsistent schema must never reach the canonicalizer.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("failed to read schema {path}: {message}")]
    Io { path: String, message: String },

    /// The schema file is not valid JSON of the expected shape.
    #[error("failed to parse schema: {0}")]
    Parse(#[from] serde_json::Error),

    /// A grammeme entry has an empty category.
    #[error("grammeme '{grammeme}' has an empty category")]
    EmptyCategory { grammeme: String },

    /// Two grammemes map to the same surface tag, which would make the
    /// surface form ambiguous when read back.
    #[error("surface tag '{surface}' is declared by both '{first}' and '{second}'")]
    DuplicateSurfaceTag {
        surface: String,
        first: String,
        second: String,
    },

    /// An ordering rule names a category no grammeme declares.
    #[error("order rule for '{pos}' references unknown category '{category}'")]
    UnknownOrderCategory { pos: String, category: String },

    /// An ordering-variant key entry is not a `category:tag` pair.
    #[error("order rule key for '{pos}' has malformed entry '{entry}'")]
    MalformedOrderKey { pos: String, entry: String },

    /// An ordering-variant key references a category/tag pair no grammeme
    /// declares.
    #[error("order rule key for '{pos}' references unknown pair '{entry}'")]
    UnknownOrderKey { pos: String, entry: String },

    /// A facultative tag's license names a surface tag no grammeme declares.
    #[error("facultative tag '{tag}' is licensed by unknown surface tag '{reference}'")]
    UnknownFacultativeLicense { tag: String, reference: String },
}
