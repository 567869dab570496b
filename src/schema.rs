//! The declarative tag-order schema.
//!
//! Linguists maintain a JSON document with three top-level sections:
//!
//! - `grammemes` — analyzer grammeme → grammatical category + surface tag,
//! - `order` — per part of speech, one or more ordering variants keyed by
//!   the `category:tag` pairs they require (`default` as the fallback),
//!   each listing categories in canonical surface order; a `*` prefix
//!   marks a category as not always required,
//! - `facultative` — optional descriptive flags with the surface tags that
//!   license them (`ALLFORMS` licenses a flag everywhere).
//!
//! The file is parsed once at startup into validated structs and shared
//! read-only afterwards; schema changes require a restart. Declaration
//! order of grammemes and facultative entries is significant — it decides
//! bucketing collisions and facultative output order — so the maps are
//! read with their original order preserved.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The category every ordering decision pivots on.
pub const PART_OF_SPEECH: &str = "part of speech";

/// Wildcard license: the facultative flag applies to every form.
pub const ALLFORMS: &str = "ALLFORMS";

/// One grammeme: an atomic morphological feature value.
///
/// `id` is the analyzer-native name (the key in the schema file);
/// `surface_tag` is the form written into stored annotations;
/// `analyzer_tag` is what to look for in raw analyzer output when
/// inferring a missing value (defaults to `id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammemeEntry {
    pub id: String,
    pub category: String,
    pub surface_tag: String,
    pub analyzer_tag: String,
}

/// One slot in an ordering variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedCategory {
    pub name: String,
    /// `false` for `*`-prefixed slots: skipped without error when the
    /// category is absent from the input.
    pub always_required: bool,
}

/// One ordering variant for a part of speech.
#[derive(Debug, Clone)]
pub struct OrderVariant {
    /// `category:tag` pairs that must all be present for this variant to
    /// apply. Empty for the `default` variant.
    required: BTreeSet<String>,
    pub categories: Vec<OrderedCategory>,
}

impl OrderVariant {
    pub fn is_default(&self) -> bool {
        self.required.is_empty()
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// True when every required `category:tag` pair occurs in `present`.
    pub fn applies_to(&self, present: &HashSet<String>) -> bool {
        self.required.iter().all(|pair| present.contains(pair))
    }
}

/// How a facultative flag is licensed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacultativeLicense {
    /// Applicable to every form.
    AllForms,
    /// Applicable when any of these surface tags has been placed.
    AnyOf(Vec<String>),
}

/// One facultative flag declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacultativeEntry {
    pub tag: String,
    pub label: String,
    pub license: FacultativeLicense,
}

#[derive(Debug, Deserialize)]
struct RawGrammeme {
    category: String,
    surface_tag: String,
    #[serde(default)]
    analyzer_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFacultative {
    label: String,
    categories: String,
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    grammemes: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    order: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    facultative: serde_json::Map<String, serde_json::Value>,
}

/// The loaded, validated schema. Immutable; safe to share across threads
/// behind a plain reference.
#[derive(Debug, Clone)]
pub struct TagSchema {
    grammemes: Vec<GrammemeEntry>,
    by_id: HashMap<String, usize>,
    by_surface: HashMap<String, usize>,
    order: HashMap<String, Vec<OrderVariant>>,
    facultative: Vec<FacultativeEntry>,
}

impl TagSchema {
    /// Parse and validate a schema document.
    pub fn load_from_str(text: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema = serde_json::from_str(text)?;

        let mut grammemes = Vec::with_capacity(raw.grammemes.len());
        let mut by_id = HashMap::new();
        let mut by_surface: HashMap<String, usize> = HashMap::new();

        for (id, value) in raw.grammemes {
            let entry: RawGrammeme = serde_json::from_value(value)?;
            if entry.category.trim().is_empty() {
                return Err(SchemaError::EmptyCategory { grammeme: id });
            }
            if let Some(&prev) = by_surface.get(&entry.surface_tag) {
                let first: &GrammemeEntry = &grammemes[prev];
                return Err(SchemaError::DuplicateSurfaceTag {
                    surface: entry.surface_tag,
                    first: first.id.clone(),
                    second: id,
                });
            }

            let at = grammemes.len();
            by_id.insert(id.clone(), at);
            by_surface.insert(entry.surface_tag.clone(), at);
            grammemes.push(GrammemeEntry {
                analyzer_tag: entry.analyzer_tag.unwrap_or_else(|| id.clone()),
                id,
                category: entry.category,
                surface_tag: entry.surface_tag,
            });
        }

        let categories: HashSet<&str> =
            grammemes.iter().map(|g| g.category.as_str()).collect();

        let mut order = HashMap::new();
        for (pos, value) in raw.order {
            let variants_raw: serde_json::Map<String, serde_json::Value> =
                serde_json::from_value(value)?;
            let mut variants = Vec::with_capacity(variants_raw.len());

            for (key, list) in variants_raw {
                let required = if key == "default" {
                    BTreeSet::new()
                } else {
                    parse_order_key(&pos, &key, &grammemes, &by_surface)?
                };

                let names: Vec<String> = serde_json::from_value(list)?;
                let mut slots = Vec::with_capacity(names.len());
                for name in names {
                    let (name, always_required) = match name.strip_prefix('*') {
                        Some(stripped) => (stripped.to_string(), false),
                        None => (name, true),
                    };
                    if !categories.contains(name.as_str()) {
                        return Err(SchemaError::UnknownOrderCategory {
                            pos,
                            category: name,
                        });
                    }
                    slots.push(OrderedCategory {
                        name,
                        always_required,
                    });
                }
                variants.push(OrderVariant {
                    required,
                    categories: slots,
                });
            }
            order.insert(pos, variants);
        }

        let mut facultative = Vec::with_capacity(raw.facultative.len());
        for (tag, value) in raw.facultative {
            let entry: RawFacultative = serde_json::from_value(value)?;
            let references: Vec<String> = entry
                .categories
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect();

            let license = if references.iter().any(|r| r == ALLFORMS) {
                FacultativeLicense::AllForms
            } else {
                for reference in &references {
                    if !by_surface.contains_key(reference) {
                        return Err(SchemaError::UnknownFacultativeLicense {
                            tag,
                            reference: reference.clone(),
                        });
                    }
                }
                FacultativeLicense::AnyOf(references)
            };

            facultative.push(FacultativeEntry {
                tag,
                label: entry.label,
                license,
            });
        }

        Ok(Self {
            grammemes,
            by_id,
            by_surface,
            order,
            facultative,
        })
    }

    /// Read and parse a schema file.
    pub fn load_from_path(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::load_from_str(&text)
    }

    /// All grammemes, in declaration order.
    pub fn grammemes(&self) -> &[GrammemeEntry] {
        &self.grammemes
    }

    /// Look up a grammeme by its analyzer-native id.
    pub fn grammeme(&self, id: &str) -> Option<&GrammemeEntry> {
        self.by_id.get(id).map(|&at| &self.grammemes[at])
    }

    /// Look up a grammeme by its surface tag.
    pub fn by_surface_tag(&self, surface: &str) -> Option<&GrammemeEntry> {
        self.by_surface.get(surface).map(|&at| &self.grammemes[at])
    }

    /// Ordering variants declared for a part-of-speech surface tag.
    pub fn order_variants(&self, pos: &str) -> Option<&[OrderVariant]> {
        self.order.get(pos).map(Vec::as_slice)
    }

    /// Select the ordering variant for a word.
    ///
    /// `present` maps category → placed surface tag. Among the variants
    /// whose full required set is satisfied, the most specific one wins;
    /// declaration order breaks ties. The `default` variant (no
    /// requirements) is always satisfied, so a part of speech with any
    /// declared variants yields `Some` as long as a `default` exists.
    pub fn select_variant(
        &self,
        pos: &str,
        present: &HashMap<String, String>,
    ) -> Option<&OrderVariant> {
        let variants = self.order.get(pos)?;
        let pairs: HashSet<String> = present
            .iter()
            .map(|(category, tag)| format!("{}:{}", category, tag))
            .collect();

        let mut best: Option<&OrderVariant> = None;
        for variant in variants {
            if !variant.applies_to(&pairs) {
                continue;
            }
            let more_specific = match best {
                Some(current) => variant.required.len() > current.required.len(),
                None => true,
            };
            if more_specific {
                best = Some(variant);
            }
        }
        best
    }

    /// All facultative flags, in declaration order.
    pub fn facultative(&self) -> &[FacultativeEntry] {
        &self.facultative
    }

    pub fn facultative_entry(&self, tag: &str) -> Option<&FacultativeEntry> {
        self.facultative.iter().find(|f| f.tag == tag)
    }

    pub fn is_facultative(&self, tag: &str) -> bool {
        self.facultative_entry(tag).is_some()
    }
}

fn parse_order_key(
    pos: &str,
    key: &str,
    grammemes: &[GrammemeEntry],
    by_surface: &HashMap<String, usize>,
) -> Result<BTreeSet<String>, SchemaError> {
    let mut required = BTreeSet::new();
    for part in key.split(',') {
        let part = part.trim();
        let (category, tag) = part.split_once(':').ok_or_else(|| {
            SchemaError::MalformedOrderKey {
                pos: pos.to_string(),
                entry: part.to_string(),
            }
        })?;

        let known = by_surface
            .get(tag)
            .map(|&at| grammemes[at].category == category)
            .unwrap_or(false);
        if !known {
            return Err(SchemaError::UnknownOrderKey {
                pos: pos.to_string(),
                entry: part.to_string(),
            });
        }
        required.insert(format!("{}:{}", category, tag));
    }
    Ok(required)
}

#[cfg(test)]
pub(crate) const TEST_SCHEMA_JSON: &str = r#"{
  "grammemes": {
    "NOUN": { "category": "part of speech", "surface_tag": "NOUN" },
    "VERB": { "category": "part of speech", "surface_tag": "VERB" },
    "INFN": { "category": "part of speech", "surface_tag": "INFN" },
    "ADJF": { "category": "part of speech", "surface_tag": "ADJ" },
    "NPRO": { "category": "part of speech", "surface_tag": "NPRO" },
    "ADVB": { "category": "part of speech", "surface_tag": "ADV" },
    "GRND": { "category": "part of speech", "surface_tag": "GER" },
    "masc": { "category": "gender", "surface_tag": "m" },
    "femn": { "category": "gender", "surface_tag": "f" },
    "neut": { "category": "gender", "surface_tag": "n" },
    "anim": { "category": "animacy", "surface_tag": "anim" },
    "inan": { "category": "animacy", "surface_tag": "inan" },
    "nomn": { "category": "case", "surface_tag": "nom" },
    "gent": { "category": "case", "surface_tag": "gen" },
    "datv": { "category": "case", "surface_tag": "dat" },
    "accs": { "category": "case", "surface_tag": "acc" },
    "ablt": { "category": "case", "surface_tag": "ins" },
    "loct": { "category": "case", "surface_tag": "loc" },
    "sing": { "category": "number", "surface_tag": "sg" },
    "plur": { "category": "number", "surface_tag": "pl" },
    "perf": { "category": "aspect", "surface_tag": "pfv" },
    "impf": { "category": "aspect", "surface_tag": "ipfv" },
    "past": { "category": "tense", "surface_tag": "pst" },
    "pres": { "category": "tense", "surface_tag": "prs" },
    "futr": { "category": "tense", "surface_tag": "fut" },
    "1per": { "category": "person", "surface_tag": "1p" },
    "2per": { "category": "person", "surface_tag": "2p" },
    "3per": { "category": "person", "surface_tag": "3p" }
  },
  "order": {
    "NOUN": {
      "default": ["gender", "case", "number"],
      "animacy:anim": ["gender", "animacy", "case", "number"],
      "animacy:inan": ["gender", "animacy", "case", "number"]
    },
    "VERB": {
      "default": ["aspect", "tense", "number", "*gender", "*person"]
    },
    "ADJ": {
      "default": ["gender", "case", "number"]
    },
    "GER": {
      "default": ["aspect"]
    }
  },
  "facultative": {
    "orPRED": { "label": "can also act as a predicate", "categories": "VERB, ADV" },
    "dial": { "label": "dialectal form", "categories": "ALLFORMS" }
  }
}"#;

#[cfg(test)]
pub(crate) fn test_schema() -> TagSchema {
    TagSchema::load_from_str(TEST_SCHEMA_JSON).expect("test schema is valid")
}
