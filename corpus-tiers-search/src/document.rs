//! The stored sentence shape.
//!
//! One aligned sentence becomes one searchable document: per-word records
//! with the cleaned lowercased transcription, the standardized form when
//! present, and the deduplicated lemmata and tag sets of every analysis.
//! Absent refinements stay absent — a word that was never standardized has
//! `standardization: None`, never an empty string.

use serde::{Deserialize, Serialize};

use corpus_tiers::format::{clean_transcription, words, TAG_SEP, UNKNOWN_PREFIX};
use corpus_tiers::{decode_grammar, decode_standardization, AlignedSentence, CodecError};

/// Where in which audio file the sentence was spoken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    pub file: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// One analysis' tag set, kept as its own struct so element-level matching
/// over analyses has a stable shape in the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    pub tags: Vec<String>,
}

/// One word of a stored sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub transcription: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standardization: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lemmata: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<TagSet>,
}

/// One sentence as persisted in the external document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceDocument {
    pub recording: String,
    pub speaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    pub words: Vec<WordEntry>,
    pub audio: AudioRef,
}

/// Build the stored document for one aligned sentence.
///
/// Word indices in the packed annotation strings refer to the cleaned
/// transcription, so the same cleanup runs here. Unparseable stored
/// annotations are a hard error — a corrupt sentence must not be indexed
/// with silently missing words.
pub fn build_sentence_document(
    sentence: &AlignedSentence,
    recording: &str,
    speaker: &str,
    dialect: Option<&str>,
    audio_file: &str,
) -> Result<SentenceDocument, CodecError> {
    let standardizations = match &sentence.standardization {
        Some(text) => decode_standardization(text)?,
        None => Default::default(),
    };
    let annotations = match &sentence.annotation {
        Some(text) => decode_grammar(text)?,
        None => Default::default(),
    };

    let cleaned = clean_transcription(&sentence.original);
    let mut entries = Vec::new();

    for (at, word) in words(&cleaned).enumerate() {
        let mut entry = WordEntry {
            transcription: word.to_lowercase(),
            standardization: None,
            lemmata: Vec::new(),
            annotations: Vec::new(),
        };

        if let Some(payload) = standardizations.get(&at) {
            entry.standardization = Some(payload.form.to_lowercase());
        }

        if let Some(payload) = annotations.get(&at) {
            for analysis in &payload.analyses {
                let lemma = analysis
                    .lemma
                    .to_lowercase()
                    .replace(UNKNOWN_PREFIX, "");
                if !entry.lemmata.contains(&lemma) {
                    entry.lemmata.push(lemma);
                }

                let tags: Vec<String> = analysis
                    .tags
                    .to_lowercase()
                    .split(TAG_SEP)
                    .map(str::to_string)
                    .collect();
                if !entry.annotations.iter().any(|set| set.tags == tags) {
                    entry.annotations.push(TagSet { tags });
                }
            }
        }

        entries.push(entry);
    }

    Ok(SentenceDocument {
        recording: recording.to_string(),
        speaker: speaker.to_string(),
        dialect: dialect.map(str::to_string),
        words: entries,
        audio: AudioRef {
            file: audio_file.to_string(),
            start_ms: sentence.interval.start_ms,
            end_ms: sentence.interval.end_ms,
        },
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{AudioRef, SentenceDocument, TagSet, WordEntry};

    /// A minimal stored sentence for store/pagination tests.
    pub fn doc(recording: &str, start_ms: u64, transcription: &str) -> SentenceDocument {
        SentenceDocument {
            recording: recording.to_string(),
            speaker: "A.".to_string(),
            dialect: Some("west".to_string()),
            words: transcription
                .split_whitespace()
                .map(|w| WordEntry {
                    transcription: w.to_lowercase(),
                    standardization: None,
                    lemmata: Vec::new(),
                    annotations: Vec::new(),
                })
                .collect(),
            audio: AudioRef {
                file: format!("{}.wav", recording),
                start_ms,
                end_ms: start_ms + 100,
            },
        }
    }

    /// A stored sentence with one fully annotated word.
    pub fn annotated_doc(
        recording: &str,
        start_ms: u64,
        transcription: &str,
        standardization: &str,
        lemma: &str,
        tags: &[&str],
    ) -> SentenceDocument {
        let mut document = doc(recording, start_ms, transcription);
        document.words[0].standardization = Some(standardization.to_string());
        document.words[0].lemmata = vec![lemma.to_string()];
        document.words[0].annotations = vec![TagSet {
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }];
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpus_tiers::{AnnotationTrack, TrackEntry, align_tiers};

    fn aligned_sentence(
        original: &str,
        standardization: Option<&str>,
        annotation: Option<&str>,
    ) -> AlignedSentence {
        let original = AnnotationTrack::from_entries(vec![TrackEntry::new(0, 100, original)]);
        let std_track = AnnotationTrack::from_entries(
            standardization
                .map(|t| vec![TrackEntry::new(0, 100, t)])
                .unwrap_or_default(),
        );
        let ann_track = AnnotationTrack::from_entries(
            annotation
                .map(|t| vec![TrackEntry::new(0, 100, t)])
                .unwrap_or_default(),
        );
        align_tiers(&original, &std_track, &ann_track).remove(0)
    }

    #[test]
    fn builds_word_entries_from_all_tiers() {
        let sentence = aligned_sentence(
            "Мама мыла раму...",
            Some("0:Мама|1:мыла|2:раму"),
            Some("1:Мыть:VERB-ipfv-pst-sg-f"),
        );
        let document =
            build_sentence_document(&sentence, "rec_01", "M. K.", Some("west"), "rec_01.wav")
                .unwrap();

        assert_eq!(document.words.len(), 3);
        assert_eq!(document.words[0].transcription, "мама");
        assert_eq!(document.words[0].standardization.as_deref(), Some("мама"));
        assert!(document.words[0].annotations.is_empty());

        assert_eq!(document.words[1].lemmata, vec!["мыть"]);
        assert_eq!(
            document.words[1].annotations,
            vec![TagSet {
                tags: vec![
                    "verb".to_string(),
                    "ipfv".to_string(),
                    "pst".to_string(),
                    "sg".to_string(),
                    "f".to_string()
                ],
            }]
        );

        assert_eq!(document.audio.start_ms, 0);
        assert_eq!(document.audio.end_ms, 100);
    }

    #[test]
    fn absent_refinements_stay_absent() {
        let sentence = aligned_sentence("да ну", None, None);
        let document =
            build_sentence_document(&sentence, "rec_01", "M. K.", None, "rec_01.wav").unwrap();

        assert_eq!(document.words.len(), 2);
        assert!(document
            .words
            .iter()
            .all(|w| w.standardization.is_none() && w.lemmata.is_empty()));
    }

    #[test]
    fn unknown_prefix_is_stripped_from_lemmata() {
        let sentence = aligned_sentence(
            "узёрым",
            Some("0:узёрым"),
            Some("0:(unkn)_узёрым:NOUN-m-ins-sg"),
        );
        let document =
            build_sentence_document(&sentence, "rec_01", "M. K.", None, "rec_01.wav").unwrap();
        assert_eq!(document.words[0].lemmata, vec!["узёрым"]);
    }

    #[test]
    fn duplicate_analyses_collapse() {
        let sentence = aligned_sentence(
            "стало",
            Some("0:стало"),
            Some("0:стать/стать:VERB-pfv-pst-sg-n/VERB-pfv-pst-sg-n"),
        );
        let document =
            build_sentence_document(&sentence, "rec_01", "M. K.", None, "rec_01.wav").unwrap();

        assert_eq!(document.words[0].lemmata, vec!["стать"]);
        assert_eq!(document.words[0].annotations.len(), 1);
    }

    #[test]
    fn corrupt_annotation_is_a_hard_error() {
        let sentence = aligned_sentence("стало", Some("0:стало"), Some("0:стать"));
        let result = build_sentence_document(&sentence, "rec_01", "M. K.", None, "rec_01.wav");
        assert!(result.is_err());
    }

    #[test]
    fn documents_serialize_without_absent_fields() {
        let sentence = aligned_sentence("да", None, None);
        let document =
            build_sentence_document(&sentence, "rec_01", "M. K.", None, "rec_01.wav").unwrap();
        let json = serde_json::to_value(&document).unwrap();

        assert!(json["words"][0].get("standardization").is_none());
        assert!(json.get("dialect").is_none());
    }
}
