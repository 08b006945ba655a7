//! Secret regions in model source.
//!
//! A secret region opens with `//START_SECRET` and closes at the next unused
//! `//END_SECRET`. Markers pair positionally: the k-th start marker takes the
//! k-th end marker found while scanning, with no regard for nesting. A start
//! marker whose partner is missing, or sits before it, runs to end of text.
//!
//! Offsets are byte offsets into the source. Both markers are ASCII, so every
//! boundary falls on a char boundary and can be used to slice the text.

use std::ops::Range;

use crate::models::EditorRange;

pub const START_MARKER: &str = "//START_SECRET";
pub const END_MARKER: &str = "//END_SECRET";

/// A half-open span `[start, end)` of secret source text.
///
/// `start` is the offset of the start marker. For a closed region `end` is
/// the offset of its end marker; otherwise it is the text length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretRegion {
    pub start: usize,
    pub end: usize,
    pub closed: bool,
}

impl SecretRegion {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The span removed from public copies: the region plus its end marker.
    fn redacted_span(&self) -> Range<usize> {
        if self.closed {
            self.start..self.end + END_MARKER.len()
        } else {
            self.start..self.end
        }
    }

    /// Locate the region on the text surface (0-based lines, char columns).
    pub fn to_editor(&self, text: &str) -> EditorRange {
        let (start_line, start_column) = position_of(text, self.start);
        let (end_line, end_column) = position_of(text, self.end);
        EditorRange {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

/// Every secret region in `text`, ordered by start offset.
pub fn extract_secrets(text: &str) -> Vec<SecretRegion> {
    let mut ends = text.match_indices(END_MARKER).map(|(i, _)| i);

    text.match_indices(START_MARKER)
        .map(|(start, _)| match ends.next() {
            Some(end) if end > start => SecretRegion {
                start,
                end,
                closed: true,
            },
            _ => SecretRegion {
                start,
                end: text.len(),
                closed: false,
            },
        })
        .collect()
}

/// True iff `text` has at least one start marker.
pub fn contains_secret(text: &str) -> bool {
    text.contains(START_MARKER)
}

/// Copy of `text` with every secret region and its closing marker removed.
///
/// Positional pairing can produce overlapping regions; overlaps are merged
/// before cutting.
pub fn redact(text: &str) -> String {
    let mut spans: Vec<Range<usize>> = extract_secrets(text)
        .iter()
        .map(SecretRegion::redacted_span)
        .collect();
    if spans.is_empty() {
        return text.to_string();
    }
    spans.sort_by_key(|s| s.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in merged {
        out.push_str(&text[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn position_of(text: &str, offset: usize) -> (u32, u32) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() as u32;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_closed_region() {
        let text = "sig A {}\n//START_SECRET\nsecret\n//END_SECRET\n";
        let regions = extract_secrets(text);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].closed);
        assert_eq!(&text[regions[0].range()], "//START_SECRET\nsecret\n");
        assert!(contains_secret(text));
    }

    #[test]
    fn unterminated_region_runs_to_end_of_text() {
        let text = "sig A {}\n//START_SECRET\nfact { no A }";
        let regions = extract_secrets(text);
        assert_eq!(
            regions,
            vec![SecretRegion {
                start: 9,
                end: text.len(),
                closed: false
            }]
        );
        assert!(contains_secret(text));
    }

    #[test]
    fn end_before_start_runs_to_end_of_text() {
        let text = "//END_SECRET\nsig A {}\n//START_SECRET\nx";
        let regions = extract_secrets(text);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].end, text.len());
        assert!(!regions[0].closed);
    }

    #[test]
    fn markers_pair_positionally_ignoring_nesting() {
        let text = "//START_SECRET a //START_SECRET b //END_SECRET c //END_SECRET";
        let regions = extract_secrets(text);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].start, 0);
        assert_eq!(regions[0].end, text.find("//END_SECRET").unwrap());
        assert_eq!(regions[1].end, text.rfind("//END_SECRET").unwrap());
        assert!(regions[1].start < regions[0].end);
    }

    #[test]
    fn stray_end_marker_is_not_a_secret() {
        let text = "sig A {}\n//END_SECRET\n";
        assert!(extract_secrets(text).is_empty());
        assert!(!contains_secret(text));
    }

    #[test]
    fn redact_strips_region_and_closing_marker() {
        let text = "sig A {}\n//START_SECRET\nfact { no A }\n//END_SECRET\nrun {}";
        assert_eq!(redact(text), "sig A {}\n\nrun {}");
    }

    #[test]
    fn redact_merges_overlapping_regions() {
        let text = "keep //START_SECRET a //START_SECRET b //END_SECRET c //END_SECRET tail";
        assert_eq!(redact(text), "keep  tail");
    }

    #[test]
    fn redact_without_secrets_is_identity() {
        let text = "sig A {}\nrun {}";
        assert_eq!(redact(text), text);
    }

    #[test]
    fn region_maps_to_editor_coordinates() {
        let text = "sig A {}\n  //START_SECRET\nfact {}\n//END_SECRET";
        let region = extract_secrets(text)[0];
        let range = region.to_editor(text);
        assert_eq!((range.start_line, range.start_column), (1, 2));
        assert_eq!((range.end_line, range.end_column), (3, 0));
    }
}
