use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{BriefError, Result};

const CUE_TAG: &[u8] = b"text";

/// Concatenate the text content of every `<text>` cue, in document order,
/// separated by single spaces.
///
/// Entities are decoded once by the XML parser. Caption bodies escape
/// apostrophes twice, so a literal `&#39;` survives parsing and is replaced
/// afterwards; other doubly-escaped entities are left as they are.
pub fn parse_caption_xml(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut cues: Vec<String> = Vec::new();
    let mut current = String::new();
    // Element depth inside the current cue, 0 when outside
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth > 0 {
                    depth += 1;
                } else if e.local_name().as_ref() == CUE_TAG {
                    depth = 1;
                    current.clear();
                }
            }
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    cues.push(std::mem::take(&mut current));
                }
            }
            Ok(Event::Empty(e)) if depth == 0 && e.local_name().as_ref() == CUE_TAG => {
                cues.push(String::new());
            }
            Ok(Event::Text(t)) if depth > 0 => {
                let text = t.unescape().map_err(malformed)?;
                current.push_str(&text);
            }
            Ok(Event::CData(t)) if depth > 0 => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e)),
        }
    }

    Ok(cues.join(" ").replace("&#39;", "'"))
}

fn malformed(e: impl std::fmt::Display) -> BriefError {
    BriefError::TranscriptFetchFailed(format!("Malformed captions XML: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_cues_and_decodes_apostrophes() {
        let xml = "<transcript><text>It&#39;s</text><text>ok</text></transcript>";
        assert_eq!(parse_caption_xml(xml).unwrap(), "It's ok");
    }

    #[test]
    fn doubly_escaped_apostrophe_is_decoded() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.0" dur="1.5">don&amp;#39;t stop</text></transcript>"#;
        assert_eq!(parse_caption_xml(xml).unwrap(), "don't stop");
    }

    #[test]
    fn other_double_escapes_are_left_alone() {
        let xml = "<transcript><text>say &amp;quot;hi&amp;quot;</text></transcript>";
        assert_eq!(parse_caption_xml(xml).unwrap(), "say &quot;hi&quot;");
    }

    #[test]
    fn keeps_document_order_and_attributes_ignored() {
        let xml = r#"<transcript>
<text start="0" dur="1">first</text>
<text start="1" dur="1">second</text>
<text start="2" dur="1">third</text>
</transcript>"#;
        assert_eq!(parse_caption_xml(xml).unwrap(), "first second third");
    }

    #[test]
    fn nested_markup_contributes_text_content() {
        let xml = "<transcript><text>a <b>bold</b> word</text></transcript>";
        assert_eq!(parse_caption_xml(xml).unwrap(), "a bold word");
    }

    #[test]
    fn empty_cues_still_count() {
        let xml = "<transcript><text/><text>x</text></transcript>";
        assert_eq!(parse_caption_xml(xml).unwrap(), " x");
    }

    #[test]
    fn no_cues_yield_empty_text() {
        assert_eq!(parse_caption_xml("<transcript></transcript>").unwrap(), "");
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let err = parse_caption_xml("<transcript><text>oops</transcript>").unwrap_err();
        assert!(matches!(err, BriefError::TranscriptFetchFailed(_)));
    }
}
