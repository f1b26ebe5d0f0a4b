//! Byte-preserving message-class editor.
//!
//! ADT's message-class endpoint 400s on a fully re-serialized document: it
//! only accepts edits that preserve the exact byte shape (whitespace,
//! attribute order, namespace prefixes) of whatever it last emitted. So
//! this module never parses the document into a tree; it scans for
//! `<…messages …>` anchors with byte offsets and only ever splices text
//! inside a matched attribute value, or inserts/removes whole elements.

use std::collections::HashMap;

/// Result of [`modify_message_class_xml`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageClassEdit {
    pub xml: Vec<u8>,
    /// msgnos whose `msgtext` was updated in place.
    pub updated: Vec<String>,
    /// msgnos whose `messages` element was removed entirely.
    pub deleted: Vec<String>,
    /// msgnos appended as new `messages` elements.
    pub inserted: Vec<String>,
}

/// Apply `updates` (msgno → new text; empty text means delete) and
/// `inserts` (msgno → new text, appended as new elements) to a
/// message-class XML document, preserving every byte not touched by an
/// edit.
///
/// `lock_handles` supplies the `lockhandle` attribute value for newly
/// inserted elements (spec'd as required on insert; omitted if absent from
/// the map).
///
/// With both `updates` and `inserts` empty this is byte-stable: the
/// returned bytes equal `xml` exactly.
pub fn modify_message_class_xml(
    xml: &[u8],
    updates: &HashMap<String, String>,
    inserts: &HashMap<String, String>,
    lock_handles: &HashMap<String, String>,
) -> MessageClassEdit {
    let text = String::from_utf8_lossy(xml).into_owned();
    let mut out = String::with_capacity(text.len());
    let mut updated = Vec::new();
    let mut deleted = Vec::new();

    let mut cursor = 0usize;
    let mut sibling_prefix: Option<String> = None;

    while let Some(rel) = text[cursor..].find("<messages")
        .or_else(|| find_prefixed_messages_open(&text[cursor..]))
    {
        let tag_start = cursor + rel;
        // Make sure we matched an element boundary, not a substring like
        // `<messagesFoo`.
        let (prefix, name_end) = match tag_open_prefix_and_end(&text, tag_start) {
            Some(v) => v,
            None => {
                out.push_str(&text[cursor..tag_start + 1]);
                cursor = tag_start + 1;
                continue;
            }
        };
        if sibling_prefix.is_none() {
            sibling_prefix = Some(prefix.clone());
        }

        let (elem_end, is_self_closing) = find_element_end(&text, name_end, &prefix)
            .expect("well-formed messages element");
        let elem_text = &text[tag_start..elem_end];
        let msgno = extract_attr(elem_text, "msgno");

        out.push_str(&text[cursor..tag_start]);

        match msgno.as_deref().and_then(|n| updates.get(n).map(|t| (n, t))) {
            Some((msgno, new_text)) if new_text.is_empty() => {
                deleted.push(msgno.to_string());
                // element dropped entirely: emit nothing for it.
            }
            Some((msgno, new_text)) => {
                updated.push(msgno.to_string());
                out.push_str(&replace_msgtext(elem_text, new_text));
            }
            None => {
                out.push_str(elem_text);
            }
        }

        cursor = elem_end;
        let _ = is_self_closing;
    }
    out.push_str(&text[cursor..]);

    let mut inserted = Vec::new();
    if !inserts.is_empty() {
        let prefix = sibling_prefix.unwrap_or_default();
        let close_tag = find_close_tag(&out, &prefix);
        let insert_at = close_tag.unwrap_or(out.len());
        let mut insertion = String::new();
        for (msgno, msgtext) in inserts {
            let lockhandle = lock_handles.get(msgno).map(String::as_str).unwrap_or("");
            insertion.push_str(&format!(
                "<{p}messages msgno=\"{n}\" msgtext=\"{t}\" lockhandle=\"{l}\"/>",
                p = prefix,
                n = escape_xml(msgno),
                t = escape_xml(msgtext),
                l = escape_xml(lockhandle),
            ));
            inserted.push(msgno.clone());
        }
        out.insert_str(insert_at, &insertion);
    }

    MessageClassEdit {
        xml: out.into_bytes(),
        updated,
        deleted,
        inserted,
    }
}

/// Find `<prefix:messages` where prefix is unknown ahead of time; falls
/// back to scanning for `:messages` preceded by a `<`.
fn find_prefixed_messages_open(haystack: &str) -> Option<usize> {
    let idx = haystack.find(":messages")?;
    let before = &haystack[..idx];
    let lt = before.rfind('<')?;
    Some(lt)
}

/// Given the byte index of a `<` that opens a `messages` (possibly
/// prefixed) tag, return (prefix_including_colon_or_empty, index just past
/// the tag name).
fn tag_open_prefix_and_end(text: &str, tag_start: usize) -> Option<(String, usize)> {
    let rest = &text[tag_start + 1..];
    let name_len = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    if name == "messages" {
        Some((String::new(), tag_start + 1 + name_len))
    } else if let Some(stripped) = name.strip_suffix("messages") {
        if stripped.ends_with(':') {
            Some((stripped.to_string(), tag_start + 1 + name_len))
        } else {
            None
        }
    } else {
        None
    }
}

/// From just past the tag name, find the end of the whole element
/// (exclusive), handling both `.../>` self-closing and
/// `...>...</prefix:messages>` paired forms (including nested children
/// such as `atom:link`). Returns (end_index, was_self_closing).
fn find_element_end(text: &str, name_end: usize, prefix: &str) -> Option<(usize, bool)> {
    let tag_close = text[name_end..].find('>')? + name_end;
    if text[..tag_close].ends_with('/') {
        return Some((tag_close + 1, true));
    }
    // Paired form: scan forward for the matching close tag, which uses the
    // same prefix as the open tag.
    let close_needle = format!("</{prefix}messages>");
    let rel = text[tag_close + 1..].find(close_needle.as_str())?;
    Some((tag_close + 1 + rel + close_needle.len(), false))
}

fn extract_attr(elem_text: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let start = elem_text.find(&needle)? + needle.len();
    let end = elem_text[start..].find('"')? + start;
    Some(elem_text[start..end].to_string())
}

/// Replace only the `msgtext="..."` attribute value in `elem_text`,
/// leaving every other byte untouched.
fn replace_msgtext(elem_text: &str, new_text: &str) -> String {
    let needle = "msgtext=\"";
    let Some(start) = elem_text.find(needle) else {
        return elem_text.to_string();
    };
    let value_start = start + needle.len();
    let Some(end_rel) = elem_text[value_start..].find('"') else {
        return elem_text.to_string();
    };
    let value_end = value_start + end_rel;
    let mut out = String::with_capacity(elem_text.len());
    out.push_str(&elem_text[..value_start]);
    out.push_str(&escape_xml(new_text));
    out.push_str(&elem_text[value_end..]);
    out
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Locate the byte offset of `</prefix:messageClass>` (or unprefixed),
/// tolerating either on the document.
fn find_close_tag(text: &str, sibling_prefix: &str) -> Option<usize> {
    let candidates = [
        format!("</{sibling_prefix}messageClass>"),
        "</messageClass>".to_string(),
    ];
    for c in &candidates {
        if let Some(idx) = text.find(c.as_str()) {
            return Some(idx);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<mc:messageClass xmlns:mc="urn:x" name="ZMSG" description="Demo">
  <mc:messages msgno="001" msgtext="First message"/>
  <mc:messages msgno="002" msgtext="Second message"><atom:link href="/foo/002"/></mc:messages>
</mc:messageClass>"#;

    #[test]
    fn noop_is_byte_stable() {
        let edit = modify_message_class_xml(
            DOC.as_bytes(),
            &HashMap::new(),
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(edit.xml, DOC.as_bytes());
        assert!(edit.updated.is_empty());
        assert!(edit.deleted.is_empty());
    }

    #[test]
    fn update_replaces_only_msgtext_value() {
        let mut updates = HashMap::new();
        updates.insert("001".to_string(), "Updated text".to_string());
        let edit = modify_message_class_xml(DOC.as_bytes(), &updates, &HashMap::new(), &HashMap::new());
        let out = String::from_utf8(edit.xml).unwrap();
        assert!(out.contains(r#"msgno="001" msgtext="Updated text""#));
        assert!(out.contains(r#"msgno="002" msgtext="Second message""#));
        assert_eq!(edit.updated, vec!["001".to_string()]);
    }

    #[test]
    fn empty_update_deletes_element_with_children() {
        let mut updates = HashMap::new();
        updates.insert("002".to_string(), String::new());
        let edit = modify_message_class_xml(DOC.as_bytes(), &updates, &HashMap::new(), &HashMap::new());
        let out = String::from_utf8(edit.xml).unwrap();
        assert!(!out.contains("002"));
        assert!(!out.contains("atom:link"));
        assert!(out.contains(r#"msgno="001""#));
        assert_eq!(edit.deleted, vec!["002".to_string()]);
    }

    #[test]
    fn insert_appends_before_close_tag_with_sibling_prefix() {
        let mut inserts = HashMap::new();
        inserts.insert("003".to_string(), "New message".to_string());
        let mut locks = HashMap::new();
        locks.insert("003".to_string(), "LOCK123".to_string());
        let edit = modify_message_class_xml(DOC.as_bytes(), &HashMap::new(), &inserts, &locks);
        let out = String::from_utf8(edit.xml).unwrap();
        assert!(out.contains(r#"<mc:messages msgno="003" msgtext="New message" lockhandle="LOCK123"/>"#));
        assert!(out.contains(r#"msgno="001""#));
        let close_idx = out.find("</mc:messageClass>").unwrap();
        let insert_idx = out.find("msgno=\"003\"").unwrap();
        assert!(insert_idx < close_idx);
    }

    #[test]
    fn escapes_special_characters_in_inserted_text() {
        let mut inserts = HashMap::new();
        inserts.insert("004".to_string(), "A & B < C > D \"E\"".to_string());
        let edit = modify_message_class_xml(DOC.as_bytes(), &HashMap::new(), &inserts, &HashMap::new());
        let out = String::from_utf8(edit.xml).unwrap();
        assert!(out.contains("A &amp; B &lt; C &gt; D &quot;E&quot;"));
    }
}
