//! Tolerant, namespace-prefix-stripping XML decoder.
//!
//! ADT responses mix several namespace prefixes (`adtcore:`, `srvb:`,
//! `mc:`, `cai:`, `atom:`, …) depending on endpoint and SAP release. Rather
//! than maintain a schema per endpoint, this decoder builds a generic tree
//! and strips any `prefix:` segment from element and attribute names before
//! callers match against them, so `adt-reader`/`adt-analysis` code can
//! write `el.name == "objectReference"` regardless of which prefix the
//! server happened to use.

use adt_domain::{Error, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;

/// A generic XML element, namespace-prefix-stripped on both the tag name
/// and every attribute key.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: HashMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// First direct child with the given (prefix-stripped) name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given (prefix-stripped) name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Every descendant with the given name, depth-first pre-order.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for c in &self.children {
            c.find_all(name, out);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Strip a single `prefix:` segment from a qualified name, if present.
pub fn strip_namespace_prefixes(qname: &str) -> &str {
    match qname.split_once(':') {
        Some((_prefix, local)) => local,
        None => qname,
    }
}

/// Parse `xml` into a prefix-stripped [`Element`] tree rooted at the
/// document's single top-level element.
///
/// Tolerant of unknown children: any element or attribute not understood
/// by a caller is simply left unread, not rejected.
pub fn decode(xml: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| Error::Malformed(format!("xml parse error: {e}")))?
        {
            Event::Start(e) => {
                let el = element_from_start(&e)?;
                stack.push(el);
            }
            Event::Empty(e) => {
                let el = element_from_start(&e)?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::Malformed(format!("xml text error: {e}")))?;
                    top.text.push_str(&text);
                }
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("unbalanced xml end tag".into()))?;
                push_finished(&mut stack, &mut root, el);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| Error::Malformed("empty xml document".into()))
}

fn push_finished(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => *root = Some(el),
    }
}

fn element_from_start(e: &quick_xml::events::BytesStart) -> Result<Element> {
    let raw_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let name = strip_namespace_prefixes(&raw_name).to_string();
    let mut attrs = HashMap::new();
    for a in e.attributes() {
        let a = a.map_err(|e| Error::Malformed(format!("xml attribute error: {e}")))?;
        let raw_key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
        let key = strip_namespace_prefixes(&raw_key).to_string();
        let value = a
            .unescape_value()
            .map_err(|e| Error::Malformed(format!("xml attribute value error: {e}")))?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(Element {
        name,
        attrs,
        text: String::new(),
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_prefixes() {
        assert_eq!(strip_namespace_prefixes("adtcore:name"), "name");
        assert_eq!(strip_namespace_prefixes("plain"), "plain");
    }

    #[test]
    fn decodes_nested_tree_stripping_prefixes() {
        let xml = br#"<adtcore:objectReferences xmlns:adtcore="urn:x">
            <adtcore:objectReference adtcore:name="ZTEST" adtcore:type="PROG/P"/>
        </adtcore:objectReferences>"#;
        let root = decode(xml).unwrap();
        assert_eq!(root.name, "objectReferences");
        let refs: Vec<&Element> = root.children_named("objectReference").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].attr("name"), Some("ZTEST"));
        assert_eq!(refs[0].attr("type"), Some("PROG/P"));
    }

    #[test]
    fn tolerates_unknown_children() {
        let xml = br#"<root><known a="1"/><unknown><weird/></unknown></root>"#;
        let root = decode(xml).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].name, "unknown");
    }

    #[test]
    fn captures_text_content() {
        let xml = br#"<msg>hello world</msg>"#;
        let root = decode(xml).unwrap();
        assert_eq!(root.text, "hello world");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let xml = br#"<root><unclosed></root>"#;
        assert!(decode(xml).is_err());
    }
}
