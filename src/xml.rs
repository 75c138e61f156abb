//! Minimal namespace-aware element tree.
//!
//! WPS responses are small documents that have to be searched in several
//! directions (status element, output list, nested exceptions), so they are
//! read once into an owned tree rather than matched on the event stream.

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Attribute {
    ns: Option<String>,
    name: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    ns: Option<String>,
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    pub fn parse(bytes: &[u8]) -> Result<Element> {
        let mut reader = NsReader::from_reader(bytes);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let (ns, event) = reader.read_resolved_event_into(&mut buf)?;
            let ns = owned_namespace(ns);
            match event {
                Event::Start(e) => {
                    stack.push(element_from(&reader, ns, &e)?);
                }
                Event::Empty(e) => {
                    let element = element_from(&reader, ns, &e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::malformed("unbalanced closing tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => return Ok(element),
                    }
                }
                Event::Text(t) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(t) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
                Event::Eof => {
                    return Err(Error::malformed("document has no root element"));
                }
                _ => {}
            }
            buf.clear();
        }
    }

    pub fn is(&self, ns: &str, name: &str) -> bool {
        self.ns.as_deref() == Some(ns) && self.name == name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn child(&self, ns: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(ns, name))
    }

    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(ns, name))
    }

    /// First matching element below this one, depth-first in document order.
    pub fn descendant(&self, ns: &str, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.is(ns, name) {
                return Some(child);
            }
            if let Some(found) = child.descendant(ns, name) {
                return Some(found);
            }
        }
        None
    }

    /// Unqualified attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.ns.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn attr_ns(&self, ns: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.ns.as_deref() == Some(ns) && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Text content, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        if self.text.is_empty() {
            None
        } else {
            Some(&self.text)
        }
    }
}

fn owned_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn element_from<R>(
    reader: &NsReader<R>,
    ns: Option<String>,
    start: &BytesStart<'_>,
) -> Result<Element> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let (attr_ns, local) = reader.resolve_attribute(attr.key);
        let attr_ns = owned_namespace(attr_ns);
        let name = String::from_utf8_lossy(local.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push(Attribute {
            ns: attr_ns,
            name,
            value,
        });
    }

    Ok(Element {
        ns,
        name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}
