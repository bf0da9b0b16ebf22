use crate::contracts::token_error::TokenError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// Namespace bindings in scope, keyed by prefix. The default namespace uses the empty prefix.
pub(crate) type Namespaces = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Minimal element tree. Attribute values and text are kept unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElement {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Direct children with the given local name.
    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |element| element.local_name() == local_name)
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.local_name() == local_name)
    }

    /// Follows a path of local names through first matching children.
    pub fn path(&self, local_names: &[&str]) -> Option<&XmlElement> {
        local_names
            .iter()
            .try_fold(self, |element, local_name| element.child(local_name))
    }

    /// Descendants with the given local name in document order.
    pub fn descendants<'a>(&'a self, local_name: &str, found: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.local_name() == local_name {
                found.push(element);
            }
            element.descendants(local_name, found);
        }
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(text) => Some(text.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Namespaces in scope inside this element, given those in scope at its parent.
    pub fn scope(&self, inherited: &Namespaces) -> Namespaces {
        let mut scope = inherited.clone();
        for (name, value) in &self.attributes {
            if let Some(prefix) = namespace_prefix(name) {
                scope.insert(prefix.to_string(), value.clone());
            }
        }
        scope
    }
}

/// Parses a document into its root element.
/// Comments, processing instructions and the XML declaration are dropped; DTDs are refused.
pub(crate) fn parse(xml: &str) -> Result<XmlElement, TokenError> {
    let mut reader = Reader::from_str(xml);
    let mut open: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event().map_err(TokenError::xml)? {
            Event::Start(start) => open.push(element_from(&start)?),
            Event::Empty(start) => attach(&mut open, &mut root, element_from(&start)?)?,
            Event::End(_) => {
                let element = open.pop().ok_or_else(|| TokenError::xml("unexpected end tag"))?;
                attach(&mut open, &mut root, element)?;
            }
            Event::Text(text) => {
                let normalized = normalize_line_endings(std::str::from_utf8(&text).map_err(TokenError::xml)?);
                let text = unescape(&normalized).map_err(TokenError::xml)?.into_owned();
                match open.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text)),
                    None if text.trim().is_empty() => {}
                    None => return Err(TokenError::xml("text outside of the root element")),
                }
            }
            Event::CData(data) => {
                let text = normalize_line_endings(std::str::from_utf8(&data).map_err(TokenError::xml)?);
                let parent = open
                    .last_mut()
                    .ok_or_else(|| TokenError::xml("CDATA outside of the root element"))?;
                parent.children.push(XmlNode::Text(text));
            }
            Event::DocType(_) => return Err(TokenError::xml("document type declarations are not accepted")),
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {}
            Event::Eof => break,
        }
    }

    if !open.is_empty() {
        return Err(TokenError::xml("unclosed element"));
    }
    root.ok_or_else(|| TokenError::xml("document has no root element"))
}

fn element_from(start: &BytesStart) -> Result<XmlElement, TokenError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(TokenError::xml)?
        .to_string();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(TokenError::xml)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(TokenError::xml)?
            .to_string();
        let raw = std::str::from_utf8(&attribute.value).map_err(TokenError::xml)?;
        let value = unescape(&normalize_attribute_whitespace(raw))
            .map_err(TokenError::xml)?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Literal `\r\n` and `\r` line breaks read as `\n`. Character references are resolved later and kept.
fn normalize_line_endings(raw: &str) -> String {
    raw.replace("\r\n", "\n").replace('\r', "\n")
}

/// Literal whitespace characters in an attribute value read as spaces.
fn normalize_attribute_whitespace(raw: &str) -> String {
    normalize_line_endings(raw).replace(['\t', '\n'], " ")
}

fn attach(open: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), TokenError> {
    match open.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(TokenError::xml("more than one root element")),
    }
    Ok(())
}

/// Inclusive canonical XML 1.0 (without comments) of `apex` and its descendants.
/// `inherited` holds the namespaces in scope at the parent of the apex; `omit` is left out of the output.
pub(crate) fn canonicalize(apex: &XmlElement, inherited: &Namespaces, omit: Option<&XmlElement>) -> String {
    let mut output = String::new();
    write_canonical(apex, inherited, &Namespaces::new(), omit, &mut output);
    output
}

/// The wire form of a document is its canonical form.
pub(crate) fn serialize(root: &XmlElement) -> String {
    canonicalize(root, &Namespaces::new(), None)
}

fn write_canonical(
    element: &XmlElement,
    inherited: &Namespaces,
    rendered: &Namespaces,
    omit: Option<&XmlElement>,
    output: &mut String,
) {
    let scope = element.scope(inherited);

    output.push('<');
    output.push_str(&element.name);

    // BTreeMap order puts the default namespace first, then prefixes lexicographically.
    for (prefix, uri) in &scope {
        let needed = match rendered.get(prefix) {
            Some(previous) => previous != uri,
            None => !(prefix.is_empty() && uri.is_empty()),
        };
        if !needed {
            continue;
        }
        if prefix.is_empty() {
            output.push_str(" xmlns=\"");
        } else {
            output.push_str(" xmlns:");
            output.push_str(prefix);
            output.push_str("=\"");
        }
        output.push_str(&escape_attribute(uri));
        output.push('"');
    }

    let mut attributes: Vec<(&str, &str, &str, &str)> = element
        .attributes
        .iter()
        .filter(|(name, _)| namespace_prefix(name).is_none())
        .map(|(name, value)| {
            let uri = match name.split_once(':') {
                Some((prefix, _)) => scope.get(prefix).map(String::as_str).unwrap_or(prefix),
                None => "",
            };
            (uri, local_part(name), name.as_str(), value.as_str())
        })
        .collect();
    attributes.sort_by(|left, right| (left.0, left.1).cmp(&(right.0, right.1)));
    for (_, _, name, value) in attributes {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        output.push_str(&escape_attribute(value));
        output.push('"');
    }
    output.push('>');

    for node in &element.children {
        match node {
            XmlNode::Text(text) => output.push_str(&escape_text(text)),
            XmlNode::Element(child) if omit.is_some_and(|omitted| std::ptr::eq(child, omitted)) => {}
            XmlNode::Element(child) => write_canonical(child, &scope, &scope, omit, output),
        }
    }

    output.push_str("</");
    output.push_str(&element.name);
    output.push('>');
}

fn namespace_prefix(attribute_name: &str) -> Option<&str> {
    if attribute_name == "xmlns" {
        Some("")
    } else {
        attribute_name.strip_prefix("xmlns:")
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#xD;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '"' => escaped.push_str("&quot;"),
            '\t' => escaped.push_str("&#x9;"),
            '\n' => escaped.push_str("&#xA;"),
            '\r' => escaped.push_str("&#xD;"),
            c => escaped.push(c),
        }
    }
    escaped
}
