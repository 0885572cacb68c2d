//! Minimal owned element tree over `quick-xml` events.
//!
//! PubMed documents are small (one efetch batch), so building a tree first
//! lets the article extractor address elements by path and fail one article
//! at a time instead of one stream at a time.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::sources::SourceError;

/// A node in the element tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its attributes and children, namespaces stripped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, SourceError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Every element reached by following a `/`-separated path of child names
    pub fn find_all(&self, path: &str) -> Vec<&XmlElement> {
        let mut frontier = vec![self];
        for step in path.split('/') {
            frontier = frontier
                .into_iter()
                .flat_map(|e| e.elements().filter(move |c| c.name == step))
                .collect();
        }
        frontier
    }

    /// First element reached by a `/`-separated path of child names
    pub fn find(&self, path: &str) -> Option<&XmlElement> {
        self.find_all(path).into_iter().next()
    }

    /// All descendants with the given name, in document order
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Concatenated text of this element and all its descendants, trimmed
    pub fn text(&self) -> String {
        let mut buf = String::new();
        self.collect_text(&mut buf);
        buf.trim().to_string()
    }

    fn collect_text(&self, buf: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => buf.push_str(t),
                XmlNode::Element(e) => e.collect_text(buf),
            }
        }
    }
}

/// Parse a whole document and return its root element.
///
/// Fails if the document is not well-formed.
pub fn parse_document(xml: &str) -> Result<XmlElement, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SourceError::Parse("Unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.unescape()?.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    parent.children.push(XmlNode::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(SourceError::Parse(format!(
            "Unexpected end of document inside <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| SourceError::Parse("Document has no root element".to_string()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), SourceError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(SourceError::Parse(
                "Document has more than one root element".to_string(),
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_content_text() {
        let root = parse_document("<a><t>Role of <i>IL-6</i> &amp; TNF </t></a>").unwrap();
        assert_eq!(root.child("t").unwrap().text(), "Role of IL-6 & TNF");
    }

    #[test]
    fn test_paths_and_attributes() {
        let root = parse_document(
            r#"<set><item kind="x"><v>1</v></item><item kind="y"><v>2</v><v>3</v></item></set>"#,
        )
        .unwrap();
        let values: Vec<String> = root.find_all("item/v").iter().map(|e| e.text()).collect();
        assert_eq!(values, vec!["1", "2", "3"]);
        assert_eq!(root.find("item").unwrap().attr("kind"), Some("x"));
        assert_eq!(root.descendants("v").len(), 3);
    }

    #[test]
    fn test_empty_elements_and_cdata() {
        let root = parse_document("<a><b/><c><![CDATA[x < y]]></c></a>").unwrap();
        assert!(root.child("b").is_some());
        assert_eq!(root.child("c").unwrap().text(), "x < y");
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a><b>").is_err());
        assert!(parse_document("").is_err());
    }
}
