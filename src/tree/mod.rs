//! Generic namespaced element tree.
//!
//! Encoders build [`Element`] values and decoders read them; turning a tree
//! into XML text (and back) is the job of [`xml`].

pub mod xml;

pub use xml::{Document, parse_document, to_xml_string};

use std::collections::BTreeMap;

/// Prefix → namespace URI bindings.
pub type NamespaceMap = BTreeMap<String, String>;

/// A namespaced attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

/// A tagged element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub text: Option<String>,
    /// Namespace declarations (prefix, uri) carried by this element.
    pub declarations: Vec<(String, String)>,
}

impl Element {
    pub fn new(namespace: &str, name: &str) -> Self {
        Element {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            namespace: None,
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn with_ns_attr(mut self, namespace: &str, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            namespace: Some(namespace.to_string()),
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn declare(&mut self, prefix: &str, uri: &str) {
        if !self.declarations.iter().any(|(p, _)| p == prefix) {
            self.declarations.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// True if this element is `{namespace}name`.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }

    /// Unqualified attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn ns_attr(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// First child named `{namespace}name`.
    pub fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, name))
    }

    /// Text content, empty when absent.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://example.com/ns";

    #[test]
    fn builds_and_reads_elements() {
        let element = Element::new(NS, "Point")
            .with_attr("srsName", "EPSG:4326")
            .with_ns_attr("http://www.opengis.net/gml/3.2", "id", "p1")
            .with_child(Element::new(NS, "pos").with_text("1 2"));

        assert!(element.is(NS, "Point"));
        assert_eq!(element.attr("srsName"), Some("EPSG:4326"));
        assert_eq!(element.attr("id"), None);
        assert_eq!(element.ns_attr("http://www.opengis.net/gml/3.2", "id"), Some("p1"));
        assert_eq!(element.child(NS, "pos").map(Element::text), Some("1 2"));
        assert_eq!(element.text(), "");
    }

    #[test]
    fn declarations_are_unique_per_prefix() {
        let mut element = Element::new(NS, "Filter");
        element.declare("app", "http://app");
        element.declare("app", "http://other");
        assert_eq!(element.declarations, vec![("app".to_string(), "http://app".to_string())]);
    }
}
