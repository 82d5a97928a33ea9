//! XML text serialization for element trees, built on `quick-xml`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::{NsReader, Writer};

use super::{Attribute, Element, NamespaceMap};
use crate::error::{FilterError, Result};

/// Prefixes used when a namespace has no declaration of its own.
const PREFERRED_PREFIXES: &[(&str, &str)] = &[
    ("http://www.opengis.net/ogc", "ogc"),
    ("http://www.opengis.net/fes/2.0", "fes"),
    ("http://www.opengis.net/gml", "gml"),
    ("http://www.opengis.net/gml/3.2", "gml"),
    ("http://www.w3.org/1999/xlink", "xlink"),
    ("http://www.opengis.net/ows/1.1", "ows"),
];

/// A parsed document: its root element and every namespace declared in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
    pub namespaces: NamespaceMap,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn xml_err(err: impl std::fmt::Display) -> FilterError {
    FilterError::Xml(err.to_string())
}

/// Serialize `root` as an indented XML document. All namespace bindings are
/// declared on the root element.
pub fn to_xml_string(root: &Element) -> Result<String> {
    let bindings = assign_prefixes(root);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    write_element(&mut writer, root, &bindings, true)?;
    String::from_utf8(writer.into_inner()).map_err(xml_err)
}

fn assign_prefixes(root: &Element) -> Vec<(String, String)> {
    let mut bindings: Vec<(String, String)> = Vec::new();
    collect_declarations(root, &mut bindings);

    let mut used: Vec<String> = Vec::new();
    collect_namespaces(root, &mut used);

    let mut generated = 0usize;
    for uri in used {
        if bindings.iter().any(|(_, bound)| *bound == uri) {
            continue;
        }
        let preferred = PREFERRED_PREFIXES
            .iter()
            .find(|(ns, _)| *ns == uri)
            .map(|(_, prefix)| prefix.to_string())
            .filter(|prefix| !bindings.iter().any(|(p, _)| p == prefix));
        let prefix = match preferred {
            Some(prefix) => prefix,
            None => loop {
                let candidate = format!("ns{}", generated);
                generated += 1;
                if !bindings.iter().any(|(p, _)| *p == candidate) {
                    break candidate;
                }
            },
        };
        bindings.push((prefix, uri));
    }
    bindings
}

fn collect_declarations(element: &Element, bindings: &mut Vec<(String, String)>) {
    for (prefix, uri) in &element.declarations {
        if !bindings.iter().any(|(p, _)| p == prefix) {
            bindings.push((prefix.clone(), uri.clone()));
        }
    }
    for child in &element.children {
        collect_declarations(child, bindings);
    }
}

fn collect_namespaces(element: &Element, used: &mut Vec<String>) {
    let attribute_namespaces = element.attributes.iter().filter_map(|a| a.namespace.as_ref());
    for uri in element.namespace.iter().chain(attribute_namespaces) {
        if !used.contains(uri) {
            used.push(uri.clone());
        }
    }
    for child in &element.children {
        collect_namespaces(child, used);
    }
}

fn qualify(namespace: Option<&str>, name: &str, bindings: &[(String, String)]) -> String {
    let prefix = namespace.and_then(|uri| {
        bindings
            .iter()
            .find(|(_, bound)| bound == uri)
            .map(|(prefix, _)| prefix.as_str())
    });
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name),
        _ => name.to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    bindings: &[(String, String)],
    is_root: bool,
) -> Result<()> {
    let qname = qualify(element.namespace.as_deref(), &element.name, bindings);
    let mut start = BytesStart::new(qname.clone());

    if is_root {
        for (prefix, uri) in bindings {
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            start.push_attribute((key.as_str(), uri.as_str()));
        }
    }
    for attr in &element.attributes {
        let key = qualify(attr.namespace.as_deref(), &attr.name, bindings);
        start.push_attribute((key.as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_err)?;
    }
    for child in &element.children {
        write_element(writer, child, bindings, false)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(qname)))
        .map_err(xml_err)?;
    Ok(())
}

/// Parse XML text into an element tree, resolving namespaces.
pub fn parse_document(xml: &str) -> Result<Document> {
    let mut reader = NsReader::from_str(xml);
    let mut namespaces = NamespaceMap::new();
    let mut stack: Vec<(Element, String)> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(xml_err)?;
        let namespace = owned_namespace(resolved)?;
        match event {
            Event::Start(start) => {
                let element = open_element(&reader, namespace, &start, &mut namespaces)?;
                stack.push((element, String::new()));
            }
            Event::Empty(start) => {
                let element = open_element(&reader, namespace, &start, &mut namespaces)?;
                close_element(element, String::new(), &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let (element, text) = stack
                    .pop()
                    .ok_or_else(|| FilterError::Xml("unbalanced end tag".into()))?;
                close_element(element, text, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    buffer.push_str(&text.unescape().map_err(xml_err)?);
                }
            }
            Event::CData(data) => {
                if let Some((_, buffer)) = stack.last_mut() {
                    buffer.push_str(&lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(FilterError::Xml("unexpected end of document".into()));
    }
    let root = root.ok_or_else(|| FilterError::Xml("document has no root element".into()))?;
    Ok(Document { root, namespaces })
}

fn owned_namespace(resolved: ResolveResult) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(lossy(ns.as_ref()))),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(FilterError::Xml(format!(
            "unknown namespace prefix '{}'",
            lossy(&prefix)
        ))),
    }
}

fn open_element(
    reader: &NsReader<&[u8]>,
    namespace: Option<String>,
    start: &BytesStart,
    namespaces: &mut NamespaceMap,
) -> Result<Element> {
    let mut element = Element {
        namespace,
        name: lossy(start.local_name().as_ref()),
        ..Default::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => String::new(),
                PrefixDeclaration::Named(prefix) => lossy(prefix),
            };
            let uri = lossy(&attr.value);
            namespaces.entry(prefix.clone()).or_insert_with(|| uri.clone());
            element.declarations.push((prefix, uri));
            continue;
        }

        let (resolved, local) = reader.resolve_attribute(attr.key);
        let attr_namespace = owned_namespace(resolved)?;
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        element.attributes.push(Attribute {
            namespace: attr_namespace,
            name: lossy(local.as_ref()),
            value,
        });
    }

    Ok(element)
}

fn close_element(
    mut element: Element,
    text: String,
    stack: &mut [(Element, String)],
    root: &mut Option<Element>,
) -> Result<()> {
    if element.children.is_empty() {
        if !text.is_empty() {
            element.text = Some(text);
        }
    } else if !text.trim().is_empty() {
        element.text = Some(text.trim().to_string());
    }

    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(FilterError::Xml("document has more than one root element".into()));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OGC: &str = "http://www.opengis.net/ogc";
    const GML: &str = "http://www.opengis.net/gml";

    #[test]
    fn writes_known_prefixes_on_root() {
        let root = Element::new(OGC, "Filter").with_child(
            Element::new(OGC, "BBOX")
                .with_child(Element::new(OGC, "PropertyName").with_text("geom"))
                .with_child(Element::new(GML, "Box").with_attr("srsName", "EPSG:4326")),
        );
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains("xmlns:ogc=\"http://www.opengis.net/ogc\""));
        assert!(xml.contains("xmlns:gml=\"http://www.opengis.net/gml\""));
        assert!(xml.contains("<ogc:PropertyName>geom</ogc:PropertyName>"));
        assert!(xml.contains("<gml:Box srsName=\"EPSG:4326\"/>"));
    }

    #[test]
    fn parses_with_arbitrary_prefixes() {
        let xml = r#"<?xml version="1.0"?>
            <f:Filter xmlns:f="http://www.opengis.net/ogc" xmlns:app="http://app">
              <f:PropertyIsEqualTo>
                <f:PropertyName>app:name</f:PropertyName>
                <f:Literal>a &amp; b</f:Literal>
              </f:PropertyIsEqualTo>
            </f:Filter>"#;
        let doc = parse_document(xml).unwrap();
        assert!(doc.root.is(OGC, "Filter"));
        assert_eq!(doc.namespaces.get("app").map(String::as_str), Some("http://app"));
        let cmp = &doc.root.children[0];
        assert!(cmp.is(OGC, "PropertyIsEqualTo"));
        assert_eq!(cmp.children[1].text(), "a & b");
        assert_eq!(doc.root.text, None);
    }

    #[test]
    fn round_trips_text_and_attributes() {
        let root = Element::new(OGC, "Filter").with_child(
            Element::new(OGC, "PropertyIsLike")
                .with_attr("wildCard", "*")
                .with_ns_attr("http://www.opengis.net/gml/3.2", "id", "x<1>")
                .with_child(Element::new(OGC, "Literal").with_text(" padded <text> ")),
        );
        let xml = to_xml_string(&root).unwrap();
        let doc = parse_document(&xml).unwrap();
        let mut expected = root.clone();
        expected.declarations = doc.root.declarations.clone();
        assert_eq!(doc.root, expected);
    }

    #[test]
    fn rejects_unknown_prefix() {
        let err = parse_document("<x:Filter/>").unwrap_err();
        assert!(matches!(err, FilterError::Xml(_)));
    }

    #[test]
    fn declared_prefixes_take_precedence() {
        let mut root = Element::new(OGC, "Filter");
        root.declare("gml", "http://app");
        let root = root.with_child(Element::new(GML, "Point"));
        let xml = to_xml_string(&root).unwrap();
        assert!(xml.contains("xmlns:gml=\"http://app\""));
        assert!(xml.contains("xmlns:ns0=\"http://www.opengis.net/gml\""));
        assert!(xml.contains("<ns0:Point/>"));
    }
}
