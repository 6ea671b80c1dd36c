//! Markup document fragments
//!
//! Statement bodies are authored as XML fragments: one root element whose
//! ordered children mix raw text with the recognized dynamic-SQL tags. This
//! module reads such a fragment into a small in-memory tree; tag semantics
//! live in [`crate::parser`].

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::BuildError;

/// One node of a markup fragment: an element or a run of text
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// An element with attributes and ordered children
    Element(Element),
    /// Raw character data (text and CDATA sections both land here)
    Text(String),
}

/// An element node: tag name, attributes in document order, ordered children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in the order they appear in the document
    pub attributes: IndexMap<String, String>,
    /// Child nodes in document order
    pub children: Vec<MarkupNode>,
}

impl Element {
    /// Create an empty element with the given tag name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Look up an attribute that must be present
    pub fn required_attr(&self, name: &str) -> Result<&str, BuildError> {
        self.attr(name)
            .ok_or_else(|| BuildError::missing_attribute(&self.name, name))
    }

    /// Look up an optional boolean attribute ("true"/"false")
    pub fn bool_attr(&self, name: &str) -> Result<Option<bool>, BuildError> {
        match self.attr(name) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(BuildError::invalid_attribute(
                &self.name,
                name,
                other,
                "expected 'true' or 'false'",
            )),
        }
    }

    /// Concatenated text of all direct text children
    pub fn text_body(&self) -> String {
        let mut body = String::new();
        for child in &self.children {
            if let MarkupNode::Text(text) = child {
                body.push_str(text);
            }
        }
        body
    }
}

/// Parse an XML fragment into its single root element.
///
/// Whitespace inside elements is preserved exactly as written; SQL texture
/// like trailing spaces in `AND ` fragments is significant downstream.
pub fn parse_fragment(input: &str) -> Result<Element, BuildError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| BuildError::markup(e.to_string()))?;
        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(BuildError::markup("multiple root elements in fragment"));
                }
                stack.push(read_element_open(&start)?);
            }
            Event::Empty(start) => {
                let element = read_element_open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| BuildError::markup("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| BuildError::markup(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| BuildError::markup(e.to_string()))?;
                push_text(&mut stack, text)?;
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(BuildError::markup("unexpected end of fragment"));
    }
    root.ok_or_else(|| BuildError::markup("fragment contains no root element"))
}

fn read_element_open(
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<Element, BuildError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| BuildError::markup(e.to_string()))?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| BuildError::markup(e.to_string()))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| BuildError::markup(e.to_string()))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| BuildError::markup(e.to_string()))?
            .into_owned();
        element.attributes.insert(key, value);
    }
    Ok(element)
}

fn attach(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), BuildError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(MarkupNode::Element(element));
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(BuildError::markup("multiple root elements in fragment"));
            }
            *root = Some(element);
            Ok(())
        }
    }
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), BuildError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(MarkupNode::Text(text.to_string()));
            Ok(())
        }
        None => {
            if text.trim().is_empty() {
                Ok(())
            } else {
                Err(BuildError::markup("text content outside of root element"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_fragment() {
        let root = parse_fragment("<select>SELECT * FROM users</select>").unwrap();
        assert_eq!(root.name, "select");
        assert_eq!(
            root.children,
            vec![MarkupNode::Text("SELECT * FROM users".to_string())]
        );
    }

    #[test]
    fn test_attributes_keep_document_order() {
        let root =
            parse_fragment(r#"<trim prefix="WHERE" prefixOverrides="AND |OR "></trim>"#).unwrap();
        let keys: Vec<&String> = root.attributes.keys().collect();
        assert_eq!(keys, vec!["prefix", "prefixOverrides"]);
        assert_eq!(root.attr("prefix"), Some("WHERE"));
    }

    #[test]
    fn test_nested_elements_and_whitespace() {
        let root = parse_fragment(
            "<select>SELECT * FROM users\n  <if test=\"name != null\"> AND name = #{name}</if>\n</select>",
        )
        .unwrap();
        assert_eq!(root.children.len(), 3);
        match &root.children[1] {
            MarkupNode::Element(el) => {
                assert_eq!(el.name, "if");
                assert_eq!(el.text_body(), " AND name = #{name}");
            }
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_cdata_is_plain_text() {
        let root = parse_fragment("<select><![CDATA[a < b]]></select>").unwrap();
        assert_eq!(root.text_body(), "a < b");
    }

    #[test]
    fn test_self_closing_child() {
        let root = parse_fragment(r#"<select><bind name="x" value="1"/></select>"#).unwrap();
        match &root.children[0] {
            MarkupNode::Element(el) => assert_eq!(el.attr("value"), Some("1")),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_fragment("no markup at all"),
            Err(BuildError::Markup { .. })
        ));
        assert!(matches!(
            parse_fragment("<a></a><b></b>"),
            Err(BuildError::Markup { .. })
        ));
        assert!(matches!(
            parse_fragment("<a><b></a>"),
            Err(BuildError::Markup { .. })
        ));
    }

    #[test]
    fn test_bool_attr() {
        let root = parse_fragment(r#"<foreach nullable="true"></foreach>"#).unwrap();
        assert_eq!(root.bool_attr("nullable").unwrap(), Some(true));
        assert_eq!(root.bool_attr("missing").unwrap(), None);

        let root = parse_fragment(r#"<foreach nullable="yes"></foreach>"#).unwrap();
        assert!(matches!(
            root.bool_attr("nullable"),
            Err(BuildError::InvalidAttribute { .. })
        ));
    }
}
