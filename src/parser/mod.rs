//! Markup-to-tree builder
//!
//! Walks a statement body's markup fragment in document order and builds the
//! immutable [`SqlNode`] tree. Tag dispatch is a closed match over the
//! recognized vocabulary, so exhaustiveness is checked at compile time; any
//! other element name fails the build.

pub mod tokens;

use log::trace;
use smallvec::SmallVec;

use crate::ast::{
    BindNode, ChooseNode, ForeachNode, IfNode, MixedNode, SetNode, SqlNode, StaticTextNode,
    TextNode, TrimNode, WhereNode,
};
use crate::error::BuildError;
use crate::markup::{Element, MarkupNode};

/// Build the node tree for a statement body element.
///
/// The returned composite owns the element's children in document order;
/// dynamic-ness is a property of the tree itself, via [`MixedNode::is_dynamic`].
pub fn build_statement(root: &Element) -> Result<MixedNode, BuildError> {
    let tree = parse_children(root)?;
    trace!(
        "built statement tree from <{}>: {} top-level nodes, dynamic: {}",
        root.name,
        tree.contents.len(),
        tree.is_dynamic()
    );
    Ok(tree)
}

fn parse_children(element: &Element) -> Result<MixedNode, BuildError> {
    let mut contents: SmallVec<[SqlNode; 4]> = SmallVec::new();
    for child in &element.children {
        match child {
            MarkupNode::Text(text) => {
                if tokens::contains_marker(tokens::RAW_OPEN, text) {
                    contents.push(SqlNode::Text(TextNode { text: text.clone() }));
                } else {
                    contents.push(SqlNode::StaticText(StaticTextNode { text: text.clone() }));
                }
            }
            MarkupNode::Element(el) => contents.push(parse_element(el)?),
        }
    }
    Ok(MixedNode { contents })
}

fn parse_element(element: &Element) -> Result<SqlNode, BuildError> {
    match element.name.as_str() {
        "if" | "when" => Ok(SqlNode::If(Box::new(parse_if(element)?))),
        "trim" => parse_trim(element),
        "where" => Ok(SqlNode::Where(Box::new(WhereNode {
            contents: parse_children(element)?,
        }))),
        "set" => Ok(SqlNode::Set(Box::new(SetNode {
            contents: parse_children(element)?,
        }))),
        "foreach" => parse_foreach(element),
        "choose" => parse_choose(element),
        // a stray <otherwise> outside <choose> is a transparent group
        "otherwise" => Ok(SqlNode::Mixed(Box::new(parse_children(element)?))),
        "bind" => Ok(SqlNode::Bind(BindNode {
            name: element.required_attr("name")?.to_string(),
            value: element.required_attr("value")?.to_string(),
        })),
        other => Err(BuildError::unknown_element(other)),
    }
}

fn parse_if(element: &Element) -> Result<IfNode, BuildError> {
    Ok(IfNode {
        test: element.required_attr("test")?.to_string(),
        contents: parse_children(element)?,
    })
}

fn parse_trim(element: &Element) -> Result<SqlNode, BuildError> {
    let prefix = element.attr("prefix").map(str::to_string);
    let suffix = element.attr("suffix").map(str::to_string);
    let prefix_overrides = split_override_tokens(element.attr("prefixOverrides"));
    let suffix_overrides = split_override_tokens(element.attr("suffixOverrides"));
    if prefix.is_none() && suffix.is_none() && prefix_overrides.is_empty() && suffix_overrides.is_empty()
    {
        return Err(BuildError::TrimWithoutRules);
    }
    Ok(SqlNode::Trim(Box::new(TrimNode {
        contents: parse_children(element)?,
        prefix,
        prefix_overrides,
        suffix,
        suffix_overrides,
    })))
}

fn parse_foreach(element: &Element) -> Result<SqlNode, BuildError> {
    Ok(SqlNode::Foreach(Box::new(ForeachNode {
        contents: parse_children(element)?,
        collection: element.required_attr("collection")?.to_string(),
        item: element.required_attr("item")?.to_string(),
        index: element.attr("index").map(str::to_string),
        open: element.attr("open").map(str::to_string),
        close: element.attr("close").map(str::to_string),
        separator: element.attr("separator").map(str::to_string),
        nullable: element.bool_attr("nullable")?.unwrap_or(false),
    })))
}

fn parse_choose(element: &Element) -> Result<SqlNode, BuildError> {
    let mut whens = Vec::new();
    let mut otherwise = None;
    for child in &element.children {
        match child {
            // free text between branches carries no meaning
            MarkupNode::Text(_) => {}
            MarkupNode::Element(el) => match el.name.as_str() {
                "when" => whens.push(parse_if(el)?),
                "otherwise" => {
                    if otherwise.is_some() {
                        return Err(BuildError::TooManyDefaults);
                    }
                    otherwise = Some(parse_children(el)?);
                }
                other => {
                    return Err(BuildError::UnexpectedChooseChild {
                        name: other.to_string(),
                    });
                }
            },
        }
    }
    Ok(SqlNode::Choose(Box::new(ChooseNode { whens, otherwise })))
}

/// Split a pipe-delimited override attribute into its tokens.
///
/// Empty tokens are dropped; a zero-length token would match everywhere and
/// strip nothing.
fn split_override_tokens(attr: Option<&str>) -> Vec<String> {
    attr.map(|value| {
        value
            .split('|')
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
