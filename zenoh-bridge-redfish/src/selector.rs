//! Navigation over Redfish documents whose shape is only known at run time.
//!
//! Every accessor returns `Option`/empty collections instead of failing: a
//! field that is missing from a document is a normal outcome.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Error returned when a selector path cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

/// One step of a [`Selector`]: a member name with an optional 0-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub index: Option<usize>,
}

/// A parsed path such as `Chassis[0]/Thermal` or `Status/Health`.
///
/// A leading `/` is accepted and ignored; paths are always evaluated against
/// the node they are applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    segments: Vec<Segment>,
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let error = |reason: &str| SelectorError {
            selector: text.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = text.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(error("empty path"));
        }

        let mut segments = Vec::new();
        for part in trimmed.split('/') {
            let segment = match part.split_once('[') {
                None => {
                    if part.contains(']') {
                        return Err(error("unbalanced ']'"));
                    }
                    Segment {
                        name: part.to_string(),
                        index: None,
                    }
                }
                Some((name, rest)) => {
                    let digits = rest
                        .strip_suffix(']')
                        .ok_or_else(|| error("index must end the segment with ']'"))?;
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| error("index is not a non-negative integer"))?;
                    Segment {
                        name: name.to_string(),
                        index: Some(index),
                    }
                }
            };

            if segment.name.is_empty() {
                return Err(error("empty segment name"));
            }
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Name of the last segment, used as a fallback label.
    pub fn last_name(&self) -> &str {
        self.segments
            .last()
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }

    /// Walk the path from `node`.
    pub fn select<'a>(&self, node: &'a Value) -> Option<&'a Value> {
        self.segments.iter().try_fold(node, |current, segment| {
            let child = get_field(current, &segment.name)?;
            match segment.index {
                Some(index) => index_into(child, index),
                None => Some(child),
            }
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&segment.name)?;
            if let Some(index) = segment.index {
                write!(f, "[{}]", index)?;
            }
        }
        Ok(())
    }
}

/// Object member lookup. Non-objects have no fields.
pub fn get_field<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.as_object()?.get(key)
}

/// The node's elements if it is an array.
pub fn as_array(node: &Value) -> Option<&[Value]> {
    node.as_array().map(Vec::as_slice)
}

/// Index into an array, or into the `Members` of a Redfish collection.
pub fn index_into(node: &Value, index: usize) -> Option<&Value> {
    match node {
        Value::Array(items) => items.get(index),
        Value::Object(_) => as_array(get_field(node, "Members")?)?.get(index),
        _ => None,
    }
}

/// A document node taking part in extraction, with its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element<'a> {
    pub position: usize,
    pub node: &'a Value,
}

/// Expand a resource node into the elements to process.
///
/// An object is a single element, an array yields every item. Scalars are not
/// enumerable and yield nothing.
pub fn elements(node: &Value) -> Vec<Element<'_>> {
    match node {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, node)| Element {
                position: i + 1,
                node,
            })
            .collect(),
        Value::Object(_) => vec![Element { position: 1, node }],
        _ => Vec::new(),
    }
}

/// Keep the elements whose `key` field renders as `expected`.
pub fn select_by_value<'a>(elements: &[Element<'a>], key: &str, expected: &str) -> Vec<Element<'a>> {
    elements
        .iter()
        .filter(|element| {
            get_field(element.node, key)
                .and_then(field_label)
                .is_some_and(|label| label == expected)
        })
        .copied()
        .collect()
}

/// Keep the elements at the listed 1-based positions.
///
/// Ids past the end of the document are ignored; the result keeps document
/// order.
pub fn select_by_index<'a>(elements: &[Element<'a>], ids: &[usize]) -> Vec<Element<'a>> {
    elements
        .iter()
        .filter(|element| ids.contains(&element.position))
        .copied()
        .collect()
}

/// Render a scalar field as a label.
///
/// Strings are taken verbatim, numbers use their canonical decimal form and
/// booleans render as `true`/`false`.
pub fn field_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Identifier of an element: its `MemberId`, else `Id`, else its position.
pub fn member_id(element: &Element<'_>) -> String {
    ["MemberId", "Id"]
        .iter()
        .find_map(|key| get_field(element.node, key).and_then(field_label))
        .unwrap_or_else(|| element.position.to_string())
}
