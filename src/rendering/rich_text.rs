//! Plain-text extraction from rich-text (Lexical-style) JSON documents.

use serde_json::Value;
use thiserror::Error;

use crate::error::AppError;

/// Appended after every node tagged `"paragraph"`.
pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Shown in place of a post body that flattens to nothing.
pub const EMPTY_PLACEHOLDER: &str = "No content available.";

/// Bounds on the traversal of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenLimits {
    /// Maximum nesting level (arrays and nodes both count as a level).
    pub max_depth: usize,
    /// Maximum number of nodes (JSON objects) visited.
    pub max_nodes: usize,
}

/// Limits for content accepted by the write API.
///
/// MongoDB rejects documents nested deeper than 100 levels and each node level
/// takes two (the node and its `children` array), so stored content must stay
/// well below the default depth.
pub const STORAGE_LIMITS: FlattenLimits = FlattenLimits {
    max_depth: 40,
    max_nodes: 100_000,
};

impl Default for FlattenLimits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_nodes: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlattenError {
    #[error("rich text nesting exceeds {limit} levels")]
    TooDeep { limit: usize },

    #[error("rich text document exceeds {limit} nodes")]
    TooManyNodes { limit: usize },
}

impl From<FlattenError> for AppError {
    fn from(err: FlattenError) -> Self {
        AppError::Internal(format!("Rich text error: {err}"))
    }
}

enum Step<'a> {
    Visit(&'a Value, usize),
    Text(&'a str),
    ParagraphBreak,
}

/// Flatten a node, an array of nodes, or nothing into plain text.
///
/// Children come first, then the node's own `text`, then a paragraph break
/// when the node's `type` is `"paragraph"`. Values that are neither objects
/// nor arrays contribute nothing.
pub fn flatten(input: Option<&Value>) -> Result<String, FlattenError> {
    flatten_with_limits(input, FlattenLimits::default())
}

/// Same as [`flatten`] with explicit traversal limits.
pub fn flatten_with_limits(
    input: Option<&Value>,
    limits: FlattenLimits,
) -> Result<String, FlattenError> {
    let mut output = String::new();
    let Some(input) = input else {
        return Ok(output);
    };

    // Steps are pushed in reverse so that popping yields document order.
    let mut stack = vec![Step::Visit(input, 0)];
    let mut nodes = 0usize;

    while let Some(step) = stack.pop() {
        match step {
            Step::Text(text) => output.push_str(text),
            Step::ParagraphBreak => output.push_str(PARAGRAPH_BREAK),
            Step::Visit(value, depth) => {
                if depth > limits.max_depth {
                    return Err(FlattenError::TooDeep {
                        limit: limits.max_depth,
                    });
                }

                match value {
                    Value::Array(items) => {
                        stack.extend(items.iter().rev().map(|item| Step::Visit(item, depth + 1)));
                    }
                    Value::Object(node) => {
                        nodes += 1;
                        if nodes > limits.max_nodes {
                            return Err(FlattenError::TooManyNodes {
                                limit: limits.max_nodes,
                            });
                        }

                        if node.get("type").and_then(Value::as_str) == Some("paragraph") {
                            stack.push(Step::ParagraphBreak);
                        }
                        if let Some(text) = node.get("text").and_then(Value::as_str) {
                            stack.push(Step::Text(text));
                        }
                        if let Some(Value::Array(children)) = node.get("children") {
                            stack.extend(
                                children
                                    .iter()
                                    .rev()
                                    .map(|child| Step::Visit(child, depth + 1)),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(output)
}

/// Display text for a stored post body of the shape `{ "root": <node> }`.
///
/// The flattened text is trimmed; an empty result becomes [`EMPTY_PLACEHOLDER`].
pub fn display_text(content: Option<&Value>) -> Result<String, FlattenError> {
    let root = content.and_then(|c| c.get("root"));
    let text = flatten(root)?;
    let trimmed = text.trim();

    if trimmed.is_empty() {
        Ok(EMPTY_PLACEHOLDER.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}
