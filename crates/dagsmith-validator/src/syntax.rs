use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Reasons a source text could not be accepted as Python
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Syntax error at line {line}: {message}")]
    Invalid { line: usize, message: String },

    #[error("Parse error: {0}")]
    Parser(String),
}

impl SyntaxError {
    /// 1-based line of the first offending token, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            SyntaxError::Invalid { line, .. } => Some(*line),
            SyntaxError::Parser(_) => None,
        }
    }
}

/// Check that `code` is syntactically valid Python
pub fn check_syntax(code: &str) -> Result<(), SyntaxError> {
    parse(code).map(|_| ())
}

/// Parse `code`, rejecting any tree that contains error or missing nodes, or
/// Python 2 constructs the grammar still accepts
pub(crate) fn parse(code: &str) -> Result<Tree, SyntaxError> {
    let tree = parse_lenient(code)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root).unwrap_or(SyntaxError::Invalid {
            line: 1,
            message: "invalid syntax".to_string(),
        }));
    }
    if let Some(err) = first_legacy_construct(root, code.as_bytes()) {
        return Err(err);
    }
    Ok(tree)
}

/// Parse `code` keeping whatever tree tree-sitter recovers, errors included
pub(crate) fn parse_lenient(code: &str) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser
        .set_language(tree_sitter_python::language())
        .map_err(|e| SyntaxError::Parser(e.to_string()))?;
    parser
        .parse(code, None)
        .ok_or_else(|| SyntaxError::Parser("parser produced no tree".to_string()))
}

/// Locate the first error or missing node in document order
fn first_error(root: Node<'_>) -> Option<SyntaxError> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_missing() {
            return Some(SyntaxError::Invalid {
                line: node.start_position().row + 1,
                message: format!("expected '{}'", node.kind()),
            });
        }
        if node.is_error() {
            return Some(SyntaxError::Invalid {
                line: node.start_position().row + 1,
                message: "invalid syntax".to_string(),
            });
        }

        // Only subtrees flagged with errors are worth descending into
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

/// Locate the first node Python 3 would refuse, in document order
fn first_legacy_construct(root: Node<'_>, source: &[u8]) -> Option<SyntaxError> {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if let Some(message) = legacy_message(node, source) {
            return Some(SyntaxError::Invalid {
                line: node.start_position().row + 1,
                message: message.to_string(),
            });
        }

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn legacy_message(node: Node<'_>, source: &[u8]) -> Option<&'static str> {
    let text = node.utf8_text(source).unwrap_or("");
    match node.kind() {
        "print_statement" if !reads_as_call(text, "print") => {
            Some("Missing parentheses in call to 'print'")
        }
        "exec_statement" if !reads_as_call(text, "exec") => {
            Some("Missing parentheses in call to 'exec'")
        }
        "identifier" if matches!(text, "async" | "await") => Some("invalid syntax"),
        "<>" if !node.is_named() => Some("invalid syntax"),
        "except_clause" if has_token_child(node, ",") => {
            Some("multiple exception types must be parenthesized")
        }
        "integer" if text.ends_with(['l', 'L']) => Some("invalid decimal literal"),
        "integer" if has_leading_zero(text) => {
            Some("leading zeros in decimal integer literals are not permitted")
        }
        _ => None,
    }
}

/// Whether `print x` style text is still a valid Python 3 expression, as in
/// `print ("x")` or `print >> f, x`
fn reads_as_call(text: &str, keyword: &str) -> bool {
    let rest = text.strip_prefix(keyword).unwrap_or(text).trim_start();
    match rest.chars().next() {
        Some(c) => !(c.is_alphanumeric() || matches!(c, '_' | '\'' | '"' | '{' | '`')),
        None => true,
    }
}

fn has_token_child(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// `0777` is an old octal literal; `0`, `00` and prefixed forms are fine
fn has_leading_zero(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    digits.len() > 1
        && digits.starts_with('0')
        && digits.chars().all(|c| c.is_ascii_digit())
        && digits.chars().any(|c| c != '0')
}
