use std::collections::VecDeque;

use tree_sitter::{Node, Tree};

/// Airflow's virtualenv operator, counted as a task regardless of naming
const VIRTUALENV_OPERATOR: &str = "PythonVirtualenvOperator";

/// Structural facts gathered in a single pass over a parsed DAG file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    /// `from airflow import ...` is present
    pub imports_airflow: bool,
    /// `DAG` is among the names imported from `airflow`
    pub imports_dag: bool,
    /// A call to `DAG(...)` or `<expr>.DAG(...)` exists
    pub dag_call_found: bool,
    /// String literal `dag_id=` of the shallowest DAG call
    pub dag_id: Option<String>,
    /// Callee names of every task-constructing call, in source order
    pub task_calls: Vec<String>,
    /// A `>>` (or `>>=`) operator appears anywhere
    pub has_rshift: bool,
}

impl Findings {
    /// Walk `tree` once, recording everything the checks need
    pub fn collect(tree: &Tree, source: &str) -> Self {
        let mut findings = Findings::default();
        let source = source.as_bytes();
        let mut cursor = tree.walk();

        loop {
            findings.visit(cursor.node(), source);

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    if findings.dag_call_found {
                        findings.dag_id = first_dag_id(tree.root_node(), source);
                    }
                    return findings;
                }
            }
        }
    }

    pub fn task_count(&self) -> usize {
        self.task_calls.len()
    }

    fn visit(&mut self, node: Node<'_>, source: &[u8]) {
        match node.kind() {
            "import_from_statement" => self.visit_import_from(node, source),
            "call" => self.visit_call(node, source),
            "binary_operator" | "augmented_assignment" => {
                let is_shift = node
                    .child_by_field_name("operator")
                    .map(|op| matches!(op.kind(), ">>" | ">>="))
                    .unwrap_or(false);
                self.has_rshift |= is_shift;
            }
            _ => {}
        }
    }

    fn visit_import_from(&mut self, node: Node<'_>, source: &[u8]) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        if module.kind() != "dotted_name" || text(module, source) != "airflow" {
            return;
        }
        self.imports_airflow = true;

        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let imported = match name.kind() {
                "aliased_import" => name.child_by_field_name("name"),
                _ => Some(name),
            };
            if imported.map(|n| text(n, source)) == Some("DAG") {
                self.imports_dag = true;
            }
        }
    }

    fn visit_call(&mut self, node: Node<'_>, source: &[u8]) {
        let Some(callee) = callee_name(node, source) else {
            return;
        };

        if callee == "DAG" {
            self.dag_call_found = true;
        }

        if is_task_callee(callee) {
            self.task_calls.push(callee.to_string());
        }
    }
}

/// `dag_id` of the DAG call found first breadth-first, so a module-level DAG
/// wins over one built inside a helper function
pub(crate) fn first_dag_id(root: Node<'_>, source: &[u8]) -> Option<String> {
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        if node.kind() == "call" && callee_name(node, source) == Some("DAG") {
            return keyword_string(node, "dag_id", source);
        }
        let mut cursor = node.walk();
        queue.extend(node.children(&mut cursor));
    }
    None
}

fn is_task_callee(name: &str) -> bool {
    name.ends_with("Operator") || name.ends_with("Sensor") || name == VIRTUALENV_OPERATOR
}

fn text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Bare name or trailing attribute of the called expression
fn callee_name<'a>(call: Node<'_>, source: &'a [u8]) -> Option<&'a str> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(text(function, source)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|attr| text(attr, source)),
        _ => None,
    }
}

/// Value of keyword argument `name` when it is a plain string literal
fn keyword_string(call: Node<'_>, name: &str, source: &[u8]) -> Option<String> {
    let arguments = call.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let keyword = arguments
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "keyword_argument")
        .find(|kw| kw.child_by_field_name("name").map(|n| text(n, source)) == Some(name))?;

    string_literal(keyword.child_by_field_name("value")?, source)
}

fn string_literal(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => unquote(node, source),
        "concatenated_string" => {
            let mut cursor = node.walk();
            let parts: Option<Vec<String>> = node
                .named_children(&mut cursor)
                .map(|part| unquote(part, source))
                .collect();
            parts.map(|p| p.concat())
        }
        _ => None,
    }
}

/// Contents of a non-interpolated `str` literal; f-strings and bytes yield None
fn unquote(node: Node<'_>, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let raw = text(node, source);
    let prefix_len = raw.find(|c: char| c == '\'' || c == '"')?;
    let prefix = raw[..prefix_len].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let literal = &raw[prefix_len..];
    let quote = if literal.starts_with("\"\"\"") || literal.starts_with("'''") {
        &literal[..3]
    } else {
        &literal[..1]
    };
    let body = literal.strip_prefix(quote)?.strip_suffix(quote)?;

    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(escaped @ ('\\' | '\'' | '"')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn findings(code: &str) -> Findings {
        let tree = parse(code).unwrap();
        Findings::collect(&tree, code)
    }

    #[test]
    fn test_import_variants() {
        let f = findings("from airflow import DAG\n");
        assert!(f.imports_airflow && f.imports_dag);

        let f = findings("from airflow import DAG as Dag, Dataset\n");
        assert!(f.imports_airflow && f.imports_dag);

        let f = findings("from airflow import Dataset\n");
        assert!(f.imports_airflow && !f.imports_dag);

        let f = findings("from airflow.models import DAG\nimport airflow\n");
        assert!(!f.imports_airflow && !f.imports_dag);
    }

    #[test]
    fn test_dag_call_and_id() {
        let f = findings("dag = DAG(dag_id='daily_sales', schedule='@daily')\n");
        assert!(f.dag_call_found);
        assert_eq!(f.dag_id.as_deref(), Some("daily_sales"));

        let f = findings("with models.DAG(dag_id=\"etl\") as dag:\n    pass\n");
        assert!(f.dag_call_found);
        assert_eq!(f.dag_id.as_deref(), Some("etl"));
    }

    #[test]
    fn test_dag_id_only_from_literals() {
        let f = findings("dag = DAG(dag_id=name)\n");
        assert!(f.dag_call_found);
        assert_eq!(f.dag_id, None);

        let f = findings("dag = DAG(dag_id=f'{prefix}_etl')\n");
        assert_eq!(f.dag_id, None);

        let f = findings("dag = DAG('positional_id')\n");
        assert!(f.dag_call_found);
        assert_eq!(f.dag_id, None);
    }

    #[test]
    fn test_dag_id_literal_forms() {
        let f = findings("dag = DAG(dag_id='a' 'b')\n");
        assert_eq!(f.dag_id.as_deref(), Some("ab"));

        let f = findings("dag = DAG(dag_id=r'raw\\id')\n");
        assert_eq!(f.dag_id.as_deref(), Some("raw\\id"));

        let f = findings("dag = DAG(dag_id='''triple''')\n");
        assert_eq!(f.dag_id.as_deref(), Some("triple"));
    }

    #[test]
    fn test_first_dag_call_wins() {
        let f = findings("a = DAG(dag_id='first')\nb = DAG(dag_id='second')\n");
        assert_eq!(f.dag_id.as_deref(), Some("first"));
    }

    #[test]
    fn test_module_level_dag_beats_helper_dag() {
        let code = "\
def make_backfill():
    return DAG(dag_id='backfill_helper')

dag = DAG(dag_id='daily_sales')
";
        let f = findings(code);
        assert!(f.dag_call_found);
        assert_eq!(f.dag_id.as_deref(), Some("daily_sales"));
    }

    #[test]
    fn test_shallowest_dag_call_without_id_yields_none() {
        let code = "\
def make_backfill():
    return DAG(dag_id='backfill_helper')

dag = DAG(name)
";
        assert_eq!(findings(code).dag_id, None);
    }

    #[test]
    fn test_task_calls() {
        let code = "\
a = PythonOperator(task_id='a')
b = operators.BashOperator(task_id='b')
c = FileSensor(task_id='c')
d = PythonVirtualenvOperator(task_id='d')
e = print('not a task')
";
        let f = findings(code);
        assert_eq!(
            f.task_calls,
            vec!["PythonOperator", "BashOperator", "FileSensor", "PythonVirtualenvOperator"]
        );
    }

    #[test]
    fn test_shift_detection() {
        assert!(findings("a >> b\n").has_rshift);
        assert!(findings("a >> [b, c]\n").has_rshift);
        assert!(findings("x >>= y\n").has_rshift);
        assert!(!findings("a << b\n").has_rshift);
        assert!(!findings("x = '>>'\n").has_rshift);
    }
}
