//! Signature and docstring extraction for Python function definitions

use tree_sitter::Node;

/// Names of a receiver-like first parameter that is left out of signatures
const RECEIVER_NAMES: [&str; 2] = ["self", "cls"];

fn text<'a>(node: Node<'_>, src: &'a [u8]) -> &'a str {
    node.utf8_text(src).unwrap_or("")
}

/// Collapse runs of whitespace so multi-line annotations render on one line
fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Respell an annotation the way `ast.unparse` prints it
///
/// One space after commas and around `|`, none just inside brackets or
/// before a comma. Quoted forward references are copied as written.
fn canonical_annotation(raw: &str) -> String {
    fn trim_space(out: &mut String) {
        while out.ends_with(' ') {
            out.pop();
        }
    }

    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    for c in raw.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            c if c.is_whitespace() => {
                if !out.is_empty() && !out.ends_with([' ', '[', '(']) {
                    out.push(' ');
                }
            }
            ',' => {
                trim_space(&mut out);
                out.push_str(", ");
            }
            '|' => {
                trim_space(&mut out);
                out.push_str(" | ");
            }
            '[' | ']' | '(' | ')' => {
                trim_space(&mut out);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}

fn annotated(head: &str, annotation: Option<Node<'_>>, src: &[u8]) -> String {
    match annotation.map(|n| canonical_annotation(text(n, src))) {
        Some(ann) if !ann.is_empty() => format!("{}: {}", head, ann),
        _ => head.to_string(),
    }
}

/// Render `name(params) -> ret` for a `function_definition` node
///
/// Parameters keep their annotations, defaults collapse to `= ...`.
/// Positional-only parameters before `/` and keyword-only parameters after
/// `*` or `*args` are not rendered.
pub(crate) fn format_signature(func: Node<'_>, src: &[u8]) -> String {
    let name = func.child_by_field_name("name").map(|n| text(n, src)).unwrap_or("");
    let mut params: Vec<String> = Vec::new();
    let mut keyword_only = false;
    let mut first = true;

    if let Some(parameters) = func.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        for param in parameters.named_children(&mut cursor) {
            let is_first = std::mem::replace(&mut first, false);
            match param.kind() {
                "comment" => {
                    first = is_first;
                }
                "positional_separator" => params.clear(),
                "keyword_separator" => keyword_only = true,
                "list_splat_pattern" => {
                    keyword_only = true;
                    params.push(text(param, src).to_string());
                }
                "dictionary_splat_pattern" => params.push(text(param, src).to_string()),
                "typed_parameter" => {
                    let head = param.named_child(0).map(|n| (n.kind(), text(n, src))).unwrap_or(("", ""));
                    let annotation = param.child_by_field_name("type");
                    match head.0 {
                        "list_splat_pattern" => {
                            keyword_only = true;
                            params.push(annotated(head.1, annotation, src));
                        }
                        "dictionary_splat_pattern" => params.push(annotated(head.1, annotation, src)),
                        _ if keyword_only => {}
                        _ if is_first && RECEIVER_NAMES.contains(&head.1) => {}
                        _ => params.push(annotated(head.1, annotation, src)),
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let pname = param.child_by_field_name("name").map(|n| text(n, src)).unwrap_or("");
                    if keyword_only || (is_first && RECEIVER_NAMES.contains(&pname)) {
                        continue;
                    }
                    let head = annotated(pname, param.child_by_field_name("type"), src);
                    params.push(format!("{} = ...", head));
                }
                _ => {
                    let pname = text(param, src);
                    if keyword_only || (is_first && RECEIVER_NAMES.contains(&pname)) {
                        continue;
                    }
                    params.push(squash(pname));
                }
            }
        }
    }

    let ret = func
        .child_by_field_name("return_type")
        .map(|n| format!(" -> {}", canonical_annotation(text(n, src))))
        .unwrap_or_default();

    format!("{}({}){}", name, params.join(", "), ret)
}

/// Docstring of a function or class body, cleaned like `inspect.cleandoc`
pub(crate) fn docstring(def: Node<'_>, src: &[u8]) -> String {
    let Some(body) = def.child_by_field_name("body") else {
        return String::new();
    };
    let mut cursor = body.walk();
    let Some(stmt) = body.named_children(&mut cursor).find(|n| n.kind() != "comment") else {
        return String::new();
    };
    if stmt.kind() != "expression_statement" || stmt.named_child_count() != 1 {
        return String::new();
    }
    let Some(string) = stmt.named_child(0).filter(|n| n.kind() == "string") else {
        return String::new();
    };

    let mut cursor = string.walk();
    let mut start = None;
    let mut end = None;
    for part in string.children(&mut cursor) {
        match part.kind() {
            "string_start" => start = Some(part.end_byte()),
            "string_end" => end = Some(part.start_byte()),
            _ => {}
        }
    }
    match (start, end) {
        (Some(s), Some(e)) if s <= e => cleandoc(&String::from_utf8_lossy(&src[s..e])),
        _ => String::new(),
    }
}

/// Strip the uniform indentation of continuation lines and blank edges
fn cleandoc(raw: &str) -> String {
    let expanded = raw.replace('\t', "        ");
    let mut lines: Vec<&str> = expanded.lines().collect();
    if lines.is_empty() {
        return String::new();
    }

    let margin = lines[1..]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    out.push(lines.remove(0).trim_start().to_string());
    for line in lines {
        out.push(line.get(margin..).unwrap_or("").trim_end().to_string());
    }

    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}
