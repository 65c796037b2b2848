//! Python unit extraction (tree-sitter-python grammar)

use crate::parser::{
    compact_text, glued_trivia_split, node_text, push_children, segment_children, ItemClass,
    RefSink, Segment, UnitDraft,
};
use crate::unit::{Reference, ReferenceKind, UnitKind};
use tree_sitter::Node;

const RECEIVERS: [&str; 2] = ["self", "cls"];

pub(crate) fn extract(root: Node, source: &str) -> Vec<UnitDraft> {
    let mut drafts = Vec::new();

    for segment in segment_children(root, classify) {
        match segment {
            Segment::Definition {
                node,
                leading_start,
            } => {
                let start = leading_start.unwrap_or_else(|| node.start_byte());
                let definition = unwrap_decorated(node);
                match definition.kind() {
                    "class_definition" => {
                        push_class(node, definition, start, source, &mut drafts);
                    }
                    _ => drafts.push(function_draft(
                        node,
                        definition,
                        start,
                        source,
                        None,
                        UnitKind::Function,
                    )),
                }
            }
            Segment::Statements(nodes) => drafts.push(statements_draft(&nodes, source)),
        }
    }

    drafts
}

fn classify(node: Node) -> ItemClass {
    match node.kind() {
        "comment" => ItemClass::Trivia,
        "function_definition" | "class_definition" => ItemClass::Definition,
        "decorated_definition" => match unwrap_decorated(node).kind() {
            "function_definition" | "class_definition" => ItemClass::Definition,
            _ => ItemClass::Statement,
        },
        _ => ItemClass::Statement,
    }
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

fn is_method(node: Node) -> bool {
    unwrap_decorated(node).kind() == "function_definition"
}

/// Class context for methods: (header draft index, class name)
type ClassCtx<'a> = Option<(usize, &'a str)>;

fn function_draft(
    outer: Node,
    definition: Node,
    start: usize,
    source: &str,
    class: ClassCtx,
    kind: UnitKind,
) -> UnitDraft {
    let name = definition
        .child_by_field_name("name")
        .map_or("<anonymous>", |n| node_text(n, source))
        .to_string();

    let mut sink = RefSink::skipping(RECEIVERS.iter().copied().chain([name.as_str()]));
    let class_name = class.map(|(_, name)| name);

    collect_decorators(outer, source, class_name, &mut sink);
    if let Some(body) = definition.child_by_field_name("body") {
        collect_refs(body, source, class_name, &mut sink);
    }

    let qualified_name = match class_name {
        Some(class_name) => format!("{class_name}.{name}"),
        None => name.clone(),
    };

    UnitDraft {
        kind,
        name,
        qualified_name,
        parent: class.map(|(idx, _)| idx),
        start_byte: start,
        end_byte: outer.end_byte(),
        references: sink.into_vec(),
        defines: Vec::new(),
        closing: None,
    }
}

/// Class header unit plus one unit per method
fn push_class(outer: Node, class: Node, start: usize, source: &str, drafts: &mut Vec<UnitDraft>) {
    let name = class
        .child_by_field_name("name")
        .map_or("<anonymous>", |n| node_text(n, source))
        .to_string();

    let mut sink = RefSink::skipping(RECEIVERS.iter().copied().chain([name.as_str()]));
    collect_decorators(outer, source, Some(name.as_str()), &mut sink);

    if let Some(bases) = class.child_by_field_name("superclasses") {
        let mut cursor = bases.walk();
        for base in bases.named_children(&mut cursor) {
            match base.kind() {
                "identifier" => sink.push_name(node_text(base, source), ReferenceKind::Inherit),
                "attribute" => {
                    if let Some(attr) = base.child_by_field_name("attribute") {
                        sink.push(
                            Reference::new(node_text(attr, source), ReferenceKind::Inherit)
                                .qualified(compact_text(base, source)),
                        );
                    }
                }
                _ => collect_refs(base, source, Some(name.as_str()), &mut sink),
            }
        }
    }

    let mut header_end = header_colon_end(class).unwrap_or_else(|| class.end_byte());
    let mut header_nodes: Vec<Node> = Vec::new();
    let mut members: Vec<(Node, usize)> = Vec::new();
    let mut member_runs: Vec<Vec<Node>> = Vec::new();

    if let Some(body) = class.child_by_field_name("body") {
        let mut comments: Vec<Node> = Vec::new();
        let mut run: Vec<Node> = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            if child.kind() == "comment" {
                comments.push(child);
            } else if is_method(child) {
                let split = glued_trivia_split(&comments, child.start_position().row);
                let start = comments.get(split).map_or(child.start_byte(), Node::start_byte);
                if members.is_empty() {
                    header_nodes.extend_from_slice(&comments[..split]);
                } else {
                    run.extend_from_slice(&comments[..split]);
                    flush_run(&mut run, &mut member_runs);
                }
                comments.clear();
                members.push((child, start));
            } else if members.is_empty() {
                header_nodes.append(&mut comments);
                header_nodes.push(child);
            } else {
                run.append(&mut comments);
                run.push(child);
            }
        }
        if members.is_empty() {
            header_nodes.append(&mut comments);
        } else {
            run.append(&mut comments);
            flush_run(&mut run, &mut member_runs);
        }
    }

    if members.is_empty() {
        header_end = outer.end_byte();
    }
    for node in &header_nodes {
        header_end = header_end.max(node.end_byte());
        if node.kind() != "comment" {
            collect_refs(*node, source, Some(name.as_str()), &mut sink);
        }
    }

    let header_idx = drafts.len();
    drafts.push(UnitDraft {
        kind: UnitKind::Class,
        name: name.clone(),
        qualified_name: name.clone(),
        parent: None,
        start_byte: start,
        end_byte: header_end,
        references: sink.into_vec(),
        defines: Vec::new(),
        closing: None,
    });

    for (member, start) in members {
        let definition = unwrap_decorated(member);
        drafts.push(function_draft(
            member,
            definition,
            start,
            source,
            Some((header_idx, name.as_str())),
            UnitKind::Method,
        ));
    }
    for run in &member_runs {
        drafts.push(body_statements_draft(run, source, (header_idx, name.as_str())));
    }
}

/// Keep a run of class-body statements unless it is only comments
fn flush_run<'t>(run: &mut Vec<Node<'t>>, runs: &mut Vec<Vec<Node<'t>>>) {
    if run.iter().any(|node| node.kind() != "comment") {
        runs.push(std::mem::take(run));
    } else {
        run.clear();
    }
}

/// Class attributes and other statements that follow a method
fn body_statements_draft(nodes: &[Node], source: &str, class: (usize, &str)) -> UnitDraft {
    let (header_idx, class_name) = class;
    let line = nodes.first().map_or(1, |n| n.start_position().row + 1);

    let mut draft = statements_draft(nodes, source);
    draft.name = draft
        .defines
        .first()
        .cloned()
        .unwrap_or_else(|| "<body>".to_string());
    draft.qualified_name = format!("{class_name}.<body>:{line}");
    draft.parent = Some(header_idx);
    // class attributes are not module-level bindings
    draft.defines.clear();
    draft
}

fn header_colon_end(class: Node) -> Option<usize> {
    let mut cursor = class.walk();
    let colon = class.children(&mut cursor).find(|c| c.kind() == ":");
    colon.map(|c| c.end_byte())
}

fn statements_draft(nodes: &[Node], source: &str) -> UnitDraft {
    let mut defines = Vec::new();
    let mut sink = RefSink::skipping(RECEIVERS);

    for node in nodes {
        match node.kind() {
            "import_statement" | "import_from_statement" => {
                imported_names(*node, source, &mut defines);
            }
            "expression_statement" => {
                assigned_names(*node, source, &mut defines);
                collect_refs(*node, source, None, &mut sink);
            }
            "comment" => {}
            _ => collect_refs(*node, source, None, &mut sink),
        }
    }

    let start_byte = nodes.first().map_or(0, Node::start_byte);
    let end_byte = nodes.last().map_or(start_byte, Node::end_byte);
    let line = nodes.first().map_or(1, |n| n.start_position().row + 1);

    UnitDraft {
        kind: UnitKind::ModuleStatement,
        name: defines.first().cloned().unwrap_or_else(|| "<module>".to_string()),
        qualified_name: format!("<module>:{line}"),
        parent: None,
        start_byte,
        end_byte,
        references: sink
            .into_vec()
            .into_iter()
            .filter(|r| !defines.contains(&r.name))
            .collect(),
        defines,
        closing: None,
    }
}

fn imported_names(node: Node, source: &str, defines: &mut Vec<String>) {
    let from_import = node.kind() == "import_from_statement";
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let bound = match name.kind() {
            "aliased_import" => name
                .child_by_field_name("alias")
                .map(|alias| node_text(alias, source).to_string()),
            "dotted_name" => {
                let text = node_text(name, source);
                let segment = if from_import {
                    text.rsplit('.').next()
                } else {
                    text.split('.').next()
                };
                segment.map(|s| s.trim().to_string())
            }
            _ => None,
        };
        if let Some(bound) = bound.filter(|b| !b.is_empty()) {
            if !defines.contains(&bound) {
                defines.push(bound);
            }
        }
    }
}

fn assigned_names(statement: Node, source: &str, defines: &mut Vec<String>) {
    let mut cursor = statement.walk();
    for child in statement.named_children(&mut cursor) {
        if !matches!(child.kind(), "assignment" | "augmented_assignment") {
            continue;
        }
        let Some(left) = child.child_by_field_name("left") else {
            continue;
        };
        let mut targets = Vec::new();
        identifiers_in(left, &mut targets);
        for target in targets {
            let name = node_text(target, source).to_string();
            if !defines.contains(&name) {
                defines.push(name);
            }
        }
    }
}

fn identifiers_in<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "identifier" => out.push(node),
            "pattern_list" | "tuple_pattern" | "list_pattern" => push_children(&mut stack, node),
            _ => {}
        }
    }
}

fn collect_decorators(outer: Node, source: &str, class_name: Option<&str>, sink: &mut RefSink) {
    if outer.kind() != "decorated_definition" {
        return;
    }
    let mut cursor = outer.walk();
    for child in outer.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            collect_refs(child, source, class_name, sink);
        }
    }
}

/// Record calls and name uses found under `node`.
///
/// Walks with an explicit stack; expression nesting depth is unbounded.
fn collect_refs(node: Node, source: &str, class_name: Option<&str>, sink: &mut RefSink) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "call" => {
                // arguments are pushed first so the callee is walked before them
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    stack.push(arguments);
                }
                let Some(function) = node.child_by_field_name("function") else {
                    continue;
                };
                match function.kind() {
                    "identifier" => {
                        sink.push_name(node_text(function, source), ReferenceKind::Call);
                    }
                    "attribute" => {
                        if let Some(reference) = attribute_call(function, source, class_name) {
                            sink.push(reference);
                        }
                        if let Some(object) = function.child_by_field_name("object") {
                            stack.push(object);
                        }
                    }
                    _ => stack.push(function),
                }
            }
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    stack.push(object);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    stack.push(value);
                }
            }
            "identifier" => sink.push_name(node_text(node, source), ReferenceKind::Import),
            "parameters" | "lambda_parameters" | "comment" | "string" => {}
            _ => push_children(&mut stack, node),
        }
    }
}

fn attribute_call(function: Node, source: &str, class_name: Option<&str>) -> Option<Reference> {
    let attribute = function.child_by_field_name("attribute")?;
    let name = node_text(attribute, source);
    let path = compact_text(function, source);

    let qualified = match (class_name, path.split_once('.')) {
        (Some(class_name), Some((receiver, rest))) if RECEIVERS.contains(&receiver) => {
            format!("{class_name}.{rest}")
        }
        _ => path,
    };

    Some(Reference::new(name, ReferenceKind::Call).qualified(qualified))
}
