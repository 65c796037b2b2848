//! Rust unit extraction (tree-sitter-rust grammar)

use crate::parser::{
    compact_text, glued_trivia_split, node_text, push_children, segment_children, ItemClass,
    RefSink, Segment, UnitDraft,
};
use crate::unit::{Reference, ReferenceKind, UnitKind};
use tree_sitter::Node;

pub(crate) fn extract(root: Node, source: &str) -> Vec<UnitDraft> {
    let mut drafts = Vec::new();

    for segment in segment_children(root, classify) {
        match segment {
            Segment::Definition {
                node,
                leading_start,
            } => {
                let start = leading_start.unwrap_or_else(|| node.start_byte());
                match node.kind() {
                    "function_item" => {
                        let draft = function_draft(node, start, source, None, UnitKind::Function);
                        drafts.push(draft);
                    }
                    "impl_item" | "trait_item" => push_container(node, start, source, &mut drafts),
                    _ => drafts.push(type_draft(node, start, source)),
                }
            }
            Segment::Statements(nodes) => drafts.push(statements_draft(&nodes, source)),
        }
    }

    drafts
}

fn classify(node: Node) -> ItemClass {
    match node.kind() {
        "line_comment" | "block_comment" | "attribute_item" => ItemClass::Trivia,
        "function_item" | "struct_item" | "enum_item" | "union_item" | "trait_item"
        | "impl_item" => ItemClass::Definition,
        _ => ItemClass::Statement,
    }
}

fn is_member_fn(node: Node) -> bool {
    matches!(node.kind(), "function_item" | "function_signature_item")
}

/// Owner context for methods: (header draft index, owner type name)
type OwnerCtx<'a> = Option<(usize, &'a str)>;

fn function_draft(
    node: Node,
    start: usize,
    source: &str,
    owner: OwnerCtx,
    kind: UnitKind,
) -> UnitDraft {
    let name = field_text(node, "name", source);
    let owner_name = owner.map(|(_, name)| name);

    let mut sink = RefSink::skipping([name.as_str(), "Self"]);
    for field in ["parameters", "return_type", "body"] {
        if let Some(child) = node.child_by_field_name(field) {
            collect_refs(child, source, owner_name, &mut sink);
        }
    }

    UnitDraft {
        kind,
        qualified_name: owner_name
            .map_or_else(|| name.clone(), |owner| format!("{owner}::{name}")),
        name,
        parent: owner.map(|(idx, _)| idx),
        start_byte: start,
        end_byte: node.end_byte(),
        references: sink.into_vec(),
        defines: Vec::new(),
        closing: None,
    }
}

/// struct / enum / union definitions
fn type_draft(node: Node, start: usize, source: &str) -> UnitDraft {
    let name = field_text(node, "name", source);
    let mut sink = RefSink::skipping([name.as_str(), "Self"]);

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "type_identifier" || child.start_byte() != name_start(node) {
            collect_refs(child, source, Some(name.as_str()), &mut sink);
        }
    }

    UnitDraft {
        kind: UnitKind::Class,
        qualified_name: name.clone(),
        name,
        parent: None,
        start_byte: start,
        end_byte: node.end_byte(),
        references: sink.into_vec(),
        defines: Vec::new(),
        closing: None,
    }
}

fn name_start(node: Node) -> usize {
    node.child_by_field_name("name")
        .map_or(usize::MAX, |n| n.start_byte())
}

/// `impl` or `trait` header plus one unit per member function
fn push_container(node: Node, start: usize, source: &str, drafts: &mut Vec<UnitDraft>) {
    let is_impl = node.kind() == "impl_item";

    let (name, qualified_name) = if is_impl {
        let type_name = node
            .child_by_field_name("type")
            .map_or_else(|| "<unknown>".to_string(), |t| base_type_name(t, source));
        let qualified = match node.child_by_field_name("trait") {
            Some(t) => format!("impl {} for {type_name}", base_type_name(t, source)),
            None => format!("impl {type_name}"),
        };
        (type_name, qualified)
    } else {
        let trait_name = field_text(node, "name", source);
        (trait_name.clone(), trait_name)
    };

    let mut sink = RefSink::skipping(["Self"]);
    if is_impl {
        for field in ["trait", "type"] {
            if let Some(target) = node.child_by_field_name(field) {
                let target_name = base_type_name(target, source);
                let path = compact_text(target, source);
                let reference = Reference::new(target_name, ReferenceKind::Inherit);
                sink.push(if path.contains("::") {
                    reference.qualified(path)
                } else {
                    reference
                });
            }
        }
    } else if let Some(bounds) = node.child_by_field_name("bounds") {
        let mut cursor = bounds.walk();
        for bound in bounds.named_children(&mut cursor) {
            sink.push(Reference::new(
                base_type_name(bound, source),
                ReferenceKind::Inherit,
            ));
        }
    }

    let mut header_end = node.end_byte();
    let mut closing = None;
    let mut members: Vec<(Node, usize)> = Vec::new();
    let mut member_runs: Vec<Vec<Node>> = Vec::new();

    if let Some(body) = node.child_by_field_name("body") {
        let mut header_nodes: Vec<Node> = Vec::new();
        let mut trivia: Vec<Node> = Vec::new();
        let mut run: Vec<Node> = Vec::new();
        let mut cursor = body.walk();
        for child in body.named_children(&mut cursor) {
            match child.kind() {
                "line_comment" | "block_comment" | "attribute_item" => trivia.push(child),
                _ if is_member_fn(child) => {
                    let split = glued_trivia_split(&trivia, child.start_position().row);
                    let member_start = trivia
                        .get(split)
                        .map_or(child.start_byte(), Node::start_byte);
                    if members.is_empty() {
                        header_nodes.extend_from_slice(&trivia[..split]);
                    } else {
                        run.extend_from_slice(&trivia[..split]);
                        flush_run(&mut run, &mut member_runs);
                    }
                    trivia.clear();
                    members.push((child, member_start));
                }
                _ if members.is_empty() => {
                    header_nodes.append(&mut trivia);
                    header_nodes.push(child);
                }
                _ => {
                    run.append(&mut trivia);
                    run.push(child);
                }
            }
        }
        if !members.is_empty() {
            run.append(&mut trivia);
            flush_run(&mut run, &mut member_runs);

            header_end = opening_brace_end(body).unwrap_or_else(|| body.start_byte());
            for header_node in &header_nodes {
                header_end = header_end.max(header_node.end_byte());
            }
            closing = closing_brace(body);
        }
        for header_node in &header_nodes {
            collect_refs(*header_node, source, Some(name.as_str()), &mut sink);
        }
    }

    let header_idx = drafts.len();
    drafts.push(UnitDraft {
        kind: UnitKind::Class,
        name: name.clone(),
        qualified_name,
        parent: None,
        start_byte: start,
        end_byte: header_end,
        references: sink.into_vec(),
        defines: Vec::new(),
        closing,
    });

    for (member, member_start) in members {
        drafts.push(function_draft(
            member,
            member_start,
            source,
            Some((header_idx, name.as_str())),
            UnitKind::Method,
        ));
    }
    for run in &member_runs {
        drafts.push(body_items_draft(run, source, (header_idx, name.as_str())));
    }
}

/// Keep a run of associated items unless it is only comments and attributes
fn flush_run<'t>(run: &mut Vec<Node<'t>>, runs: &mut Vec<Vec<Node<'t>>>) {
    let has_item = run.iter().any(|n| {
        !matches!(
            n.kind(),
            "line_comment" | "block_comment" | "attribute_item"
        )
    });
    if has_item {
        runs.push(std::mem::take(run));
    } else {
        run.clear();
    }
}

/// Associated consts, types and macro calls that follow a method
fn body_items_draft(nodes: &[Node], source: &str, owner: (usize, &str)) -> UnitDraft {
    let (header_idx, owner_name) = owner;
    let line = nodes.first().map_or(1, |n| n.start_position().row + 1);

    let mut draft = statements_draft(nodes, source);
    draft.name = draft
        .defines
        .first()
        .cloned()
        .unwrap_or_else(|| "<body>".to_string());
    draft.qualified_name = format!("{owner_name}::<body>:{line}");
    draft.parent = Some(header_idx);
    // associated items are not module-level bindings
    draft.defines.clear();
    draft
}

fn opening_brace_end(body: Node) -> Option<usize> {
    let mut cursor = body.walk();
    let brace = body.children(&mut cursor).find(|c| c.kind() == "{");
    brace.map(|c| c.end_byte())
}

fn closing_brace(body: Node) -> Option<(usize, usize)> {
    let mut cursor = body.walk();
    let brace = body.children(&mut cursor).filter(|c| c.kind() == "}").last();
    brace.map(|c| (c.start_byte(), c.end_byte()))
}

fn statements_draft(nodes: &[Node], source: &str) -> UnitDraft {
    let mut defines = Vec::new();
    let mut sink = RefSink::skipping(["Self"]);

    for node in nodes {
        match node.kind() {
            "line_comment" | "block_comment" => {}
            "use_declaration" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    used_names(argument, source, &mut defines);
                }
            }
            "const_item" | "static_item" | "type_item" | "mod_item" | "macro_definition" => {
                let name = field_text(*node, "name", source);
                if !name.is_empty() && !defines.contains(&name) {
                    defines.push(name);
                }
                collect_refs(*node, source, None, &mut sink);
            }
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

/// Names brought into scope by a `use` tree
fn used_names(node: Node, source: &str, defines: &mut Vec<String>) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        let bound = match node.kind() {
            "identifier" | "type_identifier" => Some(node_text(node, source).to_string()),
            "scoped_identifier" => node
                .child_by_field_name("name")
                .map(|n| node_text(n, source).to_string()),
            "use_as_clause" => node
                .child_by_field_name("alias")
                .map(|n| node_text(n, source).to_string()),
            "scoped_use_list" => {
                if let Some(list) = node.child_by_field_name("list") {
                    stack.push(list);
                }
                None
            }
            "use_list" => {
                push_children(&mut stack, node);
                None
            }
            _ => None,
        };

        if let Some(bound) = bound.filter(|b| b != "self") {
            if !defines.contains(&bound) {
                defines.push(bound);
            }
        }
    }
}

fn field_text(node: Node, field: &str, source: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default()
}

/// `inner::Wrapper<'a>` -> `Wrapper`, `&mut Foo` -> `Foo`
fn base_type_name(node: Node, source: &str) -> String {
    let mut node = node;
    loop {
        match node.kind() {
            "generic_type" | "reference_type" | "pointer_type" => {
                match node.child_by_field_name("type") {
                    Some(inner) => node = inner,
                    None => return compact_text(node, source),
                }
            }
            "scoped_type_identifier" | "scoped_identifier" => {
                return node
                    .child_by_field_name("name")
                    .map_or_else(|| compact_text(node, source), |n| node_text(n, source).to_string());
            }
            _ => return compact_text(node, source),
        }
    }
}

/// Record calls, type uses and value uses found under `node`.
///
/// Walks with an explicit stack; expression nesting depth is unbounded.
fn collect_refs(node: Node, source: &str, owner: Option<&str>, sink: &mut RefSink) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node.kind() {
            "call_expression" => {
                // arguments are pushed first so the callee is walked before them
                if let Some(arguments) = node.child_by_field_name("arguments") {
                    stack.push(arguments);
                }
                if let Some(function) = node.child_by_field_name("function") {
                    push_call(function, source, owner, sink, &mut stack);
                }
            }
            "field_expression" => {
                if let Some(value) = node.child_by_field_name("value") {
                    stack.push(value);
                }
            }
            "type_identifier" | "identifier" => {
                sink.push_name(node_text(node, source), ReferenceKind::Import);
            }
            "scoped_identifier" | "scoped_type_identifier" => {
                if let Some(name) = node.child_by_field_name("name") {
                    sink.push(
                        Reference::new(node_text(name, source), ReferenceKind::Import)
                            .qualified(qualify_path(&compact_text(node, source), owner)),
                    );
                }
            }
            "line_comment" | "block_comment" | "string_literal" | "raw_string_literal" => {}
            _ => push_children(&mut stack, node),
        }
    }
}

/// Record the callee of a call; sub-expressions left to walk go on `pending`
fn push_call<'t>(
    function: Node<'t>,
    source: &str,
    owner: Option<&str>,
    sink: &mut RefSink,
    pending: &mut Vec<Node<'t>>,
) {
    let mut function = function;
    while function.kind() == "generic_function" {
        match function.child_by_field_name("function") {
            Some(inner) => function = inner,
            None => return,
        }
    }

    match function.kind() {
        "identifier" => sink.push_name(node_text(function, source), ReferenceKind::Call),
        "field_expression" => {
            let Some(field) = function.child_by_field_name("field") else {
                return;
            };
            let receiver = function.child_by_field_name("value");
            let mut reference = Reference::new(node_text(field, source), ReferenceKind::Call);
            if let (Some(owner), Some("self")) = (owner, receiver.map(|r| node_text(r, source))) {
                reference = reference.qualified(format!("{owner}::{}", node_text(field, source)));
            }
            sink.push(reference);
            if let Some(receiver) = receiver {
                pending.push(receiver);
            }
        }
        "scoped_identifier" => {
            let Some(name) = function.child_by_field_name("name") else {
                return;
            };
            sink.push(
                Reference::new(node_text(name, source), ReferenceKind::Call)
                    .qualified(qualify_path(&compact_text(function, source), owner)),
            );
            if let Some(path) = function.child_by_field_name("path") {
                let owner_name = base_type_name(path, source);
                sink.push_name(&owner_name, ReferenceKind::Import);
            }
        }
        _ => pending.push(function),
    }
}

/// Normalize a Rust path so it can match a qualified unit name
fn qualify_path(path: &str, owner: Option<&str>) -> String {
    let mut path = path;
    for prefix in ["crate::", "self::", "super::"] {
        while let Some(rest) = path.strip_prefix(prefix) {
            path = rest;
        }
    }
    match (owner, path.strip_prefix("Self::")) {
        (Some(owner), Some(rest)) => format!("{owner}::{rest}"),
        _ => path.to_string(),
    }
}
