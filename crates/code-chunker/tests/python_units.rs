use haste_code_chunker::{parse_source, Language, ReferenceKind, Unit, UnitKind};
use pretty_assertions::assert_eq;

const STATS_CODE: &str = r#"
def calculate_sum(numbers):
    """Calculate sum of numbers."""
    total = 0
    for num in numbers:
        total += num
    return total

def calculate_average(numbers):
    """Calculate average of numbers."""
    if len(numbers) == 0:
        return 0
    return calculate_sum(numbers) / len(numbers)

class DataProcessor:
    """Data processing class."""

    def __init__(self, data):
        self.data = data

    def process(self):
        return calculate_average(self.data)

    def get_statistics(self):
        stats = self.process()
        return {'mean': stats}
"#;

fn find<'a>(units: &'a [Unit], name: &str) -> &'a Unit {
    units
        .iter()
        .find(|unit| unit.name == name)
        .unwrap_or_else(|| panic!("missing unit {name}"))
}

fn calls(unit: &Unit) -> Vec<&str> {
    unit.references_of(ReferenceKind::Call)
        .map(|r| r.name.as_str())
        .collect()
}

#[test]
fn functions_classes_and_methods_become_units() {
    let units = parse_source(STATS_CODE, Language::Python).expect("parse python");

    let summary: Vec<(&str, UnitKind)> = units
        .iter()
        .map(|unit| (unit.qualified_name.as_str(), unit.kind))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("calculate_sum", UnitKind::Function),
            ("calculate_average", UnitKind::Function),
            ("DataProcessor", UnitKind::Class),
            ("DataProcessor.__init__", UnitKind::Method),
            ("DataProcessor.process", UnitKind::Method),
            ("DataProcessor.get_statistics", UnitKind::Method),
        ]
    );

    for (idx, unit) in units.iter().enumerate() {
        assert_eq!(unit.id.index(), idx);
        assert_eq!(
            unit.text.as_str(),
            &STATS_CODE[unit.span.start_byte..unit.span.end_byte]
        );
    }
}

#[test]
fn spans_are_line_accurate_and_keep_indentation() {
    let units = parse_source(STATS_CODE, Language::Python).expect("parse python");

    let sum = find(&units, "calculate_sum");
    assert_eq!(sum.span.start_line, 2);
    assert_eq!(sum.span.end_line, 7);
    assert!(sum.text.starts_with("def calculate_sum(numbers):"));

    let init = find(&units, "__init__");
    assert!(init.text.starts_with("    def __init__(self, data):"));
}

#[test]
fn class_header_stops_before_first_method() {
    let units = parse_source(STATS_CODE, Language::Python).expect("parse python");

    let class = find(&units, "DataProcessor");
    assert!(class.text.starts_with("class DataProcessor:"));
    assert!(class.text.contains("Data processing class."));
    assert!(!class.text.contains("def __init__"));

    for method in ["__init__", "process", "get_statistics"] {
        assert_eq!(find(&units, method).parent, Some(class.id));
    }
}

#[test]
fn calls_are_recorded_with_self_rewritten_to_class() {
    let units = parse_source(STATS_CODE, Language::Python).expect("parse python");

    let average = find(&units, "calculate_average");
    assert!(calls(average).contains(&"calculate_sum"));
    assert!(calls(average).contains(&"len"));

    let process = find(&units, "process");
    assert_eq!(calls(process), vec!["calculate_average"]);

    let stats = find(&units, "get_statistics");
    let self_call = stats
        .references_of(ReferenceKind::Call)
        .find(|r| r.name == "process")
        .expect("self.process call");
    assert_eq!(self_call.qualified.as_deref(), Some("DataProcessor.process"));
}

#[test]
fn module_statements_record_bound_names() {
    let code = "import os\nfrom typing import List, Optional as Opt\n\nTHRESHOLD = 10\n\ndef over(values):\n    return [v for v in values if v > THRESHOLD]\n";
    let units = parse_source(code, Language::Python).expect("parse python");

    assert_eq!(units.len(), 2);
    let module = &units[0];
    assert_eq!(module.kind, UnitKind::ModuleStatement);
    assert_eq!(module.defines, vec!["os", "List", "Opt", "THRESHOLD"]);
    assert_eq!(module.span.start_line, 1);
    assert_eq!(module.span.end_line, 4);

    let over = &units[1];
    assert!(over
        .references_of(ReferenceKind::Import)
        .any(|r| r.name == "THRESHOLD"));
}

#[test]
fn superclasses_are_inherit_references() {
    let code = "class Base:\n    pass\n\nclass Child(Base, abc.ABC):\n    def run(self):\n        return 1\n";
    let units = parse_source(code, Language::Python).expect("parse python");

    let child = find(&units, "Child");
    let bases: Vec<&str> = child
        .references_of(ReferenceKind::Inherit)
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(bases, vec!["Base", "ABC"]);

    let base = find(&units, "Base");
    assert_eq!(base.text, "class Base:\n    pass");
}

#[test]
fn adjacent_comments_and_decorators_stay_with_definition() {
    let code = "# cached helper\n@cache\ndef cached():\n    return compute()\n";
    let units = parse_source(code, Language::Python).expect("parse python");

    assert_eq!(units.len(), 1);
    let cached = &units[0];
    assert_eq!(cached.name, "cached");
    assert!(cached.text.starts_with("# cached helper\n@cache"));
    assert_eq!(calls(cached), vec!["compute"]);
    assert!(cached
        .references_of(ReferenceKind::Import)
        .any(|r| r.name == "cache"));
}

#[test]
fn broken_source_degrades_to_one_opaque_unit() {
    let code = "def broken(:\n    return\n";
    let units = parse_source(code, Language::Python).expect("garbled input is not an error");

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].kind, UnitKind::Opaque);
    assert_eq!(units[0].text, code);
    assert!(units[0].references.is_empty());
}

#[test]
fn comment_only_source_is_one_module_unit() {
    let code = "# nothing to see here\n";
    let units = parse_source(code, Language::Python).expect("parse python");

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].kind, UnitKind::ModuleStatement);
    assert_eq!(units[0].text, "# nothing to see here");
}

#[test]
fn class_statements_after_methods_are_member_units() {
    let code = "class Counter:\n    def bump(self):\n        return 1\n\n    limit = 10\n    step = limit // 2\n\n    def reset(self):\n        return 0\n";
    let units = parse_source(code, Language::Python).expect("parse python");

    let class = find(&units, "Counter");
    let body = find(&units, "limit");
    assert_eq!(body.kind, UnitKind::ModuleStatement);
    assert_eq!(body.parent, Some(class.id));
    assert_eq!(body.qualified_name, "Counter.<body>:5");
    assert_eq!(body.text, "    limit = 10\n    step = limit // 2");
    assert!(body.defines.is_empty());
    assert!(class.closing.is_none());

    let order: Vec<&str> = units.iter().map(|unit| unit.name.as_str()).collect();
    assert_eq!(order, vec!["Counter", "bump", "limit", "reset"]);
}

#[test]
fn deeply_nested_expressions_parse() {
    let depth = 5_000;
    let code = format!(
        "def nested():\n    return {}helper(){}\n",
        "(".repeat(depth),
        ")".repeat(depth)
    );
    let units = parse_source(&code, Language::Python).expect("parse python");

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].kind, UnitKind::Function);
    assert_eq!(calls(&units[0]), vec!["helper"]);
}
