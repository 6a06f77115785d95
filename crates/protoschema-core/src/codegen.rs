//! Rust source emission for a compiled unit.
//!
//! Every generated type gets two functions:
//!
//! - `<Ident>_json_schema()` returns the ref-as-root document
//! - `<Ident>_json_schema_with_defs(defs)` registers the type in a shared
//!   registry and returns a `$ref` to it
//!
//! The emitted module depends only on `protoschema_core`.

use crate::generate::{CompiledUnit, GeneratedType, Origin};
use crate::schema::Schema;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

const INDENT: &str = "    ";

/// Render the module for `unit`. `generated_on` adds a timestamp line.
pub fn render(unit: &CompiledUnit, version: &str, generated_on: Option<DateTime<Utc>>) -> String {
    let mut out = String::new();
    out.push_str("// Code generated by protoschema. DO NOT EDIT.\n");
    out.push_str("//\n");
    let _ = writeln!(out, "// Source: {}", unit.source);
    let _ = writeln!(out, "// Generator version: {version}");
    if let Some(ts) = generated_on {
        out.push_str("//\n");
        let _ = writeln!(out, "// Generated on: {} UTC", ts.format("%Y-%m-%d %H:%M:%S"));
    }
    out.push('\n');
    out.push_str("#![allow(non_snake_case)]\n\n");
    out.push_str("use protoschema_core::{Definitions, InstanceType, Schema};\n");

    for t in &unit.types {
        out.push('\n');
        render_type(&mut out, t, &unit.callees);
    }
    out
}

fn render_type(out: &mut String, t: &GeneratedType, callees: &BTreeMap<String, String>) {
    let key = format!("{:?}", t.full_name);
    let short = t.full_name.rsplit('.').next().unwrap_or(&t.full_name);

    match t.origin {
        Origin::Local => {
            let _ = writeln!(out, "/// JSON Schema for the `{short}` message.");
        }
        Origin::Shared => {
            let _ = writeln!(
                out,
                "/// JSON Schema for the shared `{}` message.",
                t.full_name
            );
        }
    }
    let _ = writeln!(out, "pub fn {}_json_schema() -> Schema {{", t.ident);
    let _ = writeln!(out, "{INDENT}let mut defs = Definitions::new();");
    let _ = writeln!(out, "{INDENT}let _ = {}_json_schema_with_defs(&mut defs);", t.ident);
    let _ = writeln!(out, "{INDENT}Schema::root_reference({key}, defs)");
    out.push_str("}\n\n");

    let _ = writeln!(
        out,
        "pub fn {}_json_schema_with_defs(defs: &mut Definitions) -> Schema {{",
        t.ident
    );
    let _ = writeln!(out, "{INDENT}if defs.contains_key({key}) {{");
    let _ = writeln!(out, "{INDENT}{INDENT}return Schema::reference({key});");
    let _ = writeln!(out, "{INDENT}}}");
    let _ = writeln!(out, "{INDENT}// Register first so self-references resolve to a $ref.");
    let _ = writeln!(out, "{INDENT}defs.insert({key}.to_string(), Schema::default());");
    out.push('\n');
    let _ = writeln!(
        out,
        "{INDENT}let schema = {};",
        literal(&t.shape, callees, 1)
    );
    let _ = writeln!(out, "{INDENT}defs.insert({key}.to_string(), schema);");
    let _ = writeln!(out, "{INDENT}Schema::reference({key})");
    out.push_str("}\n");
}

fn string(s: &str) -> String {
    format!("{s:?}.to_string()")
}

/// A Rust expression that evaluates to `node`.
///
/// `$ref`s become calls to the referenced type's builder so the registry is
/// populated as a side effect; other keywords become struct fields.
fn literal(node: &Schema, callees: &BTreeMap<String, String>, depth: usize) -> String {
    let pad = INDENT.repeat(depth + 1);
    let close = INDENT.repeat(depth);
    let nested = |child: &Schema| literal(child, callees, depth + 1);
    let boxed = |child: &Schema| format!("Some(Box::new({}))", nested(child));
    let list = |children: &[Schema]| {
        let items: Vec<String> = children
            .iter()
            .map(|c| format!("{pad}{INDENT}{},\n", literal(c, callees, depth + 2)))
            .collect();
        format!("vec![\n{}{pad}]", items.concat())
    };

    let mut fields: Vec<(&str, String)> = Vec::new();
    if let Some(t) = node.instance_type {
        fields.push(("instance_type", format!("Some(InstanceType::{t:?})")));
    }
    let strings = [
        ("title", &node.title),
        ("description", &node.description),
        ("format", &node.format),
        ("pattern", &node.pattern),
        ("content_encoding", &node.content_encoding),
        ("content_media_type", &node.content_media_type),
    ];
    for (name, value) in strings {
        if let Some(v) = value {
            fields.push((name, format!("Some({})", string(v))));
        }
    }
    let counts = [
        ("min_length", node.min_length),
        ("max_length", node.max_length),
        ("min_items", node.min_items),
        ("max_items", node.max_items),
        ("min_properties", node.min_properties),
        ("max_properties", node.max_properties),
    ];
    for (name, value) in counts {
        if let Some(v) = value {
            fields.push((name, format!("Some({v})")));
        }
    }
    let bounds = [
        ("minimum", node.minimum),
        ("maximum", node.maximum),
        ("exclusive_minimum", node.exclusive_minimum),
        ("exclusive_maximum", node.exclusive_maximum),
    ];
    for (name, value) in bounds {
        if let Some(v) = value {
            fields.push((name, format!("Some({v:?})")));
        }
    }
    if !node.enum_values.is_empty() {
        let values: Vec<String> = node.enum_values.iter().map(i64::to_string).collect();
        fields.push(("enum_values", format!("vec![{}]", values.join(", "))));
    }
    if let Some(unique) = node.unique_items {
        fields.push(("unique_items", format!("Some({unique})")));
    }
    if let Some(items) = &node.items {
        fields.push(("items", boxed(items)));
    }
    if !node.properties.is_empty() {
        let entries: Vec<String> = node
            .properties
            .iter()
            .map(|(name, child)| {
                format!(
                    "{pad}{INDENT}({}, {}),\n",
                    string(name),
                    literal(child, callees, depth + 2)
                )
            })
            .collect();
        fields.push((
            "properties",
            format!("[\n{}{pad}]\n{pad}.into_iter()\n{pad}.collect()", entries.concat()),
        ));
    }
    if !node.required.is_empty() {
        let names: Vec<String> = node.required.iter().map(|n| string(n)).collect();
        fields.push(("required", format!("vec![{}]", names.join(", "))));
    }
    if let Some(values) = &node.additional_properties {
        fields.push(("additional_properties", boxed(values)));
    }
    if let Some(keys) = &node.property_names {
        fields.push(("property_names", boxed(keys)));
    }
    if !node.one_of.is_empty() {
        fields.push(("one_of", list(&node.one_of)));
    }
    if !node.all_of.is_empty() {
        fields.push(("all_of", list(&node.all_of)));
    }

    let base = match node.referenced_name() {
        Some(name) => match callees.get(name) {
            Some(callee) => format!("{callee}(defs)"),
            None => format!("Schema::reference({name:?})"),
        },
        None => "Schema::default()".to_string(),
    };

    if fields.is_empty() {
        return base;
    }
    let body: String = fields
        .iter()
        .map(|(name, value)| format!("{pad}{name}: {value},\n"))
        .collect();
    format!("Schema {{\n{body}{pad}..{base}\n{close}}}")
}
