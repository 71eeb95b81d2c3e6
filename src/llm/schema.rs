//! `$ref` resolution: many providers reject JSON-Schema documents carrying
//! `$ref` pointers, so every adapter must inline them before a tool
//! definition goes out over the wire.

use serde_json::Value;

const MAX_DEPTH: usize = 16;

/// Recursively replaces `{"$ref": "#/$defs/Foo"}` (or the legacy
/// `#/definitions/Foo` form) with the pointed-to subschema, resolving
/// against `schema` itself as the document root. `$defs`/`definitions` are
/// dropped from the result once inlined — nothing should still reference
/// them. A pointer that cannot be resolved, or a reference chain deeper
/// than a sane bound, is left as the literal `$ref` object rather than
/// looping forever.
pub fn inline_refs(schema: &Value) -> Value {
    let root = schema.clone();
    strip_defs(resolve(schema, &root, 0))
}

fn resolve(node: &Value, root: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return node.clone();
    }
    match node {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get("$ref") {
                if let Some(target) = lookup(root, pointer) {
                    return resolve(target, root, depth + 1);
                }
                return node.clone();
            }
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                out.insert(key.clone(), resolve(value, root, depth));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, root, depth)).collect()),
        other => other.clone(),
    }
}

fn lookup<'a>(root: &'a Value, pointer: &str) -> Option<&'a Value> {
    root.pointer(pointer.strip_prefix('#')?)
}

fn strip_defs(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("$defs");
        map.remove("definitions");
    }
    value
}
