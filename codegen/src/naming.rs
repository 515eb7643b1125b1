use heck::{ToLowerCamelCase, ToPascalCase};

pub fn pascal_case(name: &str) -> String {
    name.to_pascal_case()
}

pub fn camel_case(name: &str) -> String {
    name.to_lower_camel_case()
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
        _ => false,
    }
}

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

fn is_declarable(name: &str) -> bool {
    is_identifier(name) && !RESERVED.contains(&name)
}

/// `name` when it can be declared as is, otherwise its PascalCase form,
/// prefixed with `_` if that still is not declarable.
pub fn declaration_name(name: &str) -> String {
    if is_declarable(name) {
        return name.to_owned();
    }

    let pascal = pascal_case(name);

    if is_declarable(&pascal) {
        pascal
    } else {
        format!("_{}", pascal)
    }
}

pub fn type_name(name: &str) -> String {
    declaration_name(&pascal_case(name))
}

pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');

    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }

    quoted.push('"');
    quoted
}

pub fn member(path: &str, key: &str) -> String {
    if is_identifier(key) {
        format!("{}.{}", path, key)
    } else {
        format!("{}[{}]", path, quote(key))
    }
}

pub fn host_type(primitive: &str) -> &'static str {
    match primitive {
        "boolean" => "boolean",

        "date" | "dateTime" => "Date",

        "anyType" | "anySimpleType" => "any",

        "int" | "integer" | "long" | "short" | "byte" | "decimal" | "float" | "double"
        | "unsignedInt" | "unsignedLong" | "unsignedShort" | "unsignedByte" | "positiveInteger"
        | "negativeInteger" | "nonPositiveInteger" | "nonNegativeInteger" => "number",

        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn members_quote_non_identifiers() {
        assert_eq!(member("props", "bar"), "props.bar");
        assert_eq!(member("props", "first-name"), "props[\"first-name\"]");
        assert_eq!(member("props", "2nd"), "props[\"2nd\"]");
    }

    #[test]
    fn cases() {
        assert_eq!(pascal_case("getUser"), "GetUser");
        assert_eq!(pascal_case("order_line"), "OrderLine");
        assert_eq!(camel_case("OrderLine"), "orderLine");
    }

    #[test]
    fn declarations_avoid_reserved_and_invalid_names() {
        assert_eq!(declaration_name("GetUser"), "GetUser");
        assert_eq!(declaration_name("delete"), "Delete");
        assert_eq!(declaration_name("get-user"), "GetUser");
        assert_eq!(declaration_name("2fa"), "_2fa");
        assert_eq!(type_name("2nd_line"), "_2ndLine");
    }

    #[test]
    fn primitives_map_to_host_types() {
        assert_eq!(host_type("string"), "string");
        assert_eq!(host_type("token"), "string");
        assert_eq!(host_type("int"), "number");
        assert_eq!(host_type("unsignedShort"), "number");
        assert_eq!(host_type("boolean"), "boolean");
        assert_eq!(host_type("dateTime"), "Date");
        assert_eq!(host_type("anyType"), "any");
        assert_eq!(host_type("gYearMonth"), "string");
    }
}
