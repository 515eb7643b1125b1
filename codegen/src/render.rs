use super::{
    naming::{declaration_name, is_identifier, quote},
    types::{HeaderDescriptor, InterfaceDescriptor, Modifier, PropertyDescriptor, TemplateData},
};

const SKELETON: &str = "\
// Generated by tsoap from {{source}}. Do not edit.
import { createNamespace, soapEnvelope } from {{runtime}};

{{declarations}}{{namespaces}}
export const soapAction = {{soap_action}};
export const location = {{location}};
export const envelopeNamespace = {{envelope}};
export const requestElement = {{request}};

{{documentation}}export function {{function}}({{parameters}}) {
  return soapEnvelope<{{response}}>({
    namespace: envelopeNamespace,
    soapAction,
    location,
    attributes: {
{{xmlns}}    },
    headers: {{headers}},
    body: (
{{markup}}    ),
  });
}
";

pub trait Render {
    fn render(&self) -> String;
}

fn render_all(all: &[impl Render]) -> String {
    all.iter().map(Render::render).collect()
}

impl Render for PropertyDescriptor {
    fn render(&self) -> String {
        let name = if is_identifier(&self.name) {
            self.name.clone()
        } else {
            quote(&self.name)
        };

        format!(
            "  {}{}: {}{};\n",
            name,
            if self.modifier.is_optional() { "?" } else { "" },
            self.ty,
            if self.modifier.is_array() { "[]" } else { "" }
        )
    }
}

impl Render for InterfaceDescriptor {
    fn render(&self) -> String {
        format!(
            "export interface {} {{\n{}}}\n\n",
            self.name,
            render_all(&self.properties)
        )
    }
}

impl Render for HeaderDescriptor {
    fn render(&self) -> String {
        self.props.render()
    }
}

fn indent(text: &str, depth: usize) -> String {
    let padding = "  ".repeat(depth);

    text.lines()
        .map(|line| format!("{}{}\n", padding, line))
        .collect()
}

fn optional_string(value: Option<&str>) -> String {
    value.map_or_else(|| "undefined".to_owned(), quote)
}

fn documentation(data: &TemplateData) -> String {
    match data.documentation.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            let lines: String = text
                .lines()
                .map(|line| format!(" * {}\n", line.trim()))
                .collect();

            format!("/**\n{} */\n", lines)
        }

        _ => String::new(),
    }
}

fn declarations(data: &TemplateData) -> String {
    let mut out = String::new();

    for (name, host) in &data.primitive_aliases {
        out.push_str(&format!("export type {} = {};\n", name, host));
    }

    if !data.primitive_aliases.is_empty() {
        out.push('\n');
    }

    out.push_str(&render_all(&data.interfaces));
    out.push_str(&data.props.render());
    out.push_str(&render_all(&data.headers));

    if !data.headers.is_empty() {
        out.push_str(&format!(
            "export interface {}Headers {{\n",
            declaration_name(&data.operation_name)
        ));

        for header in &data.headers {
            out.push_str(
                &PropertyDescriptor::new(
                    header.part_name.as_str(),
                    header.props.name.as_str(),
                    Modifier::Required,
                )
                .render(),
            );
        }

        out.push_str("}\n\n");
    }

    out
}

fn namespaces(data: &TemplateData) -> String {
    data.namespace_tags
        .iter()
        .filter_map(|(prefix, tags)| {
            let uri = data.namespace_prefixes.get(prefix)?;
            let tags = tags.iter().map(|tag| quote(tag)).collect::<Vec<_>>();

            Some(format!(
                "const {} = createNamespace({}, {}, [{}]);\n",
                prefix,
                quote(prefix),
                quote(uri),
                tags.join(", ")
            ))
        })
        .collect()
}

fn parameters(data: &TemplateData) -> String {
    let mut parameters = format!("props: {}", data.props.name);

    if !data.headers.is_empty() {
        parameters.push_str(&format!(
            ", headers: {}Headers",
            declaration_name(&data.operation_name)
        ));
    }

    parameters
}

fn headers(data: &TemplateData) -> String {
    if data.headers.is_empty() {
        return "undefined".to_owned();
    }

    let markup: String = data
        .headers
        .iter()
        .map(|header| indent(&header.markup, 4))
        .collect();

    format!("(\n      <>\n{}      </>\n    )", markup)
}

/// Replaces each `{{name}}` in `template` in a single pass, so substituted
/// text is never rescanned.
fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let value = after.find("}}").and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (value, end))
        });

        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }

            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn render(data: &TemplateData, runtime_module: &str) -> String {
    let xmlns: String = data
        .xmlns_attributes
        .iter()
        .map(|(name, uri)| format!("      {}: {},\n", quote(name), quote(uri)))
        .collect();

    substitute(
        SKELETON,
        &[
            ("source", data.operation_name.clone()),
            ("function", declaration_name(&data.operation_name)),
            ("runtime", quote(runtime_module)),
            ("declarations", declarations(data)),
            ("namespaces", namespaces(data)),
            ("soap_action", optional_string(data.soap_action.as_deref())),
            ("location", optional_string(data.location.as_deref())),
            ("envelope", quote(&data.soap_envelope_namespace)),
            ("request", quote(&data.request_type_local_name)),
            ("documentation", documentation(data)),
            ("parameters", parameters(data)),
            (
                "response",
                data.response_type
                    .clone()
                    .unwrap_or_else(|| "unknown".to_owned()),
            ),
            ("xmlns", xmlns),
            ("headers", headers(data)),
            ("markup", indent(&data.markup, 3)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn data() -> TemplateData {
        let mut namespace_tags = IndexMap::new();
        namespace_tags.insert("svcab1".to_owned(), vec!["Echo".to_owned()]);

        let mut namespace_prefixes = IndexMap::new();
        namespace_prefixes.insert("svcab1".to_owned(), "http://ex/svc".to_owned());

        let mut primitive_aliases = IndexMap::new();
        primitive_aliases.insert("Code".to_owned(), "string".to_owned());

        TemplateData {
            operation_name: "Echo".to_owned(),
            documentation: Some("Echoes a message.".to_owned()),
            request_type_local_name: "Echo".to_owned(),
            namespace_tags,
            namespace_prefixes,
            primitive_aliases,
            props: InterfaceDescriptor {
                name: "EchoProps".to_owned(),
                properties: vec![
                    PropertyDescriptor::new("text", "string", Modifier::Required),
                    PropertyDescriptor::new("code", "Code", Modifier::OptionalArray),
                ],
            },
            interfaces: Vec::new(),
            response_type: None,
            soap_envelope_namespace: "http://schemas.xmlsoap.org/soap/envelope/".to_owned(),
            xmlns_attributes: vec![("xmlns:svcab1".to_owned(), "http://ex/svc".to_owned())],
            markup: "<svcab1.Echo>\n  <text>{props.text}</text>\n</svcab1.Echo>\n".to_owned(),
            headers: Vec::new(),
            soap_action: Some("urn:echo".to_owned()),
            location: None,
        }
    }

    #[test]
    fn substitution_does_not_rescan_values() {
        assert_eq!(
            substitute(
                "a {{x}} b {{y}} {{missing}}",
                &[("x", "{{y}}".to_owned()), ("y", "2".to_owned())]
            ),
            "a {{y}} b 2 {{missing}}"
        );
    }

    #[test]
    fn renders_a_module() {
        let module = render(&data(), "tsoap/runtime");

        let expected = "\
// Generated by tsoap from Echo. Do not edit.
import { createNamespace, soapEnvelope } from \"tsoap/runtime\";

export type Code = string;

export interface EchoProps {
  text: string;
  code?: Code[];
}

const svcab1 = createNamespace(\"svcab1\", \"http://ex/svc\", [\"Echo\"]);

export const soapAction = \"urn:echo\";
export const location = undefined;
export const envelopeNamespace = \"http://schemas.xmlsoap.org/soap/envelope/\";
export const requestElement = \"Echo\";

/**
 * Echoes a message.
 */
export function Echo(props: EchoProps) {
  return soapEnvelope<unknown>({
    namespace: envelopeNamespace,
    soapAction,
    location,
    attributes: {
      \"xmlns:svcab1\": \"http://ex/svc\",
    },
    headers: undefined,
    body: (
      <svcab1.Echo>
        <text>{props.text}</text>
      </svcab1.Echo>
    ),
  });
}
";

        assert_eq!(module, expected);
    }

    #[test]
    fn operation_names_are_made_declarable() {
        let mut data = data();
        data.operation_name = "delete".to_owned();

        let module = render(&data, "tsoap/runtime");

        assert!(module.starts_with("// Generated by tsoap from delete. Do not edit.\n"));
        assert!(module.contains("export function Delete(props: EchoProps) {"));
    }

    #[test]
    fn headers_get_their_own_parameter() {
        let mut data = data();
        data.headers.push(HeaderDescriptor {
            part_name: "auth".to_owned(),
            props: InterfaceDescriptor {
                name: "AuthHeader".to_owned(),
                properties: vec![PropertyDescriptor::new("value", "string", Modifier::Required)],
            },
            markup: "<svcab1.Token>{headers.auth.value}</svcab1.Token>\n".to_owned(),
        });

        let module = render(&data, "tsoap/runtime");

        assert!(module.contains("export interface EchoHeaders {\n  auth: AuthHeader;\n}\n"));
        assert!(module.contains("export function Echo(props: EchoProps, headers: EchoHeaders) {"));
        assert!(module.contains(
            "    headers: (\n      <>\n        <svcab1.Token>{headers.auth.value}</svcab1.Token>\n      </>\n    ),\n"
        ));
    }
}
