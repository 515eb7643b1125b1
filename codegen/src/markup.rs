use tsoap_wsdl::types::{ObjectType, Property};

use super::{
    namespaces::TagUsage,
    naming::{camel_case, member},
    resolver::{Resolved, Resolver},
    types::{Modifier, NamespaceMappings, RootElement},
};

const INDENT: &str = "  ";

struct MarkupGenerator<'r, 'a> {
    resolver: &'r Resolver<'a>,
    mappings: &'r NamespaceMappings,
    usage: Option<&'r mut TagUsage>,
    ancestors: Vec<*const ObjectType>,
    out: String,
}

// Simple content without attributes is a scalar and survives flat rendering.
fn is_nested(resolved: &Option<Resolved>) -> bool {
    match resolved {
        Some(Resolved::Object { object, .. }) => {
            !object.is_simple_content() || !object.attributes.is_empty()
        }
        _ => false,
    }
}

impl<'r, 'a> MarkupGenerator<'r, 'a> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }

        self.out.push_str(text);
        self.out.push('\n');
    }

    fn tag(&mut self, namespace: &str, local: &str, qualified: bool) -> String {
        if !qualified || namespace.is_empty() {
            return local.to_owned();
        }

        let mappings = self.mappings;

        match mappings.prefix_for(namespace) {
            Some(prefix) => {
                if let Some(usage) = self.usage.as_mut() {
                    usage.record(prefix, namespace, local);
                }

                format!("{}.{}", prefix, local)
            }

            None => {
                log::warn!("No prefix for {}, rendering <{}> unqualified", namespace, local);
                local.to_owned()
            }
        }
    }

    fn attributes(object: &ObjectType, path: &str) -> String {
        object
            .attributes
            .keys()
            .map(|name| format!(" {}={{{}}}", name, member(path, name)))
            .collect()
    }

    fn root(&mut self, root: &'a RootElement, path: &str) {
        let tag = self.tag(&root.tag.namespace, &root.tag.name, true);

        match self.resolver.resolve_node(&root.ty) {
            Some(Resolved::Object {
                object, circular, ..
            }) => self.element(&tag, object, path, 0, circular),

            Some(Resolved::Primitive { .. }) => {
                let value = member(path, "value");
                self.line(0, &format!("<{0}>{{{1}}}</{0}>", tag, value));
            }

            None => {
                log::warn!("Root element {} could not be resolved", root.tag);
                self.line(0, &format!("<{} />", tag));
            }
        }
    }

    fn element(&mut self, tag: &str, object: &'a ObjectType, path: &str, depth: usize, flat: bool) {
        let (chain, inner) = self.resolver.unwrap(object);
        let mut wrappers = Vec::new();
        let mut inner_tag = tag.to_owned();
        let mut flat = flat;

        self.ancestors.push(object as *const ObjectType);

        // The wrapped fields live at this element's path.
        for wrapped in &chain {
            let property = wrapped.property;
            let pointer = wrapped.inner as *const ObjectType;
            let tag = self.tag(&property.namespace, wrapped.key, property.qualified);

            wrappers.push(std::mem::replace(&mut inner_tag, tag));
            flat |= self.ancestors.contains(&pointer)
                || matches!(
                    self.resolver.resolve_node(&property.ty),
                    Some(Resolved::Object { circular: true, .. })
                );

            self.ancestors.push(pointer);
        }

        for (level, wrapper) in wrappers.iter().enumerate() {
            self.line(depth + level, &format!("<{}>", wrapper));
        }

        self.content(&inner_tag, inner, path, depth + wrappers.len(), flat);

        for (level, wrapper) in wrappers.iter().enumerate().rev() {
            self.line(depth + level, &format!("</{}>", wrapper));
        }

        for _ in 0..=chain.len() {
            self.ancestors.pop();
        }
    }

    fn content(&mut self, tag: &str, object: &'a ObjectType, path: &str, depth: usize, flat: bool) {
        let attributes = Self::attributes(object, path);

        if object.is_simple_content() {
            let value = member(path, "value");
            self.line(depth, &format!("<{0}{1}>{{{2}}}</{0}>", tag, attributes, value));
            return;
        }

        let children = object
            .properties
            .iter()
            .map(|(key, property)| (key, property, self.resolver.resolve_node(&property.ty)))
            .filter(|(_, _, resolved)| !flat || !is_nested(resolved))
            .collect::<Vec<_>>();

        if children.is_empty() {
            self.line(depth, &format!("<{}{} />", tag, attributes));
        } else {
            self.line(depth, &format!("<{}{}>", tag, attributes));

            for (key, property, resolved) in children {
                self.property(key, property, resolved, path, depth + 1);
            }

            self.line(depth, &format!("</{}>", tag));
        }
    }

    fn property(
        &mut self,
        key: &str,
        property: &'a Property,
        resolved: Option<Resolved<'a>>,
        parent: &str,
        depth: usize,
    ) {
        let tag = self.tag(&property.namespace, key, property.qualified);
        let path = member(parent, key);
        let modifier = Modifier::from_occurs(&property.occurs);

        if modifier.is_array() {
            let item = format!("{}Item", camel_case(key));
            let map = if modifier.is_optional() { "?.map" } else { ".map" };

            self.line(depth, &format!("{{{}{}(({}) => (", path, map, item));
            self.body(&tag, resolved, &item, depth + 1);
            self.line(depth, "))}");
        } else if modifier.is_optional() {
            self.line(depth, &format!("{{{} !== undefined && (", path));
            self.body(&tag, resolved, &path, depth + 1);
            self.line(depth, ")}");
        } else {
            self.body(&tag, resolved, &path, depth);
        }
    }

    fn body(&mut self, tag: &str, resolved: Option<Resolved<'a>>, path: &str, depth: usize) {
        let nested = is_nested(&resolved);

        match resolved {
            Some(Resolved::Object {
                object, circular, ..
            }) if nested => {
                let flat = circular || self.ancestors.contains(&(object as *const ObjectType));

                if flat {
                    log::debug!("Rendering <{}> without nested elements", tag);
                }

                self.element(tag, object, path, depth, flat);
            }

            _ => self.line(depth, &format!("<{0}>{{{1}}}</{0}>", tag, path)),
        }
    }
}

pub fn generate_body<'a>(
    root: &'a RootElement,
    path: &str,
    resolver: &Resolver<'a>,
    mappings: &NamespaceMappings,
    usage: Option<&mut TagUsage>,
) -> String {
    let mut generator = MarkupGenerator {
        resolver,
        mappings,
        usage,
        ancestors: Vec::new(),
        out: String::new(),
    };

    generator.root(root, path);
    generator.out
}
