// Lookups are exact first, then by local name alone. A local-name match can
// pick the wrong type when two namespaces share a name, so each one is logged.

use std::collections::HashSet;
use tsoap_wsdl::types::{NamespacedName, ObjectType, Property, Reference, SchemaRegistry, TypeNode};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Primitive {
        name: String,
        alias: Option<NamespacedName>,
    },
    Object {
        name: Option<NamespacedName>,
        object: &'a ObjectType,
        /// Reached by breaking a reference cycle; render without nesting.
        circular: bool,
    },
}

/// An object whose only content is one required, non-repeating property of
/// object type.
#[derive(Debug, Clone, Copy)]
pub struct Wrapped<'a> {
    pub key: &'a str,
    pub property: &'a Property,
    pub inner: &'a ObjectType,
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Element,
    Complex,
    Simple,
}

enum Found<'a> {
    Node(&'a TypeNode),
    Complex(&'a ObjectType),
    Simple(&'a TypeNode),
}

pub struct Resolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, reference: &Reference) -> Option<Resolved<'a>> {
        let mut chain = HashSet::new();
        let mut current = reference.clone();
        let mut alias = None;

        loop {
            if current.name().is_xsd() {
                return Some(Resolved::Primitive {
                    name: current.name().name.clone(),
                    alias,
                });
            }

            if !chain.insert(current.clone()) {
                return self.break_cycle(reference);
            }

            let (name, found) = self.lookup(&current)?;

            let node = match found {
                Found::Complex(object) => {
                    return Some(Resolved::Object {
                        name: Some(name.clone()),
                        object,
                        circular: false,
                    })
                }

                Found::Simple(node) => {
                    alias.get_or_insert_with(|| name.clone());
                    node
                }

                Found::Node(node) => node,
            };

            match node {
                TypeNode::Primitive(primitive) => {
                    return Some(Resolved::Primitive {
                        name: primitive.clone(),
                        alias,
                    })
                }

                TypeNode::Object(object) => {
                    return Some(Resolved::Object {
                        name: Some(name.clone()),
                        object,
                        circular: false,
                    })
                }

                TypeNode::Reference(next) => current = next.clone(),
            }
        }
    }

    pub fn resolve_node(&self, node: &'a TypeNode) -> Option<Resolved<'a>> {
        match node {
            TypeNode::Primitive(name) => Some(Resolved::Primitive {
                name: name.clone(),
                alias: None,
            }),
            TypeNode::Reference(reference) => self.resolve(reference),
            TypeNode::Object(object) => Some(Resolved::Object {
                name: None,
                object,
                circular: false,
            }),
        }
    }

    pub fn wrapped(&self, object: &'a ObjectType) -> Option<Wrapped<'a>> {
        if !object.attributes.is_empty()
            || object.is_simple_content()
            || object.properties.len() != 1
        {
            return None;
        }

        let (key, property) = object.properties.get_index(0)?;

        if property.occurs.is_array() || property.occurs.is_optional() {
            return None;
        }

        match self.resolve_node(&property.ty)? {
            Resolved::Object { object: inner, .. } if !inner.is_simple_content() => Some(Wrapped {
                key,
                property,
                inner,
            }),
            _ => None,
        }
    }

    /// Follows wrappers down from `object` to the object holding the fields.
    /// The walk stops at a wrapper whose inner object is already on the chain.
    /// Flattening and markup both unwrap through here so their paths agree.
    pub fn unwrap(&self, object: &'a ObjectType) -> (Vec<Wrapped<'a>>, &'a ObjectType) {
        let mut chain = Vec::new();
        let mut seen = vec![object as *const ObjectType];
        let mut current = object;

        while let Some(wrapped) = self.wrapped(current) {
            let inner = wrapped.inner as *const ObjectType;

            if seen.contains(&inner) {
                break;
            }

            seen.push(inner);
            chain.push(wrapped);
            current = wrapped.inner;
        }

        (chain, current)
    }

    pub fn simple_base(&self, object: &'a ObjectType) -> Option<(String, Option<NamespacedName>)> {
        let mut current = object;
        let mut seen = HashSet::new();

        loop {
            if !seen.insert(current as *const ObjectType) {
                return None;
            }

            match self.resolve(current.base.as_ref()?)? {
                Resolved::Primitive { name, alias } => return Some((name, alias)),
                Resolved::Object { object, .. } if object.is_simple_content() => current = object,
                Resolved::Object { .. } => return None,
            }
        }
    }

    fn break_cycle(&self, reference: &Reference) -> Option<Resolved<'a>> {
        let name = reference.name();

        let found = self
            .registry
            .complex_types
            .get_key_value(name)
            .or_else(|| {
                self.registry
                    .complex_types
                    .iter()
                    .find(|(key, _)| key.name == name.name)
            });

        match found {
            Some((found, object)) => {
                log::warn!(
                    "Circular reference through {}, using complex type {} unwrapped",
                    name,
                    found
                );

                Some(Resolved::Object {
                    name: Some(found.clone()),
                    object,
                    circular: true,
                })
            }

            None => {
                log::warn!("Circular reference through {} cannot be broken", name);
                None
            }
        }
    }

    fn find(&self, table: Table, name: &NamespacedName) -> Option<(&'a NamespacedName, Found<'a>)> {
        match table {
            Table::Element => self
                .registry
                .elements
                .get_key_value(name)
                .map(|(key, node)| (key, Found::Node(node))),
            Table::Complex => self
                .registry
                .complex_types
                .get_key_value(name)
                .map(|(key, object)| (key, Found::Complex(object))),
            Table::Simple => self
                .registry
                .simple_types
                .get_key_value(name)
                .map(|(key, node)| (key, Found::Simple(node))),
        }
    }

    fn lookup(&self, reference: &Reference) -> Option<(&'a NamespacedName, Found<'a>)> {
        let order = match reference {
            Reference::Element(_) => [Table::Element, Table::Complex, Table::Simple],
            Reference::Type(_) => [Table::Complex, Table::Simple, Table::Element],
        };

        let name = reference.name();

        if let Some(found) = order.iter().find_map(|&table| self.find(table, name)) {
            return Some(found);
        }

        let candidates = self.registry.with_local_name(&name.name);

        for &table in &order {
            for candidate in candidates {
                if let Some(found) = self.find(table, candidate) {
                    if candidates.len() > 1 {
                        log::warn!(
                            "Reference {} is ambiguous between {} candidates, using {}",
                            name,
                            candidates.len(),
                            candidate
                        );
                    } else {
                        log::warn!("Reference {} resolved by local name to {}", name, candidate);
                    }

                    return Some(found);
                }
            }
        }

        log::debug!("Reference {} not found", name);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::registry;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
            xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
        <xs:element name="Request">
            <xs:complexType>
                <xs:sequence><xs:element name="payload" type="tns:Payload"/></xs:sequence>
            </xs:complexType>
        </xs:element>
        <xs:element name="Payload" type="xs:string"/>
        <xs:complexType name="Payload">
            <xs:sequence>
                <xs:element name="a" type="xs:string"/>
                <xs:element name="b" type="xs:int"/>
            </xs:sequence>
        </xs:complexType>
        <xs:simpleType name="Code">
            <xs:restriction base="tns:Inner"/>
        </xs:simpleType>
        <xs:simpleType name="Inner">
            <xs:restriction base="xs:token"/>
        </xs:simpleType>
        <xs:complexType name="Amount">
            <xs:simpleContent>
                <xs:extension base="tns:Code">
                    <xs:attribute name="unit" type="xs:string"/>
                </xs:extension>
            </xs:simpleContent>
        </xs:complexType>
    </xs:schema>"#;

    fn name(local: &str) -> NamespacedName {
        NamespacedName::new("http://ex/svc", local)
    }

    #[test]
    fn reference_kind_decides_lookup_order() {
        let registry = registry(&[SCHEMA]);
        let resolver = Resolver::new(&registry);

        assert_matches!(
            resolver.resolve(&Reference::Type(name("Payload"))),
            Some(Resolved::Object { name: Some(found), circular: false, .. }) if found == name("Payload")
        );

        assert_eq!(
            resolver.resolve(&Reference::Element(name("Payload"))),
            Some(Resolved::Primitive {
                name: "string".to_owned(),
                alias: None
            })
        );
    }

    #[test]
    fn simple_types_resolve_to_primitives_with_alias() {
        let registry = registry(&[SCHEMA]);
        let resolver = Resolver::new(&registry);

        assert_eq!(
            resolver.resolve(&Reference::Type(name("Code"))),
            Some(Resolved::Primitive {
                name: "token".to_owned(),
                alias: Some(name("Code")),
            })
        );
    }

    #[test]
    fn local_name_fallback_crosses_namespaces() {
        let registry = registry(&[SCHEMA]);
        let resolver = Resolver::new(&registry);

        let reference = Reference::Type(NamespacedName::new("http://ex/elsewhere", "Payload"));
        assert_matches!(
            resolver.resolve(&reference),
            Some(Resolved::Object { name: Some(found), .. }) if found == name("Payload")
        );

        let missing = Reference::Type(NamespacedName::new("http://ex/svc", "Nowhere"));
        assert_eq!(resolver.resolve(&missing), None);
    }

    #[test]
    fn single_object_property_is_a_wrapper() {
        let registry = registry(&[SCHEMA]);
        let resolver = Resolver::new(&registry);

        let request = assert_matches!(
            resolver.resolve(&Reference::Element(name("Request"))),
            Some(Resolved::Object { object, .. }) => object
        );

        let wrapped = resolver.wrapped(request).unwrap();
        assert_eq!(wrapped.key, "payload");
        assert_eq!(
            wrapped.inner.properties.keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );

        let payload = &registry.complex_types[&name("Payload")];
        assert!(resolver.wrapped(payload).is_none());
    }

    #[test]
    fn optional_payload_is_not_a_wrapper() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:complexType name="Maybe">
                <xs:sequence>
                    <xs:element name="payload" type="tns:Payload" minOccurs="0"/>
                </xs:sequence>
            </xs:complexType>
            <xs:complexType name="Payload">
                <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);
        let resolver = Resolver::new(&registry);

        let maybe = &registry.complex_types[&name("Maybe")];
        assert!(resolver.wrapped(maybe).is_none());
    }

    #[test]
    fn unwrapping_stops_where_the_chain_loops() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:complexType name="Ping">
                <xs:sequence><xs:element name="pong" type="tns:Pong"/></xs:sequence>
            </xs:complexType>
            <xs:complexType name="Pong">
                <xs:sequence><xs:element name="ping" type="tns:Ping"/></xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);
        let resolver = Resolver::new(&registry);

        let ping = &registry.complex_types[&name("Ping")];
        let pong = &registry.complex_types[&name("Pong")];
        let (chain, inner) = resolver.unwrap(ping);

        assert_eq!(
            chain.iter().map(|wrapped| wrapped.key).collect::<Vec<_>>(),
            vec!["pong"]
        );
        assert!(std::ptr::eq(inner, pong));
    }

    #[test]
    fn simple_content_base_follows_aliases() {
        let registry = registry(&[SCHEMA]);
        let resolver = Resolver::new(&registry);

        let amount = &registry.complex_types[&name("Amount")];
        assert_eq!(
            resolver.simple_base(amount),
            Some(("token".to_owned(), Some(name("Code"))))
        );
    }

    #[test]
    fn element_cycles_fall_back_to_complex_type_by_local_name() {
        let registry = registry(&[
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                    xmlns:tns="http://ex/loop" targetNamespace="http://ex/loop">
                <xs:element name="A" type="tns:B"/>
                <xs:element name="B" type="tns:A"/>
            </xs:schema>"#,
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="http://ex/other">
                <xs:complexType name="A">
                    <xs:sequence><xs:element name="value" type="xs:string"/></xs:sequence>
                </xs:complexType>
            </xs:schema>"#,
        ]);
        let resolver = Resolver::new(&registry);

        let reference = Reference::Element(NamespacedName::new("http://ex/loop", "A"));
        assert_matches!(
            resolver.resolve(&reference),
            Some(Resolved::Object { name: Some(found), circular: true, .. })
                if found == NamespacedName::new("http://ex/other", "A")
        );
    }

    #[test]
    fn unbreakable_cycles_resolve_to_nothing() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/loop" targetNamespace="http://ex/loop">
            <xs:element name="Loop" type="tns:Loop"/>
        </xs:schema>"#]);
        let resolver = Resolver::new(&registry);

        let reference = Reference::Element(NamespacedName::new("http://ex/loop", "Loop"));
        assert_eq!(resolver.resolve(&reference), None);
    }
}
