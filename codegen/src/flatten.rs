// One flattener serves a whole operation, so a type reached from the request,
// the response and the headers is declared once.

use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use tsoap_wsdl::types::{NamespacedName, ObjectType, TypeNode};

use super::{
    naming::{host_type, type_name},
    resolver::{Resolved, Resolver},
    types::{InterfaceDescriptor, Modifier, PropertyDescriptor, RootElement},
};

pub struct Flattener<'r, 'a> {
    resolver: &'r Resolver<'a>,
    names: HashMap<String, Option<*const ObjectType>>,
    queue: VecDeque<(String, &'a ObjectType)>,
    interfaces: Vec<InterfaceDescriptor>,
    aliases: IndexMap<String, String>,
    unresolved: Vec<String>,
}

impl<'r, 'a> Flattener<'r, 'a> {
    pub fn new(resolver: &'r Resolver<'a>) -> Self {
        Self {
            resolver,
            names: HashMap::new(),
            queue: VecDeque::new(),
            interfaces: Vec::new(),
            aliases: IndexMap::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn add_root(&mut self, root: &'a RootElement) -> (String, Vec<PropertyDescriptor>) {
        let resolved = self.resolver.resolve_node(&root.ty);
        let pointer = match &resolved {
            Some(Resolved::Object { object, .. }) => Some(*object as *const ObjectType),
            _ => None,
        };

        let preferred = type_name(&root.tag.name);
        let mut name = preferred.clone();
        let mut attempt = 1;

        let declare = loop {
            match self.names.get(&name) {
                None => break true,
                Some(existing) if *existing == pointer => break false,
                Some(_) => {
                    attempt += 1;
                    name = format!("{}{}", preferred, attempt);
                }
            }
        };

        if declare {
            self.names.insert(name.clone(), pointer);
        }

        let fields = match resolved {
            Some(Resolved::Object { object, .. }) => self.fields(&name, object),

            Some(Resolved::Primitive { name, alias }) => vec![PropertyDescriptor::new(
                "value",
                self.primitive(&name, alias.as_ref()),
                Modifier::Required,
            )],

            None => {
                log::warn!("Root element {} could not be resolved", root.tag);
                Vec::new()
            }
        };

        if declare {
            self.interfaces.push(InterfaceDescriptor {
                name: name.clone(),
                properties: fields.clone(),
            });
        }

        self.drain();
        (name, fields)
    }

    pub fn finish(mut self) -> (Vec<InterfaceDescriptor>, IndexMap<String, String>) {
        for name in std::mem::take(&mut self.unresolved) {
            if !self.names.contains_key(&name) {
                self.aliases.entry(name).or_insert_with(|| "any".to_owned());
            }
        }

        (self.interfaces, self.aliases)
    }

    fn drain(&mut self) {
        while let Some((name, object)) = self.queue.pop_front() {
            let properties = self.fields(&name, object);
            self.interfaces.push(InterfaceDescriptor { name, properties });
        }
    }

    /// Names the interface for `object`, queueing it the first time. A name
    /// held by a different object is qualified with `owner`, then numbered.
    fn claim(&mut self, preferred: &str, owner: &str, object: &'a ObjectType) -> String {
        let pointer = object as *const ObjectType;
        let mut name = preferred.to_owned();
        let mut attempt = 0;

        loop {
            match self.names.get(&name) {
                None => {
                    self.names.insert(name.clone(), Some(pointer));
                    self.queue.push_back((name.clone(), object));
                    return name;
                }

                Some(Some(existing)) if *existing == pointer => return name,

                Some(_) => {
                    attempt += 1;
                    name = match attempt {
                        1 => format!("{}{}", owner, preferred),
                        n => format!("{}{}{}", owner, preferred, n),
                    };
                }
            }
        }
    }

    fn fields(&mut self, owner: &str, object: &'a ObjectType) -> Vec<PropertyDescriptor> {
        let (chain, current) = self.resolver.unwrap(object);

        for wrapped in chain {
            if let Some(Resolved::Object {
                name: Some(name), ..
            }) = self.resolver.resolve_node(&wrapped.property.ty)
            {
                self.claim(&type_name(&name.name), owner, wrapped.inner);
            }
        }

        let mut fields = Vec::new();

        for (name, attribute) in &current.attributes {
            let modifier = if attribute.required {
                Modifier::Required
            } else {
                Modifier::Optional
            };

            fields.push(PropertyDescriptor::new(
                name,
                self.field_type(owner, &attribute.ty, name),
                modifier,
            ));
        }

        if current.is_simple_content() {
            fields.push(PropertyDescriptor::new(
                "value",
                self.simple_value(current),
                Modifier::Required,
            ));
        }

        for (key, property) in &current.properties {
            fields.push(PropertyDescriptor::new(
                key,
                self.field_type(owner, &property.ty, key),
                Modifier::from_occurs(&property.occurs),
            ));
        }

        fields
    }

    fn field_type(&mut self, owner: &str, node: &'a TypeNode, key: &str) -> String {
        match self.resolver.resolve_node(node) {
            Some(Resolved::Primitive { name, alias }) => self.primitive(&name, alias.as_ref()),

            Some(Resolved::Object { object, .. })
                if object.is_simple_content() && object.attributes.is_empty() =>
            {
                self.simple_value(object)
            }

            Some(Resolved::Object { name, object, .. }) => {
                let preferred = type_name(name.as_ref().map_or(key, |name| name.name.as_str()));
                self.claim(&preferred, owner, object)
            }

            None => {
                let fallback = type_name(key);
                log::warn!(
                    "Type of {} could not be resolved, falling back to {}",
                    key,
                    fallback
                );

                self.unresolved.push(fallback.clone());
                fallback
            }
        }
    }

    fn simple_value(&mut self, object: &'a ObjectType) -> String {
        match self.resolver.simple_base(object) {
            Some((name, alias)) => self.primitive(&name, alias.as_ref()),
            None => "string".to_owned(),
        }
    }

    fn primitive(&mut self, name: &str, alias: Option<&NamespacedName>) -> String {
        let host = host_type(name);

        match alias {
            Some(alias) => {
                let alias = type_name(&alias.name);
                self.aliases
                    .entry(alias.clone())
                    .or_insert_with(|| host.to_owned());
                alias
            }

            None => host.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::registry;
    use pretty_assertions::assert_eq;
    use tsoap_wsdl::types::{Reference, SchemaRegistry};

    fn root(namespace: &str, local: &str) -> RootElement {
        let tag = NamespacedName::new(namespace, local);

        RootElement {
            ty: TypeNode::Reference(Reference::Element(tag.clone())),
            tag,
        }
    }

    fn flatten(
        registry: &SchemaRegistry,
        root: &RootElement,
    ) -> (
        Vec<PropertyDescriptor>,
        Vec<InterfaceDescriptor>,
        IndexMap<String, String>,
    ) {
        let resolver = Resolver::new(registry);
        let mut flattener = Flattener::new(&resolver);
        let (_, fields) = flattener.add_root(root);
        let (interfaces, aliases) = flattener.finish();

        (fields, interfaces, aliases)
    }

    fn interface_names(interfaces: &[InterfaceDescriptor]) -> Vec<&str> {
        interfaces
            .iter()
            .map(|interface| interface.name.as_str())
            .collect()
    }

    #[test]
    fn single_string_child() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                targetNamespace="http://ex/ns1" elementFormDefault="qualified">
            <xs:element name="Foo">
                <xs:complexType>
                    <xs:sequence><xs:element name="bar" type="xs:string"/></xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>"#]);

        let root = root("http://ex/ns1", "Foo");
        let (fields, interfaces, _) = flatten(&registry, &root);

        assert_eq!(
            interfaces,
            vec![InterfaceDescriptor {
                name: "Foo".to_owned(),
                properties: vec![PropertyDescriptor::new("bar", "string", Modifier::Required)],
            }]
        );
        assert_eq!(fields, interfaces[0].properties);
    }

    #[test]
    fn wrapper_is_expanded_into_props() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:element name="Request">
                <xs:complexType>
                    <xs:sequence><xs:element name="payload" type="tns:Payload"/></xs:sequence>
                </xs:complexType>
            </xs:element>
            <xs:complexType name="Payload">
                <xs:sequence>
                    <xs:element name="a" type="xs:string"/>
                    <xs:element name="b" type="xs:int"/>
                </xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Request");
        let (fields, interfaces, _) = flatten(&registry, &root);

        assert_eq!(
            fields,
            vec![
                PropertyDescriptor::new("a", "string", Modifier::Required),
                PropertyDescriptor::new("b", "number", Modifier::Required),
            ]
        );
        assert_eq!(interface_names(&interfaces), vec!["Request", "Payload"]);
    }

    #[test]
    fn optional_single_child_keeps_its_field() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:element name="Request">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="payload" type="tns:Payload" minOccurs="0"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
            <xs:complexType name="Payload">
                <xs:sequence><xs:element name="a" type="xs:string"/></xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Request");
        let (fields, interfaces, _) = flatten(&registry, &root);

        assert_eq!(
            fields,
            vec![PropertyDescriptor::new("payload", "Payload", Modifier::Optional)]
        );
        assert_eq!(interface_names(&interfaces), vec!["Request", "Payload"]);
    }

    #[test]
    fn distinct_inline_types_get_distinct_names() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                targetNamespace="http://ex/svc">
            <xs:element name="Contact">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="home">
                            <xs:complexType>
                                <xs:sequence>
                                    <xs:element name="address">
                                        <xs:complexType>
                                            <xs:sequence>
                                                <xs:element name="street" type="xs:string"/>
                                                <xs:element name="n" type="xs:int"/>
                                            </xs:sequence>
                                        </xs:complexType>
                                    </xs:element>
                                    <xs:element name="phone" type="xs:string"/>
                                </xs:sequence>
                            </xs:complexType>
                        </xs:element>
                        <xs:element name="work">
                            <xs:complexType>
                                <xs:sequence>
                                    <xs:element name="address">
                                        <xs:complexType>
                                            <xs:sequence>
                                                <xs:element name="email" type="xs:string"/>
                                                <xs:element name="y" type="xs:int"/>
                                            </xs:sequence>
                                        </xs:complexType>
                                    </xs:element>
                                    <xs:element name="z" type="xs:string"/>
                                </xs:sequence>
                            </xs:complexType>
                        </xs:element>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Contact");
        let (_, interfaces, _) = flatten(&registry, &root);

        assert_eq!(
            interface_names(&interfaces),
            vec!["Contact", "Home", "Work", "Address", "WorkAddress"]
        );
        assert_eq!(
            interfaces[2].properties,
            vec![
                PropertyDescriptor::new("address", "WorkAddress", Modifier::Required),
                PropertyDescriptor::new("z", "string", Modifier::Required),
            ]
        );
        assert_eq!(
            interfaces[4].properties,
            vec![
                PropertyDescriptor::new("email", "string", Modifier::Required),
                PropertyDescriptor::new("y", "number", Modifier::Required),
            ]
        );
    }

    #[test]
    fn occurrence_decides_modifiers() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:element name="Order">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="id" type="xs:long"/>
                        <xs:element name="note" type="xs:string" minOccurs="0"/>
                        <xs:element name="line" type="tns:Line" maxOccurs="unbounded"/>
                        <xs:element name="tag" type="xs:string" minOccurs="0" maxOccurs="5"/>
                    </xs:sequence>
                    <xs:attribute name="version" type="xs:int" use="required"/>
                    <xs:attribute name="source" type="xs:string"/>
                </xs:complexType>
            </xs:element>
            <xs:complexType name="Line">
                <xs:sequence><xs:element name="sku" type="xs:string"/></xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Order");
        let (fields, interfaces, _) = flatten(&registry, &root);

        assert_eq!(
            fields,
            vec![
                PropertyDescriptor::new("version", "number", Modifier::Required),
                PropertyDescriptor::new("source", "string", Modifier::Optional),
                PropertyDescriptor::new("id", "number", Modifier::Required),
                PropertyDescriptor::new("note", "string", Modifier::Optional),
                PropertyDescriptor::new("line", "Line", Modifier::Array),
                PropertyDescriptor::new("tag", "string", Modifier::OptionalArray),
            ]
        );
        assert_eq!(interface_names(&interfaces), vec!["Order", "Line"]);
    }

    #[test]
    fn circular_types_are_declared_once() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/tree" targetNamespace="http://ex/tree">
            <xs:element name="Root" type="tns:A"/>
            <xs:complexType name="A">
                <xs:sequence>
                    <xs:element name="label" type="xs:string"/>
                    <xs:element name="b" type="tns:B" minOccurs="0"/>
                </xs:sequence>
            </xs:complexType>
            <xs:complexType name="B">
                <xs:sequence>
                    <xs:element name="a" type="tns:A" maxOccurs="unbounded"/>
                </xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/tree", "Root");
        let (_, interfaces, _) = flatten(&registry, &root);

        assert_eq!(interface_names(&interfaces), vec!["Root", "B", "A"]);
        assert_eq!(
            interfaces[1].properties,
            vec![PropertyDescriptor::new("a", "A", Modifier::Array)]
        );
    }

    #[test]
    fn shared_types_are_declared_once() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:element name="Transfer">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="from" type="tns:Account"/>
                        <xs:element name="to" type="tns:Account"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
            <xs:complexType name="Account">
                <xs:sequence><xs:element name="iban" type="xs:string"/></xs:sequence>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Transfer");
        let (_, interfaces, _) = flatten(&registry, &root);

        assert_eq!(interface_names(&interfaces), vec!["Transfer", "Account"]);
    }

    #[test]
    fn simple_types_become_aliases() {
        let registry = registry(&[r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:tns="http://ex/svc" targetNamespace="http://ex/svc">
            <xs:element name="Pay">
                <xs:complexType>
                    <xs:sequence>
                        <xs:element name="currency" type="tns:currencyCode"/>
                        <xs:element name="amount" type="tns:Amount"/>
                        <xs:element name="when" type="tns:Stamp"/>
                        <xs:element name="mystery" type="tns:Missing"/>
                    </xs:sequence>
                </xs:complexType>
            </xs:element>
            <xs:simpleType name="currencyCode">
                <xs:restriction base="xs:string"/>
            </xs:simpleType>
            <xs:complexType name="Amount">
                <xs:simpleContent>
                    <xs:extension base="xs:decimal">
                        <xs:attribute name="unit" type="xs:string"/>
                    </xs:extension>
                </xs:simpleContent>
            </xs:complexType>
            <xs:complexType name="Stamp">
                <xs:simpleContent>
                    <xs:extension base="xs:dateTime"/>
                </xs:simpleContent>
            </xs:complexType>
        </xs:schema>"#]);

        let root = root("http://ex/svc", "Pay");
        let (fields, interfaces, aliases) = flatten(&registry, &root);

        assert_eq!(
            fields,
            vec![
                PropertyDescriptor::new("currency", "CurrencyCode", Modifier::Required),
                PropertyDescriptor::new("amount", "Amount", Modifier::Required),
                PropertyDescriptor::new("when", "Date", Modifier::Required),
                PropertyDescriptor::new("mystery", "Mystery", Modifier::Required),
            ]
        );
        assert_eq!(
            interfaces[1].properties,
            vec![
                PropertyDescriptor::new("unit", "string", Modifier::Optional),
                PropertyDescriptor::new("value", "number", Modifier::Required),
            ]
        );
        assert_eq!(aliases["CurrencyCode"], "string");
        assert_eq!(aliases["Mystery"], "any");
    }
}
