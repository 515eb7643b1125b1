use indexmap::IndexMap;
use std::{collections::HashMap, fmt};

pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parses the `namespaceURI:localName` form produced by `Display`. URIs
    /// contain colons themselves, so the split happens on the last one.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once(':') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new("", qualified),
        }
    }

    pub fn is_xsd(&self) -> bool {
        self.namespace == XSD_NAMESPACE
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// A named pointer into the registry. The kind decides which table is
/// searched first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Type(NamespacedName),
    Element(NamespacedName),
}

impl Reference {
    pub fn name(&self) -> &NamespacedName {
        match self {
            Reference::Type(name) | Reference::Element(name) => name,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    Primitive(String),
    Reference(Reference),
    Object(ObjectType),
}

impl TypeNode {
    pub fn from_type_name(name: NamespacedName) -> Self {
        if name.is_xsd() {
            TypeNode::Primitive(name.name)
        } else {
            TypeNode::Reference(Reference::Type(name))
        }
    }

    pub fn any() -> Self {
        TypeNode::Primitive("anyType".to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Extension,
    Restriction,
    SimpleContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: MaxOccurs,
}

impl Default for Occurs {
    fn default() -> Self {
        Self {
            min: 1,
            max: MaxOccurs::Bounded(1),
        }
    }
}

impl Occurs {
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Self {
        let mut occurs = Self::default();

        if let Some(min) = min {
            match min.trim().parse() {
                Ok(min) => occurs.min = min,
                Err(_) => log::warn!("Ignoring invalid minOccurs {:?}", min),
            }
        }

        match max.map(str::trim) {
            Some("unbounded") => occurs.max = MaxOccurs::Unbounded,
            Some(max) => match max.parse() {
                Ok(max) => occurs.max = MaxOccurs::Bounded(max),
                Err(_) => log::warn!("Ignoring invalid maxOccurs {:?}", max),
            },
            None => (),
        }

        occurs
    }

    pub fn is_array(&self) -> bool {
        self.max != MaxOccurs::Bounded(1)
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Folds the occurrence of an enclosing particle into this one.
    pub fn within(self, particle: Occurs) -> Self {
        Self {
            min: if particle.min == 0 { 0 } else { self.min },
            max: if particle.is_array() {
                MaxOccurs::Unbounded
            } else {
                self.max
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub ty: TypeNode,
    pub occurs: Occurs,
    pub qualified: bool,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    pub ty: TypeNode,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub namespace: String,
    pub qualified: bool,
    pub base: Option<Reference>,
    pub derivation: Option<Derivation>,
    pub attributes: IndexMap<String, AttributeType>,
    pub properties: IndexMap<String, Property>,
}

impl ObjectType {
    pub fn new(namespace: impl Into<String>, qualified: bool) -> Self {
        Self {
            namespace: namespace.into(),
            qualified,
            ..Default::default()
        }
    }

    pub fn is_simple_content(&self) -> bool {
        self.derivation == Some(Derivation::SimpleContent)
    }
}

#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    pub elements: IndexMap<NamespacedName, TypeNode>,
    pub complex_types: IndexMap<NamespacedName, ObjectType>,
    pub simple_types: IndexMap<NamespacedName, TypeNode>,
    pub groups: IndexMap<NamespacedName, IndexMap<String, Property>>,
    pub(crate) local_names: HashMap<String, Vec<NamespacedName>>,
}

impl SchemaRegistry {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.complex_types.is_empty()
    }

    pub fn with_local_name(&self, local_name: &str) -> &[NamespacedName] {
        self.local_names
            .get(local_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn index_local_names(&mut self) {
        let mut local_names: HashMap<String, Vec<NamespacedName>> = HashMap::new();

        let names = self
            .elements
            .keys()
            .chain(self.complex_types.keys())
            .chain(self.simple_types.keys());

        for name in names {
            let entry = local_names.entry(name.name.clone()).or_default();
            if !entry.contains(name) {
                entry.push(name.clone());
            }
        }

        self.local_names = local_names;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub element: Option<NamespacedName>,
    pub ty: Option<NamespacedName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub documentation: Option<String>,
    pub input: Option<NamespacedName>,
    pub output: Option<NamespacedName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    pub fn envelope_namespace(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::Soap12 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRef {
    pub message: NamespacedName,
    pub part: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOperation {
    pub name: String,
    pub action: Option<String>,
    pub style: Option<String>,
    pub input_headers: Vec<HeaderRef>,
    pub output_headers: Vec<HeaderRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    pub version: SoapVersion,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: NamespacedName,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub target_namespace: String,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

impl Definition {
    pub fn message(&self, name: &NamespacedName) -> Option<&Message> {
        self.messages.iter().find(|message| &message.name == name)
    }

    pub fn binding_for(&self, port_type: &NamespacedName) -> Option<&Binding> {
        self.bindings.iter().find(|binding| &binding.ty == port_type)
    }

    pub fn location_for(&self, binding: &NamespacedName) -> Option<&str> {
        self.services
            .iter()
            .flat_map(|service| &service.ports)
            .find(|port| &port.binding == binding)
            .and_then(|port| port.location.as_deref())
    }
}
