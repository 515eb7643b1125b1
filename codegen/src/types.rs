use indexmap::IndexMap;
use tsoap_wsdl::types::{NamespacedName, Occurs, SoapVersion, TypeNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    pub tag: NamespacedName,
    pub ty: TypeNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub part_name: String,
    pub element_name: NamespacedName,
    pub header_type: RootElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub documentation: Option<String>,
    pub request_type: RootElement,
    pub response_type: Option<RootElement>,
    pub headers: Vec<HeaderInfo>,
    pub soap_action: Option<String>,
    pub soap_version: SoapVersion,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Required,
    Optional,
    Array,
    OptionalArray,
}

impl Modifier {
    pub fn from_occurs(occurs: &Occurs) -> Self {
        match (occurs.is_array(), occurs.is_optional()) {
            (false, false) => Modifier::Required,
            (false, true) => Modifier::Optional,
            (true, false) => Modifier::Array,
            (true, true) => Modifier::OptionalArray,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Modifier::Optional | Modifier::OptionalArray)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Modifier::Array | Modifier::OptionalArray)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub ty: String,
    pub modifier: Modifier,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, modifier: Modifier) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            modifier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
}

pub type PropsDescriptor = InterfaceDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceEntry {
    pub uri: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMappings {
    /// prefix -> local tag names rendered under it, in first-use order.
    pub tags: IndexMap<String, Vec<String>>,
    /// prefix -> namespace URI.
    pub prefixes: IndexMap<String, String>,
    /// qualified type or element name -> where it lives.
    pub types: IndexMap<String, NamespaceEntry>,
}

impl NamespaceMappings {
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, value)| value.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
    }

    pub fn add_tag(&mut self, prefix: &str, tag: &str) {
        let tags = self.tags.entry(prefix.to_owned()).or_default();

        if !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_owned());
        }
    }

    pub fn merge(&mut self, other: NamespaceMappings) {
        for (prefix, tags) in other.tags {
            for tag in tags {
                self.add_tag(&prefix, &tag);
            }
        }

        self.prefixes.extend(other.prefixes);
        self.types.extend(other.types);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDescriptor {
    pub part_name: String,
    pub props: PropsDescriptor,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateData {
    pub operation_name: String,
    pub documentation: Option<String>,
    pub request_type_local_name: String,
    pub namespace_tags: IndexMap<String, Vec<String>>,
    pub namespace_prefixes: IndexMap<String, String>,
    pub primitive_aliases: IndexMap<String, String>,
    pub props: PropsDescriptor,
    pub interfaces: Vec<InterfaceDescriptor>,
    pub response_type: Option<String>,
    pub soap_envelope_namespace: String,
    pub xmlns_attributes: Vec<(String, String)>,
    pub markup: String,
    pub headers: Vec<HeaderDescriptor>,
    pub soap_action: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub file_name: String,
    pub contents: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsoap_wsdl::types::MaxOccurs;

    #[test]
    fn modifier_follows_occurrence() {
        let occurs = |min, max| Occurs { min, max };

        assert_eq!(
            Modifier::from_occurs(&occurs(1, MaxOccurs::Bounded(1))),
            Modifier::Required
        );
        assert_eq!(
            Modifier::from_occurs(&occurs(0, MaxOccurs::Bounded(1))),
            Modifier::Optional
        );
        assert_eq!(
            Modifier::from_occurs(&occurs(1, MaxOccurs::Unbounded)),
            Modifier::Array
        );
        assert_eq!(
            Modifier::from_occurs(&occurs(0, MaxOccurs::Bounded(3))),
            Modifier::OptionalArray
        );
    }

    #[test]
    fn add_tag_keeps_first_use_order_without_duplicates() {
        let mut mappings = NamespaceMappings::default();
        mappings.add_tag("ns", "b");
        mappings.add_tag("ns", "a");
        mappings.add_tag("ns", "b");

        assert_eq!(mappings.tags["ns"], vec!["b", "a"]);
    }

    #[test]
    fn merge_appends_new_tags_only() {
        let mut first = NamespaceMappings::default();
        first.add_tag("ns", "a");
        first.prefixes.insert("ns".to_owned(), "http://ex/ns".to_owned());

        let mut second = NamespaceMappings::default();
        second.add_tag("ns", "a");
        second.add_tag("ns", "b");
        second.add_tag("other", "c");
        second.prefixes.insert("ns".to_owned(), "http://ex/ns".to_owned());
        second.prefixes.insert("other".to_owned(), "http://ex/other".to_owned());

        first.merge(second);

        assert_eq!(first.tags["ns"], vec!["a", "b"]);
        assert_eq!(first.tags["other"], vec!["c"]);
        assert_eq!(first.prefixes.len(), 2);
    }
}
