use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Node>,
    pub text: Option<String>,
}

pub fn split_namespaced_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, local_name)) => (Some(prefix), local_name),
        None => (None, prefixed_name),
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        split_namespaced_name(&self.name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_namespaced_name(&self.name).0
    }

    // Lookups ignore the prefix, so `xs:element` and `xsd:element` both match.
    pub fn is(&self, local_name: &str) -> bool {
        self.local_name() == local_name
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes_named<const N: usize>(&self, names: [&str; N]) -> [Option<&str>; N] {
        names.map(|name| self.attribute(name))
    }

    pub fn required_attribute(&self, name: &'static str) -> Result<&str, crate::error::Error> {
        self.attribute(name)
            .ok_or_else(|| crate::error::Error::MissingAttribute {
                element: self.name.clone(),
                attribute: name,
            })
    }

    pub fn child(&self, local_name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.is(local_name))
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |child| child.is(local_name))
    }

    pub fn first_child_of<'a>(&'a self, local_names: &[&str]) -> Option<&'a Node> {
        self.children
            .iter()
            .find(|child| local_names.contains(&child.local_name()))
    }

    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(Node::local_name).collect()
    }

    pub fn namespace_declarations(&self) -> impl Iterator<Item = (Option<&str>, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            match split_namespaced_name(key) {
                (None, "xmlns") => Some((None, value.as_str())),
                (Some("xmlns"), prefix) => Some((Some(prefix), value.as_str())),
                _ => None,
            }
        })
    }
}
