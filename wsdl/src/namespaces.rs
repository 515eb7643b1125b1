use std::collections::HashMap;

use super::{
    node::{split_namespaced_name, Node},
    types::NamespacedName,
};

#[derive(Clone, Debug, Default)]
pub struct NamespaceScope {
    target: Option<String>,
    namespaces: HashMap<Option<String>, String>,
    element_form_qualified: bool,
}

impl NamespaceScope {
    pub fn enter(&self, node: &Node) -> Self {
        let mut scope = self.clone();

        for (prefix, namespace) in node.namespace_declarations() {
            scope.add_namespace_prefix(prefix.map(ToOwned::to_owned), namespace);
        }

        let [target, element_form] = node.attributes_named(["targetNamespace", "elementFormDefault"]);

        if let Some(target) = target {
            scope.target = Some(target.to_owned());
        }

        if node.is("schema") {
            scope.element_form_qualified = element_form == Some("qualified");
        }

        scope
    }

    /// Used for chameleon includes, which adopt the including schema's target.
    pub fn with_target(mut self, target: Option<&str>) -> Self {
        if self.target.is_none() {
            self.target = target.map(ToOwned::to_owned);
        }

        self
    }

    pub fn add_namespace_prefix(&mut self, prefix: Option<String>, namespace: &str) {
        self.namespaces.insert(prefix, namespace.to_owned());
    }

    pub fn namespace_of(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces
            .get(&prefix.map(ToOwned::to_owned))
            .map(String::as_str)
    }

    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or_default()
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn element_form_qualified(&self) -> bool {
        self.element_form_qualified
    }

    pub fn target_namespaced(&self, name: &str) -> NamespacedName {
        NamespacedName::new(self.target(), name)
    }

    /// Resolves a `prefix:local` QName against the declarations in scope.
    /// Unknown prefixes and unprefixed names without a default namespace fall
    /// back to the target namespace.
    pub fn resolve(&self, prefixed_name: &str) -> NamespacedName {
        let (prefix, local_name) = split_namespaced_name(prefixed_name.trim());

        match self.namespaces.get(&prefix.map(ToOwned::to_owned)) {
            Some(namespace) => NamespacedName::new(namespace, local_name),

            None => {
                if let Some(prefix) = prefix {
                    log::warn!(
                        "Unknown namespace prefix {:?} in {:?}, assuming target namespace {:?}",
                        prefix,
                        prefixed_name,
                        self.target()
                    );
                }

                self.target_namespaced(local_name)
            }
        }
    }
}
