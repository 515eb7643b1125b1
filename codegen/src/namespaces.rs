use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use tsoap_wsdl::types::{NamespacedName, ObjectType};

use super::{
    context::PrefixTable,
    error::Error,
    resolver::{Resolved, Resolver},
    types::{NamespaceEntry, NamespaceMappings, RootElement},
};

struct Predictor<'r, 'a> {
    resolver: &'r Resolver<'a>,
    prefixes: &'r mut PrefixTable,
    mappings: NamespaceMappings,
    visited: HashSet<*const ObjectType>,
}

impl<'r, 'a> Predictor<'r, 'a> {
    fn prefix(&mut self, uri: &str) -> Result<String, Error> {
        let prefix = self.prefixes.prefix_for(uri)?;
        self.mappings
            .prefixes
            .insert(prefix.clone(), uri.to_owned());

        Ok(prefix)
    }

    fn tag(&mut self, uri: &str, local: &str) -> Result<(), Error> {
        let prefix = self.prefix(uri)?;
        self.mappings.add_tag(&prefix, local);
        Ok(())
    }

    fn record_type(&mut self, name: &NamespacedName) -> Result<(), Error> {
        if name.namespace.is_empty() {
            log::debug!("Type {} has no namespace, not mapping it", name.name);
            return Ok(());
        }

        let prefix = self.prefix(&name.namespace)?;
        self.mappings.types.insert(
            name.to_string(),
            NamespaceEntry {
                uri: name.namespace.clone(),
                prefix,
            },
        );

        Ok(())
    }

    fn visit_resolved(&mut self, resolved: Option<Resolved<'a>>) -> Result<(), Error> {
        match resolved {
            Some(Resolved::Object { name, object, .. }) => {
                if let Some(name) = name {
                    self.record_type(&name)?;
                }

                self.visit(object)
            }

            Some(Resolved::Primitive {
                alias: Some(alias), ..
            }) => self.record_type(&alias),

            _ => Ok(()),
        }
    }

    fn visit(&mut self, object: &'a ObjectType) -> Result<(), Error> {
        if !self.visited.insert(object as *const ObjectType) {
            return Ok(());
        }

        for (key, property) in &object.properties {
            if property.qualified && !property.namespace.is_empty() {
                self.tag(&property.namespace, key)?;
            }

            let resolved = self.resolver.resolve_node(&property.ty);
            self.visit_resolved(resolved)?;
        }

        if let Some(base) = object.base.as_ref().filter(|_| object.is_simple_content()) {
            let resolved = self.resolver.resolve(base);
            self.visit_resolved(resolved)?;
        }

        Ok(())
    }
}

/// Phase one: the mapping implied by each element's declared namespace.
pub fn predict(
    root: &RootElement,
    resolver: &Resolver,
    prefixes: &mut PrefixTable,
) -> Result<NamespaceMappings, Error> {
    if root.tag.namespace.is_empty() {
        return Err(Error::MissingNamespace(root.tag.clone()));
    }

    let mut predictor = Predictor {
        resolver,
        prefixes,
        mappings: NamespaceMappings::default(),
        visited: HashSet::new(),
    };

    predictor.tag(&root.tag.namespace, &root.tag.name)?;
    predictor.record_type(&root.tag)?;

    let resolved = resolver.resolve_node(&root.ty);
    predictor.visit_resolved(resolved)?;

    Ok(predictor.mappings)
}

#[derive(Debug, Default, Clone)]
pub struct TagUsage {
    tags: IndexMap<String, IndexSet<String>>,
    uris: IndexMap<String, String>,
}

impl TagUsage {
    pub fn record(&mut self, prefix: &str, uri: &str, tag: &str) {
        self.uris
            .entry(prefix.to_owned())
            .or_insert_with(|| uri.to_owned());

        self.tags
            .entry(prefix.to_owned())
            .or_default()
            .insert(tag.to_owned());
    }
}

/// Phase two: tags come from observed usage, and only prefixes something was
/// rendered under survive.
pub fn reconcile(tentative: NamespaceMappings, usage: &TagUsage) -> NamespaceMappings {
    let mut mappings = NamespaceMappings::default();

    for (prefix, tags) in &usage.tags {
        for tag in tags {
            mappings.add_tag(prefix, tag);
        }

        let uri = &usage.uris[prefix];

        match tentative.prefixes.get(prefix) {
            Some(predicted) if predicted == uri => (),
            _ => log::debug!("Prefix {} for {} was not predicted", prefix, uri),
        }

        mappings.prefixes.insert(prefix.clone(), uri.clone());
    }

    for (prefix, tags) in &tentative.tags {
        for tag in tags {
            if !mappings.tags.get(prefix).map_or(false, |used| used.contains(tag)) {
                log::debug!("Predicted tag {}.{} was never rendered", prefix, tag);
            }
        }
    }

    mappings.types = tentative
        .types
        .into_iter()
        .filter(|(_, entry)| mappings.prefixes.contains_key(&entry.prefix))
        .collect();

    mappings
}
