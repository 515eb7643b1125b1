use indexmap::IndexMap;
use std::collections::HashSet;
use url::Url;

use super::{
    error,
    loader::Loader,
    namespaces::NamespaceScope,
    node::Node,
    parser,
    types::{
        AttributeType, Derivation, NamespacedName, ObjectType, Occurs, Property, Reference,
        SchemaRegistry, TypeNode,
    },
};

const PARTICLES: [&str; 4] = ["sequence", "choice", "all", "group"];
const CONTENT: [&str; 6] = [
    "sequence",
    "choice",
    "all",
    "group",
    "simpleContent",
    "complexContent",
];
const ATTRIBUTE_ONLY: [&str; 4] = ["annotation", "attribute", "attributeGroup", "anyAttribute"];

struct Context<'n> {
    schema: &'n Node,
    scope: NamespaceScope,
}

pub struct SchemaBuilder<'l> {
    loader: &'l dyn Loader,
    registry: SchemaRegistry,
    visited: HashSet<String>,
    building_groups: HashSet<NamespacedName>,
    found: Vec<String>,
}

impl<'l> SchemaBuilder<'l> {
    pub fn new(loader: &'l dyn Loader) -> Self {
        Self {
            loader,
            registry: Default::default(),
            visited: Default::default(),
            building_groups: Default::default(),
            found: Default::default(),
        }
    }

    pub fn mark_visited(&mut self, namespace: Option<&str>, url: &Url) -> bool {
        self.visited
            .insert(format!("{}|{}", namespace.unwrap_or_default(), url))
    }

    pub fn loader(&self) -> &'l dyn Loader {
        self.loader
    }

    pub fn add_schema(
        &mut self,
        schema: &Node,
        scope: &NamespaceScope,
        base: &Url,
    ) -> Result<(), error::Error> {
        let ctx = Context {
            schema,
            scope: scope.enter(schema),
        };

        log::debug!("Building schema for namespace {:?}", ctx.scope.target());

        for child in &schema.children {
            let name = child.local_name();
            if !self.found.iter().any(|found| found == name) {
                self.found.push(name.to_owned());
            }
        }

        for import in schema
            .children
            .iter()
            .filter(|child| child.is("import") || child.is("include"))
        {
            self.add_import(import, &ctx, base)?;
        }

        for group in schema.children_named("group") {
            if let Some(name) = group.attribute("name") {
                self.group(&ctx.scope.target_namespaced(name), &ctx)?;
            }
        }

        for complex_type in schema.children_named("complexType") {
            let name = complex_type.required_attribute("name")?;
            let object = self.build_complex_type(complex_type, &ctx, name)?;

            self.registry
                .complex_types
                .insert(ctx.scope.target_namespaced(name), object);
        }

        for simple_type in schema.children_named("simpleType") {
            let name = simple_type.required_attribute("name")?;
            let base = self.simple_type_base(simple_type, &ctx, name);

            self.registry
                .simple_types
                .insert(ctx.scope.target_namespaced(name), base);
        }

        for element in schema.children_named("element") {
            let name = element.required_attribute("name")?;
            let ty = self.element_type(element, &ctx, name)?;

            self.registry
                .elements
                .insert(ctx.scope.target_namespaced(name), ty);
        }

        Ok(())
    }

    fn add_import(&mut self, import: &Node, ctx: &Context, base: &Url) -> Result<(), error::Error> {
        let [location, namespace] = import.attributes_named(["schemaLocation", "namespace"]);

        let location = if let Some(location) = location {
            location
        } else {
            log::debug!(
                "Import of {:?} has no schemaLocation, expecting its types inline",
                namespace
            );
            return Ok(());
        };

        let url = match base.join(location) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("Skipping import of {:?}: {}", location, err);
                return Ok(());
            }
        };

        if !self.mark_visited(namespace, &url) {
            log::debug!("Already imported {}", url);
            return Ok(());
        }

        let root = match self
            .loader
            .load(&url)
            .and_then(|text| parser::parse_document(&text))
        {
            Ok(root) => root,
            Err(err) => {
                log::warn!("Skipping import of {}: {}", url, err);
                return Ok(());
            }
        };

        if !root.is("schema") {
            log::warn!(
                "Skipping import of {}: root element is <{}>, not <schema>",
                url,
                root.name
            );
            return Ok(());
        }

        let scope = if import.is("include") {
            NamespaceScope::default().with_target(Some(ctx.scope.target()))
        } else {
            NamespaceScope::default()
        };

        log::info!("Imported {}", url);
        self.add_schema(&root, &scope, &url)
    }

    fn build_complex_type(
        &mut self,
        node: &Node,
        ctx: &Context,
        name: &str,
    ) -> Result<ObjectType, error::Error> {
        let mut object = ObjectType::new(ctx.scope.target(), ctx.scope.element_form_qualified());
        self.collect_attributes(node, &mut object, ctx);

        match node.first_child_of(&CONTENT) {
            Some(content) if content.is("simpleContent") => {
                self.build_simple_content(content, &mut object, ctx)?
            }

            Some(content) if content.is("complexContent") => {
                self.build_complex_content(content, &mut object, ctx)?
            }

            Some(particle) => {
                object.properties = self.build_particle(particle, ctx, Occurs::default())?
            }

            None => {
                let unexpected = node
                    .children
                    .iter()
                    .any(|child| !ATTRIBUTE_ONLY.contains(&child.local_name()));

                if unexpected {
                    return Err(error::Error::structural(
                        format!("complexType {}", name),
                        "sequence/choice/all/group/simpleContent/complexContent",
                        node.child_names(),
                    ));
                }
            }
        }

        Ok(object)
    }

    fn build_simple_content(
        &mut self,
        content: &Node,
        object: &mut ObjectType,
        ctx: &Context,
    ) -> Result<(), error::Error> {
        let derivation = content
            .first_child_of(&["extension", "restriction"])
            .ok_or_else(|| {
                error::Error::structural("simpleContent", "extension/restriction", content.child_names())
            })?;

        let base = derivation.required_attribute("base")?;
        object.base = Some(Reference::Type(ctx.scope.resolve(base)));
        object.derivation = Some(Derivation::SimpleContent);
        self.collect_attributes(derivation, object, ctx);

        Ok(())
    }

    fn build_complex_content(
        &mut self,
        content: &Node,
        object: &mut ObjectType,
        ctx: &Context,
    ) -> Result<(), error::Error> {
        let derivation = content
            .first_child_of(&["extension", "restriction"])
            .ok_or_else(|| {
                error::Error::structural("complexContent", "extension/restriction", content.child_names())
            })?;

        let base = derivation.required_attribute("base")?;
        object.base = Some(Reference::Type(ctx.scope.resolve(base)));
        object.derivation = Some(if derivation.is("extension") {
            Derivation::Extension
        } else {
            Derivation::Restriction
        });

        self.collect_attributes(derivation, object, ctx);

        if let Some(particle) = derivation.first_child_of(&PARTICLES) {
            object.properties = self.build_particle(particle, ctx, Occurs::default())?;
        }

        Ok(())
    }

    /// Nested particles are processed before direct elements; each group keeps
    /// declaration order.
    fn build_particle(
        &mut self,
        node: &Node,
        ctx: &Context,
        outer: Occurs,
    ) -> Result<IndexMap<String, Property>, error::Error> {
        let mut occurs = Occurs::parse(node.attribute("minOccurs"), node.attribute("maxOccurs"))
            .within(outer);

        if node.is("choice") {
            occurs.min = 0;
        }

        let mut properties = IndexMap::new();

        if node.is("group") {
            if let Some(reference) = node.attribute("ref") {
                let name = ctx.scope.resolve(reference);

                for (key, mut property) in self.group(&name, ctx)? {
                    property.occurs = property.occurs.within(occurs);
                    properties.insert(key, property);
                }

                return Ok(properties);
            }
        }

        for particle in node
            .children
            .iter()
            .filter(|child| PARTICLES.contains(&child.local_name()))
        {
            properties.extend(self.build_particle(particle, ctx, occurs)?);
        }

        for element in node.children_named("element") {
            let (key, mut property) = self.build_local_element(element, ctx)?;
            property.occurs = property.occurs.within(occurs);
            properties.insert(key, property);
        }

        if node.children_named("any").next().is_some() {
            log::debug!("Ignoring xs:any wildcard in {}", ctx.scope.target());
        }

        Ok(properties)
    }

    fn group(
        &mut self,
        name: &NamespacedName,
        ctx: &Context,
    ) -> Result<IndexMap<String, Property>, error::Error> {
        if let Some(group) = self.registry.groups.get(name) {
            return Ok(group.clone());
        }

        if name.namespace == ctx.scope.target() {
            let definition = ctx
                .schema
                .children_named("group")
                .find(|group| group.attribute("name") == Some(name.name.as_str()));

            if let Some(definition) = definition {
                if !self.building_groups.insert(name.clone()) {
                    log::warn!("Group {} contains itself", name);
                    return Ok(IndexMap::new());
                }

                let properties = self.build_particle(definition, ctx, Occurs::default());
                self.building_groups.remove(name);

                let properties = properties?;
                self.registry
                    .groups
                    .insert(name.clone(), properties.clone());

                return Ok(properties);
            }
        }

        if let Some((found, group)) = self
            .registry
            .groups
            .iter()
            .find(|(key, _)| key.name == name.name)
        {
            log::warn!("Group {} not found, using {}", name, found);
            return Ok(group.clone());
        }

        log::warn!("Group {} is not defined", name);
        Ok(IndexMap::new())
    }

    fn build_local_element(
        &mut self,
        node: &Node,
        ctx: &Context,
    ) -> Result<(String, Property), error::Error> {
        let [name, reference, form] = node.attributes_named(["name", "ref", "form"]);
        let occurs = Occurs::parse(node.attribute("minOccurs"), node.attribute("maxOccurs"));

        // Global elements are always qualified, and live in their own namespace.
        if let Some(reference) = reference {
            let target = ctx.scope.resolve(reference);

            return Ok((
                target.name.clone(),
                Property {
                    namespace: target.namespace.clone(),
                    ty: TypeNode::Reference(Reference::Element(target)),
                    occurs,
                    qualified: true,
                },
            ));
        }

        let name = name.ok_or_else(|| error::Error::MissingAttribute {
            element: node.name.clone(),
            attribute: "name",
        })?;

        let qualified = match form {
            Some(form) => form == "qualified",
            None => ctx.scope.element_form_qualified(),
        };

        Ok((
            name.to_owned(),
            Property {
                ty: self.element_type(node, ctx, name)?,
                occurs,
                qualified,
                namespace: ctx.scope.target().to_owned(),
            },
        ))
    }

    fn element_type(
        &mut self,
        node: &Node,
        ctx: &Context,
        name: &str,
    ) -> Result<TypeNode, error::Error> {
        if let Some(ty) = node.attribute("type") {
            return Ok(TypeNode::from_type_name(ctx.scope.resolve(ty)));
        }

        if let Some(complex_type) = node.child("complexType") {
            return Ok(TypeNode::Object(self.build_complex_type(
                complex_type,
                ctx,
                name,
            )?));
        }

        if let Some(simple_type) = node.child("simpleType") {
            return Ok(self.simple_type_base(simple_type, ctx, name));
        }

        Ok(TypeNode::any())
    }

    fn simple_type_base(&self, node: &Node, ctx: &Context, name: &str) -> TypeNode {
        if let Some(restriction) = node.child("restriction") {
            if let Some(base) = restriction.attribute("base") {
                return TypeNode::from_type_name(ctx.scope.resolve(base));
            }

            if let Some(inner) = restriction.child("simpleType") {
                return self.simple_type_base(inner, ctx, name);
            }
        }

        log::warn!(
            "simpleType {} has no restriction base, treating it as xsd:string",
            name
        );
        TypeNode::Primitive("string".to_owned())
    }

    fn collect_attributes(&self, node: &Node, object: &mut ObjectType, ctx: &Context) {
        for attribute in node.children_named("attribute") {
            let [name, reference, ty, usage] =
                attribute.attributes_named(["name", "ref", "type", "use"]);

            let (name, ty) = match (name, reference) {
                (Some(name), _) => {
                    let ty = match (ty, attribute.child("simpleType")) {
                        (Some(ty), _) => TypeNode::from_type_name(ctx.scope.resolve(ty)),
                        (None, Some(simple_type)) => {
                            self.simple_type_base(simple_type, ctx, name)
                        }
                        (None, None) => TypeNode::Primitive("string".to_owned()),
                    };

                    (name.to_owned(), ty)
                }

                (None, Some(reference)) => (
                    ctx.scope.resolve(reference).name,
                    TypeNode::Primitive("string".to_owned()),
                ),

                (None, None) => {
                    log::warn!("Skipping attribute without name or ref");
                    continue;
                }
            };

            object.attributes.insert(
                name,
                AttributeType {
                    ty,
                    required: usage == Some("required"),
                },
            );
        }
    }

    /// Resolves derivation and indexes the registry. Fails if nothing usable
    /// was found in any document.
    pub fn finish(mut self) -> Result<SchemaRegistry, error::Error> {
        if self.registry.is_empty() {
            let found = if self.found.is_empty() {
                "nothing".to_owned()
            } else {
                self.found.join(", ")
            };

            return Err(error::Error::EmptySchema(found));
        }

        self.merge_bases();
        self.registry.index_local_names();

        log::info!(
            "Registered {} elements, {} complex types and {} simple types",
            self.registry.elements.len(),
            self.registry.complex_types.len(),
            self.registry.simple_types.len()
        );

        Ok(self.registry)
    }

    fn merge_bases(&mut self) {
        let names = self
            .registry
            .complex_types
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        let mut merged = HashSet::new();

        for name in &names {
            self.merge_named(name, &mut Vec::new(), &mut merged);
        }

        let pool = self.registry.complex_types.clone();

        for node in self.registry.elements.values_mut() {
            merge_inline(node, &pool);
        }

        let properties = self
            .registry
            .complex_types
            .values_mut()
            .flat_map(|object| object.properties.values_mut())
            .chain(
                self.registry
                    .groups
                    .values_mut()
                    .flat_map(|group| group.values_mut()),
            );

        for property in properties {
            merge_inline(&mut property.ty, &pool);
        }
    }

    fn merge_named(
        &mut self,
        name: &NamespacedName,
        stack: &mut Vec<NamespacedName>,
        merged: &mut HashSet<NamespacedName>,
    ) {
        if merged.contains(name) {
            return;
        }

        if stack.contains(name) {
            log::warn!("Circular derivation through {}", name);
            return;
        }

        let base = match self.registry.complex_types.get(name) {
            Some(object) if is_derived(object) => object.base.clone(),
            _ => None,
        };

        let base_name = base.and_then(|base| {
            find_base(&self.registry.complex_types, base.name()).map(|(key, _)| key.clone())
        });

        if let Some(base_name) = base_name {
            stack.push(name.clone());
            self.merge_named(&base_name, stack, merged);
            stack.pop();

            let base_object = self.registry.complex_types.get(&base_name).cloned();

            if let (Some(base_object), Some(object)) =
                (base_object, self.registry.complex_types.get_mut(name))
            {
                inherit(object, &base_object);
            }
        }

        merged.insert(name.clone());
    }
}

fn is_derived(object: &ObjectType) -> bool {
    matches!(
        object.derivation,
        Some(Derivation::Extension | Derivation::Restriction)
    )
}

fn find_base<'p>(
    pool: &'p IndexMap<NamespacedName, ObjectType>,
    base: &NamespacedName,
) -> Option<(&'p NamespacedName, &'p ObjectType)> {
    if let Some(found) = pool.get_key_value(base) {
        return Some(found);
    }

    if base.is_xsd() {
        return None;
    }

    match pool.iter().find(|(key, _)| key.name == base.name) {
        Some(found) => {
            log::warn!("Base type {} not found, using {}", base, found.0);
            Some(found)
        }

        None => {
            log::warn!("Base type {} not found", base);
            None
        }
    }
}

/// Base properties and attributes come first; the derived type's own
/// declarations replace same-named ones.
fn inherit(object: &mut ObjectType, base: &ObjectType) {
    let mut properties = base.properties.clone();
    properties.extend(object.properties.drain(..));
    object.properties = properties;

    let mut attributes = base.attributes.clone();
    attributes.extend(object.attributes.drain(..));
    object.attributes = attributes;
}

fn merge_inline(node: &mut TypeNode, pool: &IndexMap<NamespacedName, ObjectType>) {
    if let TypeNode::Object(object) = node {
        if is_derived(object) {
            let base = object
                .base
                .as_ref()
                .and_then(|base| find_base(pool, base.name()));

            if let Some((_, base)) = base {
                inherit(object, base);
            }
        }

        for property in object.properties.values_mut() {
            merge_inline(&mut property.ty, pool);
        }
    }
}
