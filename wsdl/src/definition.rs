use url::Url;

use super::{
    error,
    loader::Loader,
    namespaces::NamespaceScope,
    node::Node,
    parser,
    schema::SchemaBuilder,
    types::{
        Binding, BindingOperation, Definition, HeaderRef, Message, Operation, Part, Port,
        PortType, SchemaRegistry, Service, SoapVersion,
    },
};

const SOAP11_BINDING: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
const SOAP12_BINDING: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

struct DefinitionBuilder<'l> {
    schemas: SchemaBuilder<'l>,
    definition: Definition,
}

impl<'l> DefinitionBuilder<'l> {
    fn new(loader: &'l dyn Loader) -> Self {
        Self {
            schemas: SchemaBuilder::new(loader),
            definition: Default::default(),
        }
    }

    fn add_document(&mut self, url: &Url) -> Result<(), error::Error> {
        self.schemas.mark_visited(None, url);

        let text = self.schemas.loader().load(url)?;
        let root = parser::parse_document(&text)?;

        self.add_definitions(&root, url)
    }

    fn add_definitions(&mut self, root: &Node, url: &Url) -> Result<(), error::Error> {
        if !root.is("definitions") {
            return Err(error::Error::UnexpectedRoot {
                expected: "definitions",
                found: root.name.clone(),
            });
        }

        let scope = NamespaceScope::default().enter(root);

        if self.definition.target_namespace.is_empty() {
            self.definition.target_namespace = scope.target().to_owned();
        }

        for import in root.children_named("import") {
            self.add_import(import, url)?;
        }

        if let Some(types) = root.child("types") {
            let types_scope = scope.enter(types);

            for schema in types.children_named("schema") {
                self.schemas.add_schema(schema, &types_scope, url)?;
            }
        }

        for message in root.children_named("message") {
            let message = parse_message(message, &scope)?;
            self.definition.messages.push(message);
        }

        for port_type in root.children_named("portType") {
            let port_type = parse_port_type(port_type, &scope)?;
            self.definition.port_types.push(port_type);
        }

        for binding in root.children_named("binding") {
            if let Some(binding) = parse_binding(binding, &scope)? {
                self.definition.bindings.push(binding);
            }
        }

        for service in root.children_named("service") {
            let service = parse_service(service, &scope)?;
            self.definition.services.push(service);
        }

        Ok(())
    }

    fn add_import(&mut self, import: &Node, base: &Url) -> Result<(), error::Error> {
        let [location, namespace] = import.attributes_named(["location", "namespace"]);

        let location = if let Some(location) = location {
            location
        } else {
            log::warn!("Skipping wsdl:import of {:?} without location", namespace);
            return Ok(());
        };

        let url = match base.join(location) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("Skipping wsdl:import of {:?}: {}", location, err);
                return Ok(());
            }
        };

        if !self.schemas.mark_visited(namespace, &url) {
            return Ok(());
        }

        let root = match self
            .schemas
            .loader()
            .load(&url)
            .and_then(|text| parser::parse_document(&text))
        {
            Ok(root) => root,
            Err(err) => {
                log::warn!("Skipping wsdl:import of {}: {}", url, err);
                return Ok(());
            }
        };

        if root.is("definitions") {
            self.add_definitions(&root, &url)
        } else if root.is("schema") {
            self.schemas
                .add_schema(&root, &NamespaceScope::default(), &url)
        } else {
            log::warn!(
                "Skipping wsdl:import of {}: unexpected root element <{}>",
                url,
                root.name
            );
            Ok(())
        }
    }

    fn finish(self) -> Result<(Definition, SchemaRegistry), error::Error> {
        let registry = self.schemas.finish()?;
        Ok((self.definition, registry))
    }
}

fn parse_message(node: &Node, scope: &NamespaceScope) -> Result<Message, error::Error> {
    let name = node.required_attribute("name")?;
    let mut parts = Vec::new();

    for part in node.children_named("part") {
        let [element, ty] = part.attributes_named(["element", "type"]);
        let scope = scope.enter(part);

        parts.push(Part {
            name: part.required_attribute("name")?.to_owned(),
            element: element.map(|element| scope.resolve(element)),
            ty: ty.map(|ty| scope.resolve(ty)),
        });
    }

    Ok(Message {
        name: scope.target_namespaced(name),
        parts,
    })
}

fn parse_port_type(node: &Node, scope: &NamespaceScope) -> Result<PortType, error::Error> {
    let name = node.required_attribute("name")?;
    let mut operations = Vec::new();

    for operation in node.children_named("operation") {
        let message = |direction: &str| {
            operation
                .child(direction)
                .and_then(|node| node.attribute("message"))
                .map(|message| scope.resolve(message))
        };

        operations.push(Operation {
            name: operation.required_attribute("name")?.to_owned(),
            documentation: operation
                .child("documentation")
                .and_then(|documentation| documentation.text.clone()),
            input: message("input"),
            output: message("output"),
        });
    }

    Ok(PortType {
        name: scope.target_namespaced(name),
        operations,
    })
}

fn soap_version(node: &Node, scope: &NamespaceScope) -> Option<SoapVersion> {
    match scope.namespace_of(node.prefix()) {
        Some(SOAP11_BINDING) => Some(SoapVersion::Soap11),
        Some(SOAP12_BINDING) => Some(SoapVersion::Soap12),
        _ => None,
    }
}

fn headers(node: Option<&Node>, scope: &NamespaceScope) -> Result<Vec<HeaderRef>, error::Error> {
    let mut headers = Vec::new();

    for header in node.into_iter().flat_map(|node| node.children_named("header")) {
        headers.push(HeaderRef {
            message: scope.resolve(header.required_attribute("message")?),
            part: header.required_attribute("part")?.to_owned(),
        });
    }

    Ok(headers)
}

/// Returns `None` for bindings that are not SOAP bindings.
fn parse_binding(node: &Node, scope: &NamespaceScope) -> Result<Option<Binding>, error::Error> {
    let name = node.required_attribute("name")?;
    let ty = node.required_attribute("type")?;

    let soap_binding = node
        .children_named("binding")
        .find_map(|child| soap_version(child, scope).map(|version| (child, version)));

    let (soap_binding, version) = if let Some(found) = soap_binding {
        found
    } else {
        log::debug!("Skipping non-SOAP binding {}", name);
        return Ok(None);
    };

    let default_style = soap_binding.attribute("style");
    let mut operations = Vec::new();

    for operation in node.children_named("operation") {
        let soap_operation = operation.child("operation");
        let [action, style] = soap_operation
            .map(|soap_operation| soap_operation.attributes_named(["soapAction", "style"]))
            .unwrap_or([None, None]);

        operations.push(BindingOperation {
            name: operation.required_attribute("name")?.to_owned(),
            action: action.filter(|action| !action.is_empty()).map(ToOwned::to_owned),
            style: style.or(default_style).map(ToOwned::to_owned),
            input_headers: headers(operation.child("input"), scope)?,
            output_headers: headers(operation.child("output"), scope)?,
        });
    }

    Ok(Some(Binding {
        name: scope.target_namespaced(name),
        ty: scope.resolve(ty),
        version,
        operations,
    }))
}

fn parse_service(node: &Node, scope: &NamespaceScope) -> Result<Service, error::Error> {
    let name = node.required_attribute("name")?;
    let mut ports = Vec::new();

    for port in node.children_named("port") {
        ports.push(Port {
            name: port.required_attribute("name")?.to_owned(),
            binding: scope.resolve(port.required_attribute("binding")?),
            location: port
                .child("address")
                .and_then(|address| address.attribute("location"))
                .map(ToOwned::to_owned),
        });
    }

    Ok(Service {
        name: scope.target_namespaced(name),
        ports,
    })
}

pub fn load(url: &Url, loader: &dyn Loader) -> Result<(Definition, SchemaRegistry), error::Error> {
    let mut builder = DefinitionBuilder::new(loader);
    builder.add_document(url)?;
    builder.finish()
}
