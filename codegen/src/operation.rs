use tsoap_wsdl::{
    error::Error as WsdlError,
    types::{
        Definition, HeaderRef, Message, NamespacedName, Operation, Part, PortType, Reference,
        SoapVersion, TypeNode,
    },
};

use super::{
    context::PrefixTable,
    error::Error,
    flatten::Flattener,
    markup::generate_body,
    namespaces::{predict, reconcile, TagUsage},
    naming::{member, type_name},
    resolver::Resolver,
    types::{
        HeaderDescriptor, HeaderInfo, InterfaceDescriptor, OperationDescriptor, RootElement,
        TemplateData,
    },
};

pub fn operations(definition: &Definition) -> Vec<(&PortType, &Operation)> {
    let mut operations: Vec<(&PortType, &Operation)> = Vec::new();

    for port_type in &definition.port_types {
        for operation in &port_type.operations {
            if operations
                .iter()
                .any(|(_, existing)| existing.name == operation.name)
            {
                log::debug!(
                    "Operation {} is declared again in {}, keeping the first",
                    operation.name,
                    port_type.name
                );
                continue;
            }

            operations.push((port_type, operation));
        }
    }

    operations
}

/// The element a part is rendered as. RPC-style `type=` parts are wrapped in
/// an element named after the part.
fn root_for_part(part: &Part, target_namespace: &str) -> Option<RootElement> {
    match (&part.element, &part.ty) {
        (Some(element), _) => Some(RootElement {
            tag: element.clone(),
            ty: TypeNode::Reference(Reference::Element(element.clone())),
        }),

        (None, Some(ty)) => Some(RootElement {
            tag: NamespacedName::new(target_namespace, part.name.as_str()),
            ty: TypeNode::from_type_name(ty.clone()),
        }),

        (None, None) => None,
    }
}

fn body_part<'d>(message: &'d Message, headers: &[HeaderRef]) -> Option<&'d Part> {
    message.parts.iter().find(|part| {
        !headers
            .iter()
            .any(|header| header.message == message.name && header.part == part.name)
    })
}

fn message<'d>(definition: &'d Definition, name: &NamespacedName) -> Result<&'d Message, Error> {
    definition
        .message(name)
        .ok_or_else(|| Error::Wsdl(WsdlError::UnknownMessage(name.to_string())))
}

fn header(
    definition: &Definition,
    resolver: &Resolver,
    reference: &HeaderRef,
) -> Result<HeaderInfo, String> {
    let message = definition
        .message(&reference.message)
        .ok_or_else(|| format!("message {} is not defined", reference.message))?;

    let part = message
        .parts
        .iter()
        .find(|part| part.name == reference.part)
        .ok_or_else(|| format!("message {} has no part {}", message.name, reference.part))?;

    let root = root_for_part(part, &definition.target_namespace)
        .ok_or_else(|| format!("part {} has neither element nor type", part.name))?;

    if resolver.resolve_node(&root.ty).is_none() {
        return Err(format!("type of {} could not be resolved", root.tag));
    }

    Ok(HeaderInfo {
        part_name: part.name.clone(),
        element_name: root.tag.clone(),
        header_type: root,
    })
}

fn response(
    definition: &Definition,
    resolver: &Resolver,
    operation: &Operation,
    headers: &[HeaderRef],
) -> Result<Option<RootElement>, String> {
    let name = match &operation.output {
        Some(name) => name,
        None => return Ok(None),
    };

    let message = definition
        .message(name)
        .ok_or_else(|| format!("message {} is not defined", name))?;

    let root = body_part(message, headers)
        .and_then(|part| root_for_part(part, &definition.target_namespace))
        .ok_or_else(|| format!("message {} has no usable part", name))?;

    if resolver.resolve_node(&root.ty).is_none() {
        return Err(format!("type of {} could not be resolved", root.tag));
    }

    Ok(Some(root))
}

/// Resolves the request, headers and response of `operation`. Only a
/// request that cannot be resolved is an error.
pub fn describe(
    definition: &Definition,
    resolver: &Resolver,
    port_type: &PortType,
    operation: &Operation,
) -> Result<OperationDescriptor, Error> {
    let binding = definition.binding_for(&port_type.name);
    let binding_operation = binding.and_then(|binding| {
        binding
            .operations
            .iter()
            .find(|candidate| candidate.name == operation.name)
    });

    if binding.is_none() {
        log::warn!("No SOAP binding for port type {}", port_type.name);
    }

    let input_headers =
        binding_operation.map_or(&[][..], |binding| binding.input_headers.as_slice());
    let output_headers =
        binding_operation.map_or(&[][..], |binding| binding.output_headers.as_slice());

    let input = operation
        .input
        .as_ref()
        .ok_or_else(|| Error::MissingInput {
            operation: operation.name.clone(),
        })?;

    let input = message(definition, input)?;

    let request_type = body_part(input, input_headers)
        .and_then(|part| root_for_part(part, &definition.target_namespace))
        .ok_or_else(|| Error::MissingPart {
            message: input.name.clone(),
        })?;

    if resolver.resolve_node(&request_type.ty).is_none() {
        return Err(Error::UnresolvedRequest(request_type.tag));
    }

    let mut headers = Vec::new();

    for reference in input_headers {
        match header(definition, resolver, reference) {
            Ok(header) => headers.push(header),
            Err(reason) => log::warn!(
                "Dropping header {} of {}: {}",
                reference.part,
                operation.name,
                reason
            ),
        }
    }

    let response_type = match response(definition, resolver, operation, output_headers) {
        Ok(response_type) => response_type,
        Err(reason) => {
            log::warn!("Omitting response of {}: {}", operation.name, reason);
            None
        }
    };

    Ok(OperationDescriptor {
        name: operation.name.clone(),
        documentation: operation.documentation.clone(),
        request_type,
        response_type,
        headers,
        soap_action: binding_operation.and_then(|binding| binding.action.clone()),
        soap_version: binding.map_or(SoapVersion::Soap11, |binding| binding.version),
        location: binding
            .and_then(|binding| definition.location_for(&binding.name))
            .map(str::to_owned),
    })
}

fn header_path(header: &HeaderInfo) -> String {
    member("headers", &header.part_name)
}

pub fn template_data(
    descriptor: &OperationDescriptor,
    resolver: &Resolver,
    prefixes: &mut PrefixTable,
) -> Result<TemplateData, Error> {
    let request = &descriptor.request_type;

    let mut tentative = predict(request, resolver, prefixes)?;
    for header in &descriptor.headers {
        tentative.merge(predict(&header.header_type, resolver, prefixes)?);
    }

    let mut usage = TagUsage::default();
    generate_body(request, "props", resolver, &tentative, Some(&mut usage));
    for header in &descriptor.headers {
        let path = header_path(header);
        generate_body(&header.header_type, &path, resolver, &tentative, Some(&mut usage));
    }

    let mappings = reconcile(tentative, &usage);

    let mut flattener = Flattener::new(resolver);
    let (request_name, fields) = flattener.add_root(request);

    let mut headers = Vec::new();
    for header in &descriptor.headers {
        let (_, properties) = flattener.add_root(&header.header_type);
        let path = header_path(header);

        headers.push(HeaderDescriptor {
            part_name: header.part_name.clone(),
            props: InterfaceDescriptor {
                name: format!("{}Header", type_name(&header.part_name)),
                properties,
            },
            markup: generate_body(&header.header_type, &path, resolver, &mappings, None),
        });
    }

    let response_type = descriptor
        .response_type
        .as_ref()
        .map(|response| flattener.add_root(response).0);

    let (interfaces, primitive_aliases) = flattener.finish();

    let xmlns_attributes = mappings
        .prefixes
        .iter()
        .map(|(prefix, uri)| (format!("xmlns:{}", prefix), uri.clone()))
        .collect();

    Ok(TemplateData {
        operation_name: descriptor.name.clone(),
        documentation: descriptor.documentation.clone(),
        request_type_local_name: request.tag.name.clone(),
        markup: generate_body(request, "props", resolver, &mappings, None),
        namespace_tags: mappings.tags,
        namespace_prefixes: mappings.prefixes,
        primitive_aliases,
        props: InterfaceDescriptor {
            name: format!("{}Props", request_name),
            properties: fields,
        },
        interfaces,
        response_type,
        soap_envelope_namespace: descriptor.soap_version.envelope_namespace().to_owned(),
        xmlns_attributes,
        headers,
        soap_action: descriptor.soap_action.clone(),
        location: descriptor.location.clone(),
    })
}
