use std::{fs, path::Path};

use tsoap_wsdl::{
    self as wsdl,
    loader::LoaderOptions,
    types::{Definition, Operation, PortType, SchemaRegistry},
};

pub mod context;
pub mod error;
pub mod flatten;
pub mod markup;
pub mod namespaces;
pub mod naming;
pub mod operation;
pub mod render;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod testing;

use context::RunContext;
use resolver::Resolver;
use types::GeneratedFile;

pub const DEFAULT_RUNTIME_MODULE: &str = "tsoap/runtime";

#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub runtime_module: String,
    pub operations: Vec<String>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            runtime_module: DEFAULT_RUNTIME_MODULE.to_owned(),
            operations: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct OperationFailure {
    pub operation: String,
    pub error: error::Error,
}

#[derive(Debug, Default)]
pub struct Generation {
    pub files: Vec<GeneratedFile>,
    pub failures: Vec<OperationFailure>,
}

impl Generation {
    pub fn write_to(&self, directory: &Path) -> Result<(), error::Error> {
        fs::create_dir_all(directory)
            .map_err(|err| error::Error::WriteError(directory.display().to_string(), err))?;

        for file in &self.files {
            let path = directory.join(&file.file_name);
            fs::write(&path, &file.contents)
                .map_err(|err| error::Error::WriteError(path.display().to_string(), err))?;

            log::info!("Wrote {}", path.display());
        }

        Ok(())
    }
}

pub fn from_url<S: AsRef<str>>(
    url: S,
    loader_options: &LoaderOptions,
    options: &GeneratorOptions,
) -> Result<Generation, error::Error> {
    let (definition, registry) = wsdl::parse(url, loader_options)?;
    Ok(generate(&definition, &registry, options))
}

pub fn generate(
    definition: &Definition,
    registry: &SchemaRegistry,
    options: &GeneratorOptions,
) -> Generation {
    let mut context = RunContext::default();
    let resolver = Resolver::new(registry);
    let mut generation = Generation::default();

    for name in &options.operations {
        if !operation::operations(definition)
            .iter()
            .any(|(_, operation)| &operation.name == name)
        {
            log::warn!("Operation {} is not defined", name);
        }
    }

    for (port_type, operation) in operation::operations(definition) {
        if !options.operations.is_empty() && !options.operations.contains(&operation.name) {
            log::debug!("Skipping operation {}", operation.name);
            continue;
        }

        match generate_operation(definition, &resolver, &mut context, port_type, operation, options)
        {
            Ok(file) => {
                log::info!("Generated {}", file.file_name);
                generation.files.push(file);
            }

            Err(error) => {
                log::warn!("Skipping operation {}: {}", operation.name, error);
                generation.failures.push(OperationFailure {
                    operation: operation.name.clone(),
                    error,
                });
            }
        }
    }

    generation
}

fn generate_operation(
    definition: &Definition,
    resolver: &Resolver,
    context: &mut RunContext,
    port_type: &PortType,
    operation: &Operation,
    options: &GeneratorOptions,
) -> Result<GeneratedFile, error::Error> {
    let descriptor = operation::describe(definition, resolver, port_type, operation)?;
    let data = operation::template_data(&descriptor, resolver, &mut context.prefixes)?;

    Ok(GeneratedFile {
        file_name: format!("{}.tsx", descriptor.name),
        contents: render::render(&data, &options.runtime_module),
    })
}
