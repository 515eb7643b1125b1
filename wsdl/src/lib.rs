pub use url::Url;

mod definition;
mod parser;

pub mod error;
pub mod loader;
pub mod namespaces;
pub mod node;
pub mod schema;
pub mod types;

pub use parser::parse_document;

pub fn parse<S: AsRef<str>>(
    location: S,
    options: &loader::LoaderOptions,
) -> Result<(types::Definition, types::SchemaRegistry), error::Error> {
    let url = loader::resolve_location(location)?;
    let loader = loader::UrlLoader::new(options)?;

    parse_with(&url, &loader)
}

pub fn parse_with(
    url: &Url,
    loader: &dyn loader::Loader,
) -> Result<(types::Definition, types::SchemaRegistry), error::Error> {
    definition::load(url, loader)
}
