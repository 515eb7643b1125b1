use std::{collections::HashMap, path::Path, time::Duration};
use url::Url;

use super::error;

/// Turns a location given on the command line into a URL. Anything that does
/// not parse as an absolute URL is treated as a filesystem path.
pub fn resolve_location<S: AsRef<str>>(location: S) -> Result<Url, error::Error> {
    match Url::parse(location.as_ref()) {
        Ok(url) => Ok(url),

        Err(url::ParseError::RelativeUrlWithoutBase) => Url::from_file_path(
            Path::new(location.as_ref())
                .canonicalize()
                .map_err(|err| error::Error::PathConversionError(Some(err)))?,
        )
        .map_err(|()| error::Error::PathConversionError(None)),

        Err(err) => Err(err.into()),
    }
}

pub trait Loader {
    fn load(&self, url: &Url) -> Result<String, error::Error>;
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub timeout: Duration,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct UrlLoader {
    client: reqwest::blocking::Client,
}

impl UrlLoader {
    pub fn new(options: &LoaderOptions) -> Result<Self, error::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self { client })
    }
}

impl Loader for UrlLoader {
    fn load(&self, url: &Url) -> Result<String, error::Error> {
        log::info!("Loading {}", url);

        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| error::Error::PathConversionError(None))?;

                std::fs::read_to_string(&path)
                    .map_err(|err| error::Error::FileReadError(path.display().to_string(), err))
            }

            "http" | "https" => Ok(self
                .client
                .get(url.clone())
                .send()?
                .error_for_status()?
                .text()?),

            other => Err(error::Error::UnsupportedScheme(other.into())),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    documents: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, url: impl Into<String>, document: impl Into<String>) -> Self {
        self.documents.insert(url.into(), document.into());
        self
    }
}

impl Loader for MemoryLoader {
    fn load(&self, url: &Url) -> Result<String, error::Error> {
        self.documents
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| error::Error::DocumentNotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn absolute_urls_pass_through() {
        let url = resolve_location("https://example.com/service?wsdl").unwrap();
        assert_eq!(url.as_str(), "https://example.com/service?wsdl");
    }

    #[test]
    fn missing_paths_fail_conversion() {
        assert_matches!(
            resolve_location("./definitely/not/here.wsdl"),
            Err(error::Error::PathConversionError(Some(_)))
        );
    }

    #[test]
    fn memory_loader_serves_registered_documents() {
        let loader = MemoryLoader::new().with_document("mem://a/service.wsdl", "<definitions/>");

        let url = Url::parse("mem://a/service.wsdl").unwrap();
        assert_eq!(loader.load(&url).unwrap(), "<definitions/>");

        let missing = Url::parse("mem://a/other.xsd").unwrap();
        assert_matches!(
            loader.load(&missing),
            Err(error::Error::DocumentNotFound(_))
        );
    }

    #[test]
    fn url_loader_rejects_unknown_schemes() {
        let loader = UrlLoader::new(&LoaderOptions::default()).unwrap();
        let url = Url::parse("ftp://example.com/a.xsd").unwrap();

        assert_matches!(loader.load(&url), Err(error::Error::UnsupportedScheme(_)));
    }
}
