use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to read file {0}")]
    FileReadError(String, #[source] std::io::Error),

    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("No document registered for {0}")]
    DocumentNotFound(String),

    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Malformed XML document: {0}")]
    MalformedDocument(String),

    #[error("Expected a <{expected}> root element, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },

    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("{node}: no {expected} found (found: {found})")]
    Structural {
        node: String,
        expected: &'static str,
        found: String,
    },

    #[error("No elements or complexTypes found in schema documents (found: {0})")]
    EmptySchema(String),

    #[error("Message {0} is not defined")]
    UnknownMessage(String),
}

impl Error {
    pub(crate) fn structural<'a>(
        node: impl Into<String>,
        expected: &'static str,
        found: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let found = found.into_iter().collect::<Vec<_>>();

        Error::Structural {
            node: node.into(),
            expected,
            found: if found.is_empty() {
                "nothing".to_owned()
            } else {
                found.join(", ")
            },
        }
    }
}
