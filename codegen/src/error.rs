use thiserror::Error;
use tsoap_wsdl::types::NamespacedName;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error loading WSDL: {0}")]
    Wsdl(#[from] tsoap_wsdl::error::Error),

    #[error("Operation {operation} has no input message")]
    MissingInput { operation: String },

    #[error("Message {message} has no usable part")]
    MissingPart { message: NamespacedName },

    #[error("Request type {0} could not be resolved")]
    UnresolvedRequest(NamespacedName),

    #[error("type {0} has no $namespace")]
    MissingNamespace(NamespacedName),

    #[error("Could not derive a free namespace prefix for {uri} after {attempts} attempts")]
    PrefixExhausted { uri: String, attempts: u32 },

    #[error("Error writing {0}")]
    WriteError(String, #[source] std::io::Error),
}
