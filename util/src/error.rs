use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error reading or writing XML")]
    XmlError(#[from] quick_xml::Error),

    #[error("Malformed XML document: {0}")]
    MalformedDocument(String),

    #[error("Unable to convert {text:?} to {kind}")]
    ScalarConversion { kind: &'static str, text: String },

    #[error("Invalid port {0:?}")]
    InvalidPort(String),

    #[error("Request environment has no {0} entry")]
    MissingEnvironmentKey(&'static str),
}
