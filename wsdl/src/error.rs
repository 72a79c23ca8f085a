use soapy_util::error::Error as XmlError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to resolve WSDL address")]
    InvalidAddress(#[source] XmlError),

    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Received code [{status}] from url [{url}], expected 200")]
    RemoteFetchError { status: u16, url: String },

    #[error("Malformed WSDL document")]
    MalformedDocumentError(#[from] MalformedDocument),
}

#[derive(Debug, Error)]
pub enum MalformedDocument {
    #[error("Document is not well-formed XML")]
    Xml(#[from] XmlError),

    #[error("<{element}> has no {attribute} attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("Port {port} of service {service} has no address element")]
    MissingAddress { service: String, port: String },
}
