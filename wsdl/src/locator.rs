use bytes::{Buf, Bytes};
use reqwest::{
    blocking::{Client, ClientBuilder},
    redirect::Policy,
};
use soapy_util::{resolver::Endpoint, split_url, Element};
use tracing::{debug, trace};
use url::Url;

use super::{
    error::{Error, MalformedDocument},
    types::{Ports, ServiceLocations},
};

const HTTP_OK: u16 = 200;

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

/// Performs the single GET the locator needs. Implemented for
/// [`reqwest::blocking::Client`]; timeouts belong to the client.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn fetch(&self, url: &Url) -> Result<Response, Error>;
}

impl Transport for Client {
    fn fetch(&self, url: &Url) -> Result<Response, Error> {
        let response = self.get(url.clone()).send()?;
        let status = response.status().as_u16();

        Ok(Response {
            status,
            body: response.bytes()?,
        })
    }
}

/// A client builder that never follows redirects, so a 3xx answer surfaces
/// as a fetch error instead of a second request.
pub fn client_builder() -> ClientBuilder {
    Client::builder().redirect(Policy::none())
}

pub struct ServiceLocator<T = Client> {
    transport: T,
}

impl ServiceLocator<Client> {
    pub fn new() -> Result<Self, Error> {
        Ok(Self::with_transport(client_builder().build()?))
    }
}

impl<T: Transport> ServiceLocator<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn get_service_locations(&self, wsdl_url: &str) -> Result<ServiceLocations, Error> {
        let (hostport, path) = split_url(wsdl_url);
        let endpoint: Endpoint = hostport.parse().map_err(Error::InvalidAddress)?;
        let url = Url::parse(&format!("http://{}{}", endpoint, path))?;

        debug!(host = %endpoint.host, port = endpoint.port, %path, "fetching WSDL");

        let response = self.transport.fetch(&url)?;
        if response.status != HTTP_OK {
            return Err(Error::RemoteFetchError {
                status: response.status,
                url: wsdl_url.to_owned(),
            });
        }

        let document =
            Element::from_reader(response.body.reader()).map_err(MalformedDocument::Xml)?;

        let locations = parse_service_locations(&document)?;
        debug!(services = locations.len(), "finished parsing WSDL");

        Ok(locations)
    }
}

fn required_attribute(element: &Element, attribute: &'static str) -> Result<String, MalformedDocument> {
    element
        .get(attribute)
        .map(ToOwned::to_owned)
        .ok_or_else(|| MalformedDocument::MissingAttribute {
            element: element.tag.clone(),
            attribute,
        })
}

/// Walks the top level of a WSDL document for `service` definitions.
///
/// The first child of every port is taken to be its address element,
/// whatever its tag. Repeated service or port names replace earlier ones.
pub fn parse_service_locations(document: &Element) -> Result<ServiceLocations, MalformedDocument> {
    let mut locations = ServiceLocations::default();

    for definition in &document.children {
        if !definition.tag.contains("service") {
            trace!(tag = %definition.tag, "skipping definition");
            continue;
        }

        let service = required_attribute(definition, "name")?;
        let mut ports = Ports::new();

        for port in &definition.children {
            let name = required_attribute(port, "name")?;

            let address = match port.children.first() {
                Some(address) => address,
                None => {
                    return Err(MalformedDocument::MissingAddress {
                        service,
                        port: name,
                    })
                }
            };

            let location = required_attribute(address, "location")?;
            trace!(%service, port = %name, %location, "found port");

            ports.insert(name, location);
        }

        locations.insert(service, ports);
    }

    Ok(locations)
}
