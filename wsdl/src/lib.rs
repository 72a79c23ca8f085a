mod locator;

pub mod error;
pub mod types;

pub use locator::{client_builder, parse_service_locations, Response, ServiceLocator, Transport};

/// Fetches `wsdl_url` over plain HTTP and maps every service and port it
/// defines to the port's address location.
///
/// ```no_run
/// let locations = soapy_wsdl::get_service_locations("http://myserver:8080/service.wsdl")?;
/// let location = locations.location("Calculator", "CalculatorSoap");
/// # Ok::<(), soapy_wsdl::error::Error>(())
/// ```
pub fn get_service_locations<S: AsRef<str>>(
    wsdl_url: S,
) -> Result<types::ServiceLocations, error::Error> {
    ServiceLocator::new()?.get_service_locations(wsdl_url.as_ref())
}
