use std::collections::BTreeMap;

pub type Ports = BTreeMap<String, String>;

/// Service name → port name → address location, as read from one WSDL
/// document.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocations(BTreeMap<String, Ports>);

impl ServiceLocations {
    pub fn location(&self, service: &str, port: &str) -> Option<&str> {
        self.0
            .get(service)
            .and_then(|ports| ports.get(port))
            .map(String::as_str)
    }

    pub fn ports(&self, service: &str) -> Option<&Ports> {
        self.0.get(service)
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every `(service, port, location)` triple in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.0.iter().flat_map(|(service, ports)| {
            ports
                .iter()
                .map(move |(port, location)| (service.as_str(), port.as_str(), location.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Ports> {
        self.0
    }

    /// Replaces any ports previously stored under `service`.
    pub(crate) fn insert(&mut self, service: String, ports: Ports) {
        self.0.insert(service, ports);
    }
}
