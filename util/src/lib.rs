pub mod addressing;
pub mod convert;
pub mod error;
pub mod resolver;
pub mod xml;

pub use convert::{document_to_element, element_to_value, value_to_element, Value};
pub use resolver::{reconstruct_url, split_url};
pub use xml::Element;
