//! WS-Addressing headers used to correlate asynchronous calls with their
//! callbacks. The inbound header element is always passed in explicitly.

use crate::xml::Element;

pub const NAMESPACE: &str = "http://schemas.xmlsoap.org/ws/2003/03/addressing";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackInfo {
    pub message_id: Option<String>,
    pub reply_to: Option<String>,
}

/// Builds the `RelatesTo` header a callback carries back to its caller.
pub fn relates_to_header<'a, I>(relates_to: &str, attributes: I) -> Element
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut element = Element::new("RelatesTo").with_attribute("xmlns", NAMESPACE);

    for (name, value) in attributes {
        element.set(name, value);
    }

    element.with_text(relates_to)
}

/// Builds the `MessageID` and `ReplyTo` headers that start an asynchronous
/// exchange.
pub fn callback_info_headers(message_id: Option<&str>, reply_to: Option<&str>) -> (Element, Element) {
    let mut message_id_element = Element::new("wsa:MessageID");
    message_id_element.text = message_id.map(ToOwned::to_owned);

    let mut address = Element::new("wsa:Address");
    address.text = reply_to.map(ToOwned::to_owned);

    (message_id_element, Element::new("wsa:ReplyTo").with_child(address))
}

/// Reads the message id and reply-to address out of an inbound SOAP header.
pub fn callback_info(header: Option<&Element>) -> CallbackInfo {
    let mut info = CallbackInfo::default();

    for entry in header.into_iter().flat_map(|header| &header.children) {
        let tag = entry.tag.to_lowercase();

        if tag.ends_with("messageid") {
            info.message_id = entry.text.clone();
        }

        if tag.contains("replyto") {
            for address in &entry.children {
                if address.tag.to_lowercase().ends_with("address") {
                    info.reply_to = address.text.clone();
                }
            }
        }
    }

    info
}

/// Echoes the inbound callback information as outbound headers.
pub fn passthru_headers(header: Option<&Element>) -> (Element, Element) {
    let info = callback_info(header);
    callback_info_headers(info.message_id.as_deref(), info.reply_to.as_deref())
}

/// The `RelatesTo` value of an inbound callback, if any.
pub fn relates_to_info(header: Option<&Element>) -> Option<String> {
    header?
        .children
        .iter()
        .find(|entry| entry.tag.to_lowercase().contains("relatesto"))
        .and_then(|entry| entry.text.clone())
}
