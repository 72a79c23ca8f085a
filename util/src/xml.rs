use std::io::{BufRead, Cursor, Write};

pub use quick_xml::{events, Writer};

use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader,
};
use tracing::trace;

use crate::error::Error;

/// An in-memory XML element: tag, ordered attributes, the text preceding the
/// first child, and the children themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

/// Strips a `{namespace}` or `prefix:` qualifier from a tag name.
pub fn local_name(tag: &str) -> &str {
    let tag = tag.rsplit('}').next().unwrap_or(tag);
    tag.rsplit(':').next().unwrap_or(tag)
}

fn malformed(reason: &str) -> Error {
    Error::MalformedDocument(reason.to_owned())
}

impl Element {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets an attribute, replacing the value in place if the name exists.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();

        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn parse(xml: &str) -> Result<Self, Error> {
        Self::from_reader(xml.as_bytes())
    }

    /// Reads a single-rooted document. Text appearing after an element's
    /// first child is dropped.
    pub fn from_reader<B: BufRead>(input: B) -> Result<Self, Error> {
        let mut reader = Reader::from_reader(input);
        let mut buffer = Vec::new();

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event(&mut buffer)? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(malformed("multiple root elements"));
                    }

                    stack.push(Self::from_start(&reader, &start)?);
                }

                Event::Empty(start) => {
                    let element = Self::from_start(&reader, &start)?;
                    Self::close(&mut stack, &mut root, element)?;
                }

                Event::End(..) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("closing tag without opening tag"))?;
                    Self::close(&mut stack, &mut root, element)?;
                }

                Event::Text(text) => {
                    let text = text.unescape_and_decode(&reader)?;
                    Self::append_text(&mut stack, text)?;
                }

                Event::CData(data) => {
                    let text = data.unescape_and_decode(&reader)?;
                    Self::append_text(&mut stack, text)?;
                }

                Event::Eof => break,

                event => trace!(?event, "skipping event"),
            }

            buffer.clear();
        }

        if let Some(open) = stack.last() {
            return Err(Error::MalformedDocument(format!(
                "element {} is never closed",
                open.tag
            )));
        }

        root.ok_or_else(|| malformed("no root element"))
    }

    fn from_start<B: BufRead>(reader: &Reader<B>, start: &BytesStart<'_>) -> Result<Self, Error> {
        let mut element = Self::new(reader.decode(start.name())?);

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?.to_owned();
            let value = attribute.unescape_and_decode_value(reader)?;
            element.set(key, value);
        }

        Ok(element)
    }

    fn close(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), Error> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),

            None if root.is_none() => *root = Some(element),
            None => return Err(malformed("multiple root elements")),
        }

        Ok(())
    }

    fn append_text(stack: &mut [Element], text: String) -> Result<(), Error> {
        let current = match stack.last_mut() {
            Some(current) => current,

            None if text.trim().is_empty() => return Ok(()),
            None => return Err(malformed("text outside of the root element")),
        };

        if text.is_empty() || !current.children.is_empty() {
            return Ok(());
        }

        match &mut current.text {
            Some(existing) => existing.push_str(&text),
            None => current.text = Some(text),
        }

        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), Error> {
        let start = BytesStart::borrowed_name(self.tag.as_bytes()).with_attributes(
            self.attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );

        if self.text.is_none() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start.to_borrowed()))?;

        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::from_plain_str(text)))?;
        }

        for child in &self.children {
            child.write_to(writer)?;
        }

        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }

    pub fn to_xml(&self) -> Result<String, Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        self.write_to(&mut writer)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|err| Error::MalformedDocument(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_document() {
        let element = Element::parse(
            r#"<?xml version="1.0"?>
            <!-- leading comment -->
            <root xmlns:a="urn:a" kind="outer">
                <a:child id="1">one</a:child>
                <empty/>
                <closed></closed>
            </root>"#,
        )
        .unwrap();

        assert_eq!(element.tag, "root");
        assert_eq!(element.get("kind"), Some("outer"));
        assert_eq!(element.get("xmlns:a"), Some("urn:a"));
        assert_eq!(element.children.len(), 3);

        let child = &element.children[0];
        assert_eq!(child.tag, "a:child");
        assert_eq!(child.local_name(), "child");
        assert_eq!(child.get("id"), Some("1"));
        assert_eq!(child.text.as_deref(), Some("one"));

        assert_eq!(element.children[1].text, None);
        assert_eq!(element.children[2].text, None);
    }

    #[test]
    fn keeps_only_leading_text() {
        let element = Element::parse("<a>head<b/>tail</a>").unwrap();
        assert_eq!(element.text.as_deref(), Some("head"));
        assert_eq!(element.children.len(), 1);
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let element =
            Element::parse(r#"<a note="x &amp; y">1 &lt; 2<![CDATA[ & <raw>]]></a>"#).unwrap();
        assert_eq!(element.get("note"), Some("x & y"));
        assert_eq!(element.text.as_deref(), Some("1 < 2 & <raw>"));
    }

    #[test]
    fn cdata_keeps_markup_characters() {
        let element = Element::parse("<a><![CDATA[x & y <b>c</b> > z]]></a>").unwrap();
        assert_eq!(element.text.as_deref(), Some("x & y <b>c</b> > z"));
        assert!(element.children.is_empty());
    }

    #[test]
    fn rejects_unclosed_element() {
        assert!(matches!(
            Element::parse("<a><b></b>"),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(Element::parse("<a><b></a></b>").is_err());
    }

    #[test]
    fn rejects_empty_and_multi_rooted_documents() {
        assert!(matches!(
            Element::parse("   "),
            Err(Error::MalformedDocument(_))
        ));
        assert!(matches!(
            Element::parse("<a/><b/>"),
            Err(Error::MalformedDocument(_))
        ));
    }

    #[test]
    fn set_replaces_existing_attribute() {
        let mut element = Element::new("a")
            .with_attribute("x", "1")
            .with_attribute("y", "2");
        element.set("x", "3");

        assert_eq!(
            element.attributes,
            vec![
                ("x".to_owned(), "3".to_owned()),
                ("y".to_owned(), "2".to_owned())
            ]
        );
    }

    #[test]
    fn writes_escaped_xml() {
        let element = Element::new("root")
            .with_attribute("note", "a\"b")
            .with_child(Element::new("text").with_text("1 < 2"))
            .with_child(Element::new("none"));

        let xml = element.to_xml().unwrap();
        assert_eq!(
            xml,
            r#"<root note="a&quot;b"><text>1 &lt; 2</text><none/></root>"#
        );

        assert_eq!(Element::parse(&xml).unwrap(), element);
    }

    #[test]
    fn strips_namespace_qualifiers() {
        assert_eq!(local_name("{urn:x}service"), "service");
        assert_eq!(local_name("wsdl:service"), "service");
        assert_eq!(local_name("service"), "service");
    }
}
