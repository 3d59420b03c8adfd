// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Small event writer shared by the XML encoders

use crate::error::{ConvertError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
    format: &'static str,
}

impl XmlWriter {
    pub fn new(format: &'static str) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            format,
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        let format = self.format;
        self.writer
            .write_event(event)
            .map_err(|e| ConvertError::encode(format, e))
    }

    pub fn declaration(&mut self) -> Result<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        // `--` is not allowed inside XML comments
        let text = format!(" {} ", text.replace("--", "-"));
        self.write(Event::Comment(BytesText::from_escaped(text)))
    }

    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.write(Event::Start(element))
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.write(Event::Empty(element))
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    pub fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attributes)?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}
