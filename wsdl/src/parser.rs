use quick_xml::{
    events::{BytesStart, BytesText, Event},
    Reader,
};
use std::io::BufRead;

use super::{error, node::Node};

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Node>,
    root: Option<Node>,
}

impl TreeBuilder {
    fn parse<B: BufRead>(mut self, mut reader: Reader<B>) -> Result<Node, error::Error> {
        let mut buffer = Vec::new();

        loop {
            match reader.read_event(&mut buffer)? {
                Event::Start(start) => {
                    let node = self.handle_start(&reader, &start)?;
                    self.stack.push(node);
                }

                Event::Empty(start) => {
                    let node = self.handle_start(&reader, &start)?;
                    self.handle_end(node)?;
                }

                Event::End(end) => {
                    let node = self.stack.pop().ok_or_else(|| {
                        error::Error::MalformedDocument(format!(
                            "unexpected closing tag </{}>",
                            String::from_utf8_lossy(end.name())
                        ))
                    })?;

                    self.handle_end(node)?;
                }

                Event::Text(text) => self.handle_text(&reader, text)?,

                Event::CData(cdata) => {
                    let text = reader.decode(cdata.escaped())?;
                    self.append_text(text);
                }

                Event::Eof => break,

                _ => (),
            }

            buffer.clear();
        }

        if let Some(unclosed) = self.stack.last() {
            return Err(error::Error::MalformedDocument(format!(
                "unclosed tag <{}>",
                unclosed.name
            )));
        }

        self.root.ok_or_else(|| {
            error::Error::MalformedDocument("document has no root element".to_owned())
        })
    }

    fn handle_start<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<Node, error::Error> {
        let mut node = Node::new(reader.decode(start.name())?);

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?.to_owned();
            let value = attribute.unescaped_value()?;
            let value = reader.decode(&value)?.to_owned();

            node.attributes.insert(key, value);
        }

        Ok(node)
    }

    fn handle_end(&mut self, node: Node) -> Result<(), error::Error> {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),

            None if self.root.is_none() => self.root = Some(node),

            None => {
                return Err(error::Error::MalformedDocument(format!(
                    "second root element <{}>",
                    node.name
                )))
            }
        }

        Ok(())
    }

    fn handle_text<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        text: BytesText<'_>,
    ) -> Result<(), error::Error> {
        let unescaped = text.unescaped()?;
        let text = reader.decode(unescaped.as_ref())?;
        self.append_text(text);

        Ok(())
    }

    fn append_text(&mut self, text: &str) {
        if let Some(node) = self.stack.last_mut() {
            match node.text {
                Some(ref mut existing) => existing.push_str(text),
                None => node.text = Some(text.to_owned()),
            }
        }
    }
}

pub fn parse_document(text: &str) -> Result<Node, error::Error> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    TreeBuilder::default().parse(reader)
}
