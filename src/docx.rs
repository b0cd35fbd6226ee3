//! DOCX Rendering - Placeholder Merge Inside Word Documents
//!
//! A `.docx` is a ZIP container of XML parts. Text-bearing parts go through two
//! steps: a `quick-xml` pass that glues every Jinja tag back into contiguous
//! text and hoists `{%p ... %}` / `{%tr ... %}` over their enclosing paragraph
//! or table row, then `minijinja` renders the result. Every other entry is
//! copied through untouched.
//!
//! Lookups are strict: an unknown name fails the render.

use minijinja::{Environment, Error as TemplateError, ErrorKind, Output, State, UndefinedBehavior};
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::mem;
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid template archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("template syntax error in {part}: {message}")]
    Syntax { part: String, message: String },

    #[error("{0}")]
    Template(#[from] TemplateError),
}

/// A loaded template document.
pub struct DocxTemplate {
    bytes: Vec<u8>,
}

impl DocxTemplate {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Wrap raw archive bytes. The archive must at least parse as ZIP.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, RenderError> {
        ZipArchive::new(Cursor::new(bytes.as_slice()))?;
        Ok(Self { bytes })
    }

    /// Render into a new archive held in memory.
    pub fn render(&self, context: &Map<String, Value>) -> Result<Vec<u8>, RenderError> {
        let env = environment();
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(self.bytes.len())));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_string();
            if is_text_part(&name) {
                let mut xml = String::new();
                entry.read_to_string(&mut xml)?;
                let source = prepare_part(&name, &xml)?;
                let rendered = env.render_named_str(&name, &source, context)?;
                writer.start_file(name, options)?;
                writer.write_all(rendered.as_bytes())?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Render and write to `dest`. Nothing appears at `dest` unless the whole
    /// document rendered and was written out.
    pub fn render_to_file(
        &self,
        context: &Map<String, Value>,
        dest: &Path,
    ) -> Result<(), RenderError> {
        let bytes = self.render(context)?;

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = dest.with_file_name(format!(".{}.{}.part", file_name, Uuid::new_v4().simple()));

        let result = fs::write(&staging, &bytes).and_then(|()| fs::rename(&staging, dest));
        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        Ok(result?)
    }
}

fn is_text_part(name: &str) -> bool {
    match name {
        "word/document.xml" | "word/footnotes.xml" | "word/endnotes.xml" => true,
        _ => {
            (name.starts_with("word/header") || name.starts_with("word/footer"))
                && name.ends_with(".xml")
        }
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_formatter(xml_formatter);
    env
}

/// Printed values land inside `<w:t>`, so everything not marked safe is
/// XML-escaped. None prints as nothing.
fn xml_formatter(
    out: &mut Output<'_>,
    _state: &State<'_, '_>,
    value: &minijinja::Value,
) -> Result<(), TemplateError> {
    if value.is_undefined() {
        return Err(TemplateError::from(ErrorKind::UndefinedError));
    }
    if value.is_none() {
        return Ok(());
    }
    let text = value.to_string();
    let written = if value.is_safe() {
        out.write_str(&text)
    } else {
        out.write_str(&escape(text.as_str()))
    };
    written.map_err(|_| TemplateError::from(ErrorKind::WriteFailure))
}

// --- Tag merging ---

/// Raw markup of one XML event. Paragraph and table-row boundaries are
/// tracked so block tags can replace them.
#[derive(Clone, Copy)]
enum Markup<'x> {
    Start(&'x str, Option<&'static str>),
    End(&'x str, Option<&'static str>),
    Other(&'x str),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TagState {
    Outside,
    /// Saw `{`, waiting for `{`, `%` or `#`.
    Opening,
    Inside(char),
    /// Saw the closing character, waiting for `}`.
    Closing(char),
}

struct Frame {
    element: &'static str,
    start: usize,
    replacement: Option<String>,
}

/// Word breaks typed text into runs, so `{{ nome }}` may arrive as
/// `{</w:t></w:r><w:r><w:t>{ nome }}`. Markup inside a tag is dropped; tag
/// bodies are unescaped for the template engine while plain text stays
/// escaped.
struct TagMerger<'x> {
    part: &'x str,
    out: String,
    plain: String,
    tag: String,
    state: TagState,
    held: Vec<Markup<'x>>,
    frames: Vec<Frame>,
}

fn prepare_part(part: &str, xml: &str) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(xml);
    let mut merger = TagMerger::new(part, xml.len());

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader.read_event()?;
        let raw = &xml[start..reader.buffer_position() as usize];
        match event {
            Event::Eof => break,
            Event::Text(_) => {
                let text = unescape(raw).map_err(|e| syntax(part, e.to_string()))?;
                merger.text(&text)?;
            }
            Event::Start(e) => merger.markup(Markup::Start(raw, block_element(e.name().as_ref()))),
            Event::End(e) => merger.markup(Markup::End(raw, block_element(e.name().as_ref()))),
            _ => merger.markup(Markup::Other(raw)),
        }
    }

    merger.finish()
}

fn block_element(name: &[u8]) -> Option<&'static str> {
    match name {
        b"w:p" => Some("w:p"),
        b"w:tr" => Some("w:tr"),
        _ => None,
    }
}

fn syntax(part: &str, message: String) -> RenderError {
    RenderError::Syntax {
        part: part.to_string(),
        message,
    }
}

impl<'x> TagMerger<'x> {
    fn new(part: &'x str, capacity: usize) -> Self {
        Self {
            part,
            out: String::with_capacity(capacity),
            plain: String::new(),
            tag: String::new(),
            state: TagState::Outside,
            held: vec![],
            frames: vec![],
        }
    }

    fn markup(&mut self, markup: Markup<'x>) {
        match self.state {
            TagState::Outside => self.emit(markup),
            // Might still turn out to be a lone brace.
            TagState::Opening => self.held.push(markup),
            TagState::Inside(_) | TagState::Closing(_) => {}
        }
    }

    fn emit(&mut self, markup: Markup<'x>) {
        self.flush_plain();
        match markup {
            Markup::Start(raw, Some(element)) => {
                self.frames.push(Frame {
                    element,
                    start: self.out.len(),
                    replacement: None,
                });
                self.out.push_str(raw);
            }
            Markup::End(raw, Some(element)) => {
                self.out.push_str(raw);
                if self.frames.last().is_some_and(|f| f.element == element) {
                    if let Some(Frame {
                        start,
                        replacement: Some(replacement),
                        ..
                    }) = self.frames.pop()
                    {
                        self.out.truncate(start);
                        self.out.push_str(&replacement);
                    }
                }
            }
            Markup::Start(raw, None) | Markup::End(raw, None) | Markup::Other(raw) => {
                self.out.push_str(raw)
            }
        }
    }

    fn text(&mut self, text: &str) -> Result<(), RenderError> {
        for c in text.chars() {
            self.push_char(c)?;
        }
        Ok(())
    }

    fn push_char(&mut self, c: char) -> Result<(), RenderError> {
        match self.state {
            TagState::Outside if c == '{' => self.state = TagState::Opening,
            TagState::Outside => self.plain.push(c),
            TagState::Opening => match c {
                '{' | '%' | '#' => {
                    self.held.clear();
                    self.tag.clear();
                    self.tag.push('{');
                    self.tag.push(c);
                    self.state = TagState::Inside(if c == '{' { '}' } else { c });
                }
                _ => {
                    self.release_brace();
                    self.push_char(c)?;
                }
            },
            TagState::Inside(close) => {
                self.tag.push(c);
                if c == close {
                    self.state = TagState::Closing(close);
                }
            }
            TagState::Closing(close) => {
                self.tag.push(c);
                if c == '}' {
                    self.state = TagState::Outside;
                    self.finish_tag()?;
                } else if c != close {
                    self.state = TagState::Inside(close);
                }
            }
        }
        Ok(())
    }

    /// The pending `{` was plain text after all.
    fn release_brace(&mut self) {
        self.state = TagState::Outside;
        self.plain.push('{');
        for markup in mem::take(&mut self.held) {
            self.emit(markup);
        }
    }

    fn finish_tag(&mut self) -> Result<(), RenderError> {
        let tag = ascii_quotes(&mem::take(&mut self.tag));

        match block_tag(&tag) {
            Some((element, body)) => {
                let part = self.part;
                let frame = self
                    .frames
                    .iter_mut()
                    .rev()
                    .find(|f| f.element == element)
                    .ok_or_else(|| syntax(part, format!("{tag} is not inside <{element}>")))?;
                frame.replacement = Some(format!("{{% {body} %}}"));
            }
            None => {
                self.flush_plain();
                self.out.push_str(&tag);
            }
        }
        Ok(())
    }

    fn flush_plain(&mut self) {
        if !self.plain.is_empty() {
            self.out.push_str(&partial_escape(self.plain.as_str()));
            self.plain.clear();
        }
    }

    fn finish(mut self) -> Result<String, RenderError> {
        match self.state {
            TagState::Outside => {}
            TagState::Opening => self.release_brace(),
            TagState::Inside(_) | TagState::Closing(_) => {
                let preview: String = self.tag.chars().take(40).collect();
                return Err(syntax(self.part, format!("unclosed tag near '{preview}'")));
            }
        }
        if let Some(frame) = self.frames.iter().find(|f| f.replacement.is_some()) {
            return Err(syntax(
                self.part,
                format!("block tag has no closing </{}>", frame.element),
            ));
        }
        self.flush_plain();
        Ok(self.out)
    }
}

/// `{%p for x in y %}` -> `("w:p", "for x in y")`.
fn block_tag(tag: &str) -> Option<(&'static str, &str)> {
    let inner = tag.strip_prefix("{%")?.strip_suffix("%}")?;
    let (element, body) = if let Some(body) = inner.strip_prefix("p ") {
        ("w:p", body)
    } else if let Some(body) = inner.strip_prefix("tr ") {
        ("w:tr", body)
    } else {
        return None;
    };
    Some((element, body.trim()))
}

/// Word autocorrects quotes typed inside tags.
fn ascii_quotes(tag: &str) -> String {
    tag.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect()
}
