// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse a `Report`.

use crate::{
    errors::ParseError,
    report::{NonSuccess, NonSuccessKind, Report, Testcase, TestcaseStatus, Testsuite},
};
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

const TESTSUITES_TAG: &[u8] = b"testsuites";
const TESTSUITE_TAG: &[u8] = b"testsuite";
const TESTCASE_TAG: &[u8] = b"testcase";
const FAILURE_TAG: &[u8] = b"failure";
const ERROR_TAG: &[u8] = b"error";
const SKIPPED_TAG: &[u8] = b"skipped";
const SYSTEM_OUT_TAG: &[u8] = b"system-out";
const SYSTEM_ERR_TAG: &[u8] = b"system-err";

pub(crate) fn parse_report(input: &str) -> Result<Report, ParseError> {
    ReportParser::new(input).parse()
}

/// An element that has just been opened.
struct Child<'a> {
    start: BytesStart<'a>,
    // False for self-closing elements like `<skipped/>`.
    has_body: bool,
}

impl Child<'_> {
    fn name(&self) -> String {
        String::from_utf8_lossy(self.start.name().as_ref()).into_owned()
    }
}

struct ReportParser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> ReportParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);
        Self { reader }
    }

    fn parse(mut self) -> Result<Report, ParseError> {
        loop {
            match self.next_event()? {
                Event::Start(start) => {
                    return self.parse_root(Child {
                        start,
                        has_body: true,
                    });
                }
                Event::Empty(start) => {
                    return self.parse_root(Child {
                        start,
                        has_body: false,
                    });
                }
                Event::Eof => return Err(ParseError::InvalidRoot { found: None }),
                // Declarations, comments, doctypes and processing instructions.
                _ => {}
            }
        }
    }

    fn parse_root(&mut self, root: Child<'a>) -> Result<Report, ParseError> {
        let mut report = Report::default();
        match root.start.name().as_ref() {
            TESTSUITES_TAG => {
                report.name = self.attributes(&root.start)?.shift_remove("name");
                if root.has_body {
                    while let Some(child) = self.next_child(&root)? {
                        if child.start.name().as_ref() == TESTSUITE_TAG {
                            self.parse_testsuite(&child, &mut report.testsuites)?;
                        } else {
                            self.skip(&child)?;
                        }
                    }
                }
            }
            TESTSUITE_TAG => self.parse_testsuite(&root, &mut report.testsuites)?,
            _ => {
                return Err(ParseError::InvalidRoot {
                    found: Some(root.name()),
                });
            }
        }
        Ok(report)
    }

    fn parse_testsuite(
        &mut self,
        element: &Child<'a>,
        out: &mut Vec<Testsuite>,
    ) -> Result<(), ParseError> {
        let mut extra = self.attributes(&element.start)?;
        let mut testsuite = Testsuite::new(extra.shift_remove("name"));
        testsuite.extra = extra;

        let slot = out.len();
        out.push(testsuite);
        if !element.has_body {
            return Ok(());
        }

        while let Some(child) = self.next_child(element)? {
            match child.start.name().as_ref() {
                TESTSUITE_TAG => self.parse_testsuite(&child, out)?,
                TESTCASE_TAG => {
                    let testcase = self.parse_testcase(&child)?;
                    out[slot].testcases.push(testcase);
                }
                SYSTEM_OUT_TAG => out[slot].system_out = self.read_text(&child)?,
                SYSTEM_ERR_TAG => out[slot].system_err = self.read_text(&child)?,
                _ => self.skip(&child)?,
            }
        }
        Ok(())
    }

    fn parse_testcase(&mut self, element: &Child<'a>) -> Result<Testcase, ParseError> {
        let mut extra = self.attributes(&element.start)?;
        let mut testcase = Testcase {
            name: extra.shift_remove("name"),
            classname: extra.shift_remove("classname"),
            file: extra.shift_remove("file"),
            line: extra.shift_remove("line"),
            time: extra.shift_remove("time"),
            ..Default::default()
        };
        testcase.extra = extra;

        let mut non_successes = Vec::new();
        let mut skipped = None;
        if element.has_body {
            while let Some(child) = self.next_child(element)? {
                match child.start.name().as_ref() {
                    FAILURE_TAG => {
                        non_successes.push(self.parse_non_success(&child, NonSuccessKind::Failure)?)
                    }
                    ERROR_TAG => {
                        non_successes.push(self.parse_non_success(&child, NonSuccessKind::Error)?)
                    }
                    SKIPPED_TAG => {
                        let message = self.attributes(&child.start)?.shift_remove("message");
                        skipped = Some(TestcaseStatus::Skipped {
                            message,
                            description: self.read_text(&child)?,
                        });
                    }
                    SYSTEM_OUT_TAG => testcase.system_out = self.read_text(&child)?,
                    SYSTEM_ERR_TAG => testcase.system_err = self.read_text(&child)?,
                    _ => self.skip(&child)?,
                }
            }
        }

        // A failure wins over a skip marker on the same testcase.
        testcase.status = if non_successes.is_empty() {
            skipped.unwrap_or_default()
        } else {
            TestcaseStatus::NonSuccess(non_successes)
        };
        Ok(testcase)
    }

    fn parse_non_success(
        &mut self,
        element: &Child<'a>,
        kind: NonSuccessKind,
    ) -> Result<NonSuccess, ParseError> {
        let mut attributes = self.attributes(&element.start)?;
        Ok(NonSuccess {
            kind,
            message: attributes.shift_remove("message"),
            ty: attributes.shift_remove("type"),
            description: self.read_text(element)?,
        })
    }

    /// Returns the next child element of `parent`, or `None` once `parent` is closed.
    ///
    /// Text directly inside container elements is ignored.
    fn next_child(&mut self, parent: &Child<'a>) -> Result<Option<Child<'a>>, ParseError> {
        loop {
            match self.next_event()? {
                Event::Start(start) => {
                    return Ok(Some(Child {
                        start,
                        has_body: true,
                    }));
                }
                Event::Empty(start) => {
                    return Ok(Some(Child {
                        start,
                        has_body: false,
                    }));
                }
                // The reader checks that end tags match, so this closes `parent`.
                Event::End(_) => return Ok(None),
                Event::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        element: parent.name(),
                    });
                }
                _ => {}
            }
        }
    }

    /// Reads the text and CDATA content of `element`, consuming its end tag.
    fn read_text(&mut self, element: &Child<'a>) -> Result<Option<String>, ParseError> {
        if !element.has_body {
            return Ok(None);
        }

        let mut text = String::new();
        loop {
            match self.next_event()? {
                Event::Text(contents) => {
                    let contents = contents.unescape().map_err(|error| self.xml_error(error))?;
                    text.push_str(&contents);
                }
                Event::CData(contents) => {
                    text.push_str(&String::from_utf8_lossy(&contents.into_inner()));
                }
                Event::Start(start) => self.skip(&Child {
                    start,
                    has_body: true,
                })?,
                Event::End(_) => break,
                Event::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        element: element.name(),
                    });
                }
                _ => {}
            }
        }

        Ok((!text.is_empty()).then_some(text))
    }

    fn skip(&mut self, element: &Child<'a>) -> Result<(), ParseError> {
        if element.has_body {
            self.reader
                .read_to_end(element.start.name())
                .map_err(|error| self.xml_error(error))?;
        }
        Ok(())
    }

    fn attributes(&self, start: &BytesStart<'a>) -> Result<IndexMap<String, String>, ParseError> {
        let mut attributes = IndexMap::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|error| self.xml_error(quick_xml::Error::from(error)))?;
            let value = attribute
                .unescape_value()
                .map_err(|error| self.xml_error(error))?;
            attributes.insert(
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value.into_owned(),
            );
        }
        Ok(attributes)
    }

    fn next_event(&mut self) -> Result<Event<'a>, ParseError> {
        self.reader
            .read_event()
            .map_err(|error| self.xml_error(error))
    }

    fn xml_error(&self, error: quick_xml::Error) -> ParseError {
        ParseError::Xml {
            position: self.reader.buffer_position(),
            error,
        }
    }
}
