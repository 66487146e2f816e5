//! Structural extraction for Python sources.
//!
//! The scanner does not build a full syntax tree. It splits the file into
//! logical lines while tracking strings, brackets and backslash
//! continuations, then follows indentation to find `def` statements that sit
//! directly in a `class` body.

use super::extractor::{SourceLanguage, SourceUnit, SourceUnitExtractor, dedup_units};
use crate::{Error, Result};
use std::path::Path;

/// Extracts `(class, method)` pairs from `.py` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonExtractor;

impl SourceUnitExtractor for PythonExtractor {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::Python
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("py")
    }

    fn is_entry_point(&self, path: &Path) -> bool {
        path.file_name().and_then(|n| n.to_str()) == Some("__init__.py")
    }

    fn extract(&self, path: &Path, source: &str) -> Result<Vec<SourceUnit>> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let lines = logical_lines(source).map_err(|cause| Error::SourceParse {
            path: path.display().to_string(),
            cause,
        })?;
        Ok(dedup_units(units_from_lines(&lines)))
    }
}

/// A statement after joining continuation lines, with strings and comments removed.
#[derive(Debug)]
struct LogicalLine {
    indent: usize,
    text: String,
}

/// An enclosing block that was opened by a `class` or `def` header.
enum Scope {
    Class(String),
    Def,
}

/// A string literal still open at the end of a physical line.
struct OpenString {
    quote: char,
    triple: bool,
    line: usize,
}

fn units_from_lines(lines: &[LogicalLine]) -> Vec<SourceUnit> {
    let mut scopes: Vec<(usize, Scope)> = Vec::new();
    let mut units = Vec::new();

    for line in lines {
        while scopes.last().is_some_and(|(indent, _)| *indent >= line.indent) {
            scopes.pop();
        }
        if let Some(name) = header_name(&line.text, "class") {
            scopes.push((line.indent, Scope::Class(name.to_string())));
        } else if let Some(name) = def_name(&line.text) {
            if let Some((_, Scope::Class(group))) = scopes.last() {
                if !name.starts_with('_') {
                    units.push(SourceUnit::new(group.clone(), name));
                }
            }
            scopes.push((line.indent, Scope::Def));
        }
    }
    units
}

/// Name following `keyword` at the start of a statement.
fn header_name<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty() && !name.starts_with(|c: char| c.is_ascii_digit())).then_some(name)
}

fn def_name(text: &str) -> Option<&str> {
    let text = text
        .strip_prefix("async")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map_or(text, str::trim_start);
    header_name(text, "def")
}

fn indent_width(prefix: &str) -> usize {
    prefix.chars().fold(0, |width, c| match c {
        '\t' => (width / 8 + 1) * 8,
        '\x0c' => 0,
        _ => width + 1,
    })
}

const fn opening_bracket(closing: char) -> char {
    match closing {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

fn logical_lines(source: &str) -> std::result::Result<Vec<LogicalLine>, String> {
    let mut lines = Vec::new();
    let mut text = String::new();
    let mut indent = 0;
    let mut open: Option<OpenString> = None;
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut continued = false;

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;
        let mut body = raw;
        if open.is_none() && brackets.is_empty() && !continued {
            let stripped = raw.trim_start_matches([' ', '\t', '\x0c']);
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }
            indent = indent_width(&raw[..raw.len() - stripped.len()]);
            text.clear();
            body = stripped;
        }
        continued = false;

        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];

            if let Some(string) = &open {
                if c == '\\' {
                    continued = i + 1 == chars.len();
                    i += 2;
                    continue;
                }
                if c == string.quote {
                    if !string.triple {
                        open = None;
                        i += 1;
                        continue;
                    }
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        open = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
                continue;
            }

            match c {
                '#' => break,
                '\'' | '"' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    open = Some(OpenString {
                        quote: c,
                        triple,
                        line: number,
                    });
                    i += if triple { 3 } else { 1 };
                    text.push(' ');
                    continue;
                },
                '(' | '[' | '{' => brackets.push((c, number)),
                ')' | ']' | '}' => match brackets.pop() {
                    Some((opened, _)) if opened == opening_bracket(c) => {},
                    Some((opened, line)) => {
                        return Err(format!(
                            "'{c}' on line {number} does not close '{opened}' from line {line}"
                        ));
                    },
                    None => return Err(format!("unmatched '{c}' on line {number}")),
                },
                '\\' if i + 1 == chars.len() => {
                    continued = true;
                    i += 1;
                    continue;
                },
                _ => {},
            }
            text.push(c);
            i += 1;
        }

        if let Some(string) = &open {
            if !string.triple && !continued {
                return Err(format!(
                    "unterminated string literal on line {}",
                    string.line
                ));
            }
        }

        if open.is_none() && brackets.is_empty() && !continued {
            lines.push(LogicalLine {
                indent,
                text: text.trim().to_string(),
            });
        } else {
            text.push(' ');
        }
    }

    if let Some(string) = open {
        return Err(format!(
            "unterminated triple-quoted string starting on line {}",
            string.line
        ));
    }
    if let Some((opened, line)) = brackets.last() {
        return Err(format!("'{opened}' opened on line {line} is never closed"));
    }
    Ok(lines)
}
