//! printf-style string templates used for commit messages and work-item
//! numbers.
//!
//! Only string conversions are supported: `%s`, `%S` (upper-cased),
//! positional `%2$s`, a `-` flag with a minimum width (`%-8s`, `%3s`), plus
//! the literals `%%` and `%n`. Templates are parsed once when the
//! configuration is validated, so rendering never fails.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid format `{template}` at byte {position}: {reason}")]
pub struct TemplateError {
    pub template: String,
    pub position: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Arg {
        index: usize,
        width: usize,
        left_align: bool,
        upper: bool,
    },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let err = |position, reason| TemplateError {
            template: source.to_string(),
            position,
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut next_index = 0usize;
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }

            // digits may be an argument index (followed by `$`) or a width
            let mut flag_left = false;
            if let Some(&(_, '-')) = chars.peek() {
                flag_left = true;
                chars.next();
            }
            let mut digits = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    digits.push(d);
                    chars.next();
                } else {
                    break;
                }
            }

            let mut explicit_index = None;
            if let Some(&(_, '$')) = chars.peek() {
                if flag_left || digits.is_empty() {
                    return Err(err(pos, "argument index must be a positive number"));
                }
                chars.next();
                let index: usize = digits
                    .parse()
                    .map_err(|_| err(pos, "argument index out of range"))?;
                if index == 0 {
                    return Err(err(pos, "argument index must be a positive number"));
                }
                explicit_index = Some(index - 1);
                digits.clear();

                if let Some(&(_, '-')) = chars.peek() {
                    flag_left = true;
                    chars.next();
                }
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
            }

            let width = if digits.is_empty() {
                if flag_left {
                    return Err(err(pos, "`-` flag requires a width"));
                }
                0
            } else {
                digits.parse().map_err(|_| err(pos, "width out of range"))?
            };

            let Some((_, conversion)) = chars.next() else {
                return Err(err(pos, "dangling `%`"));
            };

            match conversion {
                '%' | 'n' if explicit_index.is_none() && width == 0 && !flag_left => {
                    literal.push(if conversion == '%' { '%' } else { '\n' });
                }
                's' | 'S' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let index = match explicit_index {
                        Some(index) => index,
                        None => {
                            next_index += 1;
                            next_index - 1
                        }
                    };
                    segments.push(Segment::Arg {
                        index,
                        width,
                        left_align: flag_left,
                        upper: conversion == 'S',
                    });
                }
                _ => return Err(err(pos, "only string conversions are supported")),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// `count` plain `%s` conversions joined by `separator`, the template
    /// [`Template::parse`] builds for `"%s<separator>%s..."`.
    pub fn sequential(count: usize, separator: &str) -> Self {
        let mut segments = Vec::with_capacity(count * 2);
        for index in 0..count {
            if index > 0 && !separator.is_empty() {
                segments.push(Segment::Literal(separator.to_string()));
            }
            segments.push(Segment::Arg {
                index,
                width: 0,
                left_align: false,
                upper: false,
            });
        }
        let escaped = separator.replace('%', "%%");
        Self {
            source: vec!["%s"; count].join(&escaped),
            segments,
        }
    }

    /// The number of arguments the template consumes.
    pub fn arity(&self) -> usize {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Arg { index, .. } => Some(index + 1),
                Segment::Literal(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Render with the given arguments. Missing arguments render as `null`.
    pub fn render(&self, args: &[&str]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Arg {
                    index,
                    width,
                    left_align,
                    upper,
                } => {
                    let value = args.get(*index).copied().unwrap_or("null");
                    let value = if *upper {
                        value.to_uppercase()
                    } else {
                        value.to_string()
                    };
                    let pad = width.saturating_sub(value.chars().count());
                    if *left_align {
                        out.push_str(&value);
                        out.extend(std::iter::repeat(' ').take(pad));
                    } else {
                        out.extend(std::iter::repeat(' ').take(pad));
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
