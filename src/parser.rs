use std::{iter::Peekable, str::Lines};

use anyhow::{bail, Error};
use pest::{iterators::Pair, Parser};
use pest_derive::Parser;

use crate::parameters::ParameterSet;

#[derive(Parser)]
#[grammar = "grammar.pest"]
struct PropertyTokenParser;

/// Iterator over the logical lines of a calendar body.
///
/// Physical lines are split on `\n` or `\r\n`. A physical line starting with a
/// space or tab continues the previous logical line: its leading whitespace is
/// dropped and the rest is appended as-is, so several continuation lines in a
/// row fold into one logical line.
#[derive(Debug, Clone)]
pub struct LogicalLines<'a> {
    lines: Peekable<Lines<'a>>,
}

impl<'a> LogicalLines<'a> {
    pub fn new(data: &'a str) -> Self {
        let data = data.strip_prefix('\u{feff}').unwrap_or(data);

        LogicalLines {
            lines: data.lines().peekable(),
        }
    }
}

impl<'a> Iterator for LogicalLines<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut line = self.lines.next()?.to_string();

        while let Some(continuation) = self.lines.next_if(|l| is_continuation(l)) {
            line.push_str(continuation.trim_start_matches(|c: char| c == ' ' || c == '\t'));
        }

        Some(line.trim().to_string())
    }
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(|c: char| c == ' ' || c == '\t')
}

/// Split a calendar body into logical lines.
pub fn logical_lines(data: &str) -> LogicalLines<'_> {
    LogicalLines::new(data)
}

/// A single content line split into name, parameters and raw value.
///
/// The value is kept exactly as it appeared, escape sequences included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedProperty {
    pub name: String,
    /// Everything before the first `:`, as written.
    pub token: String,
    pub parameters: ParameterSet,
    pub raw_value: String,
}

impl DecodedProperty {
    /// Decode a logical line.
    ///
    /// Everything before the first `:` is the property token, everything
    /// after it the value. Lines without a `:` are not properties.
    pub fn from_line(line: &str) -> Result<DecodedProperty, Error> {
        let (token, raw_value) = match line.split_once(':') {
            Some(split) => split,
            None => bail!("No ':' in content line {:?}", line),
        };

        let mut pairs = PropertyTokenParser::parse(Rule::property_token, token)?;

        let mut name = None;
        let mut parameters = Vec::new();

        if let Some(pair) = pairs.next() {
            for inner_pair in pair.into_inner() {
                match inner_pair.as_rule() {
                    Rule::name => name = Some(inner_pair.as_str().to_string()),
                    Rule::param => parameters.push(Parameter::from_pair(inner_pair)?),
                    Rule::EOI => {}
                    _ => bail!("Unexpected type {:?}", inner_pair.as_rule()),
                }
            }
        }

        match name {
            Some(name) if !name.is_empty() => Ok(DecodedProperty {
                name,
                token: token.to_string(),
                parameters: parameters.into(),
                raw_value: raw_value.to_string(),
            }),
            _ => bail!("No name for property: {:?}", line),
        }
    }

    /// Whether the token mentions `VALUE=DATE` anywhere, which marks a
    /// date-only value.
    pub fn marks_date_value(&self) -> bool {
        self.token.contains("VALUE=DATE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    fn from_pair(pair: Pair<Rule>) -> Result<Parameter, Error> {
        let span = pair.as_span();
        let mut name = None;
        let mut value = String::new();

        for inner_pair in pair.into_inner() {
            match inner_pair.as_rule() {
                Rule::param_name => name = Some(inner_pair.as_str().to_string()),
                Rule::param_value => value = inner_pair.as_str().trim_matches('"').to_string(),
                _ => bail!("Unexpected type {:?}", inner_pair.as_rule()),
            }
        }

        match name {
            Some(name) => Ok(Parameter { name, value }),
            None => bail!("No name for parameter: {:?}", span.as_str()),
        }
    }
}
