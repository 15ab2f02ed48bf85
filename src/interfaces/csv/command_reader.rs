use crate::error::{BookingError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    User,
    Service,
    Vehicle,
    Login,
    Logout,
    Book,
    Transition,
    Cancel,
    Retry,
    Confirm,
}

/// One row of a replay script.
///
/// `a`..`e` are positional arguments whose meaning depends on `op`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub op: CommandKind,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub b: Option<String>,
    #[serde(default)]
    pub c: Option<String>,
    #[serde(default)]
    pub d: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Command {
    pub fn actor(&self) -> Result<&str> {
        required(&self.actor, "actor")
    }

    pub fn target(&self) -> Result<&str> {
        required(&self.target, "target")
    }

    pub fn arg(&self, index: usize) -> Result<&str> {
        let (value, name) = match index {
            0 => (&self.a, "a"),
            1 => (&self.b, "b"),
            2 => (&self.c, "c"),
            3 => (&self.d, "d"),
            _ => (&self.e, "e"),
        };
        required(value, name)
    }

    pub fn optional_arg(&self, index: usize) -> Option<&str> {
        self.arg(index).ok()
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BookingError::ValidationFailed(format!("missing '{}' column", name)))
}

/// Reads replay commands from a CSV source, trimming whitespace and accepting
/// short rows.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn commands(self) -> impl Iterator<Item = std::result::Result<Command, csv::Error>> {
        self.reader.into_deserialize()
    }
}
