//! Extension String Parser
//!
//! The PABX renders each call leg as `"<digits> <display name>"`,
//! optionally followed by a parenthesised secondary number, e.g.
//! `"10001 Carrier One (5551234)"`.

use regex::Regex;

const EXTENSION_PATTERN: &str =
    r"^(?P<id>\d+)\s(?P<name>[\w\p{L}.\-\s]+?)(?:\s\((?P<secondary>\w+)\))?$";

/// Components of a well-formed extension string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExtension {
    pub id: String,
    /// `None` when the name part is only whitespace
    pub name: Option<String>,
    pub secondary: Option<String>,
}

impl ParsedExtension {
    /// Number of characters in the numeric id
    pub fn id_len(&self) -> usize {
        self.id.chars().count()
    }
}

/// Tagged parse result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extension {
    Parsed(ParsedExtension),
    Unparsed,
}

impl Extension {
    pub fn parsed(self) -> Option<ParsedExtension> {
        match self {
            Extension::Parsed(parsed) => Some(parsed),
            Extension::Unparsed => None,
        }
    }
}

/// Compiled extension pattern
#[derive(Debug, Clone)]
pub struct ExtensionParser {
    pattern: Regex,
}

impl ExtensionParser {
    pub fn new() -> Self {
        let pattern = Regex::new(EXTENSION_PATTERN).expect("Failed to compile extension pattern");
        Self { pattern }
    }

    pub fn parse(&self, raw: &str) -> Extension {
        let Some(captures) = self.pattern.captures(raw) else {
            return Extension::Unparsed;
        };

        let id = captures["id"].to_string();
        let name = captures
            .name("name")
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let secondary = captures.name("secondary").map(|m| m.as_str().to_string());

        Extension::Parsed(ParsedExtension { id, name, secondary })
    }
}

impl Default for ExtensionParser {
    fn default() -> Self {
        Self::new()
    }
}
