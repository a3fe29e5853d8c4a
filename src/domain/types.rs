//! Shared domain enumerations aligned with persisted database enums.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Markup format a stored document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "document_format", rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    Markdown,
    Latex,
    Typst,
    Plain,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Latex => "latex",
            Self::Typst => "typst",
            Self::Plain => "plain",
        }
    }
}

/// External compiler a compile call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CompileFlavor {
    Latex,
    Typst,
}

impl CompileFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latex => "latex",
            Self::Typst => "typst",
        }
    }

    /// Name used in user-facing envelope messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Latex => "LaTeX",
            Self::Typst => "Typst",
        }
    }

    /// Source file written into the compile workspace.
    pub fn input_file_name(self) -> &'static str {
        match self {
            Self::Latex => "document.tex",
            Self::Typst => "document.typ",
        }
    }

    pub fn output_file_name(self) -> &'static str {
        "document.pdf"
    }
}

impl Display for CompileFlavor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompileFlavor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latex" | "tex" => Ok(Self::Latex),
            "typst" | "typ" => Ok(Self::Typst),
            _ => Err(()),
        }
    }
}
