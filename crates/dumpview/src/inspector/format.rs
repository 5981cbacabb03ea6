//! Display formats a dumper may advertise and a client may select.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisplayFormat {
    /// Whatever the dumper considers natural.
    #[default]
    Automatic,
    Latin1String,
    SeparateLatin1String,
    Utf8String,
    SeparateUtf8String,
    /// Inline wide string.
    Simple,
    /// Wide string shown in a separate view.
    Separate,
    ArrayPlot,
    CompactMap,
}

/// Narrow string formats, in the order they are offered.
pub const STRING_FORMATS: &[DisplayFormat] = &[
    DisplayFormat::Latin1String,
    DisplayFormat::SeparateLatin1String,
    DisplayFormat::Utf8String,
    DisplayFormat::SeparateUtf8String,
];

pub const WIDE_STRING_FORMATS: &[DisplayFormat] = &[DisplayFormat::Simple, DisplayFormat::Separate];

pub const ARRAY_FORMATS: &[DisplayFormat] = &[DisplayFormat::ArrayPlot];

pub const MAP_FORMATS: &[DisplayFormat] = &[DisplayFormat::CompactMap];

impl DisplayFormat {
    /// Formats whose output goes to a separate view with a larger size limit.
    pub fn is_separate(self) -> bool {
        matches!(
            self,
            DisplayFormat::SeparateLatin1String
                | DisplayFormat::SeparateUtf8String
                | DisplayFormat::Separate
        )
    }

    pub fn is_latin1(self) -> bool {
        matches!(
            self,
            DisplayFormat::Latin1String | DisplayFormat::SeparateLatin1String
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            DisplayFormat::Automatic => "automatic",
            DisplayFormat::Latin1String => "latin1_string",
            DisplayFormat::SeparateLatin1String => "separate_latin1_string",
            DisplayFormat::Utf8String => "utf8_string",
            DisplayFormat::SeparateUtf8String => "separate_utf8_string",
            DisplayFormat::Simple => "simple",
            DisplayFormat::Separate => "separate",
            DisplayFormat::ArrayPlot => "array_plot",
            DisplayFormat::CompactMap => "compact_map",
        }
    }
}

impl fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
