//! Decoded views: the display tree produced by one dump request.

use serde::{Deserialize, Serialize};

/// One line of the variable view, with its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedView {
    /// Dotted path from the root, e.g. `value.3.first`.
    pub iname: String,
    pub name: String,
    pub type_name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub num_child: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<DecodedView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<PlotData>,
    /// The value should be shown in a separate view.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub separate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodedView {
    pub fn new(iname: String, name: &str, type_name: &str, address: u64) -> Self {
        DecodedView {
            iname,
            name: name.to_string(),
            type_name: type_name.to_string(),
            address: format!("{:#x}", address),
            ..Default::default()
        }
    }

    /// Find a direct child by name.
    pub fn child(&self, name: &str) -> Option<&DecodedView> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// A contiguous typed array handed over in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub address: String,
    pub count: usize,
    pub elem_type: String,
    pub values: Vec<f64>,
}
