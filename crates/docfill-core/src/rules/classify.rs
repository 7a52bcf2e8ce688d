//! Receive (container) type classification.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::patterns::{TYPE_20GP, TYPE_20HC, TYPE_40GP, TYPE_40HC, TYPE_45GP, TYPE_45HC, TYPE_LCL};
use crate::models::candidate::FieldMatch;

/// How the goods arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiveType {
    #[serde(rename = "LCL")]
    Lcl,
    #[serde(rename = "20GP")]
    Standard20,
    #[serde(rename = "20HC")]
    HighCube20,
    #[serde(rename = "40GP")]
    Standard40,
    #[serde(rename = "40HC")]
    HighCube40,
    #[serde(rename = "45GP")]
    Standard45,
    #[serde(rename = "45HC")]
    HighCube45,
}

impl ReceiveType {
    pub fn as_code(&self) -> &'static str {
        match self {
            ReceiveType::Lcl => "LCL",
            ReceiveType::Standard20 => "20GP",
            ReceiveType::HighCube20 => "20HC",
            ReceiveType::Standard40 => "40GP",
            ReceiveType::HighCube40 => "40HC",
            ReceiveType::Standard45 => "45GP",
            ReceiveType::HighCube45 => "45HC",
        }
    }

    /// Most specific first: high-cube before standard, larger before smaller.
    fn rules() -> [(ReceiveType, &'static Regex); 7] {
        [
            (ReceiveType::HighCube45, &*TYPE_45HC),
            (ReceiveType::HighCube40, &*TYPE_40HC),
            (ReceiveType::HighCube20, &*TYPE_20HC),
            (ReceiveType::Standard45, &*TYPE_45GP),
            (ReceiveType::Standard40, &*TYPE_40GP),
            (ReceiveType::Standard20, &*TYPE_20GP),
            (ReceiveType::Lcl, &*TYPE_LCL),
        ]
    }
}

impl fmt::Display for ReceiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Classify a document by the first rule that matches anywhere in it.
pub fn receive_type(text: &str) -> Vec<FieldMatch<ReceiveType>> {
    for (kind, pattern) in ReceiveType::rules() {
        for line in text.lines() {
            if let Some(found) = pattern.find(line) {
                let raw = found.as_str().trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
                return vec![FieldMatch::new(kind, raw, line.trim())];
            }
        }
    }
    Vec::new()
}
