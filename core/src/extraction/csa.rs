//! Vendor protocol sub-block parsing
//!
//! Siemens embeds the acquisition protocol as ASCCONV text inside the binary
//! CSA series header (0029,1020): one `key = value` assignment per line,
//! framed by `### ASCCONV BEGIN` and `### ASCCONV END` markers.

use crate::error::{MricatError, Result};
use crate::extraction::tags::decode_latin1;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const MULTI_SLICE_MODE: &str = "sKSpace.ucMultiSliceMode";
pub const MULTIBAND_FACTOR: &str = "sSliceAcceleration.lMultiBandFactor";
pub const ACCEL_FACTOR_PE: &str = "sPat.lAccelFactPE";

const ASCCONV_BEGIN: &str = "### ASCCONV BEGIN";
const ASCCONV_END: &str = "### ASCCONV END";

/// Key/value tokens of the embedded protocol text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolBlock {
    values: HashMap<String, String>,
}

impl ProtocolBlock {
    /// Parses the raw CSA element bytes
    ///
    /// # Errors
    ///
    /// Returns [`MricatError::MalformedVendorSubBlock`] when the bytes hold
    /// no `key = value` token at all.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = decode_latin1(bytes);
        let body = ascconv_section(&text).unwrap_or(&text);

        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"^([A-Za-z_][A-Za-z0-9_.\[\]]*)\s*=\s*(.*?)\s*$")
                .expect("Failed to compile regex")
        });

        let values: HashMap<String, String> = body
            .lines()
            .map(|line| line.trim_start_matches(|c: char| c.is_control() || c.is_whitespace()))
            .filter_map(|line| re.captures(line))
            .map(|caps| (caps[1].to_string(), unquote(&caps[2]).to_string()))
            .collect();

        if values.is_empty() {
            return Err(MricatError::MalformedVendorSubBlock(format!(
                "no protocol tokens in {} bytes",
                bytes.len()
            )));
        }

        Ok(Self { values })
    }

    /// Raw value of a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a key as an unsigned number (decimal or `0x` hexadecimal)
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        parse_number(self.get(key)?)
    }

    /// Number of parsed tokens
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no token was parsed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn ascconv_section(text: &str) -> Option<&str> {
    let start = text.find(ASCCONV_BEGIN)?;
    let rest = &text[start..];
    // skip the marker line itself
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
    let body = &rest[body_start..];
    Some(match body.find(ASCCONV_END) {
        Some(end) => &body[..end],
        None => body,
    })
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn parse_number(value: &str) -> Option<u32> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        return u32::from_str_radix(hex, 16).ok();
    }
    value.parse::<u32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u32)
    })
}
