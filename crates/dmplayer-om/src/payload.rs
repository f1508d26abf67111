//! Verification script payload parsing
//!
//! The `ad_loaded` event carries its verification scripts as a query-string
//! like payload:
//!
//! ```text
//! verificationScripts[0][vendor]=v1&verificationScripts[0][resource]=https://x&verificationScripts[0][parameters]=p1
//! ```
//!
//! Segments are grouped by their numeric index. Groups are emitted in the
//! order their index first appears in the payload; within a group the first
//! segment for a field wins and missing fields are empty. Values are taken
//! verbatim, no percent-decoding is applied.

use serde::{Deserialize, Serialize};

const PREFIX: &str = "verificationScripts[";

/// Raw verification script fields extracted from a payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationScriptData {
    pub vendor_key: String,
    pub url: String,
    pub parameters: String,
}

/// Field named by a payload segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Vendor,
    Resource,
    Parameters,
    Other,
}

/// One `verificationScripts[N][field]=value` segment
#[derive(Debug, PartialEq, Eq)]
struct Segment<'a> {
    index: &'a str,
    field: Field,
    value: &'a str,
}

/// Split a segment into index, field and value.
///
/// The key ends at the first `=`; everything after it is the value.
fn parse_segment(segment: &str) -> Option<Segment<'_>> {
    let (key, value) = segment.split_once('=')?;
    let rest = key.strip_prefix(PREFIX)?;
    let (index, rest) = rest.split_once(']')?;
    if !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = rest.strip_prefix('[')?.strip_suffix(']')?;
    let field = match field {
        "vendor" => Field::Vendor,
        "resource" => Field::Resource,
        "parameters" => Field::Parameters,
        _ => Field::Other,
    };
    Some(Segment {
        index,
        field,
        value,
    })
}

/// Parse the verification scripts of an `ad_loaded` payload.
///
/// A missing or unrecognizable payload yields an empty list.
pub fn parse_verification_scripts(payload: Option<&str>) -> Vec<VerificationScriptData> {
    let Some(payload) = payload else {
        return Vec::new();
    };

    // (index, data, fields already set)
    let mut groups: Vec<(&str, VerificationScriptData, [bool; 3])> = Vec::new();

    for segment in payload.split('&').filter_map(parse_segment) {
        let slot = match groups.iter().position(|(index, _, _)| *index == segment.index) {
            Some(slot) => slot,
            None => {
                groups.push((segment.index, VerificationScriptData::default(), [false; 3]));
                groups.len() - 1
            }
        };
        let (_, data, seen) = &mut groups[slot];
        let (target, flag) = match segment.field {
            Field::Vendor => (&mut data.vendor_key, &mut seen[0]),
            Field::Resource => (&mut data.url, &mut seen[1]),
            Field::Parameters => (&mut data.parameters, &mut seen[2]),
            Field::Other => continue,
        };
        if !*flag {
            *flag = true;
            *target = segment.value.to_string();
        }
    }

    groups.into_iter().map(|(_, data, _)| data).collect()
}
