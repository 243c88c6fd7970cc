//! MARC record parsing and classification
//!
//! Records arrive in the MARC-in-JSON shape: an object with a `leader`
//! string and a `fields` array where each element maps one tag either to a
//! string (control field) or to an object with indicators and subfields
//! (data field). The leader's type-of-record byte decides whether a record
//! is bibliographic, holdings, or authority.

use serde_json::{json, Value};
use thiserror::Error;

/// Tag of the internal tracking field
pub const TRACKING_FIELD: &str = "999";
/// Subfield that carries the source-record tracking id
pub const TRACKING_SUBFIELD: &str = "s";
/// Subfield that carries the linked-instance id
pub const INSTANCE_SUBFIELD: &str = "i";
/// Control field linking a holdings record to its bibliographic record
pub const HOLDINGS_LINKING_FIELD: &str = "004";

/// Leader position of the type-of-record byte
const TYPE_OF_RECORD_POS: usize = 6;

/// MARC record subtype derived from the leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarcRecordClass {
    Bibliographic,
    Holdings,
    Authority,
}

/// Per-record parse failure
#[derive(Debug, Error, PartialEq)]
pub enum MarcParseError {
    #[error("record is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("record has no leader")]
    MissingLeader,

    #[error("leader is too short to carry a type-of-record byte")]
    ShortLeader,

    #[error("unknown type-of-record byte '{0}'")]
    UnknownRecordType(char),
}

/// One field of a parsed record
#[derive(Debug, Clone, PartialEq)]
pub enum MarcField {
    Control {
        tag: String,
        value: String,
    },
    Data {
        tag: String,
        ind1: String,
        ind2: String,
        /// (code, value) pairs in source order
        subfields: Vec<(String, String)>,
    },
}

impl MarcField {
    pub fn tag(&self) -> &str {
        match self {
            Self::Control { tag, .. } | Self::Data { tag, .. } => tag,
        }
    }
}

/// A structurally parsed MARC record
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMarcRecord {
    pub leader: String,
    pub fields: Vec<MarcField>,
}

impl ParsedMarcRecord {
    /// Parse a raw MARC-in-JSON string
    pub fn parse(raw: &str) -> Result<Self, MarcParseError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MarcParseError::InvalidJson(e.to_string()))?;

        let leader = value
            .get("leader")
            .and_then(Value::as_str)
            .ok_or(MarcParseError::MissingLeader)?
            .to_string();

        let mut fields = Vec::new();
        if let Some(list) = value.get("fields").and_then(Value::as_array) {
            for entry in list {
                let Some(object) = entry.as_object() else {
                    continue;
                };
                for (tag, body) in object {
                    match body {
                        Value::String(control) => fields.push(MarcField::Control {
                            tag: tag.clone(),
                            value: control.clone(),
                        }),
                        Value::Object(data) => {
                            let ind1 = data
                                .get("ind1")
                                .and_then(Value::as_str)
                                .unwrap_or(" ")
                                .to_string();
                            let ind2 = data
                                .get("ind2")
                                .and_then(Value::as_str)
                                .unwrap_or(" ")
                                .to_string();
                            let mut subfields = Vec::new();
                            if let Some(subs) = data.get("subfields").and_then(Value::as_array) {
                                for sub in subs {
                                    let Some(pair) = sub.as_object() else {
                                        continue;
                                    };
                                    for (code, sub_value) in pair {
                                        if let Some(text) = sub_value.as_str() {
                                            subfields
                                                .push((code.clone(), text.to_string()));
                                        }
                                    }
                                }
                            }
                            fields.push(MarcField::Data {
                                tag: tag.clone(),
                                ind1,
                                ind2,
                                subfields,
                            });
                        },
                        _ => {},
                    }
                }
            }
        }

        Ok(Self { leader, fields })
    }

    /// Classify by the leader's type-of-record byte
    pub fn classify(&self) -> Result<MarcRecordClass, MarcParseError> {
        let byte = self
            .leader
            .chars()
            .nth(TYPE_OF_RECORD_POS)
            .ok_or(MarcParseError::ShortLeader)?;
        match byte {
            'a' | 'c' | 'd' | 'e' | 'f' | 'g' | 'i' | 'j' | 'k' | 'm' | 'o' | 'p' | 'r' | 't' => {
                Ok(MarcRecordClass::Bibliographic)
            },
            'u' | 'v' | 'x' | 'y' => Ok(MarcRecordClass::Holdings),
            'z' => Ok(MarcRecordClass::Authority),
            other => Err(MarcParseError::UnknownRecordType(other)),
        }
    }

    /// First value of a control field by tag
    pub fn control_field(&self, tag: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            MarcField::Control { tag: t, value } if t == tag => Some(value.as_str()),
            _ => None,
        })
    }

    /// First value of a subfield within a data field
    pub fn subfield(&self, tag: &str, code: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            MarcField::Data { tag: t, subfields, .. } if t == tag => subfields
                .iter()
                .find(|(c, _)| c == code)
                .map(|(_, v)| v.as_str()),
            _ => None,
        })
    }

    /// Whether the record already carries a tracking subfield
    /// (`999 $s` or `999 $i`), i.e. it has been through a pipeline before
    pub fn carries_tracking_subfield(&self) -> bool {
        self.subfield(TRACKING_FIELD, TRACKING_SUBFIELD).is_some()
            || self.subfield(TRACKING_FIELD, INSTANCE_SUBFIELD).is_some()
    }

    /// Ensure `999 ff $s` equals `tracking_id`, adding the field if absent
    pub fn assign_tracking_subfield(&mut self, tracking_id: &str) {
        for field in &mut self.fields {
            if let MarcField::Data { tag, subfields, .. } = field {
                if tag == TRACKING_FIELD {
                    if let Some(slot) = subfields.iter_mut().find(|(c, _)| c == TRACKING_SUBFIELD) {
                        slot.1 = tracking_id.to_string();
                    } else {
                        subfields.push((TRACKING_SUBFIELD.to_string(), tracking_id.to_string()));
                    }
                    return;
                }
            }
        }
        self.fields.push(MarcField::Data {
            tag: TRACKING_FIELD.to_string(),
            ind1: "f".to_string(),
            ind2: "f".to_string(),
            subfields: vec![(TRACKING_SUBFIELD.to_string(), tracking_id.to_string())],
        });
    }

    /// A display title assembled from `245 $a` and `$b`, if present
    pub fn title(&self) -> Option<String> {
        let main = self.subfield("245", "a")?;
        match self.subfield("245", "b") {
            Some(rest) => Some(format!("{} {}", main.trim_end(), rest)),
            None => Some(main.to_string()),
        }
    }

    /// Serialize back to the MARC-in-JSON shape
    pub fn to_json(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|field| {
                let mut entry = serde_json::Map::new();
                match field {
                    MarcField::Control { tag, value } => {
                        entry.insert(tag.clone(), Value::String(value.clone()));
                    },
                    MarcField::Data { tag, ind1, ind2, subfields } => {
                        let subs: Vec<Value> = subfields
                            .iter()
                            .map(|(code, value)| {
                                let mut pair = serde_json::Map::new();
                                pair.insert(code.clone(), Value::String(value.clone()));
                                Value::Object(pair)
                            })
                            .collect();
                        entry.insert(
                            tag.clone(),
                            json!({ "ind1": ind1, "ind2": ind2, "subfields": subs }),
                        );
                    },
                }
                Value::Object(entry)
            })
            .collect();
        json!({ "leader": self.leader, "fields": fields })
    }
}
