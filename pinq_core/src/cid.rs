use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Content identifier returned by the remote pinning service.
///
/// The string is opaque; its scheme is defined by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cid {
    fn from(s: String) -> Self {
        Cid(s)
    }
}

impl From<&str> for Cid {
    fn from(s: &str) -> Self {
        Cid(s.to_owned())
    }
}

/// Pulls a CID out of the service's response document.
///
/// The service encodes the identifier in one of several nested shapes:
/// `value.cid` as a plain string, `value.cid` as a link object keyed by
/// `"/"` or `"value"`, `value["/"]`, or a top-level `cid`. Tried in that
/// order; an empty string counts as absent and falls through to the next
/// shape. An unrecognized document yields `None`, which callers treat as
/// a successful pin without a usable identifier rather than an error.
pub fn extract_cid(data: &Value) -> Option<Cid> {
    if let Some(value) = data.get("value") {
        match value.get("cid") {
            Some(Value::String(s)) if !s.is_empty() => return Some(Cid::from(s.as_str())),
            Some(Value::Object(link)) => {
                if let Some(s) =
                    non_empty_str(link.get("/")).or_else(|| non_empty_str(link.get("value")))
                {
                    return Some(Cid::from(s));
                }
            }
            _ => {}
        }
        if let Some(s) = non_empty_str(value.get("/")) {
            return Some(Cid::from(s));
        }
    }
    non_empty_str(data.get("cid")).map(Cid::from)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}
