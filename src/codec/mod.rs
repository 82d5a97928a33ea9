//! The filter codec: one encoder and one decoder algorithm, parameterized by
//! a revision's [`Capabilities`](crate::capabilities::Capabilities), plus the
//! factory that hands them out per version token.

mod decode;
mod encode;
mod factory;

pub use decode::Decoder;
pub use encode::{Encoder, encode_color};
pub use factory::{FilterCodecs, VersionCodec};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::tree::NamespaceMap;

/// Pseudo-property used when nested identifier predicates are rewritten.
pub const DEFAULT_ID_PROPERTY: &str = "@id";

/// What to do with an identifier predicate nested inside a combinator when
/// the revision only allows identifiers at the filter root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestedIdPolicy {
    /// Rewrite each identifier into an equality on the id pseudo-property.
    #[default]
    Rewrite,
    /// Fail with `UnsupportedFilterConstruct`.
    Reject,
}

impl NestedIdPolicy {
    pub fn label(self) -> &'static str {
        match self {
            NestedIdPolicy::Rewrite => "rewrite",
            NestedIdPolicy::Reject => "reject",
        }
    }
}

impl FromStr for NestedIdPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "rewrite" => Ok(NestedIdPolicy::Rewrite),
            "reject" => Ok(NestedIdPolicy::Reject),
            _ => Err(format!("invalid nested_ids policy: {value}")),
        }
    }
}

/// Caller-tunable codec behaviour shared by every revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub nested_ids: NestedIdPolicy,
    pub id_property: String,
    /// Preferred prefixes for namespace-qualified property paths.
    pub namespaces: NamespaceMap,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            nested_ids: NestedIdPolicy::Rewrite,
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            namespaces: NamespaceMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_id_policy_from_str() {
        assert_eq!("REJECT".parse::<NestedIdPolicy>().unwrap(), NestedIdPolicy::Reject);
        assert_eq!("rewrite".parse::<NestedIdPolicy>().unwrap(), NestedIdPolicy::Rewrite);
        assert!("maybe".parse::<NestedIdPolicy>().is_err());
        assert_eq!(NestedIdPolicy::Reject.label(), "reject");
    }
}
