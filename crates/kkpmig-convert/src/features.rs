//! Feature gate expression parsing
//!
//! The legacy chart configured feature gates as a comma-separated list of
//! `Name=true` / `Name=false` pairs, spread over several sections. The new
//! configuration keeps a single set of enabled gate names, so the
//! converter parses every legacy expression and merges the enabled ones.

use std::collections::BTreeMap;

use crate::error::{ConvertError, Result};

/// Parse a `Gate1=true,Gate2=false` expression into a name/enabled map.
///
/// An empty expression is fine; a pair without `=` or with a non-boolean
/// value fails the whole conversion.
pub fn parse_feature_gates(expression: &str) -> Result<BTreeMap<String, bool>> {
    let mut gates = BTreeMap::new();

    for pair in expression.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (name, value) = pair.split_once('=').ok_or_else(|| {
            ConvertError::config(format!(
                "invalid feature gate '{pair}', must be of the form Name=true|false"
            ))
        })?;

        let enabled: bool = value.trim().parse().map_err(|_| {
            ConvertError::config(format!(
                "invalid feature gate '{pair}', '{value}' is not a boolean"
            ))
        })?;

        gates.insert(name.trim().to_string(), enabled);
    }

    Ok(gates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_feature_gates() {
        let gates = parse_feature_gates("OIDCKubeCfgEndpoint=true,OpenIDAuthPlugin=false").unwrap();
        assert_eq!(gates.get("OIDCKubeCfgEndpoint"), Some(&true));
        assert_eq!(gates.get("OpenIDAuthPlugin"), Some(&false));
    }

    #[test]
    fn test_empty_expression() {
        assert!(parse_feature_gates("").unwrap().is_empty());
        assert!(parse_feature_gates(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse_feature_gates("OIDCKubeCfgEndpoint").is_err());
        assert!(parse_feature_gates("OIDCKubeCfgEndpoint=yes").is_err());
    }
}
