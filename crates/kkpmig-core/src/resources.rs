//! Compute resource quantities and requirements
//!
//! A [`Quantity`] keeps the exact string it was configured with (so emitted
//! documents never reword what the operator wrote) but compares semantically:
//! `1` and `1000m` describe the same amount of CPU.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

/// The resource names recognized by the defaulting and conversion engines.
///
/// Kubernetes knows more (ephemeral storage, extended resources), but the
/// configuration schema only ever constrains memory and CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceName {
    Cpu,
    Memory,
}

impl ResourceName {
    /// All recognized names, in the order fields are visited during
    /// defaulting and conversion.
    pub const ALL: [ResourceName; 2] = [ResourceName::Memory, ResourceName::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Kubernetes resource quantity, e.g. `100m`, `512Mi` or `1`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Quantity(String);

impl Quantity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical numeric value, suffix applied.
    ///
    /// `100m` → 0.1, `1` → 1.0, `512Mi` → 536870912.0.
    pub fn canonical(&self) -> Result<f64> {
        let input = self.0.trim();
        if input.is_empty() || !input.is_ascii() {
            return Err(self.invalid("empty or non-ascii"));
        }

        let split = input
            .find(|c: char| c != '.' && c != '-' && c != '+' && !c.is_ascii_digit())
            .unwrap_or(input.len());
        let (number, suffix) = input.split_at(split);

        let value: f64 = number.parse().map_err(|_| self.invalid("not a number"))?;

        let multiplier = match suffix {
            "" => 1.0,
            "m" => 1e-3,
            "k" => 1e3,
            "M" => 1e6,
            "G" => 1e9,
            "T" => 1e12,
            "P" => 1e15,
            "E" => 1e18,
            "Ki" => 1024.0,
            "Mi" => 1024f64.powi(2),
            "Gi" => 1024f64.powi(3),
            "Ti" => 1024f64.powi(4),
            "Pi" => 1024f64.powi(5),
            "Ei" => 1024f64.powi(6),
            other => return Err(self.invalid(format!("unknown suffix '{other}'"))),
        };

        Ok(value * multiplier)
    }

    /// Whether the quantity describes a zero amount (`0`, `0m`, `0Gi`).
    /// Unparseable values are not zero.
    pub fn is_zero(&self) -> bool {
        matches!(self.canonical(), Ok(value) if value == 0.0)
    }

    /// Whether both quantities describe the same amount, regardless of the
    /// suffix they were written with.
    pub fn semantic_eq(&self, other: &Quantity) -> Result<bool> {
        Ok(self.canonical()? == other.canonical()?)
    }

    fn invalid(&self, message: impl Into<String>) -> CoreError {
        CoreError::InvalidQuantity {
            value: self.0.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl FromStr for Quantity {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self> {
        let quantity = Self(value.to_string());
        // validate eagerly so FromStr callers get the error at parse time
        quantity.canonical()?;
        Ok(quantity)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        // values.yaml files write quantities as strings ("100m") or bare
        // numbers (1); both must parse
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a quantity string or number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Quantity, E> {
                Ok(Quantity::new(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Quantity, E> {
                Ok(Quantity::new(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Quantity, E> {
                Ok(Quantity::new(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Quantity, E> {
                Ok(Quantity::new(v.to_string()))
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}

/// A map of resource names to quantities, one half of a requests/limits pair.
pub type ResourceList = BTreeMap<ResourceName, Quantity>;

/// Requests and limits for one component.
///
/// `None` means "the operator said nothing at all" and is distinct from an
/// empty map; the defaulting engine replaces an absent map wholesale but
/// only fills gaps in a supplied one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceList>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceList>,
}

impl ResourceRequirements {
    /// Convenience constructor for the built-in default tables.
    pub fn new(
        requests: [(ResourceName, &str); 2],
        limits: [(ResourceName, &str); 2],
    ) -> Self {
        let build = |entries: [(ResourceName, &str); 2]| {
            entries
                .into_iter()
                .map(|(name, value)| (name, Quantity::from(value)))
                .collect()
        };

        Self {
            requests: Some(build(requests)),
            limits: Some(build(limits)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_none() && self.limits.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_values() {
        assert_eq!(Quantity::from("100m").canonical().unwrap(), 0.1);
        assert_eq!(Quantity::from("1").canonical().unwrap(), 1.0);
        assert_eq!(Quantity::from("64Mi").canonical().unwrap(), 64.0 * 1024.0 * 1024.0);
        assert_eq!(Quantity::from("5Gi").canonical().unwrap(), 5.0 * 1024f64.powi(3));
        assert_eq!(Quantity::from("0.5").canonical().unwrap(), 0.5);
    }

    #[test]
    fn test_semantic_equality() {
        let one = Quantity::from("1");
        let thousand_milli = Quantity::from("1000m");
        assert!(one.semantic_eq(&thousand_milli).unwrap());

        let gi = Quantity::from("1Gi");
        let mi = Quantity::from("1024Mi");
        assert!(gi.semantic_eq(&mi).unwrap());

        assert!(!one.semantic_eq(&Quantity::from("2")).unwrap());
    }

    #[test]
    fn test_is_zero() {
        assert!(Quantity::from("0").is_zero());
        assert!(Quantity::from("0m").is_zero());
        assert!(Quantity::from("0.0Gi").is_zero());
        assert!(!Quantity::from("100m").is_zero());
        assert!(!Quantity::from("garbage").is_zero());
    }

    #[test]
    fn test_invalid_quantities() {
        assert!(Quantity::from("").canonical().is_err());
        assert!(Quantity::from("12Qi").canonical().is_err());
        assert!(Quantity::from("abc").canonical().is_err());
    }

    #[test]
    fn test_deserialize_string_or_number() {
        #[derive(Deserialize)]
        struct Holder {
            cpu: Quantity,
        }

        let from_str: Holder = serde_yaml::from_str("cpu: 100m").unwrap();
        assert_eq!(from_str.cpu.as_str(), "100m");

        let from_int: Holder = serde_yaml::from_str("cpu: 2").unwrap();
        assert_eq!(from_int.cpu.as_str(), "2");
    }

    #[test]
    fn test_requirements_roundtrip_skips_unset() {
        let reqs = ResourceRequirements {
            requests: Some(
                [(ResourceName::Cpu, Quantity::from("100m"))]
                    .into_iter()
                    .collect(),
            ),
            limits: None,
        };

        let yaml = serde_yaml::to_string(&reqs).unwrap();
        assert!(yaml.contains("requests"));
        assert!(!yaml.contains("limits"));
    }
}
