use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug)]
pub struct ComparisonParseError(String);

impl fmt::Display for ComparisonParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid comparison '{}', expected one of eq, ne, lt, le, gt, ge",
            self.0
        )
    }
}

impl std::error::Error for ComparisonParseError {}

impl FromStr for Comparison {
    type Err = ComparisonParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" | "==" => Ok(Comparison::Eq),
            "ne" | "!=" => Ok(Comparison::Ne),
            "lt" | "<" => Ok(Comparison::Lt),
            "le" | "<=" => Ok(Comparison::Le),
            "gt" | ">" => Ok(Comparison::Gt),
            "ge" | ">=" => Ok(Comparison::Ge),
            _ => Err(ComparisonParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// A threshold or equality test against a single sample
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Predicate {
    pub op: Comparison,
    pub value: f64,
}

impl Predicate {
    pub fn new(op: Comparison, value: f64) -> Self {
        Self { op, value }
    }

    pub fn equal_to(value: f64) -> Self {
        Self::new(Comparison::Eq, value)
    }

    pub fn at_least(value: f64) -> Self {
        Self::new(Comparison::Ge, value)
    }

    pub fn at_most(value: f64) -> Self {
        Self::new(Comparison::Le, value)
    }

    pub fn test(&self, sample: f64) -> bool {
        match self.op {
            Comparison::Eq => sample == self.value,
            Comparison::Ne => sample != self.value,
            Comparison::Lt => sample < self.value,
            Comparison::Le => sample <= self.value,
            Comparison::Gt => sample > self.value,
            Comparison::Ge => sample >= self.value,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.value)
    }
}

/// A predicate tied to the position of its input in the block list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundPredicate {
    pub input: usize,
    pub predicate: Predicate,
}

impl BoundPredicate {
    pub fn new(input: usize, predicate: Predicate) -> Self {
        Self { input, predicate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons() {
        assert!(Predicate::equal_to(10.0).test(10.0));
        assert!(!Predicate::equal_to(10.0).test(11.0));
        assert!(Predicate::at_least(2000.0).test(2000.0));
        assert!(!Predicate::at_least(2000.0).test(1999.5));
        assert!(Predicate::at_most(300.0).test(300.0));
        assert!(!Predicate::at_most(300.0).test(300.1));
        assert!(Predicate::new(Comparison::Gt, 0.0).test(0.5));
        assert!(Predicate::new(Comparison::Lt, 0.0).test(-0.5));
        assert!(Predicate::new(Comparison::Ne, 3.0).test(4.0));
    }

    #[test]
    fn test_parse_comparison() {
        assert_eq!("ge".parse::<Comparison>().unwrap(), Comparison::Ge);
        assert_eq!("<=".parse::<Comparison>().unwrap(), Comparison::Le);
        assert_eq!("EQ".parse::<Comparison>().unwrap(), Comparison::Eq);
        assert!("between".parse::<Comparison>().is_err());
    }

    #[test]
    fn test_deserialize_predicate() {
        let predicate: Predicate = serde_json::from_str(r#"{"op": "ge", "value": 3500}"#).unwrap();
        assert_eq!(predicate, Predicate::at_least(3500.0));
        assert_eq!(predicate.to_string(), ">= 3500");
    }
}
