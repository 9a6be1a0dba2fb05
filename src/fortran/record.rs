//! Decoded records and their values.
use std::ops::Index;
use std::sync::Arc;

use crate::bernese_errors::BerneseError;

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A decoded line: ordered values, with optional field names shared by every record
/// produced by the same [`FortranFormat`](super::FortranFormat).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<FieldValue>,
    names: Option<Arc<[String]>>,
}

impl Record {
    pub(crate) fn new(values: Vec<FieldValue>, names: Option<Arc<[String]>>) -> Self {
        Record { values, names }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    /// Field names, in value order, if the format declared them.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Look up a value by field name.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        let index = self.names.as_ref()?.iter().position(|n| n == name)?;
        self.values.get(index)
    }

    /// Integer value of a named field, or [`BerneseError::UnknownField`].
    pub fn int(&self, name: &str) -> Result<i64, BerneseError> {
        self.value(name)
            .and_then(FieldValue::as_int)
            .ok_or_else(|| BerneseError::UnknownField(name.to_string()))
    }

    /// Floating point value of a named field, or [`BerneseError::UnknownField`].
    pub fn float(&self, name: &str) -> Result<f64, BerneseError> {
        self.value(name)
            .and_then(FieldValue::as_float)
            .ok_or_else(|| BerneseError::UnknownField(name.to_string()))
    }

    /// Character value of a named field, or [`BerneseError::UnknownField`].
    pub fn str(&self, name: &str) -> Result<&str, BerneseError> {
        self.value(name)
            .and_then(FieldValue::as_str)
            .ok_or_else(|| BerneseError::UnknownField(name.to_string()))
    }
}

impl Index<usize> for Record {
    type Output = FieldValue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

#[cfg(test)]
mod record_test {
    use super::*;

    fn named_record() -> Record {
        Record::new(
            vec![
                FieldValue::Int(3),
                FieldValue::Text("ABCD".into()),
                FieldValue::Float(1.5),
            ],
            Some(Arc::from(vec!["id".to_string(), "name".into(), "x".into()])),
        )
    }

    #[test]
    fn test_named_access() {
        let record = named_record();
        assert_eq!(record.int("id").unwrap(), 3);
        assert_eq!(record.str("name").unwrap(), "ABCD");
        assert_eq!(record.float("x").unwrap(), 1.5);
        assert_eq!(record.names().unwrap().len(), 3);
    }

    #[test]
    fn test_wrong_name_or_type() {
        let record = named_record();
        assert!(matches!(record.int("y"), Err(BerneseError::UnknownField(ref n)) if n == "y"));
        assert!(matches!(record.float("id"), Err(BerneseError::UnknownField(_))));
    }

    #[test]
    fn test_unnamed_record_is_positional() {
        let record = Record::new(vec![FieldValue::Int(1), FieldValue::Int(2)], None);
        assert_eq!(record[1], FieldValue::Int(2));
        assert_eq!(record.get(2), None);
        assert!(record.value("id").is_none());
    }
}
