//! Loosely typed values passed in from a host application.
//!
//! Host calls are validated here before anything reaches a model: the argument count is
//! checked first ([ModelError::Arity]), then the kind of each argument ([ModelError::Type]).

use crate::{ModelError, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        if let Value::Number(v) = self { Some(*v) } else { None }
    }
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(v) = self { Some(*v) } else { None }
    }
    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(v) = self { Some(v.as_str()) } else { None }
    }
    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(v) = self { Some(v.as_slice()) } else { None }
    }
    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
}

impl From<f64> for Value   { fn from(v : f64) -> Value { Value::Number(v) } }
impl From<i32> for Value   { fn from(v : i32) -> Value { Value::Number(v as f64) } }
impl From<usize> for Value { fn from(v : usize) -> Value { Value::Number(v as f64) } }
impl From<bool> for Value  { fn from(v : bool) -> Value { Value::Bool(v) } }
impl From<&str> for Value  { fn from(v : &str) -> Value { Value::Str(v.to_string()) } }
impl From<String> for Value { fn from(v : String) -> Value { Value::Str(v) } }
impl From<&[f64]> for Value {
    fn from(v : &[f64]) -> Value { Value::Array(v.iter().map(|&x| Value::Number(x)).collect()) }
}
impl From<Vec<f64>> for Value {
    fn from(v : Vec<f64>) -> Value { Value::from(v.as_slice()) }
}

const ORDINALS : [&str;5] = ["First", "Second", "Third", "Fourth", "Fifth"];

fn ordinal(pos : usize) -> &'static str {
    ORDINALS.get(pos).copied().unwrap_or("Next")
}

/// Accessor for the arguments of a single host call.
pub(crate) struct Args<'a> {
    args : &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(args : &'a [Value]) -> Args<'a> { Args{ args } }

    pub fn len(&self) -> usize { self.args.len() }

    /// Fail unless the number of arguments is one of `allowed`.
    pub fn arity(&self, allowed : &[usize]) -> Result<usize> {
        if allowed.contains(&self.args.len()) {
            Ok(self.args.len())
        }
        else {
            Err(ModelError::Arity("Invalid number of arguments".to_string()))
        }
    }

    fn get(&self, pos : usize) -> Result<&'a Value> {
        self.args.get(pos).ok_or_else(|| ModelError::Arity("Invalid number of arguments".to_string()))
    }

    pub fn number(&self, pos : usize) -> Result<f64> {
        self.get(pos)?.as_number()
            .ok_or_else(|| ModelError::Type(format!("{} argument should be a Number", ordinal(pos))))
    }

    /// A non-negative integral number. Negative values are out of range rather than ill-typed.
    pub fn index(&self, pos : usize) -> Result<usize> {
        let v = self.number(pos)?;
        if v.fract() != 0.0 || !v.is_finite() {
            Err(ModelError::Type(format!("{} argument should be an integral Number", ordinal(pos))))
        }
        else if v < 0.0 {
            Err(ModelError::Shape(format!("index {} out of range", v)))
        }
        else {
            Ok(v as usize)
        }
    }

    pub fn boolean(&self, pos : usize) -> Result<bool> {
        self.get(pos)?.as_bool()
            .ok_or_else(|| ModelError::Type(format!("{} argument should be a Boolean", ordinal(pos))))
    }

    pub fn string(&self, pos : usize) -> Result<&'a str> {
        self.get(pos)?.as_str()
            .ok_or_else(|| ModelError::Type(format!("{} argument should be a String", ordinal(pos))))
    }

    /// An array of numbers, or `Null` meaning an empty array.
    pub fn numbers(&self, pos : usize) -> Result<Vec<f64>> {
        let err = || ModelError::Type(format!("{} argument should be a Array of Numbers or NULL", ordinal(pos)));
        match self.get(pos)? {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items.iter().map(|v| v.as_number().ok_or_else(err)).collect(),
            _ => Err(err())
        }
    }

    /// An array of column indexes, or `Null` meaning an empty array.
    pub fn indexes(&self, pos : usize) -> Result<Vec<usize>> {
        self.numbers(pos)?.into_iter()
            .map(|v| {
                if v.fract() != 0.0 || !v.is_finite() {
                    Err(ModelError::Type(format!("{} argument should be a Array of integral Numbers", ordinal(pos))))
                }
                else if v < 0.0 {
                    Err(ModelError::Shape(format!("index {} out of range", v)))
                }
                else {
                    Ok(v as usize)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_and_types() {
        let args = vec![Value::from(1.0), Value::from("abc"), Value::Null];
        let a = Args::new(&args);
        assert_eq!(a.arity(&[3]).unwrap(), 3);
        assert!(matches!(a.arity(&[0,1]), Err(ModelError::Arity(_))));
        assert_eq!(a.number(0).unwrap(), 1.0);
        match a.number(1) {
            Err(ModelError::Type(msg)) => assert_eq!(msg, "Second argument should be a Number"),
            _ => panic!("expected type error")
        }
        assert_eq!(a.string(1).unwrap(), "abc");
        assert!(a.numbers(2).unwrap().is_empty());
        assert!(matches!(a.boolean(0), Err(ModelError::Type(_))));
        assert!(matches!(a.number(3), Err(ModelError::Arity(_))));
    }

    #[test]
    fn indexes() {
        let args = vec![Value::from(vec![1.0, 3.0]), Value::from(vec![1.5]), Value::from(vec![-1.0]), Value::from(2.0)];
        let a = Args::new(&args);
        assert_eq!(a.indexes(0).unwrap(), vec![1,3]);
        assert!(matches!(a.indexes(1), Err(ModelError::Type(_))));
        assert!(matches!(a.indexes(2), Err(ModelError::Shape(_))));
        assert_eq!(a.index(3).unwrap(), 2);
    }

    #[test]
    fn mixed_array_is_type_error() {
        let args = vec![Value::Array(vec![Value::from(1.0), Value::from(true)])];
        assert!(matches!(Args::new(&args).numbers(0), Err(ModelError::Type(_))));
    }
}
