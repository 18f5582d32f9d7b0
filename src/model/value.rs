// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Proteus-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Proteus and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pin data types and literal values.
//!
//! Every pin carries a [`DataType`] tag; links and literal overrides are only
//! accepted when the tags agree or fall inside the coercion set. The coercion
//! set is deliberately small: `Int` may feed `Float`, nothing else.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Control-flow pin. Carries execution order, never a value.
    Exec,
    Bool,
    Int,
    Float,
    Text,
    /// Opaque reference into the host's object model.
    Ref,
}

impl DataType {
    /// Whether a pin of this type accepts an incoming value of `incoming`.
    pub fn accepts(self, incoming: DataType) -> bool {
        self == incoming || matches!((self, incoming), (Self::Float, Self::Int))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Exec => "exec",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Ref => "ref",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A literal carried by an unconnected input pin.
///
/// Serializes as the bare JSON scalar, so `"value": 3` on the wire is an
/// `Int` and `"value": 3.0` a `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Text(_) => DataType::Text,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DataType, Value};

    #[test]
    fn int_coerces_into_float_but_not_back() {
        assert!(DataType::Float.accepts(DataType::Int));
        assert!(!DataType::Int.accepts(DataType::Float));
    }

    #[test]
    fn exec_accepts_only_exec() {
        assert!(DataType::Exec.accepts(DataType::Exec));
        assert!(!DataType::Exec.accepts(DataType::Bool));
        assert!(!DataType::Bool.accepts(DataType::Exec));
    }

    #[test]
    fn value_reports_its_tag() {
        assert_eq!(Value::Bool(true).data_type(), DataType::Bool);
        assert_eq!(Value::Int(3).data_type(), DataType::Int);
        assert_eq!(Value::Float(0.5).data_type(), DataType::Float);
        assert_eq!(Value::Text("hi".to_owned()).data_type(), DataType::Text);
    }

    #[test]
    fn value_deserializes_from_bare_json_scalars() {
        let value: Value = serde_json::from_str("3").expect("int literal");
        assert_eq!(value, Value::Int(3));

        let value: Value = serde_json::from_str("3.5").expect("float literal");
        assert_eq!(value, Value::Float(3.5));

        let value: Value = serde_json::from_str("\"hi\"").expect("text literal");
        assert_eq!(value, Value::Text("hi".to_owned()));

        let value: Value = serde_json::from_str("true").expect("bool literal");
        assert_eq!(value, Value::Bool(true));
    }
}
