// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime values of the SCAD language

use nalgebra::{Matrix4, Point3, Vector3};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undef,
    Bool(bool),
    Number(f64),
    Str(String),
    Vector(Vec<Value>),
}

impl Value {
    /// OpenSCAD truthiness: zero, empty strings and empty vectors are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Vector(v) => !v.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Vector of numbers; missing trailing components are filled with `fill`
    pub fn as_vec3(&self, fill: f64) -> Option<Vector3<f64>> {
        let items = self.as_vector()?;
        if items.is_empty() || items.len() > 3 {
            return None;
        }
        let mut out = [fill; 3];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item.as_number()?;
        }
        Some(Vector3::new(out[0], out[1], out[2]))
    }

    pub fn as_point(&self) -> Option<Point3<f64>> {
        let items = self.as_vector()?;
        if items.len() != 3 {
            return None;
        }
        Some(Point3::new(
            items[0].as_number()?,
            items[1].as_number()?,
            items[2].as_number()?,
        ))
    }

    /// 4x4 or 3x4 matrix given row by row
    pub fn as_matrix(&self) -> Option<Matrix4<f64>> {
        let rows = self.as_vector()?;
        if rows.len() != 3 && rows.len() != 4 {
            return None;
        }
        let mut matrix = Matrix4::identity();
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_vector()?;
            if row.len() != 4 {
                return None;
            }
            for (c, cell) in row.iter().enumerate() {
                matrix[(r, c)] = cell.as_number()?;
            }
        }
        Some(matrix)
    }

    /// Non-negative integer index, as used by polyhedron faces
    pub fn as_index(&self) -> Option<usize> {
        let n = self.as_number()?;
        (n >= 0.0 && n.fract() == 0.0 && n <= usize::MAX as f64).then_some(n as usize)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undef => "undef",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Vector(_) => "vector",
        }
    }
}

impl fmt::Display for Value {
    /// Formats values the way `echo` prints them
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "undef"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Vector(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Six significant digits, trailing zeros dropped, like C's `%g`
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let exponent = n.abs().log10().floor() as i32;
    if (-4..6).contains(&exponent) {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(format!("{:.*}", decimals, n))
    } else {
        let formatted = format!("{:.5e}", n);
        let (mantissa, exp) = formatted.split_once('e').unwrap_or((&formatted, "0"));
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa.to_string()), sign, exp.abs())
    }
}

fn trim_fraction(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(123456.0), "123456");
        assert_eq!(format_number(1234567.0), "1.23457e+06");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_display() {
        let value = Value::Vector(vec![
            Value::Number(1.0),
            Value::Str("a".into()),
            Value::Bool(true),
            Value::Undef,
            Value::Vector(vec![]),
        ]);
        assert_eq!(value.to_string(), r#"[1, "a", true, undef, []]"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Vector(vec![Value::Undef]).is_truthy());
        assert!(!Value::Undef.is_truthy());
    }

    #[test]
    fn test_conversions() {
        let v = Value::Vector(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(v.as_vec3(0.0), Some(Vector3::new(1.0, 2.0, 0.0)));
        assert_eq!(v.as_point(), None);
        assert_eq!(Value::Number(3.0).as_index(), Some(3));
        assert_eq!(Value::Number(-1.0).as_index(), None);
        assert_eq!(Value::Number(1.5).as_index(), None);
    }
}
