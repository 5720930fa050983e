//! Cell values: coercion of CSV text into typed values and display helpers.
//!
//! Values are plain [`serde_json::Value`]s restricted to null, boolean,
//! number, string and arrays of those. Coercion never produces arrays.

use serde_json::{Number, Value};

/// Coerce one trimmed CSV cell into a typed value.
///
/// Precedence: empty → `null`, numeric literal → number, `true`/`false`
/// (any case) → boolean, anything else → the string itself. Digit-only
/// strings such as postal codes become numbers; there is no way to force a
/// string.
pub fn coerce_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }

    if let Some(number) = parse_number(cell).and_then(number_value) {
        return number;
    }

    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    Value::String(cell.to_string())
}

/// Coerce a cell that may be missing from a short row. Missing cells are null.
pub fn coerce_optional_cell(cell: Option<&str>) -> Value {
    cell.map(coerce_cell).unwrap_or(Value::Null)
}

/// Parse text with JavaScript `Number()` semantics.
///
/// Surrounding whitespace is ignored; decimal literals with optional sign,
/// fraction and exponent are accepted, as are `0x`/`0o`/`0b` integers and
/// `Infinity`. Empty input and a lone `.` are not numbers.
pub fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(radix_value) = parse_radix_literal(s) {
        return Some(radix_value);
    }

    let (sign, unsigned) = match s.as_bytes()[0] {
        b'+' => (1.0, &s[1..]),
        b'-' => (-1.0, &s[1..]),
        _ => (1.0, s),
    };

    if unsigned == "Infinity" {
        return Some(sign * f64::INFINITY);
    }

    if !is_decimal_literal(unsigned) {
        return None;
    }

    unsigned.parse::<f64>().ok().map(|v| sign * v)
}

fn parse_radix_literal(s: &str) -> Option<f64> {
    if s.len() < 3 || !s.starts_with('0') {
        return None;
    }
    let radix = match s.as_bytes()[1] {
        b'x' | b'X' => 16,
        b'o' | b'O' => 8,
        b'b' | b'B' => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|v| v as f64)
}

/// `digits [. digits?] | . digits`, followed by an optional exponent.
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

/// Convert a parsed number into a JSON value.
///
/// Integral values within the exactly-representable range become integers so
/// they serialise as `42`, not `42.0`. Non-finite values have no JSON form
/// and yield `None`.
pub fn number_value(value: f64) -> Option<Value> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;

    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        return Some(Value::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number)
}

/// String form of a value, as used for substring filtering.
///
/// Null renders as `null`, arrays as their comma-joined elements.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{}", f as i128),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Display form of a table cell.
///
/// Null renders as `-`; numbers keep at most six fraction digits with
/// trailing zeros removed.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => format_fraction(f, 6),
            _ => n.to_string(),
        },
        other => value_text(other),
    }
}

fn format_fraction(value: f64, max_digits: usize) -> String {
    let formatted = format!("{:.*}", max_digits, value);
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_cell_precedence() {
        assert_eq!(coerce_cell(""), Value::Null);
        assert_eq!(coerce_cell("42"), json!(42));
        assert_eq!(coerce_cell("3.14"), json!(3.14));
        assert_eq!(coerce_cell("true"), json!(true));
        assert_eq!(coerce_cell("TRUE"), json!(true));
        assert_eq!(coerce_cell("False"), json!(false));
        assert_eq!(coerce_cell("abc"), json!("abc"));
    }

    #[test]
    fn test_coerce_cell_digit_strings_become_numbers() {
        assert_eq!(coerce_cell("01234"), json!(1234));
        assert_eq!(coerce_cell("1e3"), json!(1000));
        assert_eq!(coerce_cell("-2.5E-1"), json!(-0.25));
    }

    #[test]
    fn test_coerce_cell_rejects_rust_only_float_spellings() {
        assert_eq!(coerce_cell("inf"), json!("inf"));
        assert_eq!(coerce_cell("NaN"), json!("NaN"));
        assert_eq!(coerce_cell("infinity"), json!("infinity"));
        // Infinity is a number but has no JSON representation.
        assert_eq!(coerce_cell("Infinity"), json!("Infinity"));
    }

    #[test]
    fn test_coerce_optional_cell() {
        assert_eq!(coerce_optional_cell(None), Value::Null);
        assert_eq!(coerce_optional_cell(Some("7")), json!(7));
    }

    #[test]
    fn test_parse_number_js_semantics() {
        assert_eq!(parse_number(" 12 "), Some(12.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("5."), Some(5.0));
        assert_eq!(parse_number("+7"), Some(7.0));
        assert_eq!(parse_number("0x1F"), Some(31.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("1e"), None);
        assert_eq!(parse_number("1,5"), None);
        assert_eq!(parse_number("--1"), None);
        assert_eq!(parse_number("0x"), None);
    }

    #[test]
    fn test_number_value_integral_and_fractional() {
        assert_eq!(number_value(42.0), Some(json!(42)));
        assert_eq!(number_value(-0.0), Some(json!(0)));
        assert_eq!(number_value(0.02), Some(json!(0.02)));
        assert_eq!(number_value(f64::NAN), None);
        assert_eq!(
            serde_json::to_string(&number_value(42.0).unwrap()).unwrap(),
            "42"
        );
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::Null), "-");
        assert_eq!(display_value(&json!(3)), "3");
        assert_eq!(display_value(&json!(1.0 / 3.0)), "0.333333");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!("ok")), "ok");
        assert_eq!(display_value(&json!(true)), "true");
    }

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&Value::Null), "null");
        assert_eq!(value_text(&json!([1, "a", null])), "1,a,null");
        assert_eq!(value_text(&json!(0.05)), "0.05");
    }
}
