use super::cell::CellValue;

/// The display token shown for any cell whose evaluation failed.
pub const ERROR_TOKEN: &str = "#ERROR";

/// Format a cell value for display.
pub fn format_value(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Text(s) => s.clone(),
        CellValue::Error(_) => ERROR_TOKEN.to_string(),
    }
}

/// Format a number for display.
///
/// Integral values print without a fractional part (`8`, not `8.0`), other
/// values use the shortest representation that round-trips (`2.5`, `0.1`).
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        ERROR_TOKEN.to_string()
    } else if n == 0.0 {
        // Avoid "-0".
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ErrorKind;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(f64::INFINITY), ERROR_TOKEN);
        assert_eq!(format_number(f64::NAN), ERROR_TOKEN);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&CellValue::Empty), "");
        assert_eq!(format_value(&CellValue::Text("B".into())), "B");
        assert_eq!(format_value(&CellValue::Number(15.0)), "15");
        assert_eq!(
            format_value(&CellValue::Error(ErrorKind::FormulaSyntax)),
            "#ERROR"
        );
    }
}
