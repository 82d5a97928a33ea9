//! Lexical helpers shared by the codec and the GML grammars.

use winnow::ascii::{digit0, digit1};
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::one_of;

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

/// Recognize a plain decimal: `[+-]digits[.digits][e[+-]digits]` or `.digits`.
fn decimal<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (
        opt(one_of(['+', '-'])),
        alt(((digit1, opt(('.', digit0))).void(), ('.', digit1).void())),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)
}

/// Parse `text` as a decimal number, rejecting `inf`, `nan` and trailing junk.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let mut input = text.trim();
    let matched = decimal.parse_next(&mut input).ok()?;
    if !input.is_empty() {
        return None;
    }
    matched.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Render a number the way literal text carries it.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Split `prefix:local` into its parts; unqualified names have no prefix.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimals() {
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal(" -3 "), Some(-3.0));
        assert_eq!(parse_decimal("+.5"), Some(0.5));
        assert_eq!(parse_decimal("1e3"), Some(1000.0));
        assert_eq!(parse_decimal("2.5E-1"), Some(0.25));
    }

    #[test]
    fn rejects_non_decimals() {
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("12abc"), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("1.2.3"), None);
    }

    #[test]
    fn rejects_overflowing_decimals() {
        assert_eq!(parse_decimal("1e400"), None);
        assert_eq!(parse_decimal("-1e400"), None);
        assert_eq!(parse_decimal("1e308"), Some(1e308));
    }

    #[test]
    fn formats_integers_without_fraction() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-2.5), "-2.5");
    }

    #[test]
    fn splits_qualified_names() {
        assert_eq!(split_qname("app:road"), (Some("app"), "road"));
        assert_eq!(split_qname("road"), (None, "road"));
        assert_eq!(split_qname(":road"), (None, ":road"));
    }
}
