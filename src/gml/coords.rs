//! Coordinate text formats of the GML grammars.

use geo_types::Coord;

use crate::error::{FilterError, Result};
use crate::utils::{format_number, parse_decimal};

/// `x,y x,y` as written in GML 2 `coordinates`.
pub fn format_coordinates(coords: &[Coord<f64>]) -> String {
    coords
        .iter()
        .map(|c| format!("{},{}", format_number(c.x), format_number(c.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `x y x y` as written in GML 3 `pos`/`posList`.
pub fn format_pos_list(coords: &[Coord<f64>]) -> String {
    coords
        .iter()
        .map(|c| format!("{} {}", format_number(c.x), format_number(c.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn number(token: &str, decimal: &str) -> Result<f64> {
    let normalized = if decimal == "." {
        token.to_string()
    } else {
        token.replace(decimal, ".")
    };
    parse_decimal(&normalized)
        .ok_or_else(|| FilterError::malformed(format!("invalid coordinate value '{}'", token)))
}

/// Parse GML 2 `coordinates` honoring its `decimal`, `cs` and `ts` separators.
/// Only the first two ordinates of each tuple are kept.
pub fn parse_coordinates(text: &str, decimal: &str, cs: &str, ts: &str) -> Result<Vec<Coord<f64>>> {
    let tuples: Vec<&str> = if ts.trim().is_empty() {
        text.split_whitespace().collect()
    } else {
        text.split(ts).map(str::trim).filter(|t| !t.is_empty()).collect()
    };

    tuples
        .into_iter()
        .map(|tuple| {
            let mut values = tuple.split(cs).map(str::trim);
            let x = values
                .next()
                .ok_or_else(|| FilterError::malformed("empty coordinate tuple"))?;
            let y = values
                .next()
                .ok_or_else(|| FilterError::malformed(format!("coordinate tuple '{}' has one ordinate", tuple)))?;
            Ok(Coord {
                x: number(x, decimal)?,
                y: number(y, decimal)?,
            })
        })
        .collect()
}

/// Parse whitespace separated ordinates.
pub fn parse_ordinates(text: &str) -> Result<Vec<f64>> {
    text.split_whitespace().map(|token| number(token, ".")).collect()
}

/// Parse a `posList` of `dimension`-tuples into 2D coordinates.
pub fn parse_pos_list(text: &str, dimension: usize) -> Result<Vec<Coord<f64>>> {
    if dimension < 2 {
        return Err(FilterError::malformed(format!(
            "srsDimension {} is too small for a position list",
            dimension
        )));
    }
    let values = parse_ordinates(text)?;
    if values.len() % dimension != 0 {
        return Err(FilterError::malformed(format!(
            "position list of {} values is not a multiple of dimension {}",
            values.len(),
            dimension
        )));
    }
    Ok(values
        .chunks(dimension)
        .map(|chunk| Coord {
            x: chunk[0],
            y: chunk[1],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_both_styles() {
        let coords = [Coord { x: 1.0, y: 2.5 }, Coord { x: -3.0, y: 4.0 }];
        assert_eq!(format_coordinates(&coords), "1,2.5 -3,4");
        assert_eq!(format_pos_list(&coords), "1 2.5 -3 4");
    }

    #[test]
    fn parses_default_separators() {
        let coords = parse_coordinates(" 1,2  3.5,4 ", ".", ",", " ").unwrap();
        assert_eq!(coords, vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.5, y: 4.0 }]);
    }

    #[test]
    fn parses_custom_separators() {
        let coords = parse_coordinates("1;2,5|3;4", ",", ";", "|").unwrap();
        assert_eq!(coords, vec![Coord { x: 1.0, y: 2.5 }, Coord { x: 3.0, y: 4.0 }]);
    }

    #[test]
    fn parses_three_dimensional_pos_list() {
        let coords = parse_pos_list("1 2 100 3 4 200", 3).unwrap();
        assert_eq!(coords, vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }]);
        assert!(parse_pos_list("1 2 3", 2).is_err());
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(parse_coordinates("1,x", ".", ",", " ").is_err());
        assert!(parse_coordinates("1", ".", ",", " ").is_err());
    }
}
