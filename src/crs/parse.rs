//! Parser for SRS name strings.
//!
//! Accepted forms:
//!   EPSG:4326
//!   urn:ogc:def:crs:EPSG::4326
//!   urn:ogc:def:crs:EPSG:6.6:4326
//!   urn:x-ogc:def:crs:EPSG:4326
//!   http://www.opengis.net/gml/srs/epsg.xml#4326
//!   http://www.opengis.net/def/crs/EPSG/0/4326
//!   CRS:84

use winnow::ascii::Caseless;
use winnow::combinator::{alt, preceded, separated};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use super::Crs;

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn authority<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

fn code<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != ':' && c != '/' && c != '#')
        .parse_next(input)
}

/// `urn:ogc:def:crs:AUTH:[VERSION]:CODE`
fn urn(input: &mut &str) -> PResult<(String, String)> {
    let _ = alt((
        literal(Caseless("urn:ogc:def:crs:")),
        literal(Caseless("urn:x-ogc:def:crs:")),
    ))
    .parse_next(input)?;
    let parts: Vec<&str> = separated(
        2..=3,
        take_while(0.., |c: char| !c.is_whitespace() && c != ':'),
        ':',
    )
    .parse_next(input)?;
    let (auth, code) = match parts.as_slice() {
        [auth, code] | [auth, _, code] => (*auth, *code),
        _ => return Err(winnow::error::ErrMode::Backtrack(Default::default())),
    };
    if auth.is_empty() || code.is_empty() {
        return Err(winnow::error::ErrMode::Backtrack(Default::default()));
    }
    Ok((auth.to_string(), code.to_string()))
}

/// `http://www.opengis.net/gml/srs/epsg.xml#CODE`
fn gml_srs_url(input: &mut &str) -> PResult<(String, String)> {
    let code = preceded(
        (
            alt((literal(Caseless("http://")), literal(Caseless("https://")))),
            literal(Caseless("www.opengis.net/gml/srs/")),
            authority,
            literal(Caseless(".xml#")),
        ),
        code,
    )
    .parse_next(input)?;
    Ok(("EPSG".to_string(), code.to_string()))
}

/// `http://www.opengis.net/def/crs/AUTH/VERSION/CODE`
fn def_url(input: &mut &str) -> PResult<(String, String)> {
    let _ = (
        alt((literal(Caseless("http://")), literal(Caseless("https://")))),
        literal(Caseless("www.opengis.net/def/crs/")),
    )
        .parse_next(input)?;
    let auth = authority.parse_next(input)?;
    let _ = ('/', take_while(0.., |c: char| c != '/'), '/').parse_next(input)?;
    let code = code.parse_next(input)?;
    Ok((auth.to_string(), code.to_string()))
}

/// `AUTH:CODE`
fn short_code(input: &mut &str) -> PResult<(String, String)> {
    let auth = authority.parse_next(input)?;
    let _ = ':'.parse_next(input)?;
    let code = code.parse_next(input)?;
    Ok((auth.to_string(), code.to_string()))
}

fn srs_name(input: &mut &str) -> PResult<(String, String)> {
    alt((urn, gml_srs_url, def_url, short_code)).parse_next(input)
}

/// Parse an SRS name; unrecognized strings become [`Crs::Named`].
pub fn parse_srs_name(value: &str) -> Crs {
    let trimmed = value.trim();
    let mut input = trimmed;
    match srs_name.parse_next(&mut input) {
        Ok((auth, code)) if input.is_empty() => normalize(&auth, &code),
        _ => Crs::Named(trimmed.to_string()),
    }
}

fn normalize(authority: &str, code: &str) -> Crs {
    let authority = authority.to_ascii_uppercase();
    match (authority.as_str(), code) {
        ("CRS", "84") | ("OGC", "84") => Crs::code("OGC", "CRS84"),
        ("CRS", "84h") => Crs::code("OGC", "CRS84h"),
        _ => Crs::code(authority, code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_codes() {
        assert_eq!(parse_srs_name("EPSG:4326"), Crs::epsg(4326));
        assert_eq!(parse_srs_name("epsg:3857"), Crs::epsg(3857));
    }

    #[test]
    fn parses_urns() {
        assert_eq!(parse_srs_name("urn:ogc:def:crs:EPSG::4326"), Crs::epsg(4326));
        assert_eq!(parse_srs_name("urn:ogc:def:crs:EPSG:6.6:4326"), Crs::epsg(4326));
        assert_eq!(parse_srs_name("urn:x-ogc:def:crs:EPSG:4326"), Crs::epsg(4326));
        assert_eq!(
            parse_srs_name("urn:ogc:def:crs:OGC:1.3:CRS84"),
            Crs::code("OGC", "CRS84")
        );
    }

    #[test]
    fn parses_urls() {
        assert_eq!(
            parse_srs_name("http://www.opengis.net/gml/srs/epsg.xml#4326"),
            Crs::epsg(4326)
        );
        assert_eq!(
            parse_srs_name("http://www.opengis.net/def/crs/EPSG/0/28992"),
            Crs::epsg(28992)
        );
    }

    #[test]
    fn normalizes_crs84() {
        assert_eq!(parse_srs_name("CRS:84"), Crs::code("OGC", "CRS84"));
    }

    #[test]
    fn keeps_unrecognized_names() {
        assert_eq!(
            parse_srs_name("my local grid"),
            Crs::Named("my local grid".to_string())
        );
        assert_eq!(
            parse_srs_name("urn:ogc:def:crs:EPSG::"),
            Crs::Named("urn:ogc:def:crs:EPSG::".to_string())
        );
    }
}
