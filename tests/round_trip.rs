use fescodec::tree::{parse_document, to_xml_string};
use fescodec::{
    ArithmeticOp, BBox, Between, Color, Comparison, ComparisonOp, Crs, DistanceOp, Envelope,
    Expression, Filter, FilterCodecs, FilterError, GeometryLiteral, IsNil, Like, Literal,
    MatchAction, SpatialOp, TemporalOp, Version,
};
use geo_types::{point, polygon};

/// Encode, serialize, parse and decode again.
fn round_trip(codecs: &FilterCodecs, version: Version, filter: &Filter) -> Filter {
    let codec = codecs.codec(version);
    let element = codec.encoder().encode(filter).unwrap();
    let xml = to_xml_string(&element).unwrap();
    let document = parse_document(&xml).unwrap();
    codec
        .decoder()
        .decode(&document.root, Some(&document.namespaces))
        .unwrap_or_else(|e| panic!("{} failed to decode {}: {}", version, xml, e))
}

fn square() -> GeometryLiteral {
    GeometryLiteral::new(
        polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ],
        Some(Crs::epsg(4326)),
    )
}

/// Shapes every revision represents exactly.
fn common_shapes() -> Vec<Filter> {
    vec![
        Filter::equal("name", "Main St"),
        Filter::compare(
            ComparisonOp::GreaterOrEqual,
            Expression::property("lanes"),
            Expression::literal("two"),
        ),
        Filter::Between(Between {
            expression: Expression::property("class"),
            lower: Expression::literal("a"),
            upper: Expression::literal("f"),
        }),
        Filter::Like(Like::new("name", "Ma?n*")),
        Filter::IsNull(Expression::property("ref")),
        Filter::not(Filter::equal("kind", "track")),
        Filter::And(vec![
            Filter::equal("kind", "road"),
            Filter::Or(vec![Filter::equal("surface", "paved"), Filter::equal("surface", "gravel")]),
        ]),
        Filter::spatial(
            SpatialOp::Intersects,
            Expression::property("geom"),
            Expression::literal(square()),
        ),
        Filter::distance(
            DistanceOp::DWithin,
            Expression::property("geom"),
            Expression::literal(GeometryLiteral::new(point!(x: 1.5, y: 2.5), None)),
            100.0,
            "m",
        ),
        Filter::bbox("geom", -10.0, -5.0, 10.0, 5.0, None),
        Filter::bbox("geom", 1.0, 50.0, 2.0, 51.0, Some(Crs::epsg(4326))),
        Filter::ids(["road.1", "road.2", "road.3"]).unwrap(),
        Filter::compare(
            ComparisonOp::Equal,
            Expression::function("strToLowerCase", vec![Expression::property("name")]),
            Expression::literal("main st"),
        ),
        Filter::compare(
            ComparisonOp::Less,
            Expression::arithmetic(ArithmeticOp::Add, Expression::property("width"), Expression::property("margin")),
            Expression::property("limit"),
        ),
    ]
}

#[test]
fn common_shapes_round_trip_in_every_revision() {
    let codecs = FilterCodecs::default();
    for version in Version::ALL {
        for filter in common_shapes() {
            assert_eq!(round_trip(&codecs, version, &filter), filter, "revision {}", version);
        }
    }
}

#[test]
fn revision_2_0_shapes_round_trip() {
    let codecs = FilterCodecs::default();
    let mut comparison = Comparison::new(
        ComparisonOp::NotEqual,
        Expression::property("name"),
        Expression::literal("MAIN"),
    );
    comparison.match_case = false;
    comparison.match_action = MatchAction::One;

    let shapes = vec![
        Filter::Comparison(comparison),
        Filter::equal("lanes", 2.0),
        Filter::temporal(
            TemporalOp::During,
            Expression::property("observed"),
            Expression::literal(Literal::Period {
                begin: "2024-01-01T00:00:00Z".into(),
                end: "2024-06-30T00:00:00Z".into(),
            }),
        ),
        Filter::IsNil(IsNil {
            expression: Expression::property("height"),
            nil_reason: Some("missing".into()),
        }),
        Filter::BBox(BBox {
            left: None,
            right: Expression::literal(Envelope::from_extent(0.0, 0.0, 1.0, 1.0, None)),
        }),
        Filter::equal("{http://example.com/app}road/{http://example.com/app}name", "Main"),
        Filter::compare(
            ComparisonOp::Greater,
            Expression::arithmetic(ArithmeticOp::Div, Expression::property("length"), Expression::literal(2.0)),
            Expression::literal(10.5),
        ),
    ];
    for filter in shapes {
        assert_eq!(round_trip(&codecs, Version::V2_0_0, &filter), filter);
    }
}

#[test]
fn single_child_combinators_collapse() {
    let codecs = FilterCodecs::default();
    let inner = Filter::equal("kind", "road");
    for version in Version::ALL {
        let decoded = round_trip(&codecs, version, &Filter::And(vec![inner.clone()]));
        assert_eq!(decoded, inner);
    }
}

#[test]
fn nested_ids_round_trip_through_the_pseudo_property() {
    let codecs = FilterCodecs::default();
    let filter = Filter::And(vec![
        Filter::ids(["a", "b"]).unwrap(),
        Filter::equal("kind", "road"),
    ]);

    assert_eq!(round_trip(&codecs, Version::V1_0_0, &filter), filter);

    let expected = Filter::And(vec![
        Filter::Or(vec![Filter::equal("@id", "a"), Filter::equal("@id", "b")]),
        Filter::equal("kind", "road"),
    ]);
    assert_eq!(round_trip(&codecs, Version::V1_1_0, &filter), expected);
    assert_eq!(round_trip(&codecs, Version::V2_0_0, &filter), expected);
}

#[test]
fn adjacent_id_sets_round_trip_in_1_0() {
    let codecs = FilterCodecs::default();
    let and = Filter::And(vec![Filter::ids(["a"]).unwrap(), Filter::ids(["b"]).unwrap()]);
    assert_eq!(round_trip(&codecs, Version::V1_0_0, &and), and);

    let or = Filter::Or(vec![
        Filter::ids(["a"]).unwrap(),
        Filter::ids(["b"]).unwrap(),
        Filter::ids(["c", "d"]).unwrap(),
    ]);
    assert_eq!(round_trip(&codecs, Version::V1_0_0, &or), or);
}

#[test]
fn numeric_literals_are_typed_only_in_2_0() {
    let codecs = FilterCodecs::default();
    let filter = Filter::equal("lanes", 3.14);
    assert_eq!(round_trip(&codecs, Version::V2_0_0, &filter), filter);
    for version in [Version::V1_0_0, Version::V1_1_0] {
        assert_eq!(round_trip(&codecs, version, &filter), Filter::equal("lanes", "3.14"));
    }
}

#[test]
fn colors_decode_as_strings() {
    let codecs = FilterCodecs::default();
    let filter = Filter::equal("fill", Color::rgba(0, 255, 0, 128));
    for version in Version::ALL {
        assert_eq!(round_trip(&codecs, version, &filter), Filter::equal("fill", "#8000FF00"));
    }
}

#[test]
fn swapped_operands_encode_identically() {
    let codecs = FilterCodecs::default();
    for version in Version::ALL {
        let encoder = codecs.codec(version).encoder();
        let ordered = Filter::spatial(SpatialOp::Within, Expression::property("geom"), Expression::literal(square()));
        let swapped = Filter::spatial(SpatialOp::Within, Expression::literal(square()), Expression::property("geom"));
        assert_eq!(encoder.encode(&ordered).unwrap(), encoder.encode(&swapped).unwrap());
        assert_eq!(round_trip(&codecs, version, &swapped), ordered);
    }
}

#[test]
fn ambiguous_operands_fail_everywhere() {
    let codecs = FilterCodecs::default();
    let filter = Filter::spatial(
        SpatialOp::Touches,
        Expression::property("a"),
        Expression::property("b"),
    );
    for version in Version::ALL {
        let err = codecs.encode(version.token(), &filter).unwrap_err();
        assert!(matches!(err, FilterError::AmbiguousSpatialOperand { .. }));
    }
}

#[test]
fn temporal_predicates_need_2_0() {
    let codecs = FilterCodecs::default();
    let filter = Filter::temporal(
        TemporalOp::After,
        Expression::property("observed"),
        Expression::literal(Literal::Instant("2024-01-01".into())),
    );
    for token in ["1.0.0", "1.1.0"] {
        assert!(matches!(
            codecs.encode(token, &filter),
            Err(FilterError::UnsupportedFilterConstruct { .. })
        ));
    }
    assert!(codecs.encode("2.0.0", &filter).is_ok());
}

#[test]
fn decodes_handwritten_documents() {
    let codecs = FilterCodecs::default();

    let v10 = r#"<ogc:Filter xmlns:ogc="http://www.opengis.net/ogc" xmlns:gml="http://www.opengis.net/gml">
  <ogc:BBOX>
    <ogc:PropertyName>the_geom</ogc:PropertyName>
    <gml:Box srsName="http://www.opengis.net/gml/srs/epsg.xml#4326">
      <gml:coordinates>-75.1,39.9 -75.0,40.0</gml:coordinates>
    </gml:Box>
  </ogc:BBOX>
</ogc:Filter>"#;
    let document = parse_document(v10).unwrap();
    assert_eq!(
        codecs.decode("1.0.0", &document.root, None).unwrap(),
        Filter::bbox("the_geom", -75.1, 39.9, -75.0, 40.0, Some(Crs::epsg(4326)))
    );

    let v20 = r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:app="http://example.com/app">
  <fes:PropertyIsLike wildCard="%" singleChar="_" escapeChar="!" matchCase="false">
    <fes:ValueReference>app:name</fes:ValueReference>
    <fes:Literal>Ma%</fes:Literal>
  </fes:PropertyIsLike>
</fes:Filter>"#;
    let document = parse_document(v20).unwrap();
    let decoded = codecs
        .decode("2.0.0", &document.root, Some(&document.namespaces))
        .unwrap();
    assert_eq!(
        decoded,
        Filter::Like(Like {
            expression: Expression::property("{http://example.com/app}name"),
            pattern: "Ma%".into(),
            wildcard: "%".into(),
            single_char: "_".into(),
            escape: "!".into(),
            match_case: false,
        })
    );
}
