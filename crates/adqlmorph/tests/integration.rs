//! Black-box integration tests for adqlmorph
//!
//! These tests exercise the full pipeline: annotated tree → passes → SQL.

use adqlmorph::ast::{
    AccessorKind, BinOp, ColumnRef, CompOp, DerivedTable, FieldInfo, FunctionCall, GeometryCtor,
    GeometryFunction, GeometryFunctionKind, GeometryPredicate, JoinKind, JoinSpec, PointAccessor,
    SelectItem, SetOp, TableRef, UnaryOp,
};
use adqlmorph::geom::SPoint;
use adqlmorph::{
    DialectConfig, DialectError, DialectMorph, Expr, Geometry, PLANAR_AREA_WARNING, Pipeline,
    Query, SpatialIndexPass, Statement, StcsValue, compile, morph, parse_stcs, rotation,
};

fn select(items: Vec<Expr>) -> Query {
    Query::new(
        items.into_iter().map(SelectItem::expr).collect(),
        vec![TableRef::table("gaia.source")],
    )
}

fn select_where(condition: Expr) -> Statement {
    Query::new(vec![SelectItem::Star(None)], vec![TableRef::table("gaia.source")])
        .with_where(condition)
        .into()
}

fn icrs_point() -> Expr {
    Expr::Geometry(GeometryCtor::point(
        Some("ICRS"),
        Expr::column("ra"),
        Expr::column("dec"),
    ))
}

fn icrs_circle() -> Expr {
    Expr::Geometry(GeometryCtor::circle(
        Some("ICRS"),
        Expr::number(10),
        Expr::number(20),
        Expr::number("0.5"),
    ))
}

fn is_true(predicate: GeometryPredicate) -> Expr {
    Expr::number(1).compare(CompOp::Eq, Expr::Predicate(predicate))
}

fn sql(statement: Statement) -> String {
    morph(statement).unwrap().sql
}

// ============ Spatial index fast path ============

#[test]
fn contains_circle_uses_index() {
    let statement = select_where(is_true(GeometryPredicate::contains(
        icrs_point(),
        icrs_circle(),
    )));
    assert_eq!(
        sql(statement),
        "SELECT * FROM gaia.source WHERE q3c_join(ra, dec, 10, 20, 0.5)"
    );
}

#[test]
fn contains_box_uses_index_polygon() {
    let rect = Expr::Geometry(GeometryCtor::boxed(
        Some("ICRS"),
        Expr::number(10),
        Expr::number(20),
        Expr::number(4),
        Expr::number(2),
    ));
    let statement = select_where(is_true(GeometryPredicate::contains(icrs_point(), rect)));
    assert_eq!(
        sql(statement),
        "SELECT * FROM gaia.source WHERE q3c_poly_query(ra, dec, ARRAY[8, 19, 8, 21, 12, 21, 12, 19])"
    );
}

#[test]
fn reversed_pass_order_loses_the_index() {
    let statement = select_where(is_true(GeometryPredicate::contains(
        icrs_point(),
        icrs_circle(),
    )));
    let config = DialectConfig::default();
    let reversed = Pipeline::new()
        .then(DialectMorph::new(&config))
        .then(SpatialIndexPass::new(&config));

    let out = reversed.render(statement).unwrap().sql;
    assert!(!out.contains("q3c"), "{out}");
    assert_eq!(
        out,
        "SELECT * FROM gaia.source WHERE (POINT(ra, dec)) ~ (CIRCLE(POINT(10, 20), 0.5))"
    );
}

#[test]
fn disabling_the_index_uses_operators() {
    let statement = select_where(is_true(GeometryPredicate::contains(
        icrs_point(),
        icrs_circle(),
    )));
    let config = DialectConfig::default().with_spatial_index(false);
    let out = compile(statement, &config).unwrap().sql;
    assert!(out.ends_with("WHERE (POINT(ra, dec)) ~ (CIRCLE(POINT(10, 20), 0.5))"));
}

#[test]
fn false_comparison_negates() {
    let statement = select_where(Expr::number(0).compare(
        CompOp::Eq,
        Expr::Predicate(GeometryPredicate::contains(icrs_point(), icrs_circle())),
    ));
    assert_eq!(
        sql(statement),
        "SELECT * FROM gaia.source WHERE NOT (q3c_join(ra, dec, 10, 20, 0.5))"
    );
}

#[test]
fn predicate_against_other_numbers_fails() {
    let statement = select_where(Expr::number(2).compare(
        CompOp::Eq,
        Expr::Predicate(GeometryPredicate::contains(icrs_point(), icrs_circle())),
    ));
    assert!(matches!(
        morph(statement),
        Err(DialectError::PredicateComparison { .. })
    ));
}

#[test]
fn predicate_in_select_list_leaves_where_alone() {
    let inside = || {
        let circle = GeometryCtor::circle(
            Some("ICRS"),
            Expr::number(10),
            Expr::number(20),
            Expr::number(1),
        );
        SelectItem::aliased(
            Expr::Predicate(GeometryPredicate::contains(
                Expr::column("pos"),
                Expr::Geometry(circle),
            )),
            "inside",
        )
    };
    let with_where = |condition: Expr| -> Statement {
        Query::new(vec![inside()], vec![TableRef::table("gaia.source")])
            .with_where(condition)
            .into()
    };

    assert_eq!(
        sql(with_where(Expr::column("flag").compare(CompOp::Eq, Expr::number(1)))),
        "SELECT (pos) ~ (CIRCLE(POINT(10, 20), 1)) AS inside FROM gaia.source WHERE flag = 1"
    );
    assert_eq!(
        sql(with_where(Expr::column("mag").compare(CompOp::Lt, Expr::number(12)))),
        "SELECT (pos) ~ (CIRCLE(POINT(10, 20), 1)) AS inside FROM gaia.source WHERE mag < 12"
    );
}

#[test]
fn bare_and_negated_predicates() {
    let contains = || Expr::Predicate(GeometryPredicate::contains(icrs_point(), icrs_circle()));
    assert_eq!(
        sql(select_where(contains())),
        "SELECT * FROM gaia.source WHERE q3c_join(ra, dec, 10, 20, 0.5)"
    );
    assert_eq!(
        sql(select_where(Expr::Unary(UnaryOp::Not, Box::new(contains())))),
        "SELECT * FROM gaia.source WHERE NOT q3c_join(ra, dec, 10, 20, 0.5)"
    );
    let wrapped = Expr::number(1).compare(CompOp::Eq, contains());
    assert_eq!(
        sql(select_where(Expr::Unary(UnaryOp::Not, Box::new(wrapped)))),
        "SELECT * FROM gaia.source WHERE NOT q3c_join(ra, dec, 10, 20, 0.5)"
    );
}

#[test]
fn unrelated_comparison_between_two_predicates() {
    let other = Expr::Geometry(GeometryCtor::circle(
        Some("ICRS"),
        Expr::number(1),
        Expr::number(2),
        Expr::number(3),
    ));
    let condition = is_true(GeometryPredicate::contains(icrs_point(), icrs_circle()))
        .binop(
            BinOp::And,
            Expr::column("mag").compare(CompOp::Lt, Expr::number(12)),
        )
        .binop(
            BinOp::And,
            is_true(GeometryPredicate::intersects(other, icrs_circle())),
        );
    assert_eq!(
        sql(select_where(condition)),
        "SELECT * FROM gaia.source WHERE (q3c_join(ra, dec, 10, 20, 0.5) AND (mag < 12)) \
         AND (CIRCLE(POINT(1, 2), 3)) ?# (CIRCLE(POINT(10, 20), 0.5))"
    );
}

#[test]
fn double_negation_survives_compilation() {
    let neg = |e: Expr| Expr::Unary(UnaryOp::Neg, Box::new(e));
    let query = select(vec![neg(neg(Expr::column("ra")))])
        .with_where(Expr::column("mag").compare(CompOp::Lt, Expr::number(12)));
    assert_eq!(
        sql(query.into()),
        "SELECT -(-ra) FROM gaia.source WHERE mag < 12"
    );
}

#[test]
fn crossmatch_join_condition() {
    let qualified = |table: &str, name: &str| {
        Expr::Column(ColumnRef {
            qualifier: Some(table.into()),
            ..ColumnRef::new(name)
        })
    };
    let condition = is_true(GeometryPredicate::contains(
        Expr::Geometry(GeometryCtor::point(
            Some("ICRS"),
            qualified("a", "ra"),
            qualified("a", "dec"),
        )),
        Expr::Geometry(GeometryCtor::circle(
            Some("ICRS"),
            qualified("b", "ra"),
            qualified("b", "dec"),
            Expr::number("0.01"),
        )),
    ));
    let join = TableRef::Join {
        left: Box::new(TableRef::Table {
            name: "gaia.source".into(),
            alias: Some("a".into()),
        }),
        kind: JoinKind::Inner,
        right: Box::new(TableRef::Table {
            name: "twomass.psc".into(),
            alias: Some("b".into()),
        }),
        spec: JoinSpec::On(condition),
    };
    let query = Query::new(vec![SelectItem::Star(None)], vec![join]);
    assert_eq!(
        sql(query.into()),
        "SELECT * FROM gaia.source AS a JOIN twomass.psc AS b \
         ON q3c_join(a.ra, a.dec, b.ra, b.dec, 0.01)"
    );
}

// ============ Geometry ============

#[test]
fn polygon_with_column_is_rejected() {
    let poly = GeometryCtor::polygon(
        Some("ICRS"),
        vec![
            Expr::number(0),
            Expr::number(0),
            Expr::column("ra"),
            Expr::number(0),
            Expr::number(1),
            Expr::number(1),
        ],
    );
    let result = morph(select(vec![Expr::Geometry(poly)]).into());
    assert_eq!(
        result,
        Err(DialectError::NonLiteralPolygon {
            argument: "ra".into()
        })
    );
}

#[test]
fn literal_polygon_succeeds() {
    let coords = ["0", "0", "1", "0", "1", "1"].map(Expr::number).to_vec();
    let poly = GeometryCtor::polygon(Some("ICRS"), coords);
    assert_eq!(
        sql(select(vec![Expr::Geometry(poly)]).into()),
        "SELECT '((0, 0), (1, 0), (1, 1))'::polygon FROM gaia.source"
    );
}

#[test]
fn intersects_conforms_frames() {
    let galactic = Expr::Geometry(GeometryCtor::circle(
        Some("GALACTIC"),
        Expr::number(1),
        Expr::number(2),
        Expr::number(3),
    ));
    let statement = select_where(is_true(GeometryPredicate::intersects(
        galactic,
        icrs_circle(),
    )));
    let out = sql(statement);
    assert!(
        out.contains("WHERE ((CIRCLE(POINT(1, 2), 3) - strans("),
        "{out}"
    );
    assert!(out.ends_with("?# (CIRCLE(POINT(10, 20), 0.5))"), "{out}");
}

#[test]
fn point_accessors() {
    let point = || {
        Box::new(Expr::Geometry(GeometryCtor::point(
            Some("GALACTIC"),
            Expr::number(1),
            Expr::number(2),
        )))
    };
    let annotated = Expr::Column(ColumnRef::new("pos").with_field(FieldInfo {
        coord_system: Some("FK5 J2000".into()),
        ..FieldInfo::default()
    }));
    let items = vec![
        Expr::Accessor(PointAccessor {
            kind: AccessorKind::Coord1,
            arg: point(),
        }),
        Expr::Accessor(PointAccessor {
            kind: AccessorKind::Coordsys,
            arg: point(),
        }),
        Expr::Accessor(PointAccessor {
            kind: AccessorKind::Coordsys,
            arg: Box::new(annotated),
        }),
        Expr::Accessor(PointAccessor {
            kind: AccessorKind::Coordsys,
            arg: Box::new(Expr::column("mystery")),
        }),
    ];
    assert_eq!(
        sql(select(items).into()),
        "SELECT (POINT(1, 2))[0], 'GALACTIC', 'FK5J2000', 'unknown' FROM gaia.source"
    );
}

#[test]
fn centroid_keeps_frame_for_coordsys() {
    let centroid = Expr::GeometryFunction(GeometryFunction {
        kind: GeometryFunctionKind::Centroid,
        args: vec![Expr::Geometry(GeometryCtor::circle(
            Some("FK5"),
            Expr::number(1),
            Expr::number(2),
            Expr::number(3),
        ))],
    });
    let coordsys = Expr::Accessor(PointAccessor {
        kind: AccessorKind::Coordsys,
        arg: Box::new(centroid),
    });
    assert_eq!(
        sql(select(vec![coordsys]).into()),
        "SELECT 'FK5' FROM gaia.source"
    );
}

#[test]
fn distance_forms() {
    let two = Expr::GeometryFunction(GeometryFunction {
        kind: GeometryFunctionKind::Distance,
        args: vec![icrs_point(), icrs_point()],
    });
    let four = Expr::GeometryFunction(GeometryFunction {
        kind: GeometryFunctionKind::Distance,
        args: vec![
            Expr::column("ra"),
            Expr::column("dec"),
            Expr::number(10),
            Expr::number(20),
        ],
    });
    assert_eq!(
        sql(select(vec![two, four]).into()),
        "SELECT celDistPP(POINT(ra, dec), POINT(ra, dec)), celDistDD(ra, dec, 10, 20) \
         FROM gaia.source"
    );
}

#[test]
fn area_passes_through_with_warning() {
    let area = Expr::GeometryFunction(GeometryFunction {
        kind: GeometryFunctionKind::Area,
        args: vec![icrs_circle()],
    });
    let compiled = morph(select(vec![area]).into()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT AREA(CIRCLE(POINT(10, 20), 0.5)) FROM gaia.source"
    );
    assert_eq!(compiled.warnings, vec![PLANAR_AREA_WARNING.to_string()]);
}

#[test]
fn region_is_unsupported() {
    let region = Expr::GeometryFunction(GeometryFunction {
        kind: GeometryFunctionKind::Region,
        args: vec![Expr::string("Circle ICRS 10 20 1")],
    });
    assert_eq!(
        morph(select(vec![region]).into()),
        Err(DialectError::Unsupported {
            feature: "REGION".into()
        })
    );
}

// ============ Numeric functions ============

#[test]
fn numeric_functions() {
    let call = |name: &str, args: Vec<Expr>| Expr::Function(FunctionCall::new(name, args));
    let items = vec![
        call("LOG", vec![Expr::column("x")]),
        call("LOG10", vec![Expr::column("x")]),
        call("TRUNCATE", vec![Expr::column("x")]),
        call("SQUARE", vec![Expr::column("x")]),
        call("RAND", vec![]),
        call("RAND", vec![Expr::number(7)]),
    ];
    assert_eq!(
        sql(select(items).into()),
        "SELECT LN(x), LOG(x), TRUNC(x), (x)^2, random(), setseed(7)-setseed(7)+random() \
         FROM gaia.source"
    );
}

#[test]
fn rand_with_two_arguments_fails() {
    let rand = Expr::Function(FunctionCall::new("RAND", vec![Expr::number(1), Expr::number(2)]));
    assert!(matches!(
        morph(select(vec![rand]).into()),
        Err(DialectError::Arity { got: 2, .. })
    ));
}

// ============ Statements ============

#[test]
fn all_quantifier_becomes_offset_zero() {
    let query = Query {
        quantifier: Some("ALL".into()),
        limit: Some(100),
        ..select(vec![Expr::column("ra")])
    };
    let out = sql(query.into());
    assert_eq!(out, "SELECT ra FROM gaia.source LIMIT 100 OFFSET 0");
    assert!(!out.contains("ALL"));
}

#[test]
fn derived_table_is_flattened() {
    let inner = Query {
        top: Some(5),
        ..Query::new(
            vec![SelectItem::expr(Expr::column("ra"))],
            vec![TableRef::table("gaia.source")],
        )
    };
    let outer = Query::new(
        vec![SelectItem::Star(None)],
        vec![TableRef::Derived(DerivedTable {
            statement: Box::new(inner.into()),
            name: "sub".into(),
        })],
    );
    assert_eq!(
        sql(outer.into()),
        "SELECT * FROM (SELECT ra FROM gaia.source LIMIT 5) AS sub"
    );
}

#[test]
fn set_operations_parenthesize_operands() {
    let lhs = Query {
        top: Some(1),
        ..select(vec![Expr::column("ra")])
    };
    let rhs = Query::new(
        vec![SelectItem::expr(Expr::column("ra"))],
        vec![TableRef::table("twomass.psc")],
    );
    let statement = Statement::SetOperation {
        op: SetOp::Union,
        all: true,
        lhs: Box::new(lhs.into()),
        rhs: Box::new(rhs.into()),
    };
    assert_eq!(
        sql(statement),
        "(SELECT ra FROM gaia.source LIMIT 1) UNION ALL (SELECT ra FROM twomass.psc)"
    );
}

#[test]
fn scalar_subquery_is_flattened() {
    let inner = Query {
        top: Some(1),
        ..select(vec![Expr::column("dec")])
    };
    let statement = select_where(
        Expr::column("dec").compare(CompOp::Gt, Expr::Subquery(Box::new(inner.into()))),
    );
    assert_eq!(
        sql(statement),
        "SELECT * FROM gaia.source WHERE dec > (SELECT dec FROM gaia.source LIMIT 1)"
    );
}

#[test]
fn statements_round_trip_through_json() {
    let statement = select_where(is_true(GeometryPredicate::contains(
        icrs_point(),
        icrs_circle(),
    )));
    let json = serde_json::to_string(&statement).unwrap();
    let back: Statement = serde_json::from_str(&json).unwrap();
    assert_eq!(sql(back), sql(statement));
}

// ============ Rotations ============

#[test]
fn identity_rotation_for_every_frame() {
    for frame in ["ICRS", "FK5", "GALACTIC", "ECLIPTIC", "RELOCATABLE", "UNKNOWNFrame", "BROKEN"] {
        assert_eq!(rotation(frame, frame).unwrap(), None, "{frame}");
    }
}

#[test]
fn icrs_fk5_round_trip_is_identity() {
    let there = rotation("ICRS", "FK5").unwrap();
    let back = rotation("FK5", "ICRS").unwrap();
    assert_eq!((there, back), (None, None));
}

#[test]
fn unknown_frame_is_an_error() {
    assert_eq!(
        rotation("ICRS", "MARS_C"),
        Err(DialectError::UnknownFrame {
            frame: "MARS_C".into()
        })
    );
}

// ============ STC-S ============

fn assert_degrees(point: SPoint, lon: f64, lat: f64) {
    let (x, y) = point.to_degrees();
    assert!((x - lon).abs() < 1e-9, "lon {x} != {lon}");
    assert!((y - lat).abs() < 1e-9, "lat {y} != {lat}");
}

fn concrete(text: &str) -> Geometry {
    match parse_stcs(text).unwrap() {
        StcsValue::Concrete(geometry) => geometry,
        other => panic!("expected a concrete geometry, got {other:?}"),
    }
}

#[test]
fn stcs_position() {
    let Geometry::Point(p) = concrete("position 10 20") else {
        panic!("expected a point");
    };
    assert_eq!(p, SPoint::from_degrees(10.0, 20.0));
}

#[test]
fn stcs_circle() {
    let Geometry::Circle(c) = concrete("circle 10 20 5") else {
        panic!("expected a circle");
    };
    assert_degrees(c.center, 10.0, 20.0);
    assert!((c.radius.to_degrees() - 5.0).abs() < 1e-9);
}

#[test]
fn stcs_box_corners() {
    let Geometry::Polygon(poly) = concrete("box 10 20 4 2") else {
        panic!("expected a polygon");
    };
    let expected = [(8.0, 19.0), (8.0, 21.0), (12.0, 21.0), (12.0, 19.0)];
    assert_eq!(poly.vertices.len(), 4);
    for (vertex, (lon, lat)) in poly.vertices.iter().zip(expected) {
        assert_degrees(*vertex, lon, lat);
    }
}

#[test]
fn stcs_polygon_triangle() {
    let Geometry::Polygon(poly) = concrete("polygon 0 0 1 0 1 1") else {
        panic!("expected a polygon");
    };
    assert_eq!(poly.vertices.len(), 3);
    assert_degrees(poly.vertices[2], 1.0, 1.0);
}

#[test]
fn stcs_frame_and_flavor() {
    let Geometry::Circle(_) = concrete("Circle ICRS GEOCENTER SPHERICAL2 10 20 5") else {
        panic!("expected a circle");
    };
    let err = parse_stcs("circle CARTESIAN3 10 20 5").unwrap_err();
    assert_eq!(err.literal, "circle CARTESIAN3 10 20 5");
}

#[test]
fn stcs_wrong_arity() {
    let err = parse_stcs("circle 10 20").unwrap_err();
    assert!(err.to_string().contains("expects 3"), "{err}");
}

#[test]
fn stcs_region_cannot_be_rendered() {
    let value = parse_stcs("NOT(position 1 2)").unwrap();
    let StcsValue::UnresolvedRegion(region) = &value else {
        panic!("expected a region placeholder");
    };
    assert_eq!(region.operands.len(), 1);

    let result = morph(select(vec![Expr::from(value)]).into());
    assert!(matches!(result, Err(DialectError::UnresolvedRegion { .. })));
}

#[test]
fn stcs_union_of_literals() {
    let value = parse_stcs("Union ICRS (Circle 1 2 3 Position 4 5)").unwrap();
    let StcsValue::UnresolvedRegion(region) = value else {
        panic!("expected a region placeholder");
    };
    assert_eq!(region.frame.as_deref(), Some("ICRS"));
    assert_eq!(region.operands.len(), 2);
}

#[test]
fn stcs_concrete_values_store_as_pgsphere() {
    let value = parse_stcs("Position 0 0").unwrap();
    assert_eq!(
        sql(select(vec![Expr::from(value)]).into()),
        "SELECT '(0, 0)'::spoint FROM gaia.source"
    );
}
