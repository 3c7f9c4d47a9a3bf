use std::cell::Cell;
use std::collections::HashMap;

use treemapper::{Mappable, Mapper, MapperError, MappingData, Result, Value};

#[derive(Clone, Debug, Default, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}
impl Mappable for Point {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
        data.map("x", &mut self.x)?;
        data.map("y", &mut self.y)
    }
}

#[test]
fn an_empty_mapping_misses_the_first_field() {
    let err = Mapper::new().read::<Point>(&Value::mapping()).unwrap_err();
    assert!(matches!(err, MapperError::MissingField { ref field } if field == "x"));
    assert_eq!(err.to_string(), "Missing field: x");
}

thread_local! {
    static FIELDS_VISITED: Cell<usize> = const { Cell::new(0) };
}

#[derive(Clone, Debug, Default)]
struct Counted {
    a: String,
    b: String,
    c: String,
}
impl Mappable for Counted {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
        FIELDS_VISITED.with(|n| n.set(n.get() + 1));
        data.map("a", &mut self.a)?;
        FIELDS_VISITED.with(|n| n.set(n.get() + 1));
        data.map("b", &mut self.b)?;
        FIELDS_VISITED.with(|n| n.set(n.get() + 1));
        data.map("c", &mut self.c)
    }
}

#[test]
fn reading_stops_at_the_first_failure() {
    let mut tree = Value::mapping();
    tree.insert("a", Value::from("ok"));
    tree.insert("b", Value::from(2));
    FIELDS_VISITED.with(|n| n.set(0));
    let err = Mapper::new().read::<Counted>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { ref field, expected: "text", found: "number" } if field == "b"));
    // "c" was never reached
    assert_eq!(FIELDS_VISITED.with(Cell::get), 2);
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Route {
    name: String,
    stops: Vec<Point>,
    labels: HashMap<String, Point>,
}
impl Mappable for Route {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
        data.map("name", &mut self.name)?;
        data.map("stops", &mut self.stops)?;
        data.map_or("labels", &mut self.labels, HashMap::new())
    }
}

fn point(x: i64, y: i64) -> Value {
    let mut tree = Value::mapping();
    tree.insert("x", Value::from(x));
    tree.insert("y", Value::from(y));
    tree
}

#[test]
fn nested_failures_name_their_path() {
    let mapper = Mapper::new();
    let mut broken = Value::mapping();
    broken.insert("x", Value::from(1));
    let mut tree = Value::mapping();
    tree.insert("name", Value::from("loop"));
    tree.insert("stops", Value::from(vec![point(0, 0), point(1, 1), broken]));
    let err = mapper.read::<Route>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::NestedDecodeFailure { .. }));
    assert_eq!(err.path().as_deref(), Some("stops[2].y"));
    assert!(matches!(err.root_cause(), MapperError::MissingField { field } if field == "y"));

    let mut labels = Value::mapping();
    labels.insert("home", Value::from("here"));
    tree.insert("stops", Value::from(vec![point(0, 0)]));
    tree.insert("labels", labels);
    let err = mapper.read::<Route>(&tree).unwrap_err();
    assert_eq!(err.path().as_deref(), Some("labels.home"));
    assert!(matches!(
        err.root_cause(),
        MapperError::TypeMismatch { expected: "mapping", found: "text", .. }
    ));
}

#[test]
fn shapes_that_do_not_fit_are_mismatches() {
    let mapper = Mapper::new();
    let mut tree = Value::mapping();
    tree.insert("name", Value::from("loop"));
    tree.insert("stops", Value::from("not a list"));
    let err = mapper.read::<Route>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { ref field, expected: "sequence", found: "text" } if field == "stops"));

    // null is not text
    tree.insert("name", Value::Null);
    let err = mapper.read::<Route>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { ref field, found: "null", .. } if field == "name"));

    // a fractional double is not an integer
    let mut fractional = point(0, 0);
    fractional.insert("y", Value::from(0.5));
    assert!(matches!(
        mapper.read::<Point>(&fractional),
        Err(MapperError::TypeMismatch { expected: "i64", .. })
    ));
}

#[test]
fn integral_doubles_read_as_integers() {
    let mut tree = Value::mapping();
    tree.insert("x", Value::from(3.0));
    tree.insert("y", Value::from(-4));
    assert_eq!(Mapper::new().read::<Point>(&tree).unwrap(), Point { x: 3, y: -4 });
}

#[test]
fn roots_must_be_mappings() {
    let mapper = Mapper::new();
    for tree in [Value::Null, Value::from(1), Value::from(vec![point(0, 0)])] {
        let err = mapper.read::<Point>(&tree).unwrap_err();
        assert!(matches!(err, MapperError::TypeMismatch { expected: "mapping", .. }));
        assert_eq!(err.path().as_deref(), Some("$"));
    }
}
