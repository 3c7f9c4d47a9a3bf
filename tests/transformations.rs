use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use treemapper::json::JsonSerializer;
use treemapper::transform::{CustomDateFormatTransformation, Rfc3339Transformation, TimestampTransformation};
use treemapper::{Mappable, Mapper, MapperError, MappingData, Result, Transformation, Value};

fn compact() -> CustomDateFormatTransformation {
    CustomDateFormatTransformation::new("%Y%m%d").unwrap()
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Invoice {
    number: u32,
    issued: NaiveDateTime,
    paid: Option<DateTime<Utc>>,
    due: Option<NaiveDateTime>,
}
impl Mappable for Invoice {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
        data.map("number", &mut self.number)?;
        data.map_with("issued", &mut self.issued, &compact())?;
        data.map_optional_with("paid", &mut self.paid, &Rfc3339Transformation)?;
        data.map_optional_with("due", &mut self.due, &compact())
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

#[test]
fn custom_date_format_round_trips_through_a_string() {
    let transformation = compact();
    let tree = transformation.transform_to(Some(&day(2016, 12, 31)));
    assert_eq!(tree, Value::from("20161231"));
    assert_eq!(transformation.transform_from(&tree), Some(day(2016, 12, 31)));
}

#[test]
fn transformed_fields_round_trip_through_json() {
    let invoice = Invoice {
        number: 17,
        issued: day(2016, 12, 31),
        paid: DateTime::from_timestamp(1_483_228_800, 0),
        due: None,
    };
    let mapper = Mapper::new();
    let tree = mapper.write(&invoice);
    assert_eq!(tree.get("issued"), Some(&Value::from("20161231")));
    assert_eq!(tree.get("paid"), Some(&Value::from("2017-01-01T00:00:00+00:00")));
    assert_eq!(tree.get("due"), Some(&Value::Null));

    let json = JsonSerializer::new();
    let data = json.serialize_object(&mapper, &invoice).unwrap();
    assert_eq!(json.deserialize_object::<Invoice>(&mapper, &data).unwrap(), invoice);
}

#[test]
fn optional_transformed_fields_may_be_absent() {
    let mut tree = Value::mapping();
    tree.insert("number", Value::from(1));
    tree.insert("issued", Value::from("20200229"));
    let invoice: Invoice = Mapper::new().read(&tree).unwrap();
    assert_eq!(invoice.issued, day(2020, 2, 29));
    assert_eq!(invoice.paid, None);
    assert_eq!(invoice.due, None);
}

#[test]
fn untransformable_values_fail_the_read() {
    let mapper = Mapper::new();
    let mut tree = Value::mapping();
    tree.insert("number", Value::from(1));
    let err = mapper.read::<Invoice>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::MissingField { ref field } if field == "issued"));

    tree.insert("issued", Value::from("31/12/2016"));
    let err = mapper.read::<Invoice>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { ref field, found: "text", .. } if field == "issued"));

    tree.insert("issued", Value::from("20161231"));
    tree.insert("paid", Value::from(12));
    let err = mapper.read::<Invoice>(&tree).unwrap_err();
    assert!(matches!(err, MapperError::TypeMismatch { ref field, found: "number", .. } if field == "paid"));
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Reading {
    taken: DateTime<Utc>,
}
impl Mappable for Reading {
    fn mapping<D: MappingData>(&mut self, data: &mut D) -> Result<()> {
        data.map_with("taken", &mut self.taken, &TimestampTransformation)
    }
}

#[test]
fn timestamps_survive_json() {
    let reading = Reading {
        taken: DateTime::from_timestamp(1_483_142_400, 500_000_000).unwrap(),
    };
    let mapper = Mapper::new();
    let json = JsonSerializer::new();
    let data = json.serialize_object(&mapper, &reading).unwrap();
    assert_eq!(String::from_utf8(data.clone()).unwrap(), r#"{"taken":1483142400.5}"#);
    assert_eq!(json.deserialize_object::<Reading>(&mapper, &data).unwrap(), reading);
}
