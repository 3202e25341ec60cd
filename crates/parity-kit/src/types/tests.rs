use indexmap::indexmap;
use serde_json::json;
use test_case::test_case;

use super::value::{format_number, scan_placeholders, RefStep, ResourceId, ResourceRef, Value};

fn web_ref() -> ResourceRef {
    ResourceRef::new(ResourceId::new("aws_instance", "web"))
}

#[test]
fn map_equality_ignores_key_order() {
    let a = Value::map(indexmap! {
        "a".to_string() => Value::number(1.0),
        "b".to_string() => Value::string("x"),
    });
    let b = Value::map(indexmap! {
        "b".to_string() => Value::string("x"),
        "a".to_string() => Value::number(1.0),
    });
    assert_eq!(a, b);
}

#[test]
fn list_equality_respects_order() {
    let a = Value::list(vec![Value::number(1.0), Value::number(2.0)]);
    let b = Value::list(vec![Value::number(2.0), Value::number(1.0)]);
    assert_ne!(a, b);
}

#[test]
fn nan_equals_itself() {
    let nan = Value::number(f64::NAN);
    assert_eq!(nan, nan.clone());
    assert_eq!(Value::list(vec![nan.clone()]), Value::list(vec![nan.clone()]));
    assert_ne!(nan, Value::number(0.0));
}

#[test_case(3.0, "3")]
#[test_case(-12.0, "-12")]
#[test_case(0.5, "0.5")]
#[test_case(1.25, "1.25")]
fn numbers_render_without_trailing_fraction(value: f64, expected: &str) {
    assert_eq!(format_number(value), expected);
    assert_eq!(Value::number(value).to_template_string().unwrap(), expected);
}

#[test]
fn reference_renders_as_placeholder() {
    let reference = web_ref().attr("id");
    assert_eq!(reference.to_string(), "aws_instance.web.id");
    assert_eq!(Value::reference(reference).to_template_string().unwrap(), "${aws_instance.web.id}");

    let indexed = ResourceRef::new(ResourceId::new("aws_instance", "web[0]"))
        .with_step(RefStep::Attr("tags".into()))
        .with_step(RefStep::Key("Name".into()));
    assert_eq!(indexed.to_string(), "aws_instance.web[0].tags[\"Name\"]");
}

#[test]
fn collections_have_no_template_form() {
    assert_eq!(Value::list(vec![]).to_template_string(), None);
    assert_eq!(Value::Null.to_template_string(), None);
}

#[test]
fn json_conversion_preserves_insertion_order() {
    let value = Value::from_json(&json!({"z": 1, "a": [true, null, "s"]}));
    let keys: Vec<&String> = value.as_map().unwrap().keys().collect();
    assert_eq!(keys, vec!["z", "a"]);
    assert_eq!(serde_json::to_string(&value.to_json()).unwrap(), r#"{"z":1,"a":[true,null,"s"]}"#);
}

#[test]
fn collect_references_and_placeholders() {
    let value = Value::map(indexmap! {
        "subnet".to_string() => Value::reference(web_ref().attr("subnet_id")),
        "name".to_string() => Value::string("${aws_vpc.main.id}-suffix"),
        "nested".to_string() => Value::list(vec![Value::string("plain ${ aws_eip.ip.public_ip }")]),
    });
    let references = value.collect_references();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].target, ResourceId::new("aws_instance", "web"));
    assert_eq!(value.collect_placeholders(), vec!["aws_vpc.main.id", "aws_eip.ip.public_ip"]);
}

#[test]
fn scan_placeholders_handles_nesting_and_unterminated() {
    let found = scan_placeholders("a ${x.y} b ${f({})} c ${oops");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].1, "x.y");
    assert_eq!(found[0].0, 2..8);
    assert_eq!(found[1].1, "f({})");
}
