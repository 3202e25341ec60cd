//! Shared bindings used across equivalence tests

use parity_core::bindings::BindingContext;
use parity_kit::indexmap::IndexMap;
use parity_kit::Value;

fn record(fields: &[(&str, Value)]) -> Value {
    let map: IndexMap<String, Value> = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    Value::map(map)
}

/// Three instances with `id` and `private_ip`, spread over two subnets.
pub fn mock_instances() -> Value {
    Value::list(vec![
        record(&[("id", Value::string("i-0a1")), ("private_ip", Value::string("10.0.1.10"))]),
        record(&[("id", Value::string("i-0b2")), ("private_ip", Value::string("10.0.1.11"))]),
        record(&[("id", Value::string("i-0c3")), ("private_ip", Value::string("10.0.2.12"))]),
    ])
}

/// Subnets tagged with an availability zone, two of them in `a`.
pub fn zoned_subnets() -> Value {
    Value::list(vec![
        record(&[("az", Value::string("a")), ("id", Value::string("1"))]),
        record(&[("az", Value::string("a")), ("id", Value::string("2"))]),
        record(&[("az", Value::string("b")), ("id", Value::string("3"))]),
    ])
}

pub fn availability_zones() -> Value {
    Value::list(vec![Value::string("us-east-1a"), Value::string("us-east-1b"), Value::string("us-east-1c")])
}

/// Bindings holding `instances`, `subnets`, `azs`, `env` and `cidr`.
pub fn default_bindings() -> BindingContext {
    BindingContext::new()
        .with("instances", mock_instances())
        .with("subnets", zoned_subnets())
        .with("azs", availability_zones())
        .with("env", Value::string("prod"))
        .with("cidr", Value::string("10.0.0.0/16"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_instances_shape() {
        let instances = mock_instances();
        let list = instances.as_list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].as_map().unwrap()["private_ip"], Value::string("10.0.2.12"));
    }

    #[test]
    fn test_default_bindings() {
        let bindings = default_bindings();
        assert_eq!(bindings.len(), 5);
        assert_eq!(bindings.get("env"), Some(&Value::string("prod")));
    }
}
