use kit::hcl::structure::{Block, Body, Structure};
use kit::helpers::hcl::{expression_as_ident, visit_label};
use kit::indexmap::IndexMap;
use kit::Value;

use crate::errors::EvalError;
use crate::provider::Nesting;

use super::eval::{iteration_entries, HclContext};
use super::scope::Scope;

/// Arguments interpreted by the evaluator rather than passed to the provider.
pub const META_ARGUMENTS: &[&str] = &["count", "for_each", "depends_on", "provider"];
/// Blocks that configure the resource lifecycle rather than its state.
pub const META_BLOCKS: &[&str] = &["lifecycle", "provisioner", "connection"];

impl<'a> HclContext<'a> {
    /// Attributes of a resource instance. Nested blocks become lists of
    /// maps, or a single map when the provider declares the block with
    /// single nesting.
    pub(crate) fn eval_resource_body(
        &self,
        resource_type: &str,
        body: &Body,
        scope: &Scope,
    ) -> Result<IndexMap<String, Value>, EvalError> {
        let mut attributes = self.eval_body(body, scope, true)?;

        for (name, value) in attributes.iter_mut() {
            if self.schema.nesting_of(resource_type, name) != Nesting::Single {
                continue;
            }
            let Value::List(items) = value else { continue };
            if body.get_attribute(name).is_some() {
                continue;
            }
            let collapsed = match items.len() {
                0 => Value::Null,
                1 => items.remove(0),
                n => {
                    return Err(EvalError::type_error(format!(
                        "block '{}' of {} allows a single instance, found {}",
                        name, resource_type, n
                    ))
                    .or_position(body.get_blocks(name).next().and_then(|b| self.position_of(&b.ident))));
                }
            };
            *value = collapsed;
        }
        attributes.retain(|_, value| !value.is_null());
        Ok(attributes)
    }

    fn eval_body(
        &self,
        body: &Body,
        scope: &Scope,
        top_level: bool,
    ) -> Result<IndexMap<String, Value>, EvalError> {
        let mut attributes = IndexMap::new();
        let mut blocks: IndexMap<String, Vec<Value>> = IndexMap::new();

        for structure in body.iter() {
            match structure {
                Structure::Attribute(attribute) => {
                    let key = attribute.key.as_str();
                    if top_level && META_ARGUMENTS.contains(&key) {
                        continue;
                    }
                    let value = self.eval(&attribute.value, scope)?;
                    if !value.is_null() {
                        attributes.insert(key.to_string(), value);
                    }
                }
                Structure::Block(block) => {
                    let ident = block.ident.as_str();
                    if top_level && META_BLOCKS.contains(&ident) {
                        continue;
                    }
                    if ident == "dynamic" {
                        let (name, expanded) = self.expand_dynamic_block(block, scope)?;
                        blocks.entry(name).or_default().extend(expanded);
                    } else {
                        let nested = self.eval_body(&block.body, scope, false)?;
                        blocks.entry(ident.to_string()).or_default().push(Value::map(nested));
                    }
                }
            }
        }

        for (name, items) in blocks {
            if attributes.contains_key(&name) {
                let position = body.get_blocks(&name).next().and_then(|b| self.position_of(&b.ident));
                return Err(EvalError::duplicate_declaration(name).or_position(position));
            }
            attributes.insert(name, Value::list(items));
        }
        Ok(attributes)
    }

    /// Expands `dynamic "NAME" { for_each, iterator, content }` into one map
    /// per element. Dynamic blocks may nest inside `content`.
    fn expand_dynamic_block(&self, block: &Block, scope: &Scope) -> Result<(String, Vec<Value>), EvalError> {
        let position = self.position_of(&block.ident);
        let name = visit_label(0, "name", block)
            .map_err(|e| EvalError::type_error(format!("dynamic block: {}", e)).or_position(position))?;

        let Some(for_each) = block.body.get_attribute("for_each") else {
            return Err(EvalError::type_error(format!("dynamic block '{}' requires 'for_each'", name))
                .or_position(position));
        };
        let iterator = match block.body.get_attribute("iterator") {
            Some(attribute) => expression_as_ident(&attribute.value).map_err(|e| {
                EvalError::type_error(format!("dynamic block '{}' iterator: {}", name, e))
                    .or_position(self.position_of(&attribute.value))
            })?,
            None => name.clone(),
        };
        let Some(content) = block.body.get_blocks("content").next() else {
            return Err(EvalError::type_error(format!("dynamic block '{}' requires a 'content' block", name))
                .or_position(position));
        };

        let collection = self.eval(&for_each.value, scope)?;
        let entries = match collection {
            Value::Null => vec![],
            other => iteration_entries(other).map_err(|e| e.or_position(self.position_of(&for_each.value)))?,
        };

        let mut expanded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let mut frame = scope.child();
            let mut handle = IndexMap::new();
            handle.insert("key".to_string(), key);
            handle.insert("value".to_string(), value);
            frame.bind(iterator.clone(), Value::map(handle));
            expanded.push(Value::map(self.eval_body(&content.body, &frame, false)?));
        }
        Ok((name, expanded))
    }
}

#[cfg(test)]
mod tests {
    use kit::hcl::parser::parse_body;
    use kit::indexmap::indexmap;

    use super::*;
    use crate::bindings::BindingContext;
    use crate::errors::ErrorKind;
    use crate::provider::ProviderSchema;

    fn eval_resource(resource_type: &str, source: &str) -> Result<IndexMap<String, Value>, EvalError> {
        let body = parse_body(source).unwrap();
        let bindings = BindingContext::new().with(
            "ports",
            Value::list(vec![Value::number(80.0), Value::number(443.0)]),
        );
        let schema = ProviderSchema::builtin().unwrap();
        let ctx = HclContext::new(source, &bindings, &schema);
        ctx.eval_resource_body(resource_type, &body, &Scope::root())
    }

    #[test]
    fn test_static_and_dynamic_blocks_merge_in_source_order() {
        let attributes = eval_resource(
            "aws_security_group",
            r#"
            name = "web"
            ingress {
              from_port = 22
            }
            dynamic "ingress" {
              for_each = var.ports
              content {
                from_port = ingress.value
              }
            }
            "#,
        )
        .unwrap();
        let port = |n: f64| Value::map(indexmap! { "from_port".to_string() => Value::number(n) });
        assert_eq!(
            attributes["ingress"],
            Value::list(vec![port(22.0), port(80.0), port(443.0)])
        );
    }

    #[test]
    fn test_dynamic_block_with_iterator_and_nested_dynamic() {
        let attributes = eval_resource(
            "aws_security_group",
            r#"
            dynamic "ingress" {
              for_each = var.ports
              iterator = rule
              content {
                from_port = rule.value
                dynamic "tag" {
                  for_each = ["a", "b"]
                  content {
                    slot = "${rule.key}-${tag.value}"
                  }
                }
              }
            }
            "#,
        )
        .unwrap();
        let Value::List(rules) = &attributes["ingress"] else { panic!("expected list") };
        assert_eq!(rules.len(), 2);
        let Value::Map(second) = &rules[1] else { panic!("expected map") };
        assert_eq!(
            second["tag"],
            Value::list(vec![
                Value::map(indexmap! { "slot".to_string() => Value::string("1-a") }),
                Value::map(indexmap! { "slot".to_string() => Value::string("1-b") }),
            ])
        );
    }

    #[test]
    fn test_single_nesting_collapses_to_map() {
        let attributes = eval_resource(
            "aws_instance",
            r#"
            ami = "ami-1"
            root_block_device {
              volume_size = 20
            }
            "#,
        )
        .unwrap();
        assert_eq!(
            attributes["root_block_device"],
            Value::map(indexmap! { "volume_size".to_string() => Value::number(20.0) })
        );
    }

    #[test]
    fn test_repeated_single_block_is_rejected() {
        let err = eval_resource(
            "aws_instance",
            r#"
            root_block_device {
              volume_size = 20
            }
            root_block_device {
              volume_size = 30
            }
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn test_meta_arguments_and_nulls_are_dropped() {
        let attributes = eval_resource(
            "aws_s3_bucket",
            r#"
            count = 2
            bucket = "logs"
            acl = null
            lifecycle {
              prevent_destroy = true
            }
            "#,
        )
        .unwrap();
        assert_eq!(attributes, indexmap! { "bucket".to_string() => Value::string("logs") });
    }
}
