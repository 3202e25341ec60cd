use std::collections::BTreeSet;

use kit::hcl::expr::Expression;
use kit::hcl::structure::{Attribute, Block, Body, Structure};
use kit::hcl::Span;
use kit::helpers::hcl::{collect_body_roots, collect_expression_roots, visit_label, TraversalRoot};
use kit::indexmap::IndexMap;
use kit::{ResourceRef, Value};

use crate::errors::EvalError;
use crate::graph::dependency_graph::DependencyGraph;
use crate::graph::ResourceGraph;

use super::eval::HclContext;
use super::scope::Scope;

/// Top-level blocks accepted and skipped.
const IGNORED_BLOCKS: &[&str] = &["terraform", "provider"];

enum Declaration<'b> {
    Local(&'b Attribute),
    Resource { resource_type: String, name: String, block: &'b Block },
}

/// Declarations of a document grouped by kind, in source order.
#[derive(Default)]
struct Declarations<'b> {
    variables: IndexMap<String, &'b Block>,
    nodes: IndexMap<String, Declaration<'b>>,
    outputs: IndexMap<String, &'b Block>,
}

impl<'b> Declarations<'b> {
    fn collect(ctx: &HclContext, body: &'b Body) -> Result<Self, EvalError> {
        let mut declarations = Declarations::default();
        for structure in body.iter() {
            let block = match structure {
                Structure::Block(block) => block,
                Structure::Attribute(attribute) => {
                    return Err(EvalError::unsupported(format!(
                        "top-level attribute '{}'",
                        attribute.key.as_str()
                    ))
                    .or_position(ctx.position_of(attribute)));
                }
            };
            let position = ctx.position_of(&block.ident);
            let label = |index: usize, name: &str| {
                visit_label(index, name, block)
                    .map_err(|e| EvalError::type_error(format!("{} block: {}", block.ident.as_str(), e)).or_position(position))
            };
            match block.ident.as_str() {
                "variable" => {
                    let name = label(0, "name")?;
                    if declarations.variables.insert(name.clone(), block).is_some() {
                        return Err(EvalError::duplicate_declaration(format!("var.{}", name)).or_position(position));
                    }
                }
                "locals" => {
                    for attribute in block.body.attributes() {
                        let key = format!("local.{}", attribute.key.as_str());
                        if declarations.nodes.contains_key(&key) {
                            return Err(EvalError::duplicate_declaration(key).or_position(ctx.position_of(attribute)));
                        }
                        declarations.nodes.insert(key, Declaration::Local(attribute));
                    }
                }
                "resource" => {
                    let resource_type = label(0, "type")?;
                    let name = label(1, "name")?;
                    let key = format!("{}.{}", resource_type, name);
                    if declarations.nodes.contains_key(&key) {
                        return Err(EvalError::duplicate_declaration(key).or_position(position));
                    }
                    declarations.nodes.insert(key, Declaration::Resource { resource_type, name, block });
                }
                "output" => {
                    let name = label(0, "name")?;
                    if declarations.outputs.insert(name.clone(), block).is_some() {
                        return Err(EvalError::duplicate_declaration(format!("output.{}", name)).or_position(position));
                    }
                }
                ident if IGNORED_BLOCKS.contains(&ident) => {
                    tracing::trace!(block = ident, "ignoring top-level block");
                }
                "data" | "module" => {
                    return Err(EvalError::unsupported(format!("'{}' blocks", block.ident.as_str())).or_position(position));
                }
                other => {
                    return Err(EvalError::unsupported(format!("unknown block type '{}'", other)).or_position(position));
                }
            }
        }
        Ok(declarations)
    }

    fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (key, declaration) in self.nodes.iter() {
            let span = match declaration {
                Declaration::Local(attribute) => attribute.span(),
                Declaration::Resource { block, .. } => block.ident.span(),
            };
            graph.add_node(key.as_str(), span);
        }
        for (key, declaration) in self.nodes.iter() {
            let roots = match declaration {
                Declaration::Local(attribute) => collect_expression_roots(&attribute.value),
                Declaration::Resource { block, .. } => collect_body_roots(&block.body),
            };
            for root in roots.iter().filter_map(declaration_key) {
                graph.add_edge(key, root);
            }
        }
        graph
    }
}

/// Declaration a traversal root may point at: `local.x` or `TYPE.NAME`.
fn declaration_key(root: &TraversalRoot) -> Option<String> {
    if root.root == "var" {
        return None;
    }
    root.first_attr().map(|attr| format!("{}.{}", root.root, attr))
}

/// Evaluates a parsed document into a finalized resource graph.
pub(crate) fn evaluate_body(mut ctx: HclContext, body: &Body) -> Result<ResourceGraph, EvalError> {
    let declarations = Declarations::collect(&ctx, body)?;

    for (name, block) in declarations.variables.iter() {
        let value = match ctx.bindings.get(name) {
            Some(bound) => Some(bound.clone()),
            None => match block.body.get_attribute("default") {
                Some(default) => Some(ctx.eval(&default.value, &Scope::root())?),
                None => None,
            },
        };
        match value {
            Some(value) => {
                ctx.variables.insert(name.clone(), value);
            }
            None => tracing::debug!(variable = name.as_str(), "variable has no value"),
        }
    }

    let dependencies = declarations.dependency_graph();
    let order = dependencies.evaluation_order().map_err(|cycle| {
        let members = cycle
            .iter()
            .take(cycle.len().saturating_sub(1))
            .filter_map(|name| {
                let span = dependencies.get_span(name)?;
                Some((name.clone(), ctx.mapper.span_to_position(span)))
            })
            .collect();
        let position = cycle
            .first()
            .and_then(|first| declarations.nodes.get(first))
            .and_then(|declaration| match declaration {
                Declaration::Local(attribute) => ctx.position_of(*attribute),
                Declaration::Resource { block, .. } => ctx.position_of(&block.ident),
            });
        EvalError::CyclicDependency { cycle, members, position }
    })?;

    let mut graph = ResourceGraph::new();
    for key in order.iter() {
        let Some(declaration) = declarations.nodes.get(key) else { continue };
        match declaration {
            Declaration::Local(attribute) => {
                let value = ctx.eval(&attribute.value, &Scope::root())?;
                tracing::trace!(local = key.as_str(), "evaluated local");
                ctx.locals.insert(attribute.key.as_str().to_string(), value);
            }
            Declaration::Resource { resource_type, name, block } => {
                let handle = expand_resource(&ctx, &mut graph, resource_type, name, block)
                    .map_err(|e| e.or_position(ctx.position_of(&block.ident)))?;
                ctx.resources.entry(resource_type.clone()).or_default().insert(name.clone(), handle);
            }
        }
    }

    for (name, block) in declarations.outputs.iter() {
        let Some(attribute) = block.body.get_attribute("value") else {
            return Err(EvalError::type_error(format!("output '{}' requires a 'value'", name))
                .or_position(ctx.position_of(&block.ident)));
        };
        let value = ctx.eval(&attribute.value, &Scope::root())?;
        graph.set_output(name, value).map_err(|e| EvalError::from(e).or_position(ctx.position_of(&block.ident)))?;
    }

    graph.finalize();
    tracing::debug!(resources = graph.len(), outputs = graph.outputs().len(), "evaluated hcl document");
    Ok(graph)
}

/// Adds every instance of a resource block to the graph and returns the
/// value other expressions see for `TYPE.NAME`.
fn expand_resource(
    ctx: &HclContext,
    graph: &mut ResourceGraph,
    resource_type: &str,
    name: &str,
    block: &Block,
) -> Result<Value, EvalError> {
    let count = block.body.get_attribute("count");
    let for_each = block.body.get_attribute("for_each");
    let depends_on = block.body.get_attribute("depends_on").map(|attribute| &attribute.value);

    match (count, for_each) {
        (Some(_), Some(_)) => Err(EvalError::type_error(format!(
            "{}.{} cannot use both 'count' and 'for_each'",
            resource_type, name
        ))),
        (Some(count), None) => {
            let value = ctx.eval(&count.value, &Scope::root())?;
            let n = ctx.expect_number(&value).map_err(|e| e.or_position(ctx.position_of(&count.value)))?;
            if n < 0.0 || n.fract() != 0.0 {
                return Err(EvalError::type_error(format!("count must be a non-negative whole number, got {}", value))
                    .or_position(ctx.position_of(&count.value)));
            }
            let mut handles = vec![];
            for index in 0..n as usize {
                let mut scope = Scope::root();
                let mut handle = IndexMap::new();
                handle.insert("index".to_string(), Value::number(index as f64));
                scope.bind("count", Value::map(handle));
                let instance = format!("{}[{}]", name, index);
                handles.push(add_instance(ctx, graph, resource_type, &instance, block, depends_on, &scope)?);
            }
            Ok(Value::list(handles))
        }
        (None, Some(for_each)) => {
            let value = ctx.eval(&for_each.value, &Scope::root())?;
            let entries = for_each_entries(value).map_err(|e| e.or_position(ctx.position_of(&for_each.value)))?;
            let mut handles = IndexMap::new();
            for (key, each_value) in entries {
                let mut scope = Scope::root();
                let mut handle = IndexMap::new();
                handle.insert("key".to_string(), Value::string(key.clone()));
                handle.insert("value".to_string(), each_value);
                scope.bind("each", Value::map(handle));
                let instance = format!("{}[\"{}\"]", name, key);
                let reference = add_instance(ctx, graph, resource_type, &instance, block, depends_on, &scope)?;
                handles.insert(key, reference);
            }
            Ok(Value::map(handles))
        }
        (None, None) => add_instance(ctx, graph, resource_type, name, block, depends_on, &Scope::root()),
    }
}

fn add_instance(
    ctx: &HclContext,
    graph: &mut ResourceGraph,
    resource_type: &str,
    instance: &str,
    block: &Block,
    depends_on: Option<&Expression>,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let attributes = ctx.eval_resource_body(resource_type, &block.body, scope)?;
    let mut explicit = BTreeSet::new();
    if let Some(depends_on) = depends_on {
        let value = ctx.eval(depends_on, scope)?;
        explicit.extend(value.collect_references().into_iter().map(|r| r.target.clone()));
    }
    let resource = graph.add_resource_with_dependencies(resource_type, instance, attributes, explicit)?;
    Ok(Value::reference(ResourceRef::new(resource.id.clone())))
}

/// `for_each` accepts a map, or a list of strings used as both key and value.
fn for_each_entries(value: Value) -> Result<Vec<(String, Value)>, EvalError> {
    match value {
        Value::Map(entries) => Ok(entries.into_iter().collect()),
        Value::List(items) => {
            let mut entries: IndexMap<String, Value> = IndexMap::new();
            for item in items {
                let Value::String(key) = item else {
                    return Err(EvalError::type_error(format!(
                        "for_each over a list requires strings, got {}",
                        item.type_name()
                    )));
                };
                entries.insert(key.clone(), Value::string(key));
            }
            Ok(entries.into_iter().collect())
        }
        Value::Null => Ok(vec![]),
        other => Err(EvalError::type_error(format!(
            "for_each requires a map or a list of strings, got {}",
            other.type_name()
        ))),
    }
}
