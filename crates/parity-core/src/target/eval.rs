use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use convert_case::{Boundary, Case, Casing};
use kit::helpers::location::Position;
use kit::indexmap::IndexMap;
use kit::types::value::format_number;
use kit::{RefStep, ResourceRef, Value};

use crate::bindings::BindingContext;
use crate::errors::EvalError;
use crate::graph::ResourceGraph;
use crate::provider::{Nesting, ProviderSchema};
use crate::std::functions::coerce_number;

use super::ast::{
    ArrowBody, ArrowFn, BinaryOp, Expr, ExprKind, ListItem, LogicalOp, Pattern, Prop, PropKey, Stmt, UnaryOp,
};

/// Package providing `Config`, `output`, `all` and `interpolate`.
pub const PULUMI_PACKAGE: &str = "@pulumi/pulumi";
const PROVIDER_PACKAGE_PREFIX: &str = "@pulumi/";

/// Built-in objects visible without an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Global {
    Object,
    Json,
    Math,
    String,
    Number,
    Boolean,
    Array,
    Console,
    Pulumi,
    /// `pulumi.Config`, only meaningful after `new`
    ConfigClass,
}

/// A provider package or one of its modules, e.g. `aws` or `aws.ec2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub provider: String,
    pub path: Vec<String>,
}

#[derive(Debug)]
pub struct Closure {
    pub function: Rc<ArrowFn>,
    pub env: Env,
}

/// Everything an expression can evaluate to. Only `Data` can be stored in
/// resource attributes.
#[derive(Debug, Clone)]
pub enum Runtime {
    Data(Value),
    Closure(Rc<Closure>),
    Namespace(Namespace),
    Config,
    Global(Global),
}

impl Runtime {
    pub fn null() -> Runtime {
        Runtime::Data(Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Runtime::Data(value) => value.type_name(),
            Runtime::Closure(_) => "function",
            Runtime::Namespace(_) => "namespace",
            Runtime::Config => "config",
            Runtime::Global(_) => "builtin object",
        }
    }

    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Runtime::Data(value) => Ok(value),
            other => Err(EvalError::type_error(format!("a {} cannot be used as a value", other.type_name()))),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Runtime::Data(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for Runtime {
    fn from(value: Value) -> Self {
        Runtime::Data(value)
    }
}

#[derive(Default)]
pub struct Frame {
    vars: RefCell<IndexMap<String, Runtime>>,
    parent: Option<Env>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("vars", &self.vars.borrow().keys().collect::<Vec<_>>()).finish()
    }
}

/// Lexical environment. Frames are shared by the closures created in them.
pub type Env = Rc<Frame>;

pub fn child_env(parent: &Env) -> Env {
    Rc::new(Frame { vars: RefCell::new(IndexMap::new()), parent: Some(parent.clone()) })
}

fn define(env: &Env, name: &str, value: Runtime) {
    env.vars.borrow_mut().insert(name.to_string(), value);
}

fn lookup(env: &Env, name: &str) -> Option<Runtime> {
    let mut frame = Some(env);
    while let Some(current) = frame {
        if let Some(value) = current.vars.borrow().get(name) {
            return Some(value.clone());
        }
        frame = current.parent.as_ref();
    }
    None
}

enum Flow {
    Normal,
    Return(Runtime),
}

/// `privateIp` -> `private_ip`. Keys starting with an uppercase letter or
/// containing anything other than ASCII letters, digits and `_` are kept.
pub fn snake_key(key: &str) -> String {
    let convertible = key.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && key.chars().any(|c| c.is_ascii_uppercase());
    if !convertible {
        return key.to_string();
    }
    snake_case(key)
}

/// Splits on case changes only, so `ec2` and `BucketV2` keep their digits.
pub fn snake_case(text: &str) -> String {
    text.with_boundaries(&[Boundary::LowerUpper, Boundary::Acronym]).to_case(Case::Snake)
}

fn snake_keys(value: Value) -> Value {
    match value {
        Value::Map(entries) => {
            Value::Map(entries.into_iter().map(|(key, value)| (snake_key(&key), snake_keys(value))).collect())
        }
        Value::List(items) => Value::List(items.into_iter().map(snake_keys).collect()),
        other => other,
    }
}

fn without_nulls(value: Value) -> Value {
    match value {
        Value::Map(mut entries) => {
            entries.retain(|_, v| !v.is_null());
            Value::Map(entries)
        }
        Value::List(items) => Value::List(items.into_iter().map(without_nulls).collect()),
        other => other,
    }
}

/// JavaScript truthiness over values.
pub fn truthy(value: &Runtime) -> bool {
    match value {
        Runtime::Data(Value::Null) => false,
        Runtime::Data(Value::Bool(b)) => *b,
        Runtime::Data(Value::Number(n)) => *n != 0.0 && !n.is_nan(),
        Runtime::Data(Value::String(s)) => !s.is_empty(),
        _ => true,
    }
}

fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_nan())
}

/// `String(value)` as JavaScript would render it. References render as
/// their `${...}` placeholder.
pub fn js_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::List(items) => items.iter().map(js_to_string).collect::<Vec<_>>().join(","),
        Value::Map(_) => "[object Object]".into(),
        other => other.to_template_string().unwrap_or_default(),
    }
}

/// Evaluates a TypeScript program into a resource graph.
pub struct TargetEvaluator<'a> {
    pub(crate) bindings: &'a BindingContext,
    pub(crate) schema: &'a ProviderSchema,
    pub(crate) graph: ResourceGraph,
    globals: Env,
}

impl<'a> TargetEvaluator<'a> {
    pub fn new(bindings: &'a BindingContext, schema: &'a ProviderSchema) -> Self {
        let globals: Env = Rc::new(Frame::default());
        for (name, global) in [
            ("Object", Global::Object),
            ("JSON", Global::Json),
            ("Math", Global::Math),
            ("String", Global::String),
            ("Number", Global::Number),
            ("Boolean", Global::Boolean),
            ("Array", Global::Array),
            ("console", Global::Console),
        ] {
            define(&globals, name, Runtime::Global(global));
        }
        define(&globals, "config", Runtime::Config);
        TargetEvaluator { bindings, schema, graph: ResourceGraph::new(), globals }
    }

    pub fn run(mut self, program: &[Stmt]) -> Result<ResourceGraph, EvalError> {
        let env = child_env(&self.globals);
        for statement in program {
            if let Flow::Return(_) = self.exec(statement, &env)? {
                let position = match statement {
                    Stmt::Return { position, .. } => Some(*position),
                    _ => None,
                };
                return Err(EvalError::parse("'return' outside of a function", position));
            }
        }
        self.graph.finalize();
        tracing::debug!(
            resources = self.graph.len(),
            outputs = self.graph.outputs().len(),
            "evaluated typescript program"
        );
        Ok(self.graph)
    }

    // Statements

    fn exec_block(&mut self, statements: &[Stmt], env: &Env) -> Result<Flow, EvalError> {
        for statement in statements {
            if let Flow::Return(value) = self.exec(statement, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Stmt, env: &Env) -> Result<Flow, EvalError> {
        match statement {
            Stmt::Import { alias, package, .. } => {
                let imported = if package == PULUMI_PACKAGE {
                    Runtime::Global(Global::Pulumi)
                } else {
                    let provider = package.strip_prefix(PROVIDER_PACKAGE_PREFIX).unwrap_or(alias);
                    Runtime::Namespace(Namespace { provider: provider.to_string(), path: vec![] })
                };
                define(env, alias, imported);
            }
            Stmt::Decl { pattern, init, exported, position } => {
                let value = self.eval(init, env)?;
                if *exported {
                    let Pattern::Ident(name) = pattern else {
                        return Err(EvalError::unsupported("exporting a destructuring pattern")
                            .or_position(Some(*position)));
                    };
                    let output = value.clone().into_value().map_err(|e| e.or_position(Some(*position)))?;
                    self.graph
                        .set_output(&snake_key(name), output)
                        .map_err(|e| EvalError::from(e).or_position(Some(*position)))?;
                }
                self.bind_pattern(env, pattern, value).map_err(|e| e.or_position(Some(*position)))?;
            }
            Stmt::Function { name, function, exported, .. } => {
                if *exported {
                    tracing::trace!(function = name.as_str(), "exported function is not an output");
                }
                let closure = Closure { function: function.clone(), env: env.clone() };
                define(env, name, Runtime::Closure(Rc::new(closure)));
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
            Stmt::If { cond, then, otherwise } => {
                let condition = self.eval(cond, env)?;
                let branch = if truthy(&condition) { Some(then) } else { otherwise.as_ref() };
                if let Some(branch) = branch {
                    return self.exec(branch, &child_env(env));
                }
            }
            Stmt::ForOf { pattern, iterable, body } => {
                let items = match self.eval(iterable, env)? {
                    Runtime::Data(Value::List(items)) => items,
                    Runtime::Data(Value::String(s)) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    other => {
                        return Err(EvalError::type_error(format!("{} is not iterable", other.type_name()))
                            .or_position(Some(iterable.position)))
                    }
                };
                for item in items {
                    let frame = child_env(env);
                    self.bind_pattern(&frame, pattern, item.into()).map_err(|e| e.or_position(Some(iterable.position)))?;
                    if let Flow::Return(value) = self.exec(body, &frame)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Block(statements) => return self.exec_block(statements, &child_env(env)),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Runtime::null(),
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    pub(crate) fn bind_pattern(&mut self, env: &Env, pattern: &Pattern, value: Runtime) -> Result<(), EvalError> {
        match pattern {
            Pattern::Ident(name) => {
                define(env, name, value);
                Ok(())
            }
            Pattern::Array(elements) => {
                let items = match value {
                    Runtime::Data(Value::List(items)) => items,
                    Runtime::Data(Value::Null) => vec![],
                    other => {
                        return Err(EvalError::type_error(format!(
                            "cannot destructure {} as an array",
                            other.type_name()
                        )))
                    }
                };
                for (index, element) in elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    let item = items.get(index).cloned().unwrap_or(Value::Null);
                    let item = self.apply_default(env, item.into(), element.default.as_ref())?;
                    self.bind_pattern(env, &element.pattern, item)?;
                }
                Ok(())
            }
            Pattern::Object(properties) => {
                for (key, element) in properties {
                    let field = self.get_member(&value, key, false)?;
                    let field = self.apply_default(env, field, element.default.as_ref())?;
                    self.bind_pattern(env, &element.pattern, field)?;
                }
                Ok(())
            }
        }
    }

    fn apply_default(&mut self, env: &Env, value: Runtime, default: Option<&Expr>) -> Result<Runtime, EvalError> {
        match (value, default) {
            (Runtime::Data(Value::Null), Some(default)) => self.eval(default, env),
            (value, _) => Ok(value),
        }
    }

    // Expressions

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Runtime, EvalError> {
        self.eval_inner(expr, env).map_err(|e| e.or_position(Some(expr.position)))
    }

    pub(crate) fn eval_value(&mut self, expr: &Expr, env: &Env) -> Result<Value, EvalError> {
        self.eval(expr, env)?.into_value().map_err(|e| e.or_position(Some(expr.position)))
    }

    fn eval_inner(&mut self, expr: &Expr, env: &Env) -> Result<Runtime, EvalError> {
        let value = match &expr.kind {
            ExprKind::Null | ExprKind::Undefined => Value::Null,
            ExprKind::Bool(b) => Value::bool(*b),
            ExprKind::Number(n) => Value::number(*n),
            ExprKind::Str(s) => Value::string(s.clone()),
            ExprKind::Template { tag, quasis, exprs } => {
                if let Some(tag) = tag {
                    let is_interpolate = matches!(
                        (&tag.kind, self.eval(tag_object(tag), env)?),
                        (ExprKind::Member { property, .. }, Runtime::Global(Global::Pulumi)) if property == "interpolate"
                    );
                    if !is_interpolate {
                        return Err(EvalError::unsupported("tagged templates other than pulumi.interpolate"));
                    }
                }
                let mut out = String::new();
                for (index, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(part) = exprs.get(index) {
                        out.push_str(&js_to_string(&self.eval_value(part, env)?));
                    }
                }
                Value::string(out)
            }
            ExprKind::Array(items) => Value::list(self.eval_list_items(items, env)?),
            ExprKind::Object(props) => {
                let mut map = IndexMap::new();
                for prop in props {
                    match prop {
                        Prop::KeyValue(key, value_expr) => {
                            let key = match key {
                                PropKey::Named(name) => name.clone(),
                                PropKey::Computed(key_expr) => {
                                    js_to_string(&self.eval_value(key_expr, env)?)
                                }
                            };
                            let value = self.eval_value(value_expr, env)?;
                            // later keys overwrite earlier ones
                            map.insert(key, value);
                        }
                        Prop::Shorthand(name) => {
                            let value = self.lookup_ident(name, env)?.into_value()?;
                            map.insert(name.clone(), value);
                        }
                        Prop::Spread(spread_expr) => match self.eval_value(spread_expr, env)? {
                            Value::Map(entries) => map.extend(entries),
                            Value::Null => {}
                            other => {
                                return Err(EvalError::type_error(format!(
                                    "cannot spread {} into an object",
                                    other.type_name()
                                ))
                                .or_position(Some(spread_expr.position)))
                            }
                        },
                    }
                }
                Value::map(map)
            }
            ExprKind::Ident(name) => return self.lookup_ident(name, env),
            ExprKind::Member { object, property, optional } => {
                let receiver = self.eval(object, env)?;
                return self.get_member(&receiver, property, *optional);
            }
            ExprKind::Index { object, index, optional } => {
                let receiver = self.eval(object, env)?;
                let key = self.eval_value(index, env)?;
                return self.get_index(receiver, &key, *optional);
            }
            ExprKind::Call { callee, args, optional } => {
                return self.eval_call(callee, args, *optional, env, expr.position);
            }
            ExprKind::New { callee, args } => {
                let class = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                return self.construct(class, args, callee.position);
            }
            ExprKind::Arrow(function) => {
                return Ok(Runtime::Closure(Rc::new(Closure { function: function.clone(), env: env.clone() })))
            }
            ExprKind::Unary { op, expr: operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnaryOp::Not => Value::bool(!truthy(&value)),
                    UnaryOp::Neg => Value::number(-self.expect_number(&value)?),
                    UnaryOp::Plus => Value::number(self.expect_number(&value)?),
                    UnaryOp::TypeOf => Value::string(match &value {
                        Runtime::Data(Value::Null) => "undefined",
                        Runtime::Data(Value::Bool(_)) => "boolean",
                        Runtime::Data(Value::Number(_)) => "number",
                        Runtime::Data(Value::String(_)) => "string",
                        Runtime::Closure(_) => "function",
                        _ => "object",
                    }),
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval_value(lhs, env)?;
                let rhs = self.eval_value(rhs, env)?;
                self.eval_binary(*op, lhs, rhs)?
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let lhs_value = self.eval(lhs, env)?;
                let take_lhs = match op {
                    LogicalOp::And => !truthy(&lhs_value),
                    LogicalOp::Or => truthy(&lhs_value),
                    LogicalOp::Nullish => !matches!(lhs_value, Runtime::Data(Value::Null)),
                };
                return if take_lhs { Ok(lhs_value) } else { self.eval(rhs, env) };
            }
            ExprKind::Conditional { cond, then, otherwise } => {
                let condition = self.eval(cond, env)?;
                return if truthy(&condition) { self.eval(then, env) } else { self.eval(otherwise, env) };
            }
        };
        Ok(Runtime::Data(value))
    }

    fn lookup_ident(&self, name: &str, env: &Env) -> Result<Runtime, EvalError> {
        lookup(env, name).ok_or_else(|| EvalError::unbound(name))
    }

    fn eval_list_items(&mut self, items: &[ListItem], env: &Env) -> Result<Vec<Value>, EvalError> {
        let mut values = vec![];
        for item in items {
            match item {
                ListItem::Item(expr) => values.push(self.eval_value(expr, env)?),
                ListItem::Spread(expr) => match self.eval_value(expr, env)? {
                    Value::List(spread) => values.extend(spread),
                    other => {
                        return Err(EvalError::type_error(format!("cannot spread {} into a list", other.type_name()))
                            .or_position(Some(expr.position)))
                    }
                },
            }
        }
        Ok(values)
    }

    fn eval_args(&mut self, items: &[ListItem], env: &Env) -> Result<Vec<Runtime>, EvalError> {
        let mut args = vec![];
        for item in items {
            match item {
                ListItem::Item(expr) => args.push(self.eval(expr, env)?),
                ListItem::Spread(expr) => match self.eval_value(expr, env)? {
                    Value::List(spread) => args.extend(spread.into_iter().map(Runtime::Data)),
                    other => {
                        return Err(EvalError::type_error(format!(
                            "cannot spread {} into arguments",
                            other.type_name()
                        ))
                        .or_position(Some(expr.position)))
                    }
                },
            }
        }
        Ok(args)
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[ListItem],
        optional: bool,
        env: &Env,
        position: Position,
    ) -> Result<Runtime, EvalError> {
        match &callee.kind {
            ExprKind::Member { object, property, optional: optional_member } => {
                let receiver = self.eval(object, env)?;
                if (*optional_member || optional) && matches!(receiver, Runtime::Data(Value::Null)) {
                    return Ok(Runtime::null());
                }
                let args = self.eval_args(args, env)?;
                self.call_method(receiver, property, args).map_err(|e| e.or_position(Some(position)))
            }
            _ => {
                let function = self.eval(callee, env)?;
                if optional && matches!(function, Runtime::Data(Value::Null)) {
                    return Ok(Runtime::null());
                }
                let args = self.eval_args(args, env)?;
                self.call(&function, args)
            }
        }
    }

    /// Calls a closure or a callable global (`String`, `Number`, `Boolean`).
    pub(crate) fn call(&mut self, function: &Runtime, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        match function {
            Runtime::Closure(closure) => self.call_closure(closure, args),
            Runtime::Global(global) => self.call_global(*global, args),
            other => Err(EvalError::type_error(format!("a {} is not callable", other.type_name()))),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        let frame = child_env(&closure.env);
        let mut args = args.into_iter();
        for param in closure.function.params.iter() {
            let arg = args.next().unwrap_or_else(Runtime::null);
            let arg = self.apply_default(&frame, arg, param.default.as_ref())?;
            self.bind_pattern(&frame, &param.pattern, arg)?;
        }
        match &closure.function.body {
            ArrowBody::Expr(expr) => self.eval(expr, &frame),
            ArrowBody::Block(statements) => match self.exec_block(statements, &frame)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Runtime::null()),
            },
        }
    }

    // Member access

    pub(crate) fn get_member(&mut self, receiver: &Runtime, property: &str, optional: bool) -> Result<Runtime, EvalError> {
        let value = match receiver {
            Runtime::Data(Value::Map(entries)) => entries
                .get(property)
                .or_else(|| entries.get(&snake_key(property)))
                .cloned()
                .unwrap_or(Value::Null),
            Runtime::Data(Value::Reference(reference)) => {
                Value::reference(reference.with_step(RefStep::Attr(snake_key(property))))
            }
            Runtime::Data(Value::List(items)) if property == "length" => Value::number(items.len() as f64),
            Runtime::Data(Value::String(s)) if property == "length" => Value::number(s.chars().count() as f64),
            Runtime::Data(Value::Null) if optional => Value::Null,
            Runtime::Data(Value::Null) => {
                return Err(EvalError::type_error(format!("cannot read property '{}' of null", property)))
            }
            Runtime::Data(_) => Value::Null,
            Runtime::Namespace(namespace) => {
                let mut path = namespace.path.clone();
                path.push(property.to_string());
                return Ok(Runtime::Namespace(Namespace { provider: namespace.provider.clone(), path }));
            }
            Runtime::Config => self.config_value(property).unwrap_or(Value::Null),
            Runtime::Global(Global::Pulumi) if property == "Config" => return Ok(Runtime::Global(Global::ConfigClass)),
            Runtime::Global(Global::Math) => match property {
                "PI" => Value::number(std::f64::consts::PI),
                "E" => Value::number(std::f64::consts::E),
                _ => return Err(EvalError::unsupported(format!("Math.{} as a value", property))),
            },
            Runtime::Global(_) | Runtime::Closure(_) => {
                return Err(EvalError::unsupported(format!(
                    "reading '{}' from a {}",
                    property,
                    receiver.type_name()
                )))
            }
        };
        Ok(Runtime::Data(value))
    }

    fn get_index(&mut self, receiver: Runtime, key: &Value, optional: bool) -> Result<Runtime, EvalError> {
        let value = match (receiver, key) {
            (Runtime::Data(Value::List(mut items)), Value::Number(n)) => {
                if *n >= 0.0 && n.fract() == 0.0 && (*n as usize) < items.len() {
                    items.swap_remove(*n as usize)
                } else {
                    Value::Null
                }
            }
            (Runtime::Data(Value::String(s)), Value::Number(n)) => {
                if *n >= 0.0 && n.fract() == 0.0 {
                    s.chars().nth(*n as usize).map(|c| Value::string(c.to_string())).unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            (Runtime::Data(Value::Reference(reference)), Value::Number(n)) => {
                if *n < 0.0 || n.fract() != 0.0 {
                    return Err(EvalError::type_error(format!(
                        "resource attribute index must be a whole non-negative number, got {}",
                        format_number(*n)
                    )));
                }
                Value::reference(reference.with_step(RefStep::Index(*n as usize)))
            }
            (Runtime::Data(Value::Reference(reference)), Value::String(s)) => {
                Value::reference(reference.with_step(RefStep::Key(s.clone())))
            }
            (Runtime::Data(Value::Null), _) if optional => Value::Null,
            (receiver @ Runtime::Data(Value::Null), key) => {
                return Err(EvalError::type_error(format!(
                    "cannot index {} with {}",
                    receiver.type_name(),
                    key
                )))
            }
            (receiver, key) => {
                let property = js_to_string(key);
                return self.get_member(&receiver, &property, optional);
            }
        };
        Ok(Runtime::Data(value))
    }

    pub(crate) fn config_value(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    // Operators

    pub(crate) fn expect_number(&self, value: &Runtime) -> Result<f64, EvalError> {
        match value {
            Runtime::Data(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
            Runtime::Data(Value::Null) => Ok(0.0),
            Runtime::Data(value) => coerce_number(value)
                .ok_or_else(|| EvalError::type_error(format!("expected number, got {}", value.type_name()))),
            other => Err(EvalError::type_error(format!("expected number, got {}", other.type_name()))),
        }
    }

    fn eval_binary(&self, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Reference(_));
        let value = match op {
            BinaryOp::Eq => Value::bool(lhs == rhs && !is_nan(&lhs)),
            BinaryOp::NotEq => Value::bool(lhs != rhs || is_nan(&lhs)),
            BinaryOp::Add if stringy(&lhs) || stringy(&rhs) => {
                Value::string(format!("{}{}", js_to_string(&lhs), js_to_string(&rhs)))
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq
                if matches!((&lhs, &rhs), (Value::String(_), Value::String(_))) =>
            {
                let (Value::String(a), Value::String(b)) = (&lhs, &rhs) else { unreachable!("matched above") };
                Value::bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::LtEq => a <= b,
                    BinaryOp::Gt => a > b,
                    _ => a >= b,
                })
            }
            _ => {
                let a = self.expect_number(&Runtime::Data(lhs))?;
                let b = self.expect_number(&Runtime::Data(rhs))?;
                match op {
                    BinaryOp::Add => Value::number(a + b),
                    BinaryOp::Sub => Value::number(a - b),
                    BinaryOp::Mul => Value::number(a * b),
                    BinaryOp::Div => Value::number(a / b),
                    BinaryOp::Mod => Value::number(a % b),
                    BinaryOp::Lt => Value::bool(a < b),
                    BinaryOp::LtEq => Value::bool(a <= b),
                    BinaryOp::Gt => Value::bool(a > b),
                    BinaryOp::GtEq => Value::bool(a >= b),
                    BinaryOp::Eq | BinaryOp::NotEq => unreachable!("handled above"),
                }
            }
        };
        Ok(value)
    }

    // Resources

    fn construct(&mut self, class: Runtime, args: Vec<Runtime>, position: Position) -> Result<Runtime, EvalError> {
        match class {
            Runtime::Global(Global::ConfigClass) => Ok(Runtime::Config),
            Runtime::Namespace(namespace) => self.create_resource(&namespace, args).map_err(|e| e.or_position(Some(position))),
            other => Err(EvalError::unsupported(format!("'new' on a {}", other.type_name()))),
        }
    }

    /// Resource type for a constructor path: a schema alias, then
    /// `provider_module_class` when the schema knows it, else
    /// `provider_class`.
    pub fn resolve_resource_type(&self, namespace: &Namespace) -> Result<String, EvalError> {
        let Some(class) = namespace.path.last() else {
            return Err(EvalError::type_error(format!("'{}' is not a resource class", namespace.provider)));
        };
        let constructor = format!("{}.{}", namespace.provider, namespace.path.join("."));
        if let Some(resource_type) = self.schema.resolve_alias(&constructor) {
            return Ok(resource_type.to_string());
        }
        let class = snake_case(class);
        if namespace.path.len() >= 2 {
            let module = snake_case(&namespace.path[..namespace.path.len() - 1].join("_"));
            let qualified = format!("{}_{}_{}", namespace.provider, module, class);
            if self.schema.knows(&qualified) {
                return Ok(qualified);
            }
        }
        Ok(format!("{}_{}", namespace.provider, class))
    }

    fn create_resource(&mut self, namespace: &Namespace, args: Vec<Runtime>) -> Result<Runtime, EvalError> {
        let resource_type = self.resolve_resource_type(namespace)?;
        let mut args = args.into_iter();
        let name = match args.next().map(Runtime::into_value).transpose()? {
            Some(Value::String(name)) => name,
            other => {
                return Err(EvalError::type_error(format!(
                    "resource name must be a string, got {}",
                    other.as_ref().map(|v| v.type_name()).unwrap_or("nothing")
                )))
            }
        };
        let attributes = match args.next().map(Runtime::into_value).transpose()?.unwrap_or(Value::Null) {
            Value::Map(entries) => entries,
            Value::Null => IndexMap::new(),
            other => {
                return Err(EvalError::type_error(format!("resource args must be an object, got {}", other.type_name())))
            }
        };
        let options = args.next().map(Runtime::into_value).transpose()?.unwrap_or(Value::Null);

        let mut converted = IndexMap::new();
        for (key, value) in attributes {
            let key = snake_key(&key);
            let mut value = snake_keys(value);
            if self.schema.resource(&resource_type).is_some_and(|schema| schema.blocks.contains_key(&key)) {
                value = without_nulls(value);
                if self.schema.nesting_of(&resource_type, &key) == Nesting::List {
                    if let Value::Map(_) = value {
                        value = Value::list(vec![value]);
                    }
                }
            }
            converted.insert(key, value);
        }

        let mut explicit = BTreeSet::new();
        if let Value::Map(options) = &options {
            if let Some(depends_on) = options.get("dependsOn") {
                explicit.extend(depends_on.collect_references().into_iter().map(|r| r.target.clone()));
            }
        }

        let resource = self.graph.add_resource_with_dependencies(&resource_type, &name, converted, explicit)?;
        tracing::debug!(resource = %resource.id, "created resource");
        Ok(Runtime::Data(Value::reference(ResourceRef::new(resource.id.clone()))))
    }
}

/// For `pulumi.interpolate`, the object the tag is read from.
fn tag_object(tag: &Expr) -> &Expr {
    match &tag.kind {
        ExprKind::Member { object, .. } => object,
        _ => tag,
    }
}
