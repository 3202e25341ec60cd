use kit::hcl::expr::{
    BinaryOperator, Conditional, Expression, ForExpr, FuncCall, ObjectKey, Traversal,
    TraversalOperator, UnaryOperator,
};
use kit::hcl::Span;
use kit::helpers::location::{Position, SourceMapper};
use kit::indexmap::IndexMap;
use kit::{RefStep, Value};

use crate::bindings::BindingContext;
use crate::errors::EvalError;
use crate::provider::ProviderSchema;
use crate::std::functions::{call_function, coerce_number, find_function};

use super::scope::Scope;

/// Roots that name Terraform features outside the supported subset.
const UNSUPPORTED_ROOTS: &[&str] = &["data", "module", "path", "terraform"];

/// Everything an HCL expression can see besides its lexical scope.
pub struct HclContext<'a> {
    pub(crate) bindings: &'a BindingContext,
    pub(crate) schema: &'a ProviderSchema,
    pub(crate) mapper: SourceMapper<'a>,
    /// Declared variables resolved from bindings or defaults
    pub(crate) variables: IndexMap<String, Value>,
    pub(crate) locals: IndexMap<String, Value>,
    /// Resource type -> resource name -> handle (a reference, or a list/map
    /// of references for `count` / `for_each`)
    pub(crate) resources: IndexMap<String, IndexMap<String, Value>>,
}

impl<'a> HclContext<'a> {
    pub fn new(source: &'a str, bindings: &'a BindingContext, schema: &'a ProviderSchema) -> Self {
        HclContext {
            bindings,
            schema,
            mapper: SourceMapper::new(source),
            variables: IndexMap::new(),
            locals: IndexMap::new(),
            resources: IndexMap::new(),
        }
    }

    pub(crate) fn position_of(&self, node: &impl Span) -> Option<Position> {
        self.mapper.optional_span_to_position(node.span().as_ref())
    }

    pub fn eval(&self, expr: &Expression, scope: &Scope) -> Result<Value, EvalError> {
        self.eval_inner(expr, scope).map_err(|e| e.or_position(self.position_of(expr)))
    }

    fn eval_inner(&self, expr: &Expression, scope: &Scope) -> Result<Value, EvalError> {
        let value = match expr {
            Expression::Null(_) => Value::Null,
            Expression::Bool(decorated_bool) => Value::bool(*decorated_bool.value()),
            Expression::Number(formatted_number) => match formatted_number.value().as_f64() {
                Some(value) => Value::number(value),
                None => return Err(EvalError::type_error("number is not representable")),
            },
            Expression::String(decorated_string) => Value::string(decorated_string.value().clone()),
            Expression::Array(entries) => {
                let mut values = vec![];
                for entry_expr in entries.iter() {
                    values.push(self.eval(entry_expr, scope)?);
                }
                Value::list(values)
            }
            Expression::Object(object) => {
                let mut map = IndexMap::new();
                for (key, value) in object.iter() {
                    let key = match key {
                        ObjectKey::Ident(ident) => ident.as_str().to_string(),
                        ObjectKey::Expression(key_expr) => {
                            let key_value = self.eval(key_expr, scope)?;
                            key_value.to_template_string().ok_or_else(|| {
                                EvalError::type_error(format!(
                                    "object key must be a string, got {}",
                                    key_value.type_name()
                                ))
                            })?
                        }
                    };
                    let value = self.eval(value.expr(), scope)?;
                    map.insert(key, value);
                }
                Value::map(map)
            }
            Expression::StringTemplate(template) => {
                let elements: Vec<_> = template.iter().collect();
                self.eval_template(&elements, scope)?
            }
            Expression::HeredocTemplate(heredoc) => {
                let elements: Vec<_> = heredoc.template.iter().collect();
                Value::string(self.render_template(&elements, scope)?)
            }
            Expression::Parenthesis(inner) => self.eval(inner.inner(), scope)?,
            Expression::Variable(var) => self.resolve_variable(var.as_str(), scope)?,
            Expression::Conditional(conditional) => self.eval_conditional(conditional, scope)?,
            Expression::FuncCall(func_call) => self.eval_func_call(func_call, scope)?,
            Expression::Traversal(traversal) => self.eval_traversal(traversal, scope)?,
            Expression::UnaryOp(unary_op) => {
                let operand = self.eval(&unary_op.expr, scope)?;
                match unary_op.operator.value() {
                    UnaryOperator::Neg => Value::number(-self.expect_number(&operand)?),
                    UnaryOperator::Not => Value::bool(!self.expect_bool(&operand)?),
                }
            }
            Expression::BinaryOp(binary_op) => {
                let lhs = self.eval(&binary_op.lhs_expr, scope)?;
                let rhs = self.eval(&binary_op.rhs_expr, scope)?;
                self.eval_binary(binary_op.operator.value(), lhs, rhs)?
            }
            Expression::ForExpr(for_expr) => self.eval_for(for_expr, scope)?,
        };
        Ok(value)
    }

    fn resolve_variable(&self, name: &str, scope: &Scope) -> Result<Value, EvalError> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value.clone());
        }
        if UNSUPPORTED_ROOTS.contains(&name) {
            return Err(EvalError::unsupported(format!("references to '{}'", name)));
        }
        if let Some(instances) = self.resources.get(name) {
            return Ok(Value::map(instances.clone()));
        }
        Err(EvalError::unbound(name))
    }

    pub(crate) fn lookup_var(&self, name: &str) -> Result<Value, EvalError> {
        self.variables
            .get(name)
            .or_else(|| self.bindings.get(name))
            .cloned()
            .ok_or_else(|| EvalError::unbound(format!("var.{}", name)))
    }

    fn eval_conditional(&self, conditional: &Conditional, scope: &Scope) -> Result<Value, EvalError> {
        let condition = self.eval(&conditional.cond_expr, scope)?;
        // only the taken branch is evaluated
        if self.expect_bool(&condition)? {
            self.eval(&conditional.true_expr, scope)
        } else {
            self.eval(&conditional.false_expr, scope)
        }
    }

    fn eval_func_call(&self, func_call: &FuncCall, scope: &Scope) -> Result<Value, EvalError> {
        let name = func_call.name.name.as_str();
        if !func_call.name.namespace.is_empty() {
            let namespace: Vec<&str> =
                func_call.name.namespace.iter().map(|n| n.as_str()).collect();
            return Err(EvalError::unknown_function(format!("{}::{}", namespace.join("::"), name)));
        }
        let Some(fn_spec) = find_function(name) else {
            return Err(EvalError::unknown_function(name));
        };
        let mut args = vec![];
        for arg_expr in func_call.args.iter() {
            args.push(self.eval(arg_expr, scope)?);
        }
        if func_call.args.expand_final() {
            match args.pop() {
                Some(Value::List(expanded)) => args.extend(expanded),
                Some(other) => {
                    return Err(EvalError::type_error(format!(
                        "cannot expand {} as function arguments",
                        other.type_name()
                    )))
                }
                None => {}
            }
        }
        call_function(fn_spec, &args).map_err(|diag| EvalError::type_error(diag.message))
    }

    fn eval_traversal(&self, traversal: &Traversal, scope: &Scope) -> Result<Value, EvalError> {
        let operators: Vec<&TraversalOperator> =
            traversal.operators.iter().map(|op| op.value()).collect();
        let (root, consumed) = self.resolve_traversal_root(&traversal.expr, &operators, scope)?;
        self.apply_operators(root, &operators[consumed..], scope, false)
    }

    /// Resolves the head of a traversal. `var.x`, `local.x` and `TYPE.NAME`
    /// consume their first attribute access.
    fn resolve_traversal_root(
        &self,
        expr: &Expression,
        operators: &[&TraversalOperator],
        scope: &Scope,
    ) -> Result<(Value, usize), EvalError> {
        let Expression::Variable(var) = expr else {
            return Ok((self.eval(expr, scope)?, 0));
        };
        let root = var.as_str();
        if let Some(value) = scope.lookup(root) {
            return Ok((value.clone(), 0));
        }
        let first_attr = match operators.first() {
            Some(TraversalOperator::GetAttr(ident)) => Some(ident.as_str()),
            _ => None,
        };
        match (root, first_attr) {
            ("var", Some(name)) => Ok((self.lookup_var(name)?, 1)),
            ("local", Some(name)) => self
                .locals
                .get(name)
                .cloned()
                .map(|value| (value, 1))
                .ok_or_else(|| EvalError::unbound(format!("local.{}", name))),
            ("var", None) | ("local", None) => {
                Err(EvalError::type_error(format!("'{}' must be followed by an attribute name", root)))
            }
            (root, _) if UNSUPPORTED_ROOTS.contains(&root) => {
                Err(EvalError::unsupported(format!("references to '{}'", root)))
            }
            (resource_type, Some(name)) => self
                .resources
                .get(resource_type)
                .and_then(|instances| instances.get(name))
                .cloned()
                .map(|value| (value, 1))
                .ok_or_else(|| EvalError::unbound(format!("{}.{}", resource_type, name))),
            (root, None) => Err(EvalError::unbound(root)),
        }
    }

    /// Applies traversal operators left to right. In lenient mode, used for
    /// splat projections, absent attributes and out of range indices give
    /// null instead of an error.
    fn apply_operators(
        &self,
        mut value: Value,
        operators: &[&TraversalOperator],
        scope: &Scope,
        lenient: bool,
    ) -> Result<Value, EvalError> {
        let mut i = 0;
        while i < operators.len() {
            match operators[i] {
                TraversalOperator::GetAttr(ident) => {
                    value = get_attr(value, ident.as_str(), lenient)?;
                }
                TraversalOperator::Index(index_expr) => {
                    let key = self.eval(index_expr, scope)?;
                    value = index_value(value, &key, lenient)?;
                }
                TraversalOperator::LegacyIndex(index) => {
                    value = index_value(value, &Value::number(*index.value() as f64), lenient)?;
                }
                TraversalOperator::AttrSplat(_) => {
                    // `.*` only carries the attribute accesses that follow it
                    let end = i
                        + 1
                        + operators[i + 1..]
                            .iter()
                            .take_while(|op| matches!(op, TraversalOperator::GetAttr(_)))
                            .count();
                    value = self.splat(value, &operators[i + 1..end], scope)?;
                    i = end;
                    continue;
                }
                TraversalOperator::FullSplat(_) => {
                    value = self.splat(value, &operators[i + 1..], scope)?;
                    break;
                }
            }
            i += 1;
        }
        Ok(value)
    }

    fn splat(
        &self,
        value: Value,
        operators: &[&TraversalOperator],
        scope: &Scope,
    ) -> Result<Value, EvalError> {
        let items = match value {
            Value::Null => vec![],
            Value::List(items) => items,
            other => vec![other],
        };
        let mut projected = Vec::with_capacity(items.len());
        for item in items {
            projected.push(self.apply_operators(item, operators, scope, true)?);
        }
        Ok(Value::list(projected))
    }

    fn eval_binary(&self, operator: &BinaryOperator, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        let value = match operator {
            BinaryOperator::Eq => Value::bool(lhs == rhs),
            BinaryOperator::NotEq => Value::bool(lhs != rhs),
            BinaryOperator::And => Value::bool(self.expect_bool(&lhs)? && self.expect_bool(&rhs)?),
            BinaryOperator::Or => Value::bool(self.expect_bool(&lhs)? || self.expect_bool(&rhs)?),
            _ => {
                let (a, b) = (self.expect_number(&lhs)?, self.expect_number(&rhs)?);
                match operator {
                    BinaryOperator::Plus => Value::number(a + b),
                    BinaryOperator::Minus => Value::number(a - b),
                    BinaryOperator::Mul => Value::number(a * b),
                    BinaryOperator::Div => {
                        if b == 0.0 {
                            return Err(EvalError::type_error("division by zero"));
                        }
                        Value::number(a / b)
                    }
                    BinaryOperator::Mod => {
                        if b == 0.0 {
                            return Err(EvalError::type_error("modulo by zero"));
                        }
                        Value::number(a % b)
                    }
                    BinaryOperator::Less => Value::bool(a < b),
                    BinaryOperator::LessEq => Value::bool(a <= b),
                    BinaryOperator::Greater => Value::bool(a > b),
                    BinaryOperator::GreaterEq => Value::bool(a >= b),
                    BinaryOperator::Eq
                    | BinaryOperator::NotEq
                    | BinaryOperator::And
                    | BinaryOperator::Or => unreachable!("handled above"),
                }
            }
        };
        Ok(value)
    }

    fn eval_for(&self, for_expr: &ForExpr, scope: &Scope) -> Result<Value, EvalError> {
        let collection = self.eval(&for_expr.intro.collection_expr, scope)?;
        let entries = iteration_entries(collection)?;
        let key_var = for_expr.intro.key_var.as_ref().map(|k| k.as_str());
        let value_var = for_expr.intro.value_var.as_str();

        let mut list = vec![];
        let mut map: IndexMap<String, Value> = IndexMap::new();
        let mut groups: IndexMap<String, Vec<Value>> = IndexMap::new();

        for (key, item) in entries {
            let mut frame = scope.child();
            if let Some(key_var) = key_var {
                frame.bind(key_var, key);
            }
            frame.bind(value_var, item);

            if let Some(cond) = &for_expr.cond {
                let keep = self.eval(&cond.expr, &frame)?;
                if !self.expect_bool(&keep)? {
                    continue;
                }
            }

            match &for_expr.key_expr {
                None => list.push(self.eval(&for_expr.value_expr, &frame)?),
                Some(key_expr) => {
                    let key_value = self.eval(key_expr, &frame)?;
                    let Some(key) = key_value.to_template_string() else {
                        return Err(EvalError::type_error(format!(
                            "for expression key must be a string, got {}",
                            key_value.type_name()
                        ))
                        .or_position(self.position_of(key_expr)));
                    };
                    let value = self.eval(&for_expr.value_expr, &frame)?;
                    if for_expr.grouping {
                        groups.entry(key).or_default().push(value);
                    } else if map.contains_key(&key) {
                        return Err(EvalError::duplicate_key(key).or_position(self.position_of(key_expr)));
                    } else {
                        map.insert(key, value);
                    }
                }
            }
        }

        Ok(match (&for_expr.key_expr, for_expr.grouping) {
            (None, _) => Value::list(list),
            (Some(_), true) => {
                Value::map(groups.into_iter().map(|(k, v)| (k, Value::list(v))).collect())
            }
            (Some(_), false) => Value::map(map),
        })
    }

    pub(crate) fn expect_bool(&self, value: &Value) -> Result<bool, EvalError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s == "true" => Ok(true),
            Value::String(s) if s == "false" => Ok(false),
            other => Err(EvalError::type_error(format!("expected bool, got {}", other.type_name()))),
        }
    }

    pub(crate) fn expect_number(&self, value: &Value) -> Result<f64, EvalError> {
        coerce_number(value).ok_or_else(|| {
            EvalError::type_error(format!("expected number, got {}", value.type_name()))
        })
    }
}

/// `(key, value)` pairs of a list (index keys) or map (string keys) in
/// natural order.
pub(crate) fn iteration_entries(collection: Value) -> Result<Vec<(Value, Value)>, EvalError> {
    match collection {
        Value::List(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (Value::number(i as f64), item))
            .collect()),
        Value::Map(entries) => {
            Ok(entries.into_iter().map(|(k, v)| (Value::string(k), v)).collect())
        }
        other => Err(EvalError::type_error(format!("cannot iterate over {}", other.type_name()))),
    }
}

fn get_attr(value: Value, name: &str, lenient: bool) -> Result<Value, EvalError> {
    match value {
        Value::Map(mut entries) => match entries.shift_remove(name) {
            Some(found) => Ok(found),
            None if lenient => Ok(Value::Null),
            None => Err(EvalError::type_error(format!("object has no attribute '{}'", name))),
        },
        Value::Reference(reference) => Ok(Value::reference(reference.attr(name))),
        Value::Null if lenient => Ok(Value::Null),
        other => Err(EvalError::type_error(format!(
            "cannot access attribute '{}' on {}",
            name,
            other.type_name()
        ))),
    }
}

fn index_value(value: Value, key: &Value, lenient: bool) -> Result<Value, EvalError> {
    match (value, key) {
        (Value::List(mut items), Value::Number(n)) => {
            if *n < 0.0 || n.fract() != 0.0 || *n as usize >= items.len() {
                if lenient {
                    return Ok(Value::Null);
                }
                return Err(EvalError::type_error(format!(
                    "index {} out of range for list of length {}",
                    key,
                    items.len()
                )));
            }
            Ok(items.swap_remove(*n as usize))
        }
        (Value::Map(mut entries), key) => {
            let Some(name) = key.to_template_string() else {
                return Err(EvalError::type_error(format!("invalid map key {}", key)));
            };
            match entries.shift_remove(&name) {
                Some(found) => Ok(found),
                None if lenient => Ok(Value::Null),
                None => Err(EvalError::type_error(format!("map has no key '{}'", name))),
            }
        }
        (Value::Reference(reference), Value::Number(n)) => {
            if *n < 0.0 || n.fract() != 0.0 {
                return Err(EvalError::type_error(format!("invalid index {}", key)));
            }
            Ok(Value::reference(reference.with_step(RefStep::Index(*n as usize))))
        }
        (Value::Reference(reference), Value::String(s)) => {
            Ok(Value::reference(reference.with_step(RefStep::Key(s.clone()))))
        }
        (Value::Null, _) if lenient => Ok(Value::Null),
        (other, key) => Err(EvalError::type_error(format!(
            "cannot index {} with {}",
            other.type_name(),
            key.type_name()
        ))),
    }
}
