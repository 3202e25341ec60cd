use kit::hcl::template::{Directive, Element, ForDirective, IfDirective, Strip, Template};
use kit::Value;

use crate::errors::EvalError;

use super::eval::{iteration_entries, HclContext};
use super::scope::Scope;

/// Output buffer that knows enough about what was written last to honour
/// `~` strip markers on either side of an interpolation or directive.
#[derive(Default)]
struct RenderState {
    out: String,
    /// Offset in `out` where the most recent literal starts, if nothing was
    /// interpolated after it.
    last_literal_start: Option<usize>,
    /// Leading whitespace of the next literal must be dropped.
    pending_strip: bool,
}

impl RenderState {
    fn push_literal(&mut self, text: &str) {
        let text = if std::mem::take(&mut self.pending_strip) { text.trim_start() } else { text };
        self.last_literal_start = Some(self.out.len());
        self.out.push_str(text);
    }

    fn push_value(&mut self, text: &str) {
        self.pending_strip = false;
        self.last_literal_start = None;
        self.out.push_str(text);
    }

    fn strip_before(&mut self) {
        if let Some(start) = self.last_literal_start {
            let keep = start + self.out[start..].trim_end().len();
            self.out.truncate(keep);
        }
    }

    fn open(&mut self, strip: &Strip) {
        if strip.strip_start() {
            self.strip_before();
        }
        self.pending_strip = strip.strip_end();
    }

    /// A branch that was not rendered cannot be stripped into.
    fn skip(&mut self) {
        self.pending_strip = false;
        self.last_literal_start = None;
    }
}

impl<'a> HclContext<'a> {
    /// String templates made of a single interpolation keep the type of the
    /// interpolated value: `"${var.port}"` stays a number.
    pub(crate) fn eval_template(&self, elements: &[&Element], scope: &Scope) -> Result<Value, EvalError> {
        if let [Element::Interpolation(interpolation)] = elements {
            if !interpolation.strip.strip_start() && !interpolation.strip.strip_end() {
                return self.eval(&interpolation.expr, scope);
            }
        }
        Ok(Value::string(self.render_template(elements, scope)?))
    }

    pub(crate) fn render_template(&self, elements: &[&Element], scope: &Scope) -> Result<String, EvalError> {
        let mut state = RenderState::default();
        self.render_elements(elements.iter().copied(), scope, &mut state)?;
        Ok(state.out)
    }

    fn render_elements<'e>(
        &self,
        elements: impl Iterator<Item = &'e Element>,
        scope: &Scope,
        state: &mut RenderState,
    ) -> Result<(), EvalError> {
        for element in elements {
            match element {
                Element::Literal(literal) => state.push_literal(literal.value()),
                Element::Interpolation(interpolation) => {
                    let value = self.eval(&interpolation.expr, scope)?;
                    let Some(text) = value.to_template_string() else {
                        return Err(EvalError::type_error(format!(
                            "cannot interpolate {} into a string",
                            value.type_name()
                        ))
                        .or_position(self.position_of(&interpolation.expr)));
                    };
                    if interpolation.strip.strip_start() {
                        state.strip_before();
                    }
                    state.push_value(&text);
                    state.pending_strip = interpolation.strip.strip_end();
                }
                Element::Directive(directive) => {
                    let directive: &Directive = directive;
                    match directive {
                        Directive::If(if_directive) => self.render_if(if_directive, scope, state)?,
                        Directive::For(for_directive) => self.render_for(for_directive, scope, state)?,
                    }
                }
            }
        }
        Ok(())
    }

    fn render_branch(&self, template: &Template, scope: &Scope, state: &mut RenderState) -> Result<(), EvalError> {
        self.render_elements(template.iter(), scope, state)
    }

    fn render_if(&self, directive: &IfDirective, scope: &Scope, state: &mut RenderState) -> Result<(), EvalError> {
        let if_expr = &directive.if_expr;
        let condition = self.eval(&if_expr.cond_expr, scope)?;
        let taken = self.expect_bool(&condition)?;

        state.open(&if_expr.strip);
        if taken {
            self.render_branch(&if_expr.template, scope, state)?;
        } else {
            state.skip();
        }

        if let Some(else_expr) = &directive.else_expr {
            state.open(&else_expr.strip);
            if taken {
                state.skip();
            } else {
                self.render_branch(&else_expr.template, scope, state)?;
            }
        }

        state.open(&directive.endif_expr.strip);
        Ok(())
    }

    fn render_for(&self, directive: &ForDirective, scope: &Scope, state: &mut RenderState) -> Result<(), EvalError> {
        let for_expr = &directive.for_expr;
        let collection = self.eval(&for_expr.collection_expr, scope)?;
        let entries =
            iteration_entries(collection).map_err(|e| e.or_position(self.position_of(&for_expr.collection_expr)))?;

        if for_expr.strip.strip_start() {
            state.strip_before();
        }
        for (key, item) in entries {
            state.pending_strip = for_expr.strip.strip_end();
            let mut frame = scope.child();
            if let Some(key_var) = &for_expr.key_var {
                frame.bind(key_var.as_str(), key);
            }
            frame.bind(for_expr.value_var.as_str(), item);
            self.render_branch(&for_expr.template, &frame, state)?;
            if directive.endfor_expr.strip.strip_start() {
                state.strip_before();
            }
        }
        state.last_literal_start = None;
        state.pending_strip = directive.endfor_expr.strip.strip_end();
        Ok(())
    }
}
