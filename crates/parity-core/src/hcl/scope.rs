use kit::indexmap::IndexMap;
use kit::Value;

/// Lexical frame for names introduced while evaluating: for-expression
/// variables, `count`, `each` and dynamic block iterators. Frames link to
/// their parent and are never mutated once a child exists.
#[derive(Debug, Default)]
pub struct Scope<'p> {
    vars: IndexMap<String, Value>,
    parent: Option<&'p Scope<'p>>,
}

impl<'p> Scope<'p> {
    pub fn root() -> Scope<'static> {
        Scope { vars: IndexMap::new(), parent: None }
    }

    pub fn child<'c>(&'c self) -> Scope<'c>
    where
        'p: 'c,
    {
        Scope { vars: IndexMap::new(), parent: Some(self) }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(value) => Some(value),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }
}
