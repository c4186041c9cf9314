//! Runtime values and scopes.
//!
//! The value model is JSON plus first-class functions. Lists and maps are
//! shared mutable references, so user code can alias them — which also means
//! a value graph can be cyclic and therefore not JSON-representable.
//!
//! Maps are backed by `BTreeMap`, so object key order is canonicalized:
//! iteration and emitted JSON are always key-sorted, regardless of literal
//! or insertion order.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::ast::Stmt;

/// Signature for built-in functions. The writer is the invocation's output
/// stream; errors carry a bare message and get a line attached at the call
/// site.
pub type NativeFn = fn(&[Value], &mut dyn Write) -> Result<Value, String>;

pub enum Function {
    Native { name: &'static str, f: NativeFn },
    Script {
        name: Option<String>,
        params: Vec<String>,
        body: Rc<Vec<Stmt>>,
        env: Scope,
    },
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native { name, .. } => write!(f, "<builtin {name}>"),
            Function::Script { name: Some(n), .. } => write!(f, "<fn {n}>"),
            Function::Script { name: None, .. } => write!(f, "<fn>"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
    Func(Rc<Function>),
}

/// Why a value could not be serialized to JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unrepresentable {
    #[error("function values are not JSON-representable")]
    Function,
    #[error("cyclic structures are not JSON-representable")]
    Cycle,
    #[error("non-finite numbers are not JSON-representable")]
    NonFinite,
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Num(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::list(items.iter().map(Value::from_json).collect()),
            Json::Object(entries) => Value::map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON, failing on functions, cycles, and non-finite numbers.
    pub fn to_json(&self) -> Result<Json, Unrepresentable> {
        let mut seen = Vec::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(&self, seen: &mut Vec<*const ()>) -> Result<Json, Unrepresentable> {
        match self {
            Value::Null => Ok(Json::Null),
            Value::Bool(b) => Ok(Json::Bool(*b)),
            Value::Num(n) => number_to_json(*n).ok_or(Unrepresentable::NonFinite),
            Value::Str(s) => Ok(Json::String(s.clone())),
            Value::List(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if seen.contains(&ptr) {
                    return Err(Unrepresentable::Cycle);
                }
                seen.push(ptr);
                let out = items
                    .borrow()
                    .iter()
                    .map(|v| v.to_json_inner(seen))
                    .collect::<Result<Vec<_>, _>>();
                seen.pop();
                Ok(Json::Array(out?))
            }
            Value::Map(entries) => {
                let ptr = Rc::as_ptr(entries) as *const ();
                if seen.contains(&ptr) {
                    return Err(Unrepresentable::Cycle);
                }
                seen.push(ptr);
                let mut out = JsonMap::new();
                let mut failed = None;
                for (k, v) in entries.borrow().iter() {
                    match v.to_json_inner(seen) {
                        Ok(json) => {
                            out.insert(k.clone(), json);
                        }
                        Err(e) => {
                            failed = Some(e);
                            break;
                        }
                    }
                }
                seen.pop();
                match failed {
                    Some(e) => Err(e),
                    None => Ok(Json::Object(out)),
                }
            }
            Value::Func(_) => Err(Unrepresentable::Function),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) => "function",
        }
    }

    /// Falsy: null, false, 0, "", empty list, empty map.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Map(entries) => !entries.borrow().is_empty(),
            Value::Func(_) => true,
        }
    }

    fn write_repr(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        // Depth cap keeps cyclic values printable.
        if depth > 64 {
            return write!(f, "...");
        }
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_repr(f, depth + 1)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    v.write_repr(f, depth + 1)?;
                }
                write!(f, "}}")
            }
            other => write!(f, "{other}"),
        }
    }
}

/// Render an f64 as a JSON number, collapsing integral values to integers.
fn number_to_json(n: f64) -> Option<Json> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9e15 {
        return Some(Json::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Json::Number)
}

pub(crate) fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 9e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    /// Display form used by `print` and string coercion: bare strings at the
    /// top level, JSON-like rendering for containers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{}", format_num(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(_) | Value::Map(_) => self.write_repr(f, 0),
            Value::Func(func) => write!(f, "{func:?}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scopes
// ─────────────────────────────────────────────────────────────────────────────

/// A lexical scope. Reads walk the parent chain; writes always land in the
/// scope they execute in, so a program running directly in the root scope
/// leaves its top-level bindings there.
#[derive(Debug, Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

#[derive(Debug)]
struct ScopeData {
    vars: HashMap<String, Value>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let data = self.0.borrow();
        match data.vars.get(name) {
            Some(v) => Some(v.clone()),
            None => data.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().vars.insert(name.into(), value);
    }

    /// Lookup confined to this scope, ignoring parents.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.0.borrow().vars.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_roundtrip() {
        let json = json!({"a": [1, 2.5, "x"], "b": {"c": null, "d": true}});
        let value = Value::from_json(&json);
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn test_object_keys_emit_sorted() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("b".to_string(), Value::Num(1.0));
        entries.insert("a".to_string(), Value::Num(2.0));
        let json = Value::map(entries).to_json().unwrap();
        assert_eq!(serde_json::to_string(&json).unwrap(), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_integral_floats_collapse() {
        assert_eq!(Value::Num(7.0).to_json().unwrap(), json!(7));
        assert_eq!(Value::Num(2.5).to_json().unwrap(), json!(2.5));
    }

    #[test]
    fn test_function_not_representable() {
        let f = Value::Func(Rc::new(Function::Native {
            name: "print",
            f: |_, _| Ok(Value::Null),
        }));
        assert_eq!(f.to_json(), Err(Unrepresentable::Function));
    }

    #[test]
    fn test_cycle_detected() {
        let list = Value::list(vec![Value::Num(1.0)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(list.to_json(), Err(Unrepresentable::Cycle));
    }

    #[test]
    fn test_shared_but_acyclic_is_fine() {
        let inner = Value::list(vec![Value::Num(1.0)]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(outer.to_json().unwrap(), json!([[1], [1]]));
    }

    #[test]
    fn test_non_finite_not_representable() {
        assert_eq!(
            Value::Num(f64::INFINITY).to_json(),
            Err(Unrepresentable::NonFinite)
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(!Value::list(vec![]).truthy());
        assert!(Value::Num(1.0).truthy());
        assert!(Value::Str("x".into()).truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Str("hi".into()).to_string(), "hi");
        assert_eq!(Value::Num(3.0).to_string(), "3");
        let list = Value::list(vec![Value::Str("a".into()), Value::Num(1.0)]);
        assert_eq!(list.to_string(), r#"["a", 1]"#);
    }

    #[test]
    fn test_scope_chain() {
        let root = Scope::root();
        root.set("x", Value::Num(1.0));
        let child = root.child();
        assert_eq!(child.get("x"), Some(Value::Num(1.0)));
        child.set("x", Value::Num(2.0));
        assert_eq!(child.get("x"), Some(Value::Num(2.0)));
        assert_eq!(root.get("x"), Some(Value::Num(1.0)));
        assert_eq!(root.get_local("missing"), None);
    }
}
