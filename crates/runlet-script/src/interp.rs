//! Tree-walking interpreter.
//!
//! [`Interp::run`] executes a program as the body of a synthesized
//! zero-argument callable: `return` at any depth produces the call's return
//! value, and the statements run directly in the scope handed in, so
//! top-level assignments remain visible to the caller afterwards.

use std::io::Write;
use std::rc::Rc;

use crate::ast::{AssignTarget, BinOp, Expr, Program, Stmt, UnaryOp};
use crate::error::RuntimeError;
use crate::value::{format_num, Function, Scope, Value};

/// Control flow signal from statement execution.
enum Flow {
    Normal,
    Return(Option<Value>),
    Break,
    Continue,
}

pub struct Interp<'a> {
    out: &'a mut dyn Write,
}

impl<'a> Interp<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Interp { out }
    }

    /// Run a program in `scope`, returning the value of the first executed
    /// `return` statement, or `None` when execution falls off the end.
    pub fn run(
        &mut self,
        program: &Program,
        scope: &Scope,
    ) -> Result<Option<Value>, RuntimeError> {
        match self.exec_block(&program.stmts, scope)? {
            Flow::Return(v) => Ok(v),
            // Break/Continue cannot escape: the parser rejects them outside
            // loops and function bodies reset loop depth.
            _ => Ok(None),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], scope: &Scope) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.exec_stmt(stmt, scope)? {
                Flow::Normal => {}
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Scope) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Assign {
                target,
                value,
                line,
            } => {
                let value = self.eval(value, scope)?;
                match target {
                    AssignTarget::Name(name) => scope.set(name.clone(), value),
                    AssignTarget::Index { target, index } => {
                        let container = self.eval(target, scope)?;
                        let index = self.eval(index, scope)?;
                        self.index_set(container, index, value, *line)?;
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => Some(self.eval(expr, scope)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                if self.eval(cond, scope)?.truthy() {
                    self.exec_block(then_body, scope)
                } else {
                    self.exec_block(else_body, scope)
                }
            }
            Stmt::While { cond, body, .. } => {
                while self.eval(cond, scope)?.truthy() {
                    match self.exec_block(body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                var,
                iter,
                body,
                line,
            } => {
                let items = self.iterable(iter, scope, *line)?;
                for item in items {
                    scope.set(var.clone(), item);
                    match self.exec_block(body, scope)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),
            Stmt::FnDef {
                name, params, body, ..
            } => {
                let func = Function::Script {
                    name: Some(name.clone()),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    env: scope.clone(),
                };
                scope.set(name.clone(), Value::Func(Rc::new(func)));
                Ok(Flow::Normal)
            }
            Stmt::Expr { expr, .. } => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Snapshot the elements of a for-loop target so body mutations of the
    /// container do not disturb iteration.
    fn iterable(
        &mut self,
        expr: &Expr,
        scope: &Scope,
        line: usize,
    ) -> Result<Vec<Value>, RuntimeError> {
        match self.eval(expr, scope)? {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Map(entries) => Ok(entries
                .borrow()
                .keys()
                .map(|k| Value::Str(k.clone()))
                .collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(RuntimeError::new(
                format!("cannot iterate over {}", other.type_name()),
                line,
            )),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Ident(name, line) => scope.get(name).ok_or_else(|| {
                RuntimeError::new(format!("undefined variable '{name}'"), *line)
            }),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|e| self.eval(e, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expr::Map(entries) => {
                let mut map = std::collections::BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval(value, scope)?);
                }
                Ok(Value::map(map))
            }
            Expr::Unary { op, expr, line } => {
                let value = self.eval(expr, scope)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => match value {
                        Value::Num(n) => Ok(Value::Num(-n)),
                        other => Err(RuntimeError::new(
                            format!("cannot negate {}", other.type_name()),
                            *line,
                        )),
                    },
                }
            }
            Expr::Binary { op, lhs, rhs, line } => self.eval_binary(*op, lhs, rhs, scope, *line),
            Expr::Index {
                target,
                index,
                line,
            } => {
                let container = self.eval(target, scope)?;
                let index = self.eval(index, scope)?;
                self.index_get(container, index, *line)
            }
            Expr::Call { callee, args, line } => {
                let callee = self.eval(callee, scope)?;
                let args = args
                    .iter()
                    .map(|e| self.eval(e, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_value(callee, args, *line)
            }
            Expr::Func { params, body } => Ok(Value::Func(Rc::new(Function::Script {
                name: None,
                params: params.clone(),
                body: Rc::new(body.clone()),
                env: scope.clone(),
            }))),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        scope: &Scope,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        // Short-circuit forms yield the deciding operand, not a bool.
        if op == BinOp::And {
            let left = self.eval(lhs, scope)?;
            return if left.truthy() {
                self.eval(rhs, scope)
            } else {
                Ok(left)
            };
        }
        if op == BinOp::Or {
            let left = self.eval(lhs, scope)?;
            return if left.truthy() {
                Ok(left)
            } else {
                self.eval(rhs, scope)
            };
        }

        let left = self.eval(lhs, scope)?;
        let right = self.eval(rhs, scope)?;
        let type_error = || {
            RuntimeError::new(
                format!(
                    "unsupported operands for '{}': {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ),
                line,
            )
        };

        match op {
            BinOp::Add => match (&left, &right) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Ok(Value::Str(format!("{left}{right}")))
                }
                (Value::List(a), Value::List(b)) => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                _ => Err(type_error()),
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => match (&left, &right) {
                (Value::Num(a), Value::Num(b)) => match op {
                    BinOp::Sub => Ok(Value::Num(a - b)),
                    BinOp::Mul => Ok(Value::Num(a * b)),
                    BinOp::Div => {
                        if *b == 0.0 {
                            Err(RuntimeError::new("division by zero", line))
                        } else {
                            Ok(Value::Num(a / b))
                        }
                    }
                    BinOp::Rem => {
                        if *b == 0.0 {
                            Err(RuntimeError::new("modulo by zero", line))
                        } else {
                            Ok(Value::Num(a % b))
                        }
                    }
                    _ => unreachable!(),
                },
                _ => Err(type_error()),
            },
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => match (&left, &right) {
                (Value::Num(a), Value::Num(b)) => Ok(Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    BinOp::Ge => a >= b,
                    _ => unreachable!(),
                })),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Bool(match op {
                    BinOp::Lt => a < b,
                    BinOp::Le => a <= b,
                    BinOp::Gt => a > b,
                    BinOp::Ge => a >= b,
                    _ => unreachable!(),
                })),
                _ => Err(type_error()),
            },
            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    fn index_get(
        &mut self,
        container: Value,
        index: Value,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        match (&container, &index) {
            (Value::Map(entries), Value::Str(key)) => {
                entries.borrow().get(key).cloned().ok_or_else(|| {
                    RuntimeError::new(format!("unknown key \"{key}\""), line)
                })
            }
            (Value::List(items), Value::Num(n)) => {
                let items = items.borrow();
                let i = list_index(*n, items.len())
                    .ok_or_else(|| list_range_error(*n, items.len(), line))?;
                Ok(items[i].clone())
            }
            (Value::Str(s), Value::Num(n)) => {
                let chars: Vec<char> = s.chars().collect();
                let i = list_index(*n, chars.len())
                    .ok_or_else(|| list_range_error(*n, chars.len(), line))?;
                Ok(Value::Str(chars[i].to_string()))
            }
            _ => Err(RuntimeError::new(
                format!(
                    "cannot index {} with {}",
                    container.type_name(),
                    index.type_name()
                ),
                line,
            )),
        }
    }

    fn index_set(
        &mut self,
        container: Value,
        index: Value,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        match (&container, &index) {
            (Value::Map(entries), Value::Str(key)) => {
                entries.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            (Value::List(items), Value::Num(n)) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                let i = list_index(*n, len).ok_or_else(|| list_range_error(*n, len, line))?;
                items[i] = value;
                Ok(())
            }
            _ => Err(RuntimeError::new(
                format!(
                    "cannot assign into {} with {} index",
                    container.type_name(),
                    index.type_name()
                ),
                line,
            )),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let func = match callee {
            Value::Func(f) => f,
            other => {
                return Err(RuntimeError::new(
                    format!("{} is not callable", other.type_name()),
                    line,
                ));
            }
        };
        match &*func {
            Function::Native { f, .. } => {
                f(&args, self.out).map_err(|message| RuntimeError::new(message, line))
            }
            Function::Script {
                name, params, body, env,
            } => {
                if args.len() != params.len() {
                    let label = name.as_deref().unwrap_or("fn");
                    return Err(RuntimeError::new(
                        format!(
                            "{label}() expects {} argument(s), got {}",
                            params.len(),
                            args.len()
                        ),
                        line,
                    ));
                }
                let local = env.child();
                for (param, arg) in params.iter().zip(args) {
                    local.set(param.clone(), arg);
                }
                match self.exec_block(body, &local)? {
                    Flow::Return(v) => Ok(v.unwrap_or(Value::Null)),
                    _ => Ok(Value::Null),
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builtins
// ─────────────────────────────────────────────────────────────────────────────

/// Install the built-in functions into a scope.
pub fn install_builtins(scope: &Scope) {
    let builtins: &[(&'static str, crate::value::NativeFn)] = &[
        ("print", builtin_print),
        ("len", builtin_len),
        ("str", builtin_str),
        ("keys", builtin_keys),
        ("push", builtin_push),
        ("range", builtin_range),
        ("type", builtin_type),
    ];
    for (name, f) in builtins.iter().copied() {
        scope.set(name, Value::Func(Rc::new(Function::Native { name, f })));
    }
}

fn builtin_print(args: &[Value], out: &mut dyn Write) -> Result<Value, String> {
    let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    writeln!(out, "{}", rendered.join(" ")).map_err(|e| format!("write failed: {e}"))?;
    Ok(Value::Null)
}

fn builtin_len(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    match args {
        [Value::Str(s)] => Ok(Value::Num(s.chars().count() as f64)),
        [Value::List(items)] => Ok(Value::Num(items.borrow().len() as f64)),
        [Value::Map(entries)] => Ok(Value::Num(entries.borrow().len() as f64)),
        [other] => Err(format!("len() expects a string, list, or map, got {}", other.type_name())),
        _ => Err(format!("len() expects 1 argument, got {}", args.len())),
    }
}

fn builtin_str(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    match args {
        [value] => Ok(Value::Str(value.to_string())),
        _ => Err(format!("str() expects 1 argument, got {}", args.len())),
    }
}

fn builtin_keys(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    match args {
        [Value::Map(entries)] => Ok(Value::list(
            entries
                .borrow()
                .keys()
                .map(|k| Value::Str(k.clone()))
                .collect(),
        )),
        [other] => Err(format!("keys() expects a map, got {}", other.type_name())),
        _ => Err(format!("keys() expects 1 argument, got {}", args.len())),
    }
}

fn builtin_push(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    match args {
        [Value::List(items), value] => {
            items.borrow_mut().push(value.clone());
            Ok(Value::Null)
        }
        [other, _] => Err(format!("push() expects a list, got {}", other.type_name())),
        _ => Err(format!("push() expects 2 arguments, got {}", args.len())),
    }
}

fn builtin_range(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    let (start, end) = match args {
        [Value::Num(end)] => (0.0, *end),
        [Value::Num(start), Value::Num(end)] => (*start, *end),
        _ => return Err("range() expects 1 or 2 number arguments".into()),
    };
    if start.fract() != 0.0 || end.fract() != 0.0 {
        return Err("range() expects whole numbers".into());
    }
    let mut items = Vec::new();
    let mut i = start;
    while i < end {
        items.push(Value::Num(i));
        i += 1.0;
    }
    Ok(Value::list(items))
}

fn builtin_type(args: &[Value], _out: &mut dyn Write) -> Result<Value, String> {
    match args {
        [value] => Ok(Value::Str(value.type_name().into())),
        _ => Err(format!("type() expects 1 argument, got {}", args.len())),
    }
}

fn list_index(n: f64, len: usize) -> Option<usize> {
    if n.fract() != 0.0 || n < 0.0 {
        return None;
    }
    let i = n as usize;
    if i < len {
        Some(i)
    } else {
        None
    }
}

fn list_range_error(n: f64, len: usize, line: usize) -> RuntimeError {
    RuntimeError::new(
        format!("index {} out of range (len {len})", format_num(n)),
        line,
    )
}
