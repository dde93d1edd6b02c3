//! Tree-walking evaluator for guest programs.
//!
//! Every property read, write and call on an object created by another realm
//! goes through the engine's token check first.

use crate::parser::{Expression, Literal, Program, Statement};
use crate::sandbox::SandboxEngine;
use crate::Engine;
use core_types::{ErrorKind, JsResult, ObjectId, Thrown, Value};

/// Evaluation state of one script or function activation.
pub struct Interpreter<'e> {
    engine: &'e SandboxEngine,
    global: ObjectId,
    this: Value,
    locals: Vec<(String, Value)>,
}

impl<'e> Interpreter<'e> {
    /// Create an activation running in `global`'s realm.
    pub fn new(engine: &'e SandboxEngine, global: ObjectId, this: Value) -> Self {
        Self {
            engine,
            global,
            this,
            locals: Vec::new(),
        }
    }

    /// Declare or overwrite a local binding.
    pub fn bind(&mut self, name: &str, value: Value) {
        match self.locals.iter_mut().rev().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.locals.push((name.to_string(), value)),
        }
    }

    /// Execute a program and return its completion value.
    pub fn run(&mut self, program: &Program) -> JsResult {
        let mut completion = Value::Undefined;
        for statement in &program.body {
            match statement {
                Statement::Let { name, init } => {
                    let value = self.eval(init)?;
                    self.bind(name, value);
                }
                Statement::Throw(argument) => return Err(Thrown(self.eval(argument)?)),
                Statement::Return(argument) => return self.eval(argument),
                Statement::Expression(expr) => completion = self.eval(expr)?,
            }
        }
        Ok(completion)
    }

    fn eval(&mut self, expr: &Expression) -> JsResult {
        match expr {
            Expression::Literal(literal) => Ok(match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
            }),
            Expression::This => Ok(self.this.clone()),
            Expression::Identifier(name) => self.lookup(name),
            Expression::Member { object, property } => {
                let base = self.eval(object)?;
                self.get_property(&base, property)
            }
            Expression::Call { callee, arguments } => {
                let (function, this) = match callee.as_ref() {
                    Expression::Member { object, property } => {
                        let base = self.eval(object)?;
                        (self.get_property(&base, property)?, base)
                    }
                    other => (self.eval(other)?, Value::Undefined),
                };
                let args = self.eval_arguments(arguments)?;
                match function {
                    Value::Object(id) if self.engine.is_callable(&function) => {
                        self.check_access(id, &callee.describe())?;
                        self.engine.call(id, this, &args)
                    }
                    _ => Err(self.error(
                        ErrorKind::TypeError,
                        format!("{} is not a function", callee.describe()),
                    )),
                }
            }
            Expression::New { callee, arguments } => {
                let constructor = self.eval(callee)?;
                let args = self.eval_arguments(arguments)?;
                match constructor {
                    Value::Object(id) if self.engine.is_constructor(&constructor) => {
                        self.check_access(id, &callee.describe())?;
                        self.engine.construct(id, &args, None)
                    }
                    _ => Err(self.error(
                        ErrorKind::TypeError,
                        format!("{} is not a constructor", callee.describe()),
                    )),
                }
            }
            Expression::Assign { target, value } => {
                let value = self.eval(value)?;
                match target.as_ref() {
                    Expression::Identifier(name) => self.assign(name, value.clone())?,
                    Expression::Member { object, property } => {
                        let base = self.eval(object)?;
                        self.set_property(&base, property, value.clone())?;
                    }
                    _ => {
                        return Err(self.error(
                            ErrorKind::SyntaxError,
                            "Invalid left-hand side in assignment",
                        ))
                    }
                }
                Ok(value)
            }
        }
    }

    fn eval_arguments(&mut self, arguments: &[Expression]) -> JsResult<Vec<Value>> {
        arguments.iter().map(|arg| self.eval(arg)).collect()
    }

    fn lookup(&self, name: &str) -> JsResult {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        if self.engine.has_property(self.global, name) {
            return self.engine.get(self.global, name);
        }
        Err(self.error(
            ErrorKind::ReferenceError,
            format!("{} is not defined", name),
        ))
    }

    fn assign(&mut self, name: &str, value: Value) -> JsResult<()> {
        if let Some((_, slot)) = self.locals.iter_mut().rev().find(|(n, _)| n == name) {
            *slot = value;
            return Ok(());
        }
        self.engine.set(self.global, name, value)
    }

    fn get_property(&self, base: &Value, property: &str) -> JsResult {
        match base {
            Value::Object(id) => {
                self.check_access(*id, property)?;
                self.engine.get(*id, property)
            }
            Value::Undefined | Value::Null => Err(self.error(
                ErrorKind::TypeError,
                format!("Cannot read properties of {} (reading '{}')", base, property),
            )),
            Value::String(s) if property == "length" => Ok(Value::Number(s.chars().count() as f64)),
            _ => Ok(Value::Undefined),
        }
    }

    fn set_property(&self, base: &Value, property: &str, value: Value) -> JsResult<()> {
        match base {
            Value::Object(id) => {
                self.check_access(*id, property)?;
                self.engine.set(*id, property, value)
            }
            Value::Undefined | Value::Null => Err(self.error(
                ErrorKind::TypeError,
                format!("Cannot set properties of {} (setting '{}')", base, property),
            )),
            _ => Ok(()),
        }
    }

    fn check_access(&self, target: ObjectId, what: &str) -> JsResult<()> {
        if self.engine.may_access(self.global, target) {
            Ok(())
        } else {
            Err(self.error(
                ErrorKind::TypeError,
                format!("Permission denied to access property '{}'", what),
            ))
        }
    }

    fn error(&self, kind: ErrorKind, message: impl Into<String>) -> Thrown {
        self.engine.throw_error(self.global, kind, message)
    }
}
