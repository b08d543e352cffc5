//! Bounded-step evaluator
//!
//! A CEK machine: the control is either an expression to evaluate in an
//! environment or a value being returned, and pending work lives on an
//! explicit continuation stack. Every machine transition is one iteration,
//! so deep recursion in a program never recurses on the Rust stack.

use std::rc::Rc;

use tracing::{debug, info};

use crate::builtins::{self, Builtin};
use crate::commit::CommitmentStore;
use crate::error::{EvalError, Result};
use crate::reader;
use crate::tag::TaggedValue;
use crate::value::{Closure, Env, Lookup, Value};

/// Evaluation bounds and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum number of machine transitions
    pub max_steps: usize,
    /// Report every transition through `tracing`
    pub debug: bool,
}

impl EvalConfig {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            debug: false,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Result of a terminated evaluation
#[derive(Debug, Clone)]
pub struct EvalOutput {
    pub value: Value,
    pub tagged: TaggedValue,
    /// Transitions taken; never more than `max_steps`
    pub iterations: usize,
    /// Values passed to `emit`, in order
    pub emitted: Vec<Value>,
}

/// What the machine is about to do at a step
#[derive(Debug, Clone, Copy)]
pub enum ControlView<'a> {
    Eval(&'a Value),
    Return(&'a Value),
}

/// One machine transition as seen by an observer
#[derive(Debug, Clone, Copy)]
pub struct StepView<'a> {
    /// 1-based step number
    pub index: usize,
    pub control: ControlView<'a>,
    /// Continuation stack depth before the transition
    pub depth: usize,
}

/// Receives every transition of an evaluation
pub trait StepObserver {
    fn observe(&mut self, step: &StepView<'_>);
}

impl StepObserver for () {
    fn observe(&mut self, _step: &StepView<'_>) {}
}

enum Control {
    Eval(Value, Env),
    Return(Value),
}

enum Callee {
    Builtin(Builtin),
    Closure(Rc<Closure>),
}

enum Cont {
    If {
        then: Value,
        otherwise: Value,
        env: Env,
    },
    Let {
        name: Rc<str>,
        /// Remaining bindings, next one last
        rest: Vec<(Rc<str>, Value)>,
        body: Value,
        env: Env,
    },
    Begin {
        /// Remaining expressions, next one last
        rest: Vec<Value>,
        env: Env,
    },
    CallHead {
        args: Vec<Value>,
        env: Env,
    },
    CallArgs {
        callee: Callee,
        /// Unevaluated arguments, next one last
        pending: Vec<Value>,
        done: Vec<Value>,
        env: Env,
    },
    ApplyRest {
        args: Vec<Value>,
    },
    Emit,
    EvalData,
}

const SPECIAL_FORMS: &[&str] = &["quote", "if", "lambda", "let", "letrec", "begin", "emit", "eval"];

/// Whether `name` is a reserved special-form keyword
pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name)
}

/// Evaluator with its commitment openings
///
/// Openings created by `hide`/`commit` during a run stay available to later
/// runs on the same evaluator.
#[derive(Debug)]
pub struct Evaluator {
    config: EvalConfig,
    commitments: CommitmentStore,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Self {
        Self::with_commitments(config, CommitmentStore::new())
    }

    /// Evaluator pre-seeded with known openings
    pub fn with_commitments(config: EvalConfig, commitments: CommitmentStore) -> Self {
        Self {
            config,
            commitments,
        }
    }

    pub fn config(&self) -> EvalConfig {
        self.config
    }

    pub fn commitments(&self) -> &CommitmentStore {
        &self.commitments
    }

    pub fn eval_expr(&mut self, expr: &Value) -> Result<EvalOutput> {
        self.run(expr, &mut ())
    }

    pub fn eval_source(&mut self, src: &str) -> Result<EvalOutput> {
        let expr = reader::read(src)?;
        self.eval_expr(&expr)
    }

    /// Evaluate `(program private public)`
    pub fn eval_program(&mut self, program: &str, private: &str, public: &str) -> Result<EvalOutput> {
        let expr = program_expr(program, private, public)?;
        self.eval_expr(&expr)
    }

    /// Run the machine on `expr`, reporting each transition to `observer`
    pub fn run<O: StepObserver>(&mut self, expr: &Value, observer: &mut O) -> Result<EvalOutput> {
        let max_steps = self.config.max_steps;
        let mut control = Control::Eval(expr.clone(), Env::empty());
        let mut stack: Vec<Cont> = Vec::new();
        let mut emitted = Vec::new();
        let mut iterations = 0usize;

        loop {
            if let Control::Return(value) = &control {
                if stack.is_empty() {
                    let value = value.clone();
                    debug!(iterations, result = %value, "evaluation finished");
                    return Ok(EvalOutput {
                        tagged: value.tagged(),
                        value,
                        iterations,
                        emitted,
                    });
                }
            }
            if iterations >= max_steps {
                debug!(max_steps, "evaluation exhausted step bound");
                return Err(EvalError::Exhausted { max_steps });
            }
            iterations += 1;

            let view = StepView {
                index: iterations,
                control: match &control {
                    Control::Eval(expr, _) => ControlView::Eval(expr),
                    Control::Return(value) => ControlView::Return(value),
                },
                depth: stack.len(),
            };
            if self.config.debug {
                trace_step(&view);
            }
            observer.observe(&view);

            control = match control {
                Control::Eval(expr, env) => self.eval_step(expr, env, &mut stack)?,
                Control::Return(value) => {
                    // The loop head returns when the stack is empty
                    let Some(cont) = stack.pop() else {
                        return Err(EvalError::Malformed("empty continuation".into()));
                    };
                    self.return_step(value, cont, &mut stack, &mut emitted)?
                }
            };
        }
    }

    fn eval_step(&mut self, expr: Value, env: Env, stack: &mut Vec<Cont>) -> Result<Control> {
        let parts = match &expr {
            Value::Sym(name) => return lookup(name, &env),
            Value::Cons(pair) => Some((pair.car.clone(), pair.cdr.clone())),
            _ => None,
        };
        let Some((head, tail)) = parts else {
            return Ok(Control::Return(expr));
        };
        let args = tail
            .list_items()
            .ok_or_else(|| EvalError::Malformed(format!("improper list in call: {}", expr)))?;

        if let Some(name) = head.as_sym() {
            match name {
                "quote" => {
                    let [quoted] = exact::<1>("quote", args)?;
                    return Ok(Control::Return(quoted));
                }
                "if" => {
                    let (cond, then, otherwise) = match args.len() {
                        2 => {
                            let [c, t] = exact::<2>("if", args)?;
                            (c, t, Value::Nil)
                        }
                        _ => {
                            let [c, t, e] = exact::<3>("if", args)?;
                            (c, t, e)
                        }
                    };
                    stack.push(Cont::If {
                        then,
                        otherwise,
                        env: env.clone(),
                    });
                    return Ok(Control::Eval(cond, env));
                }
                "lambda" => {
                    let [params, body] = exact::<2>("lambda", args)?;
                    let params = symbol_list("lambda", &params)?;
                    return Ok(Control::Return(Value::Fun(Rc::new(Closure::new(params, body, env)))));
                }
                "let" => {
                    let [bindings, body] = exact::<2>("let", args)?;
                    let mut rest = bindings_of("let", &bindings)?;
                    rest.reverse();
                    return Ok(match rest.pop() {
                        None => Control::Eval(body, env),
                        Some((name, init)) => {
                            stack.push(Cont::Let {
                                name,
                                rest,
                                body,
                                env: env.clone(),
                            });
                            Control::Eval(init, env)
                        }
                    });
                }
                "letrec" => {
                    let [bindings, body] = exact::<2>("letrec", args)?;
                    let env = bindings_of("letrec", &bindings)?
                        .into_iter()
                        .fold(env, |env, (name, init)| env.extend_rec(name, init));
                    return Ok(Control::Eval(body, env));
                }
                "begin" => {
                    let mut rest = args;
                    rest.reverse();
                    return Ok(match rest.pop() {
                        None => Control::Return(Value::Nil),
                        Some(first) => {
                            if !rest.is_empty() {
                                stack.push(Cont::Begin {
                                    rest,
                                    env: env.clone(),
                                });
                            }
                            Control::Eval(first, env)
                        }
                    });
                }
                "emit" => {
                    let [arg] = exact::<1>("emit", args)?;
                    stack.push(Cont::Emit);
                    return Ok(Control::Eval(arg, env));
                }
                "eval" => {
                    let [arg] = exact::<1>("eval", args)?;
                    stack.push(Cont::EvalData);
                    return Ok(Control::Eval(arg, env));
                }
                _ => {}
            }

            if !env.is_bound(name) {
                if let Some(op) = Builtin::from_name(name) {
                    return self.start_args(Callee::Builtin(op), args, env, stack);
                }
            }
        }

        stack.push(Cont::CallHead {
            args,
            env: env.clone(),
        });
        Ok(Control::Eval(head, env))
    }

    fn return_step(
        &mut self,
        value: Value,
        cont: Cont,
        stack: &mut Vec<Cont>,
        emitted: &mut Vec<Value>,
    ) -> Result<Control> {
        match cont {
            Cont::If {
                then,
                otherwise,
                env,
            } => Ok(Control::Eval(if value.is_nil() { otherwise } else { then }, env)),
            Cont::Let {
                name,
                mut rest,
                body,
                env,
            } => {
                let env = env.extend(name, value);
                Ok(match rest.pop() {
                    None => Control::Eval(body, env),
                    Some((name, init)) => {
                        stack.push(Cont::Let {
                            name,
                            rest,
                            body,
                            env: env.clone(),
                        });
                        Control::Eval(init, env)
                    }
                })
            }
            Cont::Begin { mut rest, env } => match rest.pop() {
                None => Ok(Control::Return(value)),
                Some(next) => {
                    if !rest.is_empty() {
                        stack.push(Cont::Begin {
                            rest,
                            env: env.clone(),
                        });
                    }
                    Ok(Control::Eval(next, env))
                }
            },
            Cont::CallHead { args, env } => match value {
                Value::Fun(closure) => self.start_args(Callee::Closure(closure), args, env, stack),
                other => Err(EvalError::TypeMismatch {
                    op: "apply",
                    expected: "function",
                    found: other.type_name(),
                }),
            },
            Cont::CallArgs {
                callee,
                mut pending,
                mut done,
                env,
            } => {
                done.push(value);
                match pending.pop() {
                    None => self.apply(callee, done, stack),
                    Some(next) => {
                        stack.push(Cont::CallArgs {
                            callee,
                            pending,
                            done,
                            env: env.clone(),
                        });
                        Ok(Control::Eval(next, env))
                    }
                }
            }
            Cont::ApplyRest { args } => match value {
                Value::Fun(closure) => apply_closure(closure, args, stack),
                other => Err(EvalError::TypeMismatch {
                    op: "apply",
                    expected: "function",
                    found: other.type_name(),
                }),
            },
            Cont::Emit => {
                info!(value = %value, "emit");
                emitted.push(value.clone());
                Ok(Control::Return(value))
            }
            Cont::EvalData => Ok(Control::Eval(value, Env::empty())),
        }
    }

    fn start_args(
        &mut self,
        callee: Callee,
        args: Vec<Value>,
        env: Env,
        stack: &mut Vec<Cont>,
    ) -> Result<Control> {
        let mut pending = args;
        pending.reverse();
        match pending.pop() {
            None => self.apply(callee, Vec::new(), stack),
            Some(first) => {
                let done = Vec::with_capacity(pending.len() + 1);
                stack.push(Cont::CallArgs {
                    callee,
                    pending,
                    done,
                    env: env.clone(),
                });
                Ok(Control::Eval(first, env))
            }
        }
    }

    fn apply(&mut self, callee: Callee, args: Vec<Value>, stack: &mut Vec<Cont>) -> Result<Control> {
        match callee {
            Callee::Builtin(op) => {
                builtins::apply(op, args, &mut self.commitments).map(Control::Return)
            }
            Callee::Closure(closure) => apply_closure(closure, args, stack),
        }
    }
}

/// Apply a curried closure
///
/// Fewer arguments than parameters yields a closure over the rest; extra
/// arguments are applied to whatever the body returns.
fn apply_closure(closure: Rc<Closure>, args: Vec<Value>, stack: &mut Vec<Cont>) -> Result<Control> {
    if args.is_empty() && !closure.params.is_empty() {
        return Ok(Control::Return(Value::Fun(closure)));
    }

    let bound = args.len().min(closure.params.len());
    let mut args = args.into_iter();
    let mut env = closure.env.clone();
    for (param, arg) in closure.params.iter().zip(args.by_ref().take(bound)) {
        env = env.extend(param.clone(), arg);
    }

    if bound < closure.params.len() {
        return Ok(Control::Return(Value::Fun(Rc::new(Closure::new(
            closure.params[bound..].to_vec(),
            closure.body.clone(),
            env,
        )))));
    }

    let extra: Vec<Value> = args.collect();
    if !extra.is_empty() {
        stack.push(Cont::ApplyRest { args: extra });
    }
    Ok(Control::Eval(closure.body.clone(), env))
}

fn lookup(name: &str, env: &Env) -> Result<Control> {
    match env.lookup(name) {
        Some(Lookup::Value(v)) => Ok(Control::Return(v)),
        Some(Lookup::Rec { expr, env }) => Ok(Control::Eval(expr, env)),
        None if name == "t" => Ok(Control::Return(Value::t())),
        None => Err(EvalError::UnboundVariable(name.to_string())),
    }
}

fn exact<const N: usize>(form: &str, args: Vec<Value>) -> Result<[Value; N]> {
    let actual = args.len();
    <[Value; N]>::try_from(args).map_err(|_| EvalError::ArityMismatch {
        op: form.to_string(),
        expected: N,
        actual,
    })
}

fn symbol_list(form: &str, v: &Value) -> Result<Vec<Rc<str>>> {
    let items = v
        .list_items()
        .ok_or_else(|| EvalError::Malformed(format!("{} parameters must be a list", form)))?;
    items
        .iter()
        .map(|item| match item {
            Value::Sym(s) if !is_special_form(s) && &**s != "t" => Ok(s.clone()),
            other => Err(EvalError::Malformed(format!(
                "{} parameter must be a symbol, found {}",
                form, other
            ))),
        })
        .collect()
}

fn bindings_of(form: &str, v: &Value) -> Result<Vec<(Rc<str>, Value)>> {
    let items = v
        .list_items()
        .ok_or_else(|| EvalError::Malformed(format!("{} bindings must be a list", form)))?;
    items
        .into_iter()
        .map(|binding| {
            let pair = binding.list_items().filter(|p| p.len() == 2);
            match pair.as_deref() {
                Some([Value::Sym(name), init]) if !is_special_form(name) => {
                    Ok((name.clone(), init.clone()))
                }
                _ => Err(EvalError::Malformed(format!(
                    "{} binding must be (symbol expr), found {}",
                    form, binding
                ))),
            }
        })
        .collect()
}

fn trace_step(step: &StepView<'_>) {
    match step.control {
        ControlView::Eval(expr) => debug!(
            target: "illium_lurk::trace",
            step = step.index,
            depth = step.depth,
            "eval {}",
            expr
        ),
        ControlView::Return(value) => debug!(
            target: "illium_lurk::trace",
            step = step.index,
            depth = step.depth,
            "return {}",
            value
        ),
    }
}

/// The expression evaluated for a program run: `(program 'private 'public)`
///
/// Blank parameter text reads as `nil`.
pub fn program_expr(program: &str, private: &str, public: &str) -> Result<Value> {
    let program = reader::read(program)?;
    let private = reader::read_or_nil(private)?;
    let public = reader::read_or_nil(public)?;
    Ok(Value::list(vec![program, quote(private), quote(public)]))
}

fn quote(v: Value) -> Value {
    Value::list(vec![Value::sym("quote"), v])
}

/// Evaluate a program against its inputs with a fresh evaluator
pub fn eval(
    program: &str,
    private: &str,
    public: &str,
    max_steps: usize,
    debug: bool,
) -> Result<EvalOutput> {
    Evaluator::new(EvalConfig::new(max_steps).with_debug(debug)).eval_program(program, private, public)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<Value> {
        Evaluator::new(EvalConfig::new(100_000))
            .eval_source(src)
            .map(|out| out.value)
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(run("42").unwrap(), Value::num(42));
        assert_eq!(run("\"s\"").unwrap(), Value::str("s"));
        assert_eq!(run("t").unwrap(), Value::t());
        assert_eq!(run("nil").unwrap(), Value::Nil);
    }

    #[test]
    fn test_special_forms() {
        assert_eq!(run("(if nil 1 2)").unwrap(), Value::num(2));
        assert_eq!(run("(if 0 1 2)").unwrap(), Value::num(1));
        assert_eq!(run("(if nil 1)").unwrap(), Value::Nil);
        assert_eq!(run("(let ((x 2) (y (+ x 1))) (* x y))").unwrap(), Value::num(6));
        assert_eq!(run("(begin 1 2 3)").unwrap(), Value::num(3));
        assert_eq!(run("(begin)").unwrap(), Value::Nil);
        assert_eq!(run("(quote (a b))").unwrap().to_string(), "(a b)");
        assert_eq!(run("(eval '(+ 1 2))").unwrap(), Value::num(3));
    }

    #[test]
    fn test_currying() {
        assert_eq!(run("(((lambda (a b) (- a b)) 5) 3)").unwrap(), Value::num(2));
        assert_eq!(
            run("((lambda (a) (lambda (b) (+ a b))) 1 2)").unwrap(),
            Value::num(3)
        );
        let f = run("(lambda (x) x)").unwrap();
        assert!(matches!(f, Value::Fun(_)));
        assert_eq!(run("((lambda () 9))").unwrap(), Value::num(9));
    }

    #[test]
    fn test_letrec_recursion() {
        let src = "(letrec ((fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1)))))))
                     (fact 10))";
        assert_eq!(run(src).unwrap(), Value::num(3_628_800));
    }

    #[test]
    fn test_shadowed_builtin() {
        assert_eq!(run("(let ((car (lambda (x) 7))) (car 1))").unwrap(), Value::num(7));
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(
            run("undefined").unwrap_err(),
            EvalError::UnboundVariable("undefined".into())
        );
        assert!(matches!(
            run("(1 2)").unwrap_err(),
            EvalError::TypeMismatch { op: "apply", .. }
        ));
        assert!(matches!(
            run("(quote)").unwrap_err(),
            EvalError::ArityMismatch { .. }
        ));
        assert!(matches!(
            run("(lambda (1) 1)").unwrap_err(),
            EvalError::Malformed(_)
        ));
    }

    #[test]
    fn test_exhaustion() {
        let mut ev = Evaluator::new(EvalConfig::new(50));
        let err = ev
            .eval_source("(letrec ((loop (lambda (n) (loop (+ n 1))))) (loop 0))")
            .unwrap_err();
        assert_eq!(err, EvalError::Exhausted { max_steps: 50 });

        let mut zero = Evaluator::new(EvalConfig::new(0));
        assert!(zero.eval_source("1").unwrap_err().is_exhausted());
    }

    #[test]
    fn test_emit_collected() {
        let out = Evaluator::new(EvalConfig::new(1_000))
            .eval_source("(begin (emit 1) (emit 2) 3)")
            .unwrap();
        assert_eq!(out.emitted, vec![Value::num(1), Value::num(2)]);
        assert_eq!(out.value, Value::num(3));
    }

    #[test]
    fn test_program_application() {
        let out = eval("(lambda (priv pub) (+ priv pub))", "4", "5", 1_000, false).unwrap();
        assert_eq!(out.value, Value::num(9));
        assert!(out.iterations > 0);

        let blank = eval("(lambda (priv pub) (eq priv pub))", "", "  ", 1_000, false).unwrap();
        assert_eq!(blank.value, Value::t());
    }

    #[test]
    fn test_observer_sees_every_step() {
        struct Count(usize);
        impl StepObserver for Count {
            fn observe(&mut self, step: &StepView<'_>) {
                self.0 += 1;
                assert_eq!(step.index, self.0);
            }
        }
        let expr = reader::read("(+ 1 (* 2 3))").unwrap();
        let mut count = Count(0);
        let out = Evaluator::new(EvalConfig::new(1_000))
            .run(&expr, &mut count)
            .unwrap();
        assert_eq!(count.0, out.iterations);
    }
}
