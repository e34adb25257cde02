// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Expression evaluator: a stack machine over a reverse-Polish stream.
//!
//! An EXPR is a literal AC whose items are literal operand values,
//! value-producing references, and OPER references. Expansion walks the
//! source AC into an input queue, splicing nested EXPR literals inline, so
//! an expression's result is always the single remaining stack element.

use std::fmt;

use crate::amm::{dereference, ItemizedParams, Lookup, MatchRes, ObjData};
use crate::ari::Ari;
use crate::runctx::RunCtx;
use crate::valprod;

/// Evaluation failure.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// A non-EXPR literal or non-value object was evaluated.
    BadType { what: String },
    /// An object reference in the stream did not dereference.
    DerefFailed { what: String },
    /// A value-producing reference failed to produce.
    ProdFailed { what: String },
    /// The stack did not hold exactly one value at exhaustion
    /// (`EVAL_NON_SINGLE`).
    NonSingle { depth: usize },
    /// Operand coercion failure, missing operand, or an OPER evaluator
    /// leaving its result undefined (`EVAL_FAILED`).
    Failed { what: String },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::BadType { what } => write!(f, "cannot evaluate {}", what),
            EvalError::DerefFailed { what } => write!(f, "dereference failed for {}", what),
            EvalError::ProdFailed { what } => write!(f, "production failed for {}", what),
            EvalError::NonSingle { depth } => {
                write!(f, "evaluation left {} values on the stack", depth)
            }
            EvalError::Failed { what } => write!(f, "evaluation failed: {}", what),
        }
    }
}

impl std::error::Error for EvalError {}

/// Context handed to an OPER evaluator callback.
pub struct OperEvalCtx<'a> {
    pub runctx: &'a RunCtx,
    /// The OPER's own actual parameters (from the reference).
    pub aparams: &'a ItemizedParams,
    /// Popped and type-coerced operands, in push order.
    pub operands: ItemizedParams,
    result: Option<Ari>,
}

impl<'a> OperEvalCtx<'a> {
    pub fn operand_index(&self, i: usize) -> Option<&Ari> {
        self.operands.index(i)
    }

    pub fn operand_name(&self, name: &str) -> Option<&Ari> {
        self.operands.name(name)
    }

    pub fn has_operand_undefined(&self) -> bool {
        self.operands.any_undefined
    }

    pub fn aparam_index(&self, i: usize) -> Option<&Ari> {
        self.aparams.index(i)
    }

    /// Set the evaluation result. Leaving it unset, or setting undefined,
    /// fails the enclosing evaluation.
    pub fn set_result(&mut self, value: Ari) {
        self.result = Some(value);
    }
}

/// Evaluate an EXPR target: a literal AC matching the EXPR type, or an
/// object reference whose production yields one.
pub fn eval_target(runctx: &RunCtx, target: &Ari) -> Result<Ari, EvalError> {
    let expr = resolve_expr(runctx, target)?;
    let items = expr.as_ac().ok_or_else(|| EvalError::BadType {
        what: expr.to_string(),
    })?;

    let mut input = Vec::new();
    expand(runctx, items, &mut input);
    run(runctx, input)
}

/// Evaluate a condition and reduce it to a boolean by truthiness.
pub fn eval_condition(runctx: &RunCtx, condition: &Ari) -> Result<Ari, EvalError> {
    let result = eval_target(runctx, condition)?;
    Ok(Ari::bool(result.is_truthy()))
}

/// Resolve a reference target down to the EXPR literal to evaluate.
fn resolve_expr(runctx: &RunCtx, target: &Ari) -> Result<Ari, EvalError> {
    if !target.is_ref() {
        let store = runctx.core.store.read();
        let matched = runctx.core.expr_type().match_ari(&store, target);
        drop(store);
        if matched != MatchRes::Positive {
            return Err(EvalError::BadType {
                what: target.to_string(),
            });
        }
        return Ok(target.clone());
    }

    let lookup = deref_for_eval(runctx, target)?;
    match &lookup.obj.data {
        ObjData::Const(_) | ObjData::Var(_) | ObjData::Edd(_) => {
            let value = valprod::produce(runctx, &lookup).map_err(|_| EvalError::ProdFailed {
                what: target.to_string(),
            })?;
            // the produced value must itself be an EXPR
            resolve_expr(runctx, &value)
        }
        _ => Err(EvalError::BadType {
            what: target.to_string(),
        }),
    }
}

fn deref_for_eval(runctx: &RunCtx, target: &Ari) -> Result<Lookup, EvalError> {
    let store = runctx.core.store.read();
    dereference(&store, target).map_err(|_| EvalError::DerefFailed {
        what: target.to_string(),
    })
}

/// Walk the source AC into the input queue, splicing nested EXPR literals
/// inline so they compose.
fn expand(runctx: &RunCtx, items: &[Ari], input: &mut Vec<Ari>) {
    for item in items {
        let nested = if item.is_ref() {
            None
        } else {
            item.as_ac().filter(|_| {
                let store = runctx.core.store.read();
                runctx.core.expr_type().match_ari(&store, item) == MatchRes::Positive
            })
        };
        match nested {
            Some(inner) => expand(runctx, inner, input),
            None => input.push(item.clone()),
        }
    }
}

/// The stack machine proper.
fn run(runctx: &RunCtx, input: Vec<Ari>) -> Result<Ari, EvalError> {
    let mut stack: Vec<Ari> = Vec::new();

    for item in input {
        if !item.is_ref() {
            stack.push(item);
            continue;
        }

        let lookup = deref_for_eval(runctx, &item)?;
        match &lookup.obj.data {
            ObjData::Const(_) | ObjData::Var(_) | ObjData::Edd(_) => {
                let value = valprod::produce(runctx, &lookup).map_err(|_| EvalError::ProdFailed {
                    what: item.to_string(),
                })?;
                stack.push(value);
            }
            ObjData::Oper(oper) => {
                let arity = oper.operands.len();
                if stack.len() < arity {
                    return Err(EvalError::Failed {
                        what: format!("{} needs {} operands", lookup.obj.id.name, arity),
                    });
                }

                // pop in reverse so operands sit in push order
                let mut popped = stack.split_off(stack.len() - arity);

                let mut operands = ItemizedParams::default();
                {
                    let store = runctx.core.store.read();
                    for (i, typ) in oper.operands.iter().enumerate() {
                        let orig = std::mem::replace(&mut popped[i], Ari::undefined());
                        let converted =
                            typ.typ
                                .convert(&store, &orig)
                                .map_err(|_| EvalError::Failed {
                                    what: format!(
                                        "operand \"{}\" failed conversion from {}",
                                        typ.name, orig
                                    ),
                                })?;
                        operands.named.insert(typ.name.clone(), i);
                        operands.ordered.push(converted);
                    }
                }

                let mut ctx = OperEvalCtx {
                    runctx,
                    aparams: &lookup.aparams,
                    operands,
                    result: None,
                };
                (oper.evaluate.0)(&mut ctx);

                match ctx.result {
                    Some(value) if !value.is_undefined() => stack.push(value),
                    _ => {
                        return Err(EvalError::Failed {
                            what: format!("operator {} produced no value", lookup.obj.id.name),
                        })
                    }
                }
            }
            _ => {
                return Err(EvalError::BadType {
                    what: item.to_string(),
                })
            }
        }
    }

    if stack.len() == 1 {
        Ok(stack.remove(0))
    } else {
        Err(EvalError::NonSingle { depth: stack.len() })
    }
}
