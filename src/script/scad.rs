// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD subset: pest parser plus a mesh-building evaluator.
//!
//! Booleans other than union need a CSG kernel and are rejected with an
//! evaluation error. Union is a plain mesh merge.

use super::sandbox::IncludeSandbox;
use super::ScriptEngine;
use crate::error::{ConvertError, Result};
use crate::geometry::{Mesh, Primitive, MAX_SEGMENTS};
use crate::model::NamedParameters;
use nalgebra::{Matrix3, Matrix4, Point3, Rotation3, Unit, Vector3};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Parser)]
#[grammar = "script/scad.pest"]
struct ScadParser;

#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    Assign(String, Expr),
    Include(String),
    Block(Vec<Stmt>),
    Instantiate(Call),
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    name: String,
    modifier: Option<char>,
    args: Vec<Argument>,
    children: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
struct Argument {
    name: Option<String>,
    value: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Bool(bool),
    Str(String),
    Undef,
    Vector(Vec<Expr>),
    Var(String),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Runtime value of an OpenSCAD expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
    Vector(Vec<Value>),
    Undef,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Vector(v) => !v.is_empty(),
            Value::Undef => false,
        }
    }

    /// Vectors of two or three numbers; a missing z is zero
    pub fn as_vec3(&self) -> Option<Vector3<f64>> {
        let Value::Vector(items) = self else {
            return None;
        };
        let numbers: Option<Vec<f64>> = items.iter().map(Value::as_number).collect();
        match numbers?.as_slice() {
            [x, y] => Some(Vector3::new(*x, *y, 0.0)),
            [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    fn as_index_list(&self) -> Option<Vec<usize>> {
        let Value::Vector(items) = self else {
            return None;
        };
        items
            .iter()
            .map(|item| match item {
                Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
                _ => None,
            })
            .collect()
    }
}

type Env = HashMap<String, Value>;

/// Evaluator for OpenSCAD sources
#[derive(Debug, Default, Clone, Copy)]
pub struct ScadEngine;

impl ScriptEngine for ScadEngine {
    fn evaluate(&self, source: &str, sandbox: &IncludeSandbox, params: &NamedParameters) -> Result<Mesh> {
        let statements = parse_program(source, "model script")?;
        let statements = expand_includes(statements, None, 0, sandbox)?;
        let evaluator = Evaluator { params };
        let mesh = evaluator.eval_scope(&statements, &Env::new(), true)?;
        debug!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "evaluated openscad model"
        );
        Ok(mesh)
    }
}

// Parsing

fn malformed() -> ConvertError {
    ConvertError::evaluation("malformed OpenSCAD syntax tree")
}

fn next_pair<'a>(pairs: &mut Pairs<'a, Rule>) -> Result<Pair<'a, Rule>> {
    pairs.next().ok_or_else(malformed)
}

fn first_inner(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>> {
    pair.into_inner().next().ok_or_else(malformed)
}

fn parse_program(source: &str, origin: &str) -> Result<Vec<Stmt>> {
    let program = ScadParser::parse(Rule::program, source)
        .map_err(|e| ConvertError::evaluation(format!("cannot parse {}:\n{}", origin, e)))?
        .next()
        .ok_or_else(malformed)?;

    let mut statements = Vec::new();
    for pair in program.into_inner() {
        if pair.as_rule() == Rule::statement {
            if let Some(stmt) = parse_statement(pair)? {
                statements.push(stmt);
            }
        }
    }
    Ok(statements)
}

fn parse_statement(pair: Pair<'_, Rule>) -> Result<Option<Stmt>> {
    let inner = first_inner(pair)?;
    let stmt = match inner.as_rule() {
        Rule::include_stmt => Some(Stmt::Include(first_inner(inner)?.as_str().trim().to_string())),
        Rule::block => Some(Stmt::Block(parse_block(inner)?)),
        Rule::assignment => {
            let mut parts = inner.into_inner();
            let name = next_pair(&mut parts)?.as_str().to_string();
            let value = parse_expr(next_pair(&mut parts)?)?;
            Some(Stmt::Assign(name, value))
        }
        Rule::instantiation => Some(Stmt::Instantiate(parse_instantiation(inner)?)),
        _ => None,
    };
    Ok(stmt)
}

fn parse_block(pair: Pair<'_, Rule>) -> Result<Vec<Stmt>> {
    let mut statements = Vec::new();
    for stmt in pair.into_inner() {
        if let Some(stmt) = parse_statement(stmt)? {
            statements.push(stmt);
        }
    }
    Ok(statements)
}

fn parse_instantiation(pair: Pair<'_, Rule>) -> Result<Call> {
    let mut call = Call {
        name: String::new(),
        modifier: None,
        args: Vec::new(),
        children: Vec::new(),
    };

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::modifier => call.modifier = part.as_str().chars().next(),
            Rule::ident => call.name = part.as_str().to_string(),
            Rule::arguments => {
                for arg in part.into_inner() {
                    call.args.push(parse_argument(arg)?);
                }
            }
            Rule::child => {
                if let Some(inner) = part.into_inner().next() {
                    call.children = match inner.as_rule() {
                        Rule::block => parse_block(inner)?,
                        Rule::instantiation => vec![Stmt::Instantiate(parse_instantiation(inner)?)],
                        _ => Vec::new(),
                    };
                }
            }
            _ => {}
        }
    }

    Ok(call)
}

fn parse_argument(pair: Pair<'_, Rule>) -> Result<Argument> {
    let inner = first_inner(pair)?;
    if inner.as_rule() == Rule::named_argument {
        let mut parts = inner.into_inner();
        let name = next_pair(&mut parts)?.as_str().to_string();
        let value = parse_expr(next_pair(&mut parts)?)?;
        Ok(Argument {
            name: Some(name),
            value,
        })
    } else {
        Ok(Argument {
            name: None,
            value: parse_expr(inner)?,
        })
    }
}

fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let mut lhs = parse_term(next_pair(&mut parts)?)?;
    while let Some(op) = parts.next() {
        let rhs = parse_term(next_pair(&mut parts)?)?;
        let op = if op.as_str() == "+" { BinOp::Add } else { BinOp::Sub };
        lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_term(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let mut lhs = parse_factor(next_pair(&mut parts)?)?;
    while let Some(op) = parts.next() {
        let rhs = parse_factor(next_pair(&mut parts)?)?;
        let op = match op.as_str() {
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            _ => BinOp::Mod,
        };
        lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_factor(pair: Pair<'_, Rule>) -> Result<Expr> {
    let inner = first_inner(pair)?;
    match inner.as_rule() {
        Rule::negation => Ok(Expr::Neg(Box::new(parse_factor(first_inner(inner)?)?))),
        _ => parse_atom(inner),
    }
}

fn parse_atom(pair: Pair<'_, Rule>) -> Result<Expr> {
    let inner = first_inner(pair)?;
    let expr = match inner.as_rule() {
        Rule::number => Expr::Number(inner.as_str().parse().map_err(|e| {
            ConvertError::evaluation(format!("invalid number `{}`: {}", inner.as_str(), e))
        })?),
        Rule::string => Expr::Str(unescape(first_inner(inner)?.as_str())),
        Rule::boolean => Expr::Bool(inner.as_str() == "true"),
        Rule::undef => Expr::Undef,
        Rule::vector => Expr::Vector(inner.into_inner().map(parse_expr).collect::<Result<_>>()?),
        Rule::call => {
            let mut parts = inner.into_inner();
            let name = next_pair(&mut parts)?.as_str().to_string();
            let args = parts.map(parse_expr).collect::<Result<_>>()?;
            Expr::Call(name, args)
        }
        Rule::ident => Expr::Var(inner.as_str().to_string()),
        Rule::expr => parse_expr(inner)?,
        _ => return Err(malformed()),
    };
    Ok(expr)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Parse a `--name value` parameter as an OpenSCAD literal. Bare words and
/// unparsable text become strings.
pub fn parameter_value(raw: &str) -> Value {
    let parsed = ScadParser::parse(Rule::parameter_value, raw)
        .ok()
        .and_then(|mut pairs| pairs.next())
        .and_then(|pair| pair.into_inner().next())
        .and_then(|expr| parse_expr(expr).ok());

    match parsed {
        Some(Expr::Var(_)) | None => Value::Str(raw.to_string()),
        Some(expr) => eval_expr(&expr, &Env::new()).unwrap_or_else(|_| Value::Str(raw.to_string())),
    }
}

fn expand_includes(
    statements: Vec<Stmt>,
    origin: Option<&Path>,
    depth: usize,
    sandbox: &IncludeSandbox,
) -> Result<Vec<Stmt>> {
    let mut expanded = Vec::with_capacity(statements.len());
    for stmt in statements {
        match stmt {
            Stmt::Include(name) => {
                let file = sandbox.read_include(&name, origin, depth)?;
                let included = parse_program(&file.source, &file.path.display().to_string())?;
                expanded.extend(expand_includes(included, Some(&file.path), depth + 1, sandbox)?);
            }
            Stmt::Block(inner) => {
                expanded.push(Stmt::Block(expand_includes(inner, origin, depth, sandbox)?));
            }
            Stmt::Instantiate(mut call) => {
                let children = std::mem::take(&mut call.children);
                call.children = expand_includes(children, origin, depth, sandbox)?;
                expanded.push(Stmt::Instantiate(call));
            }
            other => expanded.push(other),
        }
    }
    Ok(expanded)
}

// Expressions

fn eval_expr(expr: &Expr, env: &Env) -> Result<Value> {
    let value = match expr {
        Expr::Number(n) => Value::Number(*n),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Undef => Value::Undef,
        Expr::Vector(items) => Value::Vector(
            items
                .iter()
                .map(|item| eval_expr(item, env))
                .collect::<Result<_>>()?,
        ),
        Expr::Var(name) => env.get(name).cloned().unwrap_or_else(|| {
            debug!(variable = %name, "unknown variable evaluates to undef");
            Value::Undef
        }),
        Expr::Neg(inner) => negate(eval_expr(inner, env)?),
        Expr::Binary(lhs, op, rhs) => binary(*op, eval_expr(lhs, env)?, eval_expr(rhs, env)?),
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|arg| eval_expr(arg, env))
                .collect::<Result<Vec<_>>>()?;
            call_function(name, &args)?
        }
    };
    Ok(value)
}

fn negate(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        Value::Vector(items) => Value::Vector(items.into_iter().map(negate).collect()),
        _ => Value::Undef,
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value) -> Value {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Value::Number(match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Mod => a % b,
        }),
        (Value::Vector(a), Value::Vector(b))
            if matches!(op, BinOp::Add | BinOp::Sub) && a.len() == b.len() =>
        {
            Value::Vector(a.into_iter().zip(b).map(|(x, y)| binary(op, x, y)).collect())
        }
        (Value::Vector(items), scalar @ Value::Number(_)) if matches!(op, BinOp::Mul | BinOp::Div) => {
            Value::Vector(items.into_iter().map(|x| binary(op, x, scalar.clone())).collect())
        }
        (scalar @ Value::Number(_), Value::Vector(items)) if op == BinOp::Mul => {
            Value::Vector(items.into_iter().map(|x| binary(op, scalar.clone(), x)).collect())
        }
        _ => Value::Undef,
    }
}

fn call_function(name: &str, args: &[Value]) -> Result<Value> {
    let number = |i: usize| args.get(i).and_then(Value::as_number);
    let unary = |f: fn(f64) -> f64| -> Result<Value> {
        Ok(number(0).map_or(Value::Undef, |x| Value::Number(f(x))))
    };

    match name {
        "sin" => unary(|x| x.to_radians().sin()),
        "cos" => unary(|x| x.to_radians().cos()),
        "tan" => unary(|x| x.to_radians().tan()),
        "asin" => unary(|x| x.asin().to_degrees()),
        "acos" => unary(|x| x.acos().to_degrees()),
        "atan" => unary(|x| x.atan().to_degrees()),
        "sqrt" => unary(f64::sqrt),
        "abs" => unary(f64::abs),
        "floor" => unary(f64::floor),
        "ceil" => unary(f64::ceil),
        "round" => unary(f64::round),
        "atan2" => Ok(match (number(0), number(1)) {
            (Some(y), Some(x)) => Value::Number(y.atan2(x).to_degrees()),
            _ => Value::Undef,
        }),
        "pow" => Ok(match (number(0), number(1)) {
            (Some(b), Some(e)) => Value::Number(b.powf(e)),
            _ => Value::Undef,
        }),
        "min" | "max" => {
            let numbers: Option<Vec<f64>> = args.iter().map(Value::as_number).collect();
            let folded = numbers.and_then(|ns| {
                ns.into_iter().reduce(|a, b| if name == "min" { a.min(b) } else { a.max(b) })
            });
            Ok(folded.map_or(Value::Undef, Value::Number))
        }
        "len" => Ok(match args.first() {
            Some(Value::Vector(items)) => Value::Number(items.len() as f64),
            Some(Value::Str(s)) => Value::Number(s.chars().count() as f64),
            _ => Value::Undef,
        }),
        _ => Err(ConvertError::evaluation(format!("unknown function `{}`", name))),
    }
}

// Geometry

struct Arguments {
    positional: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Arguments {
    fn evaluate(args: &[Argument], env: &Env) -> Result<Self> {
        let mut positional = Vec::new();
        let mut named = HashMap::new();
        for arg in args {
            let value = eval_expr(&arg.value, env)?;
            match &arg.name {
                Some(name) => {
                    named.insert(name.clone(), value);
                }
                None => positional.push(value),
            }
        }
        Ok(Self { positional, named })
    }

    fn get(&self, name: &str, position: usize) -> Option<&Value> {
        self.named.get(name).or_else(|| self.positional.get(position))
    }

    fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    fn number(&self, name: &str, position: usize) -> Option<f64> {
        self.get(name, position).and_then(Value::as_number)
    }

    fn named_number(&self, name: &str) -> Option<f64> {
        self.named(name).and_then(Value::as_number)
    }
}

struct Evaluator<'a> {
    params: &'a NamedParameters,
}

impl Evaluator<'_> {
    fn eval_scope(&self, statements: &[Stmt], parent: &Env, top_level: bool) -> Result<Mesh> {
        let mut env = parent.clone();

        // Assignments bind before any geometry in the same scope
        for stmt in statements {
            if let Stmt::Assign(name, expr) = stmt {
                let value = match self.params.get(name).filter(|_| top_level) {
                    Some(raw) => parameter_value(raw),
                    None => eval_expr(expr, &env)?,
                };
                env.insert(name.clone(), value);
            }
        }
        if top_level {
            for (name, raw) in self.params {
                env.entry(name.clone()).or_insert_with(|| parameter_value(raw));
            }
        }

        let mut mesh = Mesh::new();
        for stmt in statements {
            match stmt {
                Stmt::Instantiate(call) => mesh.merge(&self.eval_call(call, &env)?),
                Stmt::Block(inner) => mesh.merge(&self.eval_scope(inner, &env, false)?),
                Stmt::Assign(..) | Stmt::Include(_) => {}
            }
        }
        Ok(mesh)
    }

    fn eval_call(&self, call: &Call, env: &Env) -> Result<Mesh> {
        if matches!(call.modifier, Some('*') | Some('%')) {
            return Ok(Mesh::new());
        }

        let args = Arguments::evaluate(&call.args, env)?;

        match call.name.as_str() {
            "cube" => {
                let size = match args.get("size", 0) {
                    Some(Value::Number(n)) => Vector3::new(*n, *n, *n),
                    Some(v) => v.as_vec3().unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
                    None => Vector3::new(1.0, 1.0, 1.0),
                };
                let center = args.get("center", 1).is_some_and(Value::as_bool);
                Ok(Primitive::cube(size, center).to_mesh())
            }
            "sphere" => {
                let r = args
                    .number("r", 0)
                    .or_else(|| args.named_number("d").map(|d| d / 2.0))
                    .unwrap_or(1.0);
                Ok(Primitive::sphere(r, tessellation(&args, env)?).to_mesh())
            }
            "cylinder" => {
                let h = args.number("h", 0).unwrap_or(1.0);
                let r = args
                    .named_number("r")
                    .or_else(|| args.named_number("d").map(|d| d / 2.0));
                let r1 = args
                    .named_number("r1")
                    .or_else(|| args.named_number("d1").map(|d| d / 2.0))
                    .or(r)
                    .or_else(|| args.positional.get(1).and_then(Value::as_number))
                    .unwrap_or(1.0);
                let r2 = args
                    .named_number("r2")
                    .or_else(|| args.named_number("d2").map(|d| d / 2.0))
                    .or(r)
                    .or_else(|| args.positional.get(2).and_then(Value::as_number))
                    .unwrap_or(r1);
                let center = args.get("center", 3).is_some_and(Value::as_bool);
                Ok(Primitive::cone(h, r1, r2, tessellation(&args, env)?, center).to_mesh())
            }
            "polyhedron" => polyhedron(&args),
            "translate" => {
                let v = args.get("v", 0).and_then(Value::as_vec3).unwrap_or_else(Vector3::zeros);
                self.transformed(call, env, Matrix4::new_translation(&v))
            }
            "rotate" => {
                let matrix = match args.get("a", 0) {
                    Some(Value::Number(angle)) => {
                        let axis = args.get("v", 1).and_then(Value::as_vec3).unwrap_or_else(Vector3::z);
                        Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle.to_radians())
                            .to_homogeneous()
                    }
                    Some(v) => {
                        let a = v.as_vec3().unwrap_or_else(Vector3::zeros);
                        Rotation3::from_euler_angles(a.x.to_radians(), a.y.to_radians(), a.z.to_radians())
                            .to_homogeneous()
                    }
                    None => Matrix4::identity(),
                };
                self.transformed(call, env, matrix)
            }
            "scale" => {
                let v = match args.get("v", 0) {
                    Some(Value::Number(n)) => Vector3::new(*n, *n, *n),
                    Some(v) => v.as_vec3().unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
                    None => Vector3::new(1.0, 1.0, 1.0),
                };
                self.transformed(call, env, Matrix4::new_nonuniform_scaling(&v))
            }
            "mirror" => {
                let normal = args
                    .get("v", 0)
                    .and_then(Value::as_vec3)
                    .unwrap_or_else(Vector3::x)
                    .try_normalize(f64::EPSILON);
                let matrix = match normal {
                    Some(n) => (Matrix3::identity() - 2.0 * n * n.transpose()).to_homogeneous(),
                    None => Matrix4::identity(),
                };
                self.transformed(call, env, matrix)
            }
            "multmatrix" => {
                let matrix = args.get("m", 0).map(matrix_from_value).unwrap_or_else(Matrix4::identity);
                self.transformed(call, env, matrix)
            }
            "union" | "group" | "render" | "color" => self.eval_scope(&call.children, env, false),
            "echo" => {
                info!(target: "polyconvert::echo", "{:?}", args.positional);
                Ok(Mesh::new())
            }
            "difference" | "intersection" | "hull" | "minkowski" => Err(ConvertError::evaluation(format!(
                "`{}` needs a CSG kernel, which this converter does not provide",
                call.name
            ))),
            "square" | "circle" | "polygon" | "text" | "linear_extrude" | "rotate_extrude" => {
                Err(ConvertError::evaluation(format!(
                    "2D module `{}` is not supported",
                    call.name
                )))
            }
            other => Err(ConvertError::evaluation(format!("unknown module `{}`", other))),
        }
    }

    fn transformed(&self, call: &Call, env: &Env, matrix: Matrix4<f64>) -> Result<Mesh> {
        let mut mesh = self.eval_scope(&call.children, env, false)?;
        mesh.transform(&matrix);
        Ok(mesh)
    }
}

/// `$fn` from the call or the enclosing scope; 0 selects the default
fn tessellation(args: &Arguments, env: &Env) -> Result<u32> {
    let requested = args
        .named_number("$fn")
        .or_else(|| env.get("$fn").and_then(Value::as_number));
    match requested {
        Some(n) if n > MAX_SEGMENTS as f64 => Err(ConvertError::evaluation(format!(
            "$fn = {} exceeds the limit of {} segments",
            n, MAX_SEGMENTS
        ))),
        Some(n) => Ok(n.max(0.0) as u32),
        None => Ok(0),
    }
}

fn polyhedron(args: &Arguments) -> Result<Mesh> {
    let points: Vec<Point3<f64>> = match args.get("points", 0) {
        Some(Value::Vector(items)) => items
            .iter()
            .map(|p| p.as_vec3().map(Point3::from))
            .collect::<Option<_>>()
            .ok_or_else(|| ConvertError::evaluation("polyhedron points must be 3D vectors"))?,
        _ => return Err(ConvertError::evaluation("polyhedron requires `points`")),
    };

    let faces_value = args
        .get("faces", 1)
        .or_else(|| args.named("triangles"))
        .ok_or_else(|| ConvertError::evaluation("polyhedron requires `faces`"))?;
    let Value::Vector(face_values) = faces_value else {
        return Err(ConvertError::evaluation("polyhedron faces must be a list"));
    };

    // OpenSCAD lists face corners clockwise seen from outside
    let faces: Vec<Vec<usize>> = face_values
        .iter()
        .map(|face| {
            face.as_index_list().map(|mut indices| {
                indices.reverse();
                indices
            })
        })
        .collect::<Option<_>>()
        .ok_or_else(|| ConvertError::evaluation("polyhedron faces must list point indices"))?;

    Mesh::from_polygons(&points, &faces).map_err(ConvertError::evaluation)
}

fn matrix_from_value(value: &Value) -> Matrix4<f64> {
    let mut matrix = Matrix4::identity();
    if let Value::Vector(rows) = value {
        for (r, row) in rows.iter().take(4).enumerate() {
            if let Value::Vector(cells) = row {
                for (c, cell) in cells.iter().take(4).enumerate() {
                    if let Some(n) = cell.as_number() {
                        matrix[(r, c)] = n;
                    }
                }
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::SandboxLimits;
    use approx::assert_relative_eq;
    use std::fs;
    use tempfile::TempDir;

    fn render(source: &str) -> Result<Mesh> {
        ScadEngine.evaluate(source, &IncludeSandbox::closed(), &NamedParameters::new())
    }

    #[test]
    fn test_parse_statements() {
        let statements = parse_program(
            "// box\nw = 10;\ntranslate([w, 0, 0]) cube([1, 2, 3], center=true);\n{ sphere(1); }",
            "test",
        )
        .unwrap();
        assert_eq!(statements.len(), 3);
        assert!(matches!(&statements[0], Stmt::Assign(name, Expr::Number(n)) if name == "w" && *n == 10.0));
        let Stmt::Instantiate(call) = &statements[1] else {
            panic!("expected instantiation");
        };
        assert_eq!(call.name, "translate");
        assert_eq!(call.children.len(), 1);
    }

    #[test]
    fn test_operator_precedence() {
        let statements = parse_program("x = 1 + 2 * 3 - -4;", "test").unwrap();
        let Stmt::Assign(_, expr) = &statements[0] else {
            panic!("expected assignment");
        };
        assert_eq!(eval_expr(expr, &Env::new()).unwrap(), Value::Number(11.0));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = render("cube([1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("cannot parse"));
    }

    #[test]
    fn test_translate_cube() {
        let mesh = render("translate([5, 0, 0]) cube(10);").unwrap();
        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.min.x, 5.0);
        assert_relative_eq!(bbox.max.x, 15.0);
        assert_relative_eq!(bbox.max.z, 10.0);
    }

    #[test]
    fn test_variables_and_functions() {
        let mesh = render("w = 4; h = sqrt(16) * 2; cube([w, w / 2, h]);").unwrap();
        let size = mesh.bounding_box().size();
        assert_relative_eq!(size.x, 4.0);
        assert_relative_eq!(size.y, 2.0);
        assert_relative_eq!(size.z, 8.0);
    }

    #[test]
    fn test_union_merges_children() {
        let mesh = render("union() { cube(1); translate([2, 0, 0]) cube(1); }").unwrap();
        assert_eq!(mesh.triangle_count(), 24);
        assert_relative_eq!(mesh.bounding_box().max.x, 3.0);
    }

    #[test]
    fn test_disabled_modifier_skips_geometry() {
        let mesh = render("cube(1); *sphere(5); %sphere(5);").unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_rotate_scalar_about_z() {
        let mesh = render("rotate(90) cube([2, 1, 1]);").unwrap();
        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.min.x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(bbox.max.y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mirror_plane() {
        let mesh = render("mirror([1, 0, 0]) cube(1);").unwrap();
        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.min.x, -1.0);
        assert_relative_eq!(bbox.max.x, 0.0);
    }

    #[test]
    fn test_difference_needs_kernel() {
        let err = render("difference() { cube(10); sphere(8); }").unwrap_err();
        assert!(err.to_string().contains("CSG kernel"));
    }

    #[test]
    fn test_tessellation_limit() {
        let err = render("sphere(1, $fn = 4000000000);").unwrap_err();
        assert!(matches!(err, ConvertError::Evaluation(_)));
        assert!(err.to_string().contains("$fn"));

        let err = render("$fn = 1e12; cylinder(h = 1, r = 1);").unwrap_err();
        assert!(matches!(err, ConvertError::Evaluation(_)));

        // Only tessellated primitives look at $fn
        assert_eq!(render("$fn = 1e12; cube(1);").unwrap().triangle_count(), 12);
        assert_eq!(render("sphere(1, $fn = 8);").unwrap().vertex_count(), 8 * 3 + 2);
    }

    #[test]
    fn test_unknown_module() {
        let err = render("gear(teeth = 12);").unwrap_err();
        assert!(err.to_string().contains("unknown module `gear`"));
    }

    #[test]
    fn test_polyhedron_orientation() {
        let mesh = render(
            "polyhedron(points = [[0,0,0],[1,0,0],[0,1,0],[0,0,1]], \
             faces = [[0,1,2],[0,3,1],[0,2,3],[1,3,2]]);",
        )
        .unwrap();
        assert_eq!(mesh.triangle_count(), 4);
        // Bottom face [0,1,2] is clockwise from below, so it must point down
        assert_relative_eq!(mesh.facet_normal(&mesh.triangles[0]).z, -1.0);
    }

    #[test]
    fn test_named_parameters_override_assignments() {
        let mut params = NamedParameters::new();
        params.insert("width".into(), "5".into());
        params.insert("depth".into(), "3".into());
        let mesh = ScadEngine
            .evaluate(
                "width = 1; depth = 1; height = width * 2; cube([width, depth, height]);",
                &IncludeSandbox::closed(),
                &params,
            )
            .unwrap();
        let size = mesh.bounding_box().size();
        assert_relative_eq!(size.x, 5.0);
        assert_relative_eq!(size.y, 3.0);
        assert_relative_eq!(size.z, 10.0);
    }

    #[test]
    fn test_parameter_value_literals() {
        assert_eq!(parameter_value("5"), Value::Number(5.0));
        assert_eq!(parameter_value("-2.5"), Value::Number(-2.5));
        assert_eq!(parameter_value("true"), Value::Bool(true));
        assert_eq!(
            parameter_value("[1, 2]"),
            Value::Vector(vec![Value::Number(1.0), Value::Number(2.0)])
        );
        assert_eq!(parameter_value("walnut"), Value::Str("walnut".into()));
        assert_eq!(parameter_value("two words"), Value::Str("two words".into()));
    }

    #[test]
    fn test_include_through_sandbox() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("size.scad"), "s = 7;").unwrap();
        let sandbox = IncludeSandbox::new(&[dir.path().to_path_buf()], SandboxLimits::default());

        let mesh = ScadEngine
            .evaluate("include <size.scad>\ncube(s);", &sandbox, &NamedParameters::new())
            .unwrap();
        assert_relative_eq!(mesh.bounding_box().max.x, 7.0);
    }

    #[test]
    fn test_recursive_include_hits_depth_limit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("loop.scad"), "include <loop.scad>").unwrap();
        let sandbox = IncludeSandbox::new(&[dir.path().to_path_buf()], SandboxLimits::default());

        let err = ScadEngine
            .evaluate("include <loop.scad>", &sandbox, &NamedParameters::new())
            .unwrap_err();
        assert!(err.to_string().contains("depth limit"));
    }
}
