// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Instantiation: syntax tree to scene graph
//!
//! Expressions are evaluated in lexical scopes, user modules are expanded and
//! builtin modules become scene graph nodes. `echo` and `assert` talk to the
//! console the way OpenSCAD does; unknown names are reported as warnings and
//! otherwise ignored.

use super::syntax::{Argument, BinaryOp, Expr, ModuleCall, ModuleDef, Program, Statement, UnaryOp};
use super::value::Value;
use super::{Node, NodeKind, TransformOp, Vec3};
use crate::config::EngineConfig;
use crate::console::Console;
use crate::geometry::{Primitive, MAX_FRAGMENTS, MIN_FRAGMENTS};
use ahash::AHashMap;
use anyhow::{bail, Result};
use nalgebra::{Matrix4, Point3};
use std::f64::consts::PI;

/// Radii below this are treated as points when choosing a fragment count
const GRID_FINE: f64 = 0.000_000_953_674_316_406_25;

/// Instantiate a parsed program into a scene graph rooted at an implicit union
pub fn instantiate(program: &Program, console: &Console, config: &EngineConfig) -> Result<Node> {
    Instantiator::new(console, config).run(program)
}

/// Number of segments used to approximate a circle of radius `r`, clamped
/// to `MIN_FRAGMENTS..=MAX_FRAGMENTS`
pub fn fragments(r: f64, fn_: f64, fs: f64, fa: f64) -> u32 {
    let requested = requested_fragments(r, fn_, fs, fa);
    if requested.is_nan() {
        return MIN_FRAGMENTS;
    }
    requested.clamp(MIN_FRAGMENTS as f64, MAX_FRAGMENTS as f64) as u32
}

/// Unclamped count; infinite when `$fa` or `$fs` is zero
fn requested_fragments(r: f64, fn_: f64, fs: f64, fa: f64) -> f64 {
    if r < GRID_FINE {
        return MIN_FRAGMENTS as f64;
    }
    if fn_ > 0.0 {
        return fn_.floor();
    }
    (360.0 / fa).min(r * 2.0 * PI / fs).max(5.0).ceil()
}

struct Frame<'a> {
    vars: AHashMap<String, Value>,
    modules: AHashMap<&'a str, (&'a ModuleDef, usize)>,
    parent: Option<usize>,
}

impl Frame<'_> {
    fn new(parent: Option<usize>) -> Self {
        Self {
            vars: AHashMap::new(),
            modules: AHashMap::new(),
            parent,
        }
    }
}

/// Evaluated call arguments
#[derive(Debug, Default)]
struct Args {
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

impl Args {
    fn named(&self, name: &str) -> Option<&Value> {
        self.named.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Named argument first, then the positional slot
    fn get(&self, name: &str, position: usize) -> Option<&Value> {
        self.named(name).or_else(|| self.positional.get(position))
    }

    fn number(&self, name: &str, position: usize) -> Option<f64> {
        self.get(name, position).and_then(Value::as_number)
    }

    fn specials(&self) -> impl Iterator<Item = &(String, Value)> {
        self.named.iter().filter(|(n, _)| n.starts_with('$'))
    }
}

/// Walks a program, keeping a stack of scope frames
pub struct Instantiator<'a> {
    console: &'a Console,
    config: &'a EngineConfig,
    frames: Vec<Frame<'a>>,
    /// Child statements of the user module calls being expanded
    children: Vec<(&'a Statement, usize)>,
    depth: usize,
}

impl<'a> Instantiator<'a> {
    pub fn new(console: &'a Console, config: &'a EngineConfig) -> Self {
        let mut root = Frame::new(None);
        root.vars.insert("$fn".into(), Value::Number(config.fn_ as f64));
        root.vars.insert("$fa".into(), Value::Number(config.fa));
        root.vars.insert("$fs".into(), Value::Number(config.fs));

        Self {
            console,
            config,
            frames: vec![root],
            children: Vec::new(),
            depth: 0,
        }
    }

    pub fn run(&mut self, program: &'a Program) -> Result<Node> {
        let nodes = self.statements(&program.statements, 0)?;
        Ok(Node::with_origin(NodeKind::Union(nodes), "root"))
    }

    fn statements(&mut self, statements: &'a [Statement], frame: usize) -> Result<Vec<Node>> {
        // Modules are visible to the whole scope they are defined in
        for statement in statements {
            if let Statement::ModuleDef(def) = statement {
                self.frames[frame].modules.insert(def.name.as_str(), (def, frame));
            }
        }

        let mut nodes = Vec::new();
        for statement in statements {
            self.statement(statement, frame, &mut nodes)?;
        }
        Ok(nodes)
    }

    fn statement(&mut self, statement: &'a Statement, frame: usize, out: &mut Vec<Node>) -> Result<()> {
        match statement {
            Statement::Empty => {}
            Statement::ModuleDef(def) => {
                self.frames[frame].modules.insert(def.name.as_str(), (def, frame));
            }
            Statement::Block(items) => out.extend(self.statements(items, frame)?),
            Statement::Assignment { name, value } => {
                let value = self.eval(value, frame);
                self.frames[frame].vars.insert(name.clone(), value);
            }
            Statement::If {
                condition,
                then,
                otherwise,
            } => {
                let branch = if self.eval(condition, frame).is_truthy() {
                    Some(then)
                } else {
                    otherwise.as_ref()
                };
                if let Some(branch) = branch {
                    let scope = self.push_frame(frame);
                    let mut nodes = Vec::new();
                    let result = self.statement(branch, scope, &mut nodes);
                    self.pop_frame(scope);
                    result?;
                    out.extend(group(nodes, "if"));
                }
            }
            Statement::ModuleCall(call) => {
                if let Some(node) = self.call(call, frame)? {
                    out.push(node);
                }
            }
        }
        Ok(())
    }

    fn push_frame(&mut self, parent: usize) -> usize {
        self.frames.push(Frame::new(Some(parent)));
        self.frames.len() - 1
    }

    fn pop_frame(&mut self, frame: usize) {
        self.frames.truncate(frame);
    }

    fn lookup(&self, name: &str, frame: usize) -> Option<&Value> {
        let mut current = Some(frame);
        while let Some(index) = current {
            let frame = &self.frames[index];
            if let Some(value) = frame.vars.get(name) {
                return Some(value);
            }
            current = frame.parent;
        }
        None
    }

    fn lookup_module(&self, name: &str, frame: usize) -> Option<(&'a ModuleDef, usize)> {
        let mut current = Some(frame);
        while let Some(index) = current {
            let frame = &self.frames[index];
            if let Some(&entry) = frame.modules.get(name) {
                return Some(entry);
            }
            current = frame.parent;
        }
        None
    }

    /// `$` variables are dynamically scoped: collect the innermost binding of
    /// each one visible from `frame`
    fn special_vars(&self, frame: usize) -> Vec<(String, Value)> {
        let mut seen: AHashMap<&str, &Value> = AHashMap::new();
        let mut current = Some(frame);
        while let Some(index) = current {
            let frame = &self.frames[index];
            for (name, value) in &frame.vars {
                if name.starts_with('$') {
                    seen.entry(name.as_str()).or_insert(value);
                }
            }
            current = frame.parent;
        }
        seen.into_iter().map(|(n, v)| (n.to_string(), v.clone())).collect()
    }

    fn special_number(&self, args: &Args, name: &str, frame: usize, fallback: f64) -> f64 {
        args.named(name)
            .or_else(|| self.lookup(name, frame))
            .and_then(Value::as_number)
            .unwrap_or(fallback)
    }

    fn fragments_for(&self, r: f64, args: &Args, frame: usize) -> u32 {
        let fn_ = self.special_number(args, "$fn", frame, self.config.fn_ as f64);
        let fs = self.special_number(args, "$fs", frame, self.config.fs);
        let fa = self.special_number(args, "$fa", frame, self.config.fa);
        let requested = requested_fragments(r, fn_, fs, fa);
        if requested > MAX_FRAGMENTS as f64 {
            self.console.warning(&format!(
                "Fragment count {} exceeds the limit, using {}",
                Value::Number(requested),
                MAX_FRAGMENTS
            ));
        }
        fragments(r, fn_, fs, fa)
    }

    fn eval_args(&self, args: &[Argument], frame: usize) -> Args {
        let mut result = Args::default();
        for arg in args {
            let value = self.eval(&arg.value, frame);
            match &arg.name {
                Some(name) => result.named.push((name.clone(), value)),
                None => result.positional.push(value),
            }
        }
        result
    }

    /// Every module call, builtin or user defined, counts towards the
    /// nesting limit. Instantiation recurses on the native stack, so the
    /// limit is what keeps runaway recursion from overflowing it.
    fn call(&mut self, call: &'a ModuleCall, frame: usize) -> Result<Option<Node>> {
        if self.depth >= self.config.max_depth {
            let message = format!("Recursion detected calling module '{}'", call.name);
            self.console.error(&message);
            bail!(message);
        }

        self.depth += 1;
        let result = self.dispatch(call, frame);
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, call: &'a ModuleCall, frame: usize) -> Result<Option<Node>> {
        let args = self.eval_args(&call.args, frame);

        if let Some((def, def_frame)) = self.lookup_module(&call.name, frame) {
            return self.call_user(call, def, def_frame, &args, frame).map(Some);
        }

        let name = call.name.as_str();
        let kind = match name {
            "echo" => {
                self.console.echo(&format_echo(&args));
                return Ok(None);
            }
            "assert" => {
                self.check_assertion(call, &args)?;
                let nodes = self.children_of(call, &args, frame)?;
                return Ok(group(nodes, name));
            }
            "children" => {
                return self.expand_children().map(|nodes| group(nodes, name));
            }
            "cube" => NodeKind::Primitive(self.cube(&args)),
            "sphere" => NodeKind::Primitive(self.sphere(&args, frame)),
            "cylinder" => NodeKind::Primitive(self.cylinder(&args, frame)),
            "polyhedron" => NodeKind::Primitive(polyhedron(&args)?),
            "translate" | "rotate" | "scale" | "mirror" | "multmatrix" => {
                let op = self.transform(name, &args);
                let children = self.children_of(call, &args, frame)?;
                NodeKind::Transform { op, children }
            }
            "union" => NodeKind::Union(self.children_of(call, &args, frame)?),
            "difference" => NodeKind::Difference(self.children_of(call, &args, frame)?),
            "intersection" => NodeKind::Intersection(self.children_of(call, &args, frame)?),
            _ => {
                self.console.warning(&format!(
                    "Ignoring unknown module '{}', line {}",
                    call.name, call.line
                ));
                return Ok(None);
            }
        };

        Ok(Some(Node::with_origin(kind, name)))
    }

    fn call_user(
        &mut self,
        call: &'a ModuleCall,
        def: &'a ModuleDef,
        def_frame: usize,
        args: &Args,
        caller: usize,
    ) -> Result<Node> {
        let specials = self.special_vars(caller);
        let scope = self.push_frame(def_frame);
        self.frames[scope].vars.extend(specials);

        for (i, param) in def.params.iter().enumerate() {
            let value = match args.named(&param.name).or_else(|| args.positional.get(i)) {
                Some(value) => value.clone(),
                None => match &param.default {
                    Some(default) => self.eval(default, scope),
                    None => Value::Undef,
                },
            };
            self.frames[scope].vars.insert(param.name.clone(), value);
        }
        for (name, value) in args.specials() {
            self.frames[scope].vars.insert(name.clone(), value.clone());
        }

        self.children.push((call.child.as_ref(), caller));
        let mut nodes = Vec::new();
        let result = self.statement(&def.body, scope, &mut nodes);
        self.children.pop();
        self.pop_frame(scope);
        result?;

        Ok(Node::with_origin(NodeKind::Union(nodes), def.name.as_str()))
    }

    /// Instantiate the child statement of a builtin call in a fresh scope
    fn children_of(&mut self, call: &'a ModuleCall, args: &Args, frame: usize) -> Result<Vec<Node>> {
        let scope = self.push_frame(frame);
        for (name, value) in args.specials() {
            self.frames[scope].vars.insert(name.clone(), value.clone());
        }
        let mut nodes = Vec::new();
        let result = self.statement(&call.child, scope, &mut nodes);
        self.pop_frame(scope);
        result.map(|()| nodes)
    }

    /// `children()` inside a user module: the caller's child statement
    fn expand_children(&mut self) -> Result<Vec<Node>> {
        let Some((statement, caller)) = self.children.pop() else {
            return Ok(Vec::new());
        };
        let scope = self.push_frame(caller);
        let mut nodes = Vec::new();
        let result = self.statement(statement, scope, &mut nodes);
        self.pop_frame(scope);
        self.children.push((statement, caller));
        result.map(|()| nodes)
    }

    fn check_assertion(&self, call: &ModuleCall, args: &Args) -> Result<()> {
        if args.get("condition", 0).is_some_and(Value::is_truthy) {
            return Ok(());
        }

        let text = call
            .args
            .iter()
            .find(|a| a.name.as_deref() == Some("condition"))
            .or_else(|| call.args.iter().find(|a| a.name.is_none()))
            .map(|a| a.text.as_str())
            .unwrap_or("undef");
        let mut message = format!("Assertion '{}' failed", text);
        if let Some(detail) = args.get("message", 1) {
            message.push_str(&format!(": {}", detail));
        }
        self.console.error(&message);
        bail!(message)
    }

    fn cube(&self, args: &Args) -> Primitive {
        let size = match args.get("size", 0) {
            None => Vec3::new(1.0, 1.0, 1.0),
            Some(Value::Number(n)) => Vec3::new(*n, *n, *n),
            Some(value) => value.as_point().map(|p| p.coords).unwrap_or_else(|| {
                self.console.warning(&format!(
                    "Unable to convert cube(size = {}) parameter to a number or a vec3 of numbers",
                    value
                ));
                Vec3::new(1.0, 1.0, 1.0)
            }),
        };
        let center = args.get("center", 1).and_then(Value::as_bool).unwrap_or(false);
        Primitive::cube(size, center)
    }

    fn sphere(&self, args: &Args, frame: usize) -> Primitive {
        let r = args
            .named("d")
            .and_then(Value::as_number)
            .map(|d| d / 2.0)
            .or_else(|| args.number("r", 0))
            .unwrap_or(1.0);
        Primitive::sphere(r, self.fragments_for(r, args, frame))
    }

    fn cylinder(&self, args: &Args, frame: usize) -> Primitive {
        let named = |name: &str| args.named(name).and_then(Value::as_number);
        let h = args.number("h", 0).unwrap_or(1.0);

        let r = named("d").map(|d| d / 2.0).or_else(|| named("r"));
        let r1 = named("d1")
            .map(|d| d / 2.0)
            .or_else(|| named("r1"))
            .or(r)
            .or_else(|| args.positional.get(1).and_then(Value::as_number))
            .unwrap_or(1.0);
        let r2 = named("d2")
            .map(|d| d / 2.0)
            .or_else(|| named("r2"))
            .or(r)
            .or_else(|| args.positional.get(2).and_then(Value::as_number))
            .unwrap_or(1.0);
        let center = args.get("center", 3).and_then(Value::as_bool).unwrap_or(false);

        let fragments = self.fragments_for(r1.max(r2), args, frame);
        Primitive::cylinder(h, r1, r2, center, fragments)
    }

    fn transform(&self, name: &str, args: &Args) -> TransformOp {
        match name {
            "translate" => TransformOp::Translate(
                args.get("v", 0).and_then(|v| v.as_vec3(0.0)).unwrap_or_else(Vec3::zeros),
            ),
            "rotate" => {
                let axis = args.get("v", 1).and_then(|v| v.as_vec3(0.0));
                match (args.get("a", 0), axis) {
                    (Some(Value::Number(angle)), Some(axis)) => TransformOp::RotateAxis { angle: *angle, axis },
                    (Some(Value::Number(angle)), None) => TransformOp::Rotate(Vec3::new(0.0, 0.0, *angle)),
                    (Some(angles), _) => TransformOp::Rotate(angles.as_vec3(0.0).unwrap_or_else(Vec3::zeros)),
                    (None, _) => TransformOp::Rotate(Vec3::zeros()),
                }
            }
            "scale" => TransformOp::Scale(match args.get("v", 0) {
                Some(Value::Number(s)) => Vec3::new(*s, *s, *s),
                Some(v) => v.as_vec3(1.0).unwrap_or_else(|| Vec3::new(1.0, 1.0, 1.0)),
                None => Vec3::new(1.0, 1.0, 1.0),
            }),
            "mirror" => TransformOp::Mirror(
                args.get("v", 0)
                    .and_then(|v| v.as_vec3(0.0))
                    .unwrap_or_else(|| Vec3::new(1.0, 0.0, 0.0)),
            ),
            _ => {
                let matrix = args.get("m", 0).and_then(Value::as_matrix);
                if matrix.is_none() {
                    self.console.warning("multmatrix() expects a 4x4 or 3x4 matrix, using identity");
                }
                TransformOp::Multmatrix(matrix.unwrap_or_else(Matrix4::identity))
            }
        }
    }

    fn eval(&self, expr: &Expr, frame: usize) -> Value {
        match expr {
            Expr::Number(n) => Value::Number(*n),
            Expr::Str(s) => Value::Str(s.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Undef => Value::Undef,
            Expr::Ident(name) => match self.lookup(name, frame) {
                Some(value) => value.clone(),
                None => {
                    self.console.warning(&format!("Ignoring unknown variable '{}'", name));
                    Value::Undef
                }
            },
            Expr::Vector(items) => Value::Vector(items.iter().map(|item| self.eval(item, frame)).collect()),
            Expr::Index { target, index } => {
                let target = self.eval(target, frame);
                let index = self.eval(index, frame);
                index_value(&target, &index)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand, frame);
                unary(*op, operand)
            }
            Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
                Value::Bool(self.eval(lhs, frame).is_truthy() && self.eval(rhs, frame).is_truthy())
            }
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                Value::Bool(self.eval(lhs, frame).is_truthy() || self.eval(rhs, frame).is_truthy())
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs, frame);
                let rhs = self.eval(rhs, frame);
                binary(*op, &lhs, &rhs)
            }
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition, frame).is_truthy() {
                    self.eval(then, frame)
                } else {
                    self.eval(otherwise, frame)
                }
            }
        }
    }
}

/// Several nodes produced by one statement act as a single operand
fn group(mut nodes: Vec<Node>, origin: &str) -> Option<Node> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(Node::with_origin(NodeKind::Union(nodes), origin)),
    }
}

fn format_echo(args: &Args) -> String {
    // Positional arguments first, then named ones as `name = value`
    let mut parts: Vec<String> = args.positional.iter().map(Value::to_string).collect();
    parts.extend(args.named.iter().map(|(name, value)| format!("{} = {}", name, value)));
    parts.join(", ")
}

fn polyhedron(args: &Args) -> Result<Primitive> {
    let points = match args.get("points", 0).and_then(Value::as_vector) {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, p)| match p.as_point() {
                Some(point) => Ok(point),
                None => bail!("polyhedron point {} is not a vec3 of numbers: {}", i, p),
            })
            .collect::<Result<Vec<Point3<f64>>>>()?,
        None => bail!("polyhedron() requires a points vector"),
    };

    let faces_value = args
        .named("faces")
        .or_else(|| args.named("triangles"))
        .or_else(|| args.positional.get(1));
    let faces = match faces_value.and_then(Value::as_vector) {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, face)| {
                let indices = face.as_vector().unwrap_or_default();
                indices
                    .iter()
                    .map(|index| match index.as_index() {
                        Some(index) => Ok(index),
                        None => bail!("polyhedron face {} has a non-integer index: {}", i, index),
                    })
                    .collect::<Result<Vec<usize>>>()
            })
            .collect::<Result<Vec<Vec<usize>>>>()?,
        None => bail!("polyhedron() requires a faces vector"),
    };

    Ok(Primitive::polyhedron(points, faces))
}

fn index_value(target: &Value, index: &Value) -> Value {
    let Some(i) = index.as_number().filter(|i| *i >= 0.0).map(|i| i.floor() as usize) else {
        return Value::Undef;
    };
    match target {
        Value::Vector(items) => items.get(i).cloned().unwrap_or(Value::Undef),
        Value::Str(s) => s
            .chars()
            .nth(i)
            .map(|c| Value::Str(c.to_string()))
            .unwrap_or(Value::Undef),
        _ => Value::Undef,
    }
}

fn unary(op: UnaryOp, operand: Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!operand.is_truthy()),
        UnaryOp::Plus => operand,
        UnaryOp::Neg => negate(&operand),
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        Value::Vector(items) => Value::Vector(items.iter().map(negate).collect()),
        _ => Value::Undef,
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    use Value::{Number, Vector};

    match (op, lhs, rhs) {
        (BinaryOp::Eq, a, b) => Value::Bool(a == b),
        (BinaryOp::Ne, a, b) => Value::Bool(a != b),
        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, a, b) => compare(op, a, b),
        (_, Number(a), Number(b)) => Number(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            _ => return Value::Undef,
        }),
        (BinaryOp::Add | BinaryOp::Sub, Vector(a), Vector(b)) if a.len() == b.len() => a
            .iter()
            .zip(b)
            .map(|(x, y)| binary(op, x, y))
            .collect::<Vec<_>>()
            .into(),
        (BinaryOp::Mul, Vector(a), Vector(b)) if a.len() == b.len() => {
            let mut sum = 0.0;
            for (x, y) in a.iter().zip(b) {
                match (x, y) {
                    (Number(x), Number(y)) => sum += x * y,
                    _ => return Value::Undef,
                }
            }
            Number(sum)
        }
        (BinaryOp::Mul | BinaryOp::Div, Vector(a), Number(_)) => {
            a.iter().map(|x| binary(op, x, rhs)).collect::<Vec<_>>().into()
        }
        (BinaryOp::Mul, Number(_), Vector(b)) => b.iter().map(|y| binary(op, lhs, y)).collect::<Vec<_>>().into(),
        _ => Value::Undef,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Value::Bool(false);
    };
    Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Vector(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CaptureBuffer;
    use crate::io::parse_scad;

    fn run(source: &str) -> (Result<Node>, String) {
        let buffer = CaptureBuffer::default();
        let console = Console::with_sinks(buffer.clone(), buffer.clone());
        let program = parse_scad(source).unwrap();
        let result = instantiate(&program, &console, &EngineConfig::default());
        (result, buffer.contents())
    }

    fn root_children(node: &Node) -> &[Node] {
        node.kind.children()
    }

    #[test]
    fn test_echo_formatting() {
        let (result, output) = run(r#"x = 2; echo("hi", x * 1.5, [1, true], n = undef);"#);
        assert!(result.is_ok());
        assert_eq!(output, "ECHO: \"hi\", 3, [1, true], n = undef\n");
    }

    #[test]
    fn test_primitives_and_transforms() {
        let (result, output) = run("translate([1, 2, 3]) cube(5, center = true); sphere(d = 4, $fn = 12);");
        let root = result.unwrap();
        assert!(output.is_empty());

        let children = root_children(&root);
        assert_eq!(children.len(), 2);
        let NodeKind::Transform { op, children: inner } = &children[0].kind else {
            panic!("expected a transform");
        };
        assert_eq!(*op, TransformOp::Translate(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(
            inner[0].kind,
            NodeKind::Primitive(Primitive::cube(Vec3::new(5.0, 5.0, 5.0), true))
        );
        assert_eq!(children[1].kind, NodeKind::Primitive(Primitive::sphere(2.0, 12)));
    }

    #[test]
    fn test_cylinder_arguments() {
        let (result, _) = run("cylinder(h = 10, r1 = 2, d2 = 2, $fn = 8);");
        let root = result.unwrap();
        assert_eq!(
            root_children(&root)[0].kind,
            NodeKind::Primitive(Primitive::cylinder(10.0, 2.0, 1.0, false, 8))
        );
    }

    #[test]
    fn test_fragment_defaults() {
        // $fa = 12, $fs = 2: a radius 5 circle gets ceil(10 * pi / 2) segments
        assert_eq!(fragments(5.0, 0.0, 2.0, 12.0), 16);
        assert_eq!(fragments(100.0, 0.0, 2.0, 12.0), 30);
        assert_eq!(fragments(0.1, 0.0, 2.0, 12.0), 5);
        assert_eq!(fragments(5.0, 2.0, 2.0, 12.0), 3);
        assert_eq!(fragments(0.0, 64.0, 2.0, 12.0), 3);
    }

    #[test]
    fn test_user_module_with_defaults_and_specials() {
        let source = r#"
            module peg(h, r = 1) { cylinder(h = h, r = r); }
            $fn = 6;
            peg(5);
            peg(h = 2, r = 3, $fn = 10);
        "#;
        let (result, _) = run(source);
        let root = result.unwrap();
        let children = root_children(&root);
        assert_eq!(children.len(), 2);

        let first = &children[0].kind.children()[0].kind;
        assert_eq!(*first, NodeKind::Primitive(Primitive::cylinder(5.0, 1.0, 1.0, false, 6)));
        let second = &children[1].kind.children()[0].kind;
        assert_eq!(*second, NodeKind::Primitive(Primitive::cylinder(2.0, 3.0, 3.0, false, 10)));
        assert_eq!(children[1].origin.as_deref(), Some("peg"));
    }

    #[test]
    fn test_children_of_user_module() {
        let source = "module lift() { translate([0, 0, 5]) children(); } lift() cube(1);";
        let (result, _) = run(source);
        let root = result.unwrap();
        let lift = &root_children(&root)[0];
        let NodeKind::Transform { children, .. } = &lift.kind.children()[0].kind else {
            panic!("expected translate inside the module");
        };
        assert!(matches!(children[0].kind, NodeKind::Primitive(Primitive::Cube { .. })));
    }

    #[test]
    fn test_if_else_and_expressions() {
        let source = r#"
            w = [4, 5, 6];
            if (w[1] > 4 && !false) echo(w * 2); else echo("no");
            echo(w[0] == 4 ? "four" : "other", 7 % 4, -w);
        "#;
        let (result, output) = run(source);
        assert!(result.is_ok());
        assert_eq!(output, "ECHO: [8, 10, 12]\nECHO: \"four\", 3, [-4, -5, -6]\n");
    }

    #[test]
    fn test_assert_failure() {
        let (result, output) = run(r#"x = -1; assert(x > 0, "x must be positive");"#);
        let message = result.unwrap_err().to_string();
        assert_eq!(message, "Assertion 'x > 0' failed: \"x must be positive\"");
        assert_eq!(output, format!("ERROR: {}\n", message));
    }

    #[test]
    fn test_passing_assert_keeps_children() {
        let (result, output) = run("assert(true) cube(2);");
        assert!(output.is_empty());
        assert_eq!(root_children(&result.unwrap()).len(), 1);
    }

    #[test]
    fn test_unknown_names_warn() {
        let (result, output) = run("frobnicate(3); echo(missing);");
        assert!(result.unwrap().kind.children().is_empty());
        assert!(output.contains("WARNING: Ignoring unknown module 'frobnicate', line 1"));
        assert!(output.contains("WARNING: Ignoring unknown variable 'missing'"));
        assert!(output.contains("ECHO: undef"));
    }

    #[test]
    fn test_recursion_limit() {
        let (result, output) = run("module forever() { forever(); } forever();");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Recursion detected calling module 'forever'"));
        assert!(output.starts_with("ERROR: Recursion detected"));
    }

    #[test]
    fn test_nesting_limit_counts_builtins() {
        let config = EngineConfig {
            max_depth: 3,
            ..EngineConfig::default()
        };
        let console = Console::sink();
        let nested = parse_scad("translate([1, 0, 0]) rotate(90) scale(2) cube(1);").unwrap();
        let err = instantiate(&nested, &console, &config).unwrap_err();
        assert_eq!(err.to_string(), "Recursion detected calling module 'cube'");

        let shallow = parse_scad("translate([1, 0, 0]) rotate(90) cube(1);").unwrap();
        assert!(instantiate(&shallow, &console, &config).is_ok());
    }

    #[test]
    fn test_fragment_count_is_clamped() {
        assert_eq!(fragments(1.0, 100_000.0, 2.0, 12.0), MAX_FRAGMENTS);
        assert_eq!(fragments(1.0, f64::INFINITY, 2.0, 12.0), MAX_FRAGMENTS);
        assert_eq!(fragments(1.0, 0.0, 0.0, 0.0), MAX_FRAGMENTS);
        assert_eq!(fragments(1.0, f64::NAN, f64::NAN, f64::NAN), 5);

        let (result, output) = run("$fn = 100000; sphere(1);");
        let root = result.unwrap();
        assert_eq!(
            root_children(&root)[0].kind,
            NodeKind::Primitive(Primitive::sphere(1.0, MAX_FRAGMENTS))
        );
        assert_eq!(
            output,
            format!("WARNING: Fragment count 100000 exceeds the limit, using {}\n", MAX_FRAGMENTS)
        );
    }

    #[test]
    fn test_polyhedron_arguments() {
        let source = "polyhedron(points = [[0,0,0],[1,0,0],[0,1,0],[0,0,1]], faces = [[0,1,2],[0,3,1],[0,2,3],[1,3,2]]);";
        let (result, _) = run(source);
        let root = result.unwrap();
        let NodeKind::Primitive(Primitive::Polyhedron { points, faces }) = &root_children(&root)[0].kind else {
            panic!("expected a polyhedron");
        };
        assert_eq!(points.len(), 4);
        assert_eq!(faces[3], vec![1, 3, 2]);

        let (bad, _) = run("polyhedron(points = [[0,0,0]], faces = [[0, 0.5, 1]]);");
        assert!(bad.is_err());
    }

    #[test]
    fn test_difference_operands() {
        let (result, _) = run("difference() { cube(10); cube(20, center = true); }");
        let root = result.unwrap();
        let NodeKind::Difference(operands) = &root_children(&root)[0].kind else {
            panic!("expected a difference");
        };
        assert_eq!(operands.len(), 2);
    }
}
