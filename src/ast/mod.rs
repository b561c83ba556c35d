// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Abstract Syntax Tree module
//!
//! Defines the syntax tree the parser produces, the runtime values and scene
//! graph built by instantiation, and the evaluator that turns a scene graph
//! into geometry.

mod evaluator;
mod instantiate;
mod node;
mod syntax;
mod value;

pub use evaluator::Evaluator;
pub use instantiate::{fragments, instantiate, Instantiator};
pub use node::{Node, NodeKind, TransformOp, Vec3};
pub use syntax::{Argument, BinaryOp, Expr, ModuleCall, ModuleDef, Param, Program, Statement, UnaryOp};
pub use value::{format_number, Value};
