// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD parser using pest

use crate::ast::{Argument, BinaryOp, Expr, ModuleCall, ModuleDef, Param, Program, Statement, UnaryOp};
use anyhow::{anyhow, bail, Context, Result};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "io/scad.pest"]
struct ScadParser;

/// Parse OpenSCAD source code into a syntax tree.
///
/// Errors carry the line and column of the offending token.
pub fn parse_scad(source: &str) -> Result<Program> {
    let mut pairs = ScadParser::parse(Rule::program, source).context("Failed to parse SCAD source")?;

    let mut statements = Vec::new();
    if let Some(program) = pairs.next() {
        for pair in program.into_inner() {
            if pair.as_rule() == Rule::statement {
                statements.push(parse_statement(pair)?);
            }
        }
    }

    Ok(Program { statements })
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>> {
    pairs.next().ok_or_else(|| anyhow!("Malformed syntax tree: missing {}", what))
}

fn parse_statement(pair: Pair<Rule>) -> Result<Statement> {
    let inner = next_pair(&mut pair.into_inner(), "statement body")?;

    match inner.as_rule() {
        Rule::empty_stmt => Ok(Statement::Empty),
        Rule::block => parse_block(inner),
        Rule::module_def => parse_module_def(inner),
        Rule::if_stmt => parse_if(inner),
        Rule::assignment => {
            let mut parts = inner.into_inner();
            let name = next_pair(&mut parts, "assignment target")?.as_str().to_string();
            let value = parse_expr(next_pair(&mut parts, "assignment value")?)?;
            Ok(Statement::Assignment { name, value })
        }
        Rule::module_call => parse_module_call(inner),
        rule => bail!("Unexpected statement: {:?}", rule),
    }
}

fn parse_block(pair: Pair<Rule>) -> Result<Statement> {
    let statements = pair
        .into_inner()
        .map(parse_statement)
        .collect::<Result<Vec<_>>>()?;
    Ok(Statement::Block(statements))
}

fn parse_module_def(pair: Pair<Rule>) -> Result<Statement> {
    let mut parts = pair.into_inner();
    let name = next_pair(&mut parts, "module name")?.as_str().to_string();

    let mut params = Vec::new();
    let mut body = None;
    for part in parts {
        match part.as_rule() {
            Rule::param_list => {
                for param in part.into_inner() {
                    let mut items = param.into_inner();
                    let name = next_pair(&mut items, "parameter name")?.as_str().to_string();
                    let default = items.next().map(parse_expr).transpose()?;
                    params.push(Param { name, default });
                }
            }
            Rule::statement => body = Some(parse_statement(part)?),
            _ => {}
        }
    }

    let body = body.ok_or_else(|| anyhow!("Module '{}' has no body", name))?;
    Ok(Statement::ModuleDef(ModuleDef {
        name,
        params,
        body: Box::new(body),
    }))
}

fn parse_if(pair: Pair<Rule>) -> Result<Statement> {
    let mut parts = pair.into_inner();
    let condition = parse_expr(next_pair(&mut parts, "if condition")?)?;
    let then = parse_statement(next_pair(&mut parts, "if branch")?)?;
    let otherwise = parts.next().map(parse_statement).transpose()?;

    Ok(Statement::If {
        condition,
        then: Box::new(then),
        otherwise: otherwise.map(Box::new),
    })
}

fn parse_module_call(pair: Pair<Rule>) -> Result<Statement> {
    let (line, _) = pair.as_span().start_pos().line_col();
    let mut parts = pair.into_inner();
    let name = next_pair(&mut parts, "module name")?.as_str().to_string();

    let mut args = Vec::new();
    let mut child = Statement::Empty;
    for part in parts {
        match part.as_rule() {
            Rule::arg_list => {
                for arg in part.into_inner() {
                    args.push(parse_argument(arg)?);
                }
            }
            Rule::child => child = parse_child(part)?,
            _ => {}
        }
    }

    Ok(Statement::ModuleCall(ModuleCall {
        name,
        args,
        child: Box::new(child),
        line,
    }))
}

fn parse_child(pair: Pair<Rule>) -> Result<Statement> {
    let inner = next_pair(&mut pair.into_inner(), "child statement")?;
    match inner.as_rule() {
        Rule::empty_stmt => Ok(Statement::Empty),
        Rule::block => parse_block(inner),
        Rule::if_stmt => parse_if(inner),
        Rule::module_call => parse_module_call(inner),
        rule => bail!("Unexpected child statement: {:?}", rule),
    }
}

fn parse_argument(pair: Pair<Rule>) -> Result<Argument> {
    let inner = next_pair(&mut pair.into_inner(), "argument")?;
    match inner.as_rule() {
        Rule::named_arg => {
            let mut parts = inner.into_inner();
            let name = next_pair(&mut parts, "argument name")?.as_str().to_string();
            let value = next_pair(&mut parts, "argument value")?;
            let text = value.as_str().trim().to_string();
            Ok(Argument {
                name: Some(name),
                value: parse_expr(value)?,
                text,
            })
        }
        _ => {
            let text = inner.as_str().trim().to_string();
            Ok(Argument {
                name: None,
                value: parse_expr(inner)?,
                text,
            })
        }
    }
}

fn parse_expr(pair: Pair<Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::expr | Rule::primary => parse_expr(next_pair(&mut pair.into_inner(), "expression")?),
        Rule::ternary => {
            let mut parts = pair.into_inner();
            let condition = parse_expr(next_pair(&mut parts, "operand")?)?;
            match parts.next() {
                None => Ok(condition),
                Some(then) => {
                    let otherwise = next_pair(&mut parts, "else branch")?;
                    Ok(Expr::Ternary {
                        condition: Box::new(condition),
                        then: Box::new(parse_expr(then)?),
                        otherwise: Box::new(parse_expr(otherwise)?),
                    })
                }
            }
        }
        Rule::logic_or
        | Rule::logic_and
        | Rule::equality
        | Rule::comparison
        | Rule::additive
        | Rule::multiplicative => parse_binary_chain(pair),
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = None;
            for part in pair.into_inner() {
                match part.as_rule() {
                    Rule::unary_op => ops.push(
                        UnaryOp::from_symbol(part.as_str())
                            .ok_or_else(|| anyhow!("Unknown operator '{}'", part.as_str()))?,
                    ),
                    _ => operand = Some(parse_expr(part)?),
                }
            }
            let mut expr = operand.ok_or_else(|| anyhow!("Operator without operand"))?;
            for op in ops.into_iter().rev() {
                expr = Expr::Unary {
                    op,
                    operand: Box::new(expr),
                };
            }
            Ok(expr)
        }
        Rule::postfix => {
            let mut parts = pair.into_inner();
            let mut expr = parse_expr(next_pair(&mut parts, "indexed value")?)?;
            for index in parts {
                let index = parse_expr(next_pair(&mut index.into_inner(), "index")?)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            }
            Ok(expr)
        }
        Rule::vector => Ok(Expr::Vector(
            pair.into_inner().map(parse_expr).collect::<Result<Vec<_>>>()?,
        )),
        Rule::number => {
            let value = pair
                .as_str()
                .parse::<f64>()
                .with_context(|| format!("Invalid number: {}", pair.as_str()))?;
            Ok(Expr::Number(value))
        }
        Rule::string => {
            let inner = next_pair(&mut pair.into_inner(), "string body")?;
            Ok(Expr::Str(unescape(inner.as_str())))
        }
        Rule::boolean => Ok(Expr::Bool(pair.as_str() == "true")),
        Rule::undef => Ok(Expr::Undef),
        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string())),
        rule => bail!("Unexpected expression: {:?}", rule),
    }
}

/// Left-associative fold over `operand (op operand)*`
fn parse_binary_chain(pair: Pair<Rule>) -> Result<Expr> {
    let mut parts = pair.into_inner();
    let mut lhs = parse_expr(next_pair(&mut parts, "operand")?)?;

    while let Some(op) = parts.next() {
        let op = BinaryOp::from_symbol(op.as_str())
            .ok_or_else(|| anyhow!("Unknown operator '{}'", op.as_str()))?;
        let rhs = parse_expr(next_pair(&mut parts, "right operand")?)?;
        lhs = Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }

    Ok(lhs)
}

fn unescape(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some(other) => result.push(other),
            None => result.push('\\'),
        }
    }
    result
}
