// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render error taxonomy

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a render call did not produce a mesh.
///
/// Every variant is non-fatal to the process: the pipeline turns it into a
/// failed [`RenderResult`](crate::RenderResult) carrying the captured console
/// text. Nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RenderError {
    #[error("engine init failed: {0}")]
    Initialization(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("instantiation failed: {0}")]
    Instantiation(String),

    #[error("geometry evaluation failed: {0}")]
    Evaluation(String),

    #[error("empty geometry: the model produced no mesh data")]
    EmptyGeometry,

    #[error("cancelled")]
    Cancelled,

    #[error("{}", fault_message(.0))]
    UnexpectedFault(Option<String>),
}

fn fault_message(message: &Option<String>) -> String {
    match message {
        Some(message) => format!("exception: {message}"),
        None => "unknown exception".to_string(),
    }
}

impl RenderError {
    /// Short stable identifier, used by reports and the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "initialization",
            Self::Parse(_) => "parse",
            Self::Instantiation(_) => "instantiation",
            Self::Evaluation(_) => "evaluation",
            Self::EmptyGeometry => "empty_geometry",
            Self::Cancelled => "cancelled",
            Self::UnexpectedFault(_) => "unexpected_fault",
        }
    }

    /// Build from a collaborator error, keeping the whole context chain
    pub(crate) fn chain(err: &anyhow::Error) -> String {
        format!("{err:#}")
    }
}
