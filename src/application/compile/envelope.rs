//! JSON envelope returned by the compile endpoints.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::domain::types::CompileFlavor;

use super::invoker::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileEnvelope {
    pub status: CompileStatus,
    pub progress: u8,
    pub message: String,
    #[serde(rename = "pdfData", default, skip_serializing_if = "Option::is_none")]
    pub pdf_data: Option<String>,
}

impl CompileEnvelope {
    pub fn success(flavor: CompileFlavor, pdf: &[u8]) -> Self {
        Self {
            status: CompileStatus::Success,
            progress: 100,
            message: format!("{} compiled successfully", flavor.display_name()),
            pdf_data: Some(STANDARD.encode(pdf)),
        }
    }

    pub fn failure(flavor: CompileFlavor, error: &CompileError) -> Self {
        Self {
            status: CompileStatus::Error,
            progress: 0,
            message: format!("Failed to compile {}: {error}", flavor.display_name()),
            pdf_data: None,
        }
    }

    pub fn from_result(flavor: CompileFlavor, result: &Result<Vec<u8>, CompileError>) -> Self {
        match result {
            Ok(pdf) => Self::success(flavor, pdf),
            Err(error) => Self::failure(flavor, error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == CompileStatus::Success
    }
}
