use std::sync::Arc;

use crate::application::{
    accounts::AccountService, compile::CompileService, documents::DocumentService,
    repos::HealthRepo, todos::TodoService,
};

/// Body size ceilings per route group, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub compile_bytes: usize,
    pub document_bytes: usize,
}

#[derive(Clone)]
pub struct ApiState {
    pub accounts: Arc<AccountService>,
    pub documents: Arc<DocumentService>,
    pub todos: Arc<TodoService>,
    pub compiler: Arc<CompileService>,
    pub health: Arc<dyn HealthRepo>,
    pub limits: RequestLimits,
}
