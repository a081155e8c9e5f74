//! Application state shared across handlers.

use std::sync::Arc;

use devgate_auth::AccountService;
use devgate_core::repository::AccountRepository;

use crate::config::ApiConfig;

pub struct AppState<R: AccountRepository> {
    pub service: Arc<AccountService<R>>,
    pub config: Arc<ApiConfig>,
}

impl<R: AccountRepository> AppState<R> {
    pub fn new(service: AccountService<R>, config: ApiConfig) -> Self {
        Self {
            service: Arc::new(service),
            config: Arc::new(config),
        }
    }
}

// Manual impl: cloning the state must not require `R: Clone`.
impl<R: AccountRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            config: Arc::clone(&self.config),
        }
    }
}
