use std::sync::Arc;

use crate::processor::PdfProcessor;
use crate::repository::FjallRepository;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<PdfProcessor>,
    /// Used for health statistics when the server owns an embedded store
    pub store: Option<Arc<FjallRepository>>,
}

impl AppState {
    pub fn new(processor: Arc<PdfProcessor>) -> Self {
        Self {
            processor,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<FjallRepository>) -> Self {
        self.store = Some(store);
        self
    }
}
