use std::sync::Arc;

use burrow_core::Shortener;

use crate::subnet::TrustedSubnet;

#[derive(Clone)]
pub struct AppState {
    shortener: Arc<dyn Shortener>,
    trusted_subnet: Option<TrustedSubnet>,
}

impl AppState {
    pub fn new(shortener: Arc<dyn Shortener>) -> Self {
        Self {
            shortener,
            trusted_subnet: None,
        }
    }

    pub fn with_trusted_subnet(mut self, subnet: Option<TrustedSubnet>) -> Self {
        self.trusted_subnet = subnet;
        self
    }

    pub fn shortener(&self) -> &dyn Shortener {
        self.shortener.as_ref()
    }

    pub fn trusted_subnet(&self) -> Option<TrustedSubnet> {
        self.trusted_subnet
    }
}
