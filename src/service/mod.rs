pub mod announcement_service;
pub mod scope;
pub mod submission_service;
pub mod verification_service;

use std::sync::Arc;

use crate::auth::CsrfService;
use crate::client::{PortalApi, SessionToken};
use crate::config::PortalConfig;
use announcement_service::AnnouncementAuthoring;
use submission_service::SubmissionDesk;
use verification_service::VerificationDesk;

pub struct ServiceContext {
    pub api: Arc<dyn PortalApi>,
    pub csrf_service: Arc<CsrfService>,
    pub portal: PortalConfig,
}

impl ServiceContext {
    pub fn new(api: Arc<dyn PortalApi>, csrf_service: Arc<CsrfService>, portal: PortalConfig) -> Self {
        Self {
            api,
            csrf_service,
            portal,
        }
    }

    pub fn announcements(&self, token: &SessionToken) -> AnnouncementAuthoring {
        AnnouncementAuthoring::new(self.api.clone(), token.clone(), self.portal.clone())
    }

    pub fn submissions(&self, token: &SessionToken) -> SubmissionDesk {
        SubmissionDesk::new(self.api.clone(), token.clone(), self.portal.max_upload_bytes)
    }

    pub fn verification_desk(&self, token: &SessionToken) -> VerificationDesk {
        VerificationDesk::new(self.api.clone(), token.clone())
    }
}
