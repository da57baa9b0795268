//! Scan / click analytics pipeline
//!
//! - `classifier`: exactly-once new-user detection
//! - `recorder`: persists events on the request path
//! - `enrichment`: out-of-band geography patching
//! - `retention`: purges old first-seen rows

pub mod classifier;
pub mod enrichment;
pub mod recorder;
pub mod retention;

pub use classifier::SessionClassifier;
pub use enrichment::{EnrichmentJob, EnrichmentQueue, enrich_event};
pub use recorder::{
    EventRecorder, RequestContext, ScanLogPayload, ScanRecorded, SocialClickPayload,
    SocialClickRecorded, effective_session_id,
};
pub use retention::SessionRetentionTask;
