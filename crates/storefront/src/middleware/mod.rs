//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (added by the binary)
//! 2. CORS (permissive; the mini-app is served from the chat client's webview)
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (assign or propagate `x-request-id`)
//!
//! Extractors:
//!
//! - `LenientJson` - JSON body that never rejects

pub mod lenient_json;
pub mod request_id;

pub use lenient_json::LenientJson;

pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
