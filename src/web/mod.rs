//! Web framework integration surface.
//!
//! This module is the boundary between HTTP frameworks and the transport
//! policy. It handles:
//! - Tagging every incoming field with where it arrived (query, header, body)
//! - Pulling bearer credentials out of the `Authorization` header
//! - Mapping policy decisions and violations to HTTP responses
//!
//! It contains no framework-specific code. An integration converts its
//! native request into an [`IntakeRequest`] (or implements
//! [`RequestSource`] directly) and follows this flow:
//!
//! ```text
//! HTTP request
//!   ↓
//! IntakeRequest (fields tagged with FieldLocation)
//!   ↓
//! TransportPolicyGuard::evaluate_request  ── rejected ──→ 4xx / 301
//!   ↓ allowed
//! handler logic
//!   ↓
//! RedactingLogger::emit(AuditRecord)
//! ```
//!
//! [`handlers`] shows the flow for a login form, a bearer-token API and a
//! profile update.

mod adapter;
mod credentials;
mod extract;
pub mod handlers;

pub use adapter::{IntakeRequest, Scheme};
pub use credentials::{bearer_token, parse_bearer};
pub use extract::RequestSource;
pub use handlers::{DemoAccount, HandlerResponse, ReferenceApi};
