//! HTTP plumbing for plinth backends.
//!
//! Three pieces, all request-scoped:
//!
//! - [`ParamStore`] — the per-request key/value map that collects query
//!   string, form body, JSON body, and path-template fields.
//! - [`Reply`] / [`Halt`] — the JSON response writer. `Halt` is the
//!   explicit unrecoverable-response type: a handler returning it stops
//!   the request, and the dispatch boundary flushes it as-is.
//! - [`RouteTable`] — a minimal path-template router. Patterns are
//!   `/`-delimited, segments wrapped in `{}` bind path parameters into
//!   the store, first registered match wins.

mod input;
mod params;
mod response;
mod router;

pub use input::gather;
pub use params::ParamStore;
pub use response::{Halt, HandlerResult, Reply};
pub use router::{RequestContext, RouteTable};
