//! Request body types
//!
//! Bodies are boxed so services and handlers share one concrete request type no
//! matter where the request came from.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Bytes, Incoming};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type carried by every request handed to a `Service`
pub type RequestBody = BoxBody<Bytes, BoxError>;

/// Box a body received from a hyper connection
pub fn from_incoming(body: Incoming) -> RequestBody {
    body.map_err(Into::into).boxed()
}

/// Body holding `data` in full
pub fn full(data: impl Into<Bytes>) -> RequestBody {
    Full::new(data.into()).map_err(Into::into).boxed()
}

pub fn empty() -> RequestBody {
    Empty::<Bytes>::new().map_err(Into::into).boxed()
}
