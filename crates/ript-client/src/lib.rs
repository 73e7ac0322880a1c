//! ript-client: drives RIPT operations against a remote gateway.
//!
//! [`ClientFace`] implements the shared `Face` contract over HTTP, so code
//! that speaks to a router through faces can speak to a gateway the same way.

pub mod face;
pub mod http;

pub use face::ClientFace;
pub use http::Endpoints;
