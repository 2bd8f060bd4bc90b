//! Data Transfer Objects for REST request/response serialization.
//!
//! Request bodies convert into domain inputs via `From`; responses either
//! wrap domain and service types or flatten them for public consumers.

pub mod common_dto;
pub mod event_dto;
pub mod vote_dto;
pub mod voter_dto;

pub use common_dto::*;
pub use event_dto::*;
pub use vote_dto::*;
pub use voter_dto::*;
