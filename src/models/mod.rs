//! Models Module
//!
//! Request and response DTOs for the HTTP layer.

mod requests;
mod responses;

pub use requests::SetRequest;
pub use responses::{
    DeleteResponse, EntriesResponse, EntrySummary, ErrorResponse, GetResponse, HealthResponse,
    SetResponse, StatsResponse,
};
