//! The request pipeline.
//!
//! [`VisionService`] is the entry point: it decodes the image, hands an
//! [`InferenceRequest`] to the [`Dispatcher`], and shapes the normalized result
//! into the wire types in [`api`].

pub mod api;
pub mod dispatcher;
pub mod service;

pub use api::{
    ApiRequest, ApiResponse, DetectRequest, DetectResponse, HealthResponse, ImageRequest,
    ListResponse, LoadRequest, LoadResponse, PendingResponse,
};
pub use dispatcher::{Dispatcher, InferenceRequest};
pub use service::VisionService;
