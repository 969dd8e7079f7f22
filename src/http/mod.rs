pub mod client;
pub mod request;
pub mod response;

pub use client::{HttpProbe, ProbeFuture, ReqwestProbeClient};
pub use request::ProbeRequest;
pub use response::{ProbeResponse, ResponseHeaders};
