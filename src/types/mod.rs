// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ARN confusion at compile time.

mod id;
mod image_ref;
mod service_name;

pub use id::{Arn, ClusterArn, ServiceArn, TaskArn, TaskDefinitionArn};
pub use image_ref::TaggedImage;
pub use service_name::{ServiceName, ServiceNameError};
