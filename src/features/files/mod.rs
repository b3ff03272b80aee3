pub mod cache;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod projection;
pub mod routes;
pub mod services;
pub mod session;

pub use policy::UploadPolicy;
pub use routes::routes;
pub use services::{LifecycleError, LifecycleManager};
pub use session::SessionRegistry;
