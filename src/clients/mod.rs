//! Client records — data model, mutation protocol, and REST surface.

pub mod model;
pub mod routes;
pub mod service;

pub use model::{Client, ClientEvent, EventOperation, NewClient};
pub use routes::client_routes;
pub use service::{ClientService, DeleteOutcome, TaskUpdate};
