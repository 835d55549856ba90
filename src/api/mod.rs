//! JSON REST surface over the persistence module: a small blocking HTTP/1.1
//! server, request validation, and the workout routes.

mod error;
mod handlers;
mod http;
mod server;
mod validation;

pub use error::ApiError;
pub use handlers::handle_request;
pub use http::{read_request, write_response, ReadError, Request, Response, MAX_BODY_BYTES};
pub use server::Server;
pub use validation::{is_date_shaped, validate_new_workout, validate_replacement};
