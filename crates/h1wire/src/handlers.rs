//! Demo request handler

use h1wire_core::{HandlerError, Request, ResponseWriter, StatusCode};
use std::io::Write;

pub const OK_BODY: &str = "all good frfr\n";

/// `/yourproblem` is the client's fault, `/myproblem` is ours, anything
/// else is fine.
pub fn demo(w: &mut ResponseWriter, request: &Request) -> Result<(), HandlerError> {
    match request.target() {
        "/yourproblem" => Err(HandlerError::new(
            StatusCode::BAD_REQUEST,
            "Your problem is not my problem",
        )),
        "/myproblem" => Err(HandlerError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Woopsie, my bad",
        )),
        _ => w
            .write_all(OK_BODY.as_bytes())
            .map_err(|e| HandlerError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}
