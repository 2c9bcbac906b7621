//! Device-hosted command resource.
//!
//! Actuators expose `temperature` or `ventilation`, sensors expose `test`;
//! each accepts a PUT whose payload carries new values for the model.

use super::{ParseResult, parse};
use crate::model::{InvalidValue, Model};
use crate::network::application::coap::{CONTENT_FORMAT_JSON, Code, Message, MessageType};
use core::fmt::Write;
use heapless::String;
use serde::Serialize;

/// Capacity of a response body.
pub const REPLY_LEN: usize = 64;

/// Reply to one PUT: a response code and an optional JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Response code.
    pub code: Code,
    /// `{"msg":...}` explanation, absent on success.
    pub body: Option<String<REPLY_LEN>>,
}

#[derive(Serialize)]
struct Reply<'a> {
    msg: &'a str,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            code: Code::CONTENT,
            body: None,
        }
    }

    fn with_message(code: Code, msg: &str) -> Self {
        let mut buf = [0u8; REPLY_LEN];
        let body = serde_json_core::to_slice(&Reply { msg }, &mut buf)
            .ok()
            .and_then(|len| core::str::from_utf8(&buf[..len]).ok())
            .and_then(|text| String::try_from(text).ok());
        if body.is_none() {
            log::warn!("Reply body for {} does not fit", code);
        }
        Self { code, body }
    }

    fn describe(code: Code, prefix: &str, field: &str) -> Self {
        let mut msg: String<REPLY_LEN> = String::new();
        if write!(msg, "{} {}", prefix, field).is_err() {
            msg.clear();
        }
        Self::with_message(code, &msg)
    }
}

/// Validate `payload` and apply it to `model`.
pub fn handle_put(model: &mut Model, payload: &[u8]) -> CommandResponse {
    if payload.iter().all(u8::is_ascii_whitespace) {
        log::warn!("Empty PUT payload");
        return CommandResponse::with_message(Code::BAD_REQUEST, "Empty PUT payload");
    }

    let keys = model.command_keys();
    let values = match parse(payload, &keys) {
        ParseResult::Found(values) => values,
        ParseResult::NotFound => {
            log::warn!("PUT payload names no {}", model.field_name());
            return CommandResponse::describe(Code::BAD_REQUEST, "Missing", model.field_name());
        }
        ParseResult::Malformed => {
            log::warn!("Malformed PUT payload");
            return CommandResponse::with_message(Code::BAD_REQUEST, "Malformed PUT payload");
        }
    };

    match model.apply_command(&values) {
        Ok(()) => CommandResponse::ok(),
        Err(InvalidValue { key, value }) => {
            log::warn!("Invalid value {} for {}", value, key);
            CommandResponse::describe(Code::NOT_ACCEPTABLE, "Requested invalid", model.field_name())
        }
    }
}

/// Answer a CoAP request addressed to the node.
///
/// Confirmable requests get a piggybacked acknowledgement carrying the
/// request's message id and token. Any other request is answered with a
/// non-confirmable message numbered `message_id`, echoing only the token.
pub fn handle_request(model: &mut Model, request: &Message, message_id: u16) -> Message {
    let reply = if request.path.as_str() != model.kind().resource_name() {
        CommandResponse {
            code: Code::NOT_FOUND,
            body: None,
        }
    } else if request.code != Code::PUT {
        CommandResponse {
            code: Code::METHOD_NOT_ALLOWED,
            body: None,
        }
    } else {
        handle_put(model, &request.payload)
    };

    let mut response = match request.kind {
        MessageType::Confirmable => {
            Message::new(MessageType::Acknowledgement, reply.code, request.message_id)
        }
        _ => Message::new(MessageType::NonConfirmable, reply.code, message_id),
    };
    response.token = request.token.clone();
    if let Some(body) = reply.body {
        if response.set_payload(body.as_bytes()).is_ok() {
            response.content_format = Some(CONTENT_FORMAT_JSON);
        } else {
            response.code = Code::INTERNAL_SERVER_ERROR;
        }
    }
    response
}
