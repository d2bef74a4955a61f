//! Classify HTTP status and curl errors into retry policy error kinds.

use crate::retry::policy::ErrorKind;
use crate::transport::TransportError;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        400..=499 => ErrorKind::Rejected(code as u16),
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_ssl_connect_error()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transport error into an ErrorKind.
pub fn classify_transport(e: &TransportError) -> ErrorKind {
    match e {
        TransportError::Curl(ce) => classify_curl_error(ce),
        TransportError::Http(code) => classify_http_status(*code),
        TransportError::Body(io) if io.kind() == std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
        TransportError::Body(_) => ErrorKind::Connection,
        TransportError::Worker(_) => ErrorKind::Other,
    }
}
