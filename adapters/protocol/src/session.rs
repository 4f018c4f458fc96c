//! Request/response loop shared by both bindings.

use tracing::{debug, trace};

use crate::{Transport, TransportError};

/// Serves requests from `transport` until the peer goes away.
///
/// Every message read is answered by `handler` before the next one is read.
/// Returns the number of requests served when the peer closes the session
/// cleanly; any other transport failure is returned to the caller.
pub fn serve_session<T, H>(transport: &mut T, mut handler: H) -> Result<usize, TransportError>
where
    T: Transport,
    H: FnMut(&str) -> String,
{
    let mut served = 0;
    loop {
        let request = match transport.read_message() {
            Ok(request) => request,
            Err(TransportError::PeerClosed) => {
                debug!(served, "session closed by peer");
                return Ok(served);
            }
            Err(error) => return Err(error),
        };
        trace!(bytes = request.len(), "request received");

        let response = handler(&request);
        transport.write_message(&response)?;
        served += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LineDelimited;
    use std::io::Cursor;

    #[test]
    fn answers_each_line_in_order() {
        let input = Cursor::new(b"one\ntwo\n".to_vec());
        let mut transport = LineDelimited::new(input, Vec::new());

        let served =
            serve_session(&mut transport, |request| request.to_uppercase()).expect("session");

        assert_eq!(served, 2);
        let (_, written) = transport.into_parts();
        assert_eq!(written, b"ONE\nTWO\n");
    }

    #[test]
    fn malformed_input_ends_session_with_error() {
        let input = Cursor::new(vec![b'o', b'k', b'\n', 0xc3, b'\n']);
        let mut transport = LineDelimited::new(input, Vec::new());

        let result = serve_session(&mut transport, |request| request.to_owned());

        assert!(matches!(result, Err(TransportError::MalformedFrame(_))));
        let (_, written) = transport.into_parts();
        assert_eq!(written, b"ok\n");
    }
}
