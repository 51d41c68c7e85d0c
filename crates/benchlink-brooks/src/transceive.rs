//! One request/response exchange on the 0254 bus.
//!
//! Channel facades and the hub share this helper so every command goes
//! through the same [`Link`] discipline and the same rejection logging.

use tracing::{trace, warn};

use benchlink_core::error::{Error, Result};
use benchlink_core::link::Link;

use crate::protocol::{self, Response};

/// Send `request` and decode the reply.
///
/// A non-success status is logged and returned as
/// [`Error::DeviceRejected`]; the payload is never exposed in that case.
pub(crate) async fn transceive(link: &Link, request: &[u8]) -> Result<Response> {
    let reply = link.exchange(request, protocol::response_framer).await?;
    match protocol::decode_response(&reply) {
        Ok(response) => {
            trace!(
                request = %String::from_utf8_lossy(request).trim_end(),
                tokens = ?response.tokens(),
                "0254 response"
            );
            Ok(response)
        }
        Err(e @ Error::DeviceRejected(_)) => {
            warn!(
                request = %String::from_utf8_lossy(request).trim_end(),
                error = %e,
                "0254 rejected request"
            );
            Err(e)
        }
        Err(e) => Err(e),
    }
}
