//! Public address parsing.

use std::net::IpAddr;

use crate::error::ParseError;

/// Parse the body returned by a public-IP echo service.
pub fn parse_public_ip(raw: &[u8]) -> Result<IpAddr, ParseError> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    text.parse::<IpAddr>()
        .map_err(|_| ParseError::InvalidAddress(text.to_string()))
}
