// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::Span;

/// Correlation identifiers of one query, passed along every call that handles it.
///
/// The server numbers every datagram it reads with a `request_id`. The DNS transaction id is
/// only known once the header has been decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Sequence number of the datagram, unique for the lifetime of a server
    pub request_id: u64,
    /// ID field of the DNS header, once decoded
    pub transaction_id: Option<u16>,
}

impl RequestContext {
    /// Context for the datagram number `request_id`.
    #[inline]
    pub fn new(request_id: u64) -> Self {
        RequestContext {
            request_id,
            transaction_id: None,
        }
    }

    /// The same context with the DNS transaction id attached.
    #[inline]
    pub fn with_transaction(self, transaction_id: u16) -> Self {
        RequestContext {
            transaction_id: Some(transaction_id),
            ..self
        }
    }

    /// A span that tags every event emitted inside it with these identifiers.
    pub fn span(&self) -> Span {
        tracing::debug_span!(
            "query",
            request_id = self.request_id,
            transaction_id = self.transaction_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_transaction() {
        let ctx = RequestContext::new(7);
        assert_eq!(ctx.transaction_id, None);

        let ctx = ctx.with_transaction(0x1234);
        assert_eq!(ctx.request_id, 7);
        assert_eq!(ctx.transaction_id, Some(0x1234));
    }
}
