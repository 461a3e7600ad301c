// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoding of a query and lookup of its answers.

use std::{
    future::{self, Future},
    net::SocketAddr,
    sync::Arc,
};

use tracing::warn;
use waypoint_parser::{DnsHeader, HeaderPolicy, Question, HEADER_SIZE, MAX_QUESTIONS};

use crate::{response, Cache, RequestContext, ResolveError, ServerService};

/// Answers queries from a [Cache].
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use waypoint::{Cache, DnsHeader, QType, RequestContext, Resolver};
///
/// let cache = Arc::new(Cache::new());
/// cache.set("example.com", QType::A, [127, 0, 0, 1], Duration::from_secs(300));
///
/// let query = [
///     0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
///     7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // example.com
///     0x00, 0x01, 0x00, 0x01, // A IN
/// ];
/// let response = Resolver::new(cache)
///     .resolve(RequestContext::default(), &query)
///     .unwrap();
///
/// assert_eq!(DnsHeader::try_from(&response[..]).unwrap().answers, 1);
/// assert_eq!(&response[response.len() - 4..], &[0x7F, 0x00, 0x00, 0x01]);
/// ```
#[derive(Clone, Debug)]
pub struct Resolver {
    cache: Arc<Cache>,
    policy: HeaderPolicy,
}

impl Resolver {
    /// A resolver answering from `cache` with a [HeaderPolicy::Strict] header policy.
    pub fn new(cache: Arc<Cache>) -> Self {
        Resolver {
            cache,
            policy: HeaderPolicy::default(),
        }
    }

    /// Set how query headers are validated.
    pub fn policy(mut self, policy: HeaderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The cache answers are taken from.
    #[inline]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Decode `query` and build its response.
    ///
    /// # Errors
    ///
    /// The first error found decoding the header or any of its questions, in which case
    /// nothing is looked up, or any error building the response.
    pub fn resolve(&self, ctx: RequestContext, query: &[u8]) -> Result<Vec<u8>, ResolveError> {
        let header = DnsHeader::parse(query, self.policy)?;
        let ctx = ctx.with_transaction(header.id);
        let _span = ctx.span().entered();

        let mut questions = Vec::with_capacity(header.questions.min(MAX_QUESTIONS) as usize);
        let mut pos = HEADER_SIZE;
        for _ in 0..header.questions {
            let (question, next) = Question::parse(query, pos)?;
            questions.push(question);
            pos = next;
        }
        response::build(&ctx, &header, &questions, &self.cache)
    }
}

impl ServerService for Resolver {
    fn run(
        &self,
        ctx: RequestContext,
        client: SocketAddr,
        query: Vec<u8>,
    ) -> impl Future<Output = Option<Vec<u8>>> + Send {
        let response = match self.resolve(ctx, &query) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(request_id = ctx.request_id, %client, error = %e, "dropping query");
                None
            }
        };
        future::ready(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use waypoint_parser::{ParseError, QType, ResponseCode};

    const EXAMPLE: &[u8] = &[
        0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
        0x07, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0x03, b'c', b'o', b'm', 0x00, // example.com
        0x00, 0x01, 0x00, 0x01, // A IN
    ];

    fn resolver() -> Resolver {
        let cache = Arc::new(Cache::new());
        cache.set("example.com", QType::A, [127, 0, 0, 1], Duration::from_secs(300));
        Resolver::new(cache)
    }

    #[test]
    fn example_query() {
        let resolver = resolver();
        assert_eq!(resolver.cache().len(), 1);
        let response = resolver.resolve(RequestContext::new(1), EXAMPLE).unwrap();

        let header = DnsHeader::try_from(&response[..]).unwrap();
        assert_eq!(header.id, 0x1234);
        assert_eq!(header.answers, 1);
        assert_eq!(header.flags.rcode, ResponseCode::NoError);
        assert_eq!(&response[response.len() - 6..], &[0, 4, 0x7F, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn unknown_domain_is_nxdomain() {
        let mut query = EXAMPLE.to_vec();
        query[13] = b'E';
        query[14] = b'Y';
        let response = resolver().resolve(RequestContext::new(1), &query).unwrap();

        let header = DnsHeader::try_from(&response[..]).unwrap();
        assert_eq!(header.flags.rcode, ResponseCode::NXDomain);
        assert_eq!(header.answers, 0);
        assert_eq!(header.questions, 1);
        assert_eq!(response.len(), query.len());
    }

    #[test]
    fn lookups_ignore_case() {
        let mut query = EXAMPLE.to_vec();
        query[13] = b'E';
        let response = resolver().resolve(RequestContext::new(1), &query).unwrap();

        let header = DnsHeader::try_from(&response[..]).unwrap();
        assert_eq!(header.answers, 1);
        // the question keeps the spelling of the query
        assert_eq!(response[13], b'E');
    }

    #[test]
    fn missing_question_aborts() {
        let mut query = EXAMPLE.to_vec();
        query[5] = 2;
        assert!(matches!(
            resolver().resolve(RequestContext::new(1), &query),
            Err(ResolveError::Parse(ParseError::Truncated(29)))
        ));
    }

    #[test]
    fn invalid_question_aborts() {
        let mut query = EXAMPLE.to_vec();
        query[25] = 0xFF;
        assert!(matches!(
            resolver().resolve(RequestContext::new(1), &query),
            Err(ResolveError::Parse(ParseError::InvalidQType(0xFF01)))
        ));
    }

    #[test]
    fn header_policy() {
        let mut query = EXAMPLE.to_vec();
        query[5] = 0;
        assert!(matches!(
            resolver().resolve(RequestContext::new(1), &query),
            Err(ResolveError::Parse(ParseError::InvalidHeader(_)))
        ));
        assert!(matches!(
            resolver()
                .policy(HeaderPolicy::Lenient)
                .resolve(RequestContext::new(1), &query),
            Err(ResolveError::NoQuestions)
        ));
    }

    #[test]
    fn short_packet() {
        assert!(matches!(
            resolver().resolve(RequestContext::new(1), &EXAMPLE[..6]),
            Err(ResolveError::Parse(ParseError::Malformed(6)))
        ));
    }

    #[tokio::test]
    async fn service_drops_bad_queries() {
        let resolver = resolver();
        let client: SocketAddr = "127.0.0.1:5300".parse().unwrap();

        assert!(resolver
            .run(RequestContext::new(1), client, EXAMPLE.to_vec())
            .await
            .is_some());
        assert!(resolver
            .run(RequestContext::new(2), client, EXAMPLE[..20].to_vec())
            .await
            .is_none());
    }
}
