// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response construction from the cached records.

use tracing::debug;
use waypoint_parser::{
    DnsHeader, MessageWriter, Question, QueryResponse, RecordData, RecursionAvailable,
    ResponseCode,
};

use crate::{Cache, RequestContext, ResolveError};

/// Build the response to the query with `header` and `questions`.
///
/// Every question is echoed back, followed by one answer for each question that has a record
/// in `cache`. A response without answers is NXDOMAIN. The TTL of an answer is the time its
/// record has left in the cache.
///
/// # Errors
///
/// [ResolveError::NoQuestions] if `questions` is empty, or any error encoding the response.
pub fn build(
    ctx: &RequestContext,
    header: &DnsHeader,
    questions: &[Question],
    cache: &Cache,
) -> Result<Vec<u8>, ResolveError> {
    if questions.is_empty() {
        return Err(ResolveError::NoQuestions);
    }

    let mut flags = header.flags;
    flags.qr = QueryResponse::Response;
    flags.ra = RecursionAvailable::NotAvailable;
    let response = DnsHeader {
        id: header.id,
        flags,
        questions: header.questions,
        answers: 0,
        authority: 0,
        additional: 0,
    };

    let mut writer = MessageWriter::new(&response);
    for question in questions {
        writer.question(question)?;
    }

    let mut answers = 0u16;
    for question in questions {
        let Some(record) = cache.get(question.name.as_str(), question.qtype) else {
            debug!(name = %question.name, qtype = ?question.qtype, "no record");
            continue;
        };
        let ttl = u32::try_from(record.ttl_remaining().as_secs()).unwrap_or(u32::MAX);
        writer.answer(
            &question.name,
            question.qtype,
            question.class,
            ttl,
            RecordData::new(question.qtype, record.value()),
        )?;
        answers += 1;
    }

    if answers == 0 {
        flags.rcode = ResponseCode::NXDomain;
    }
    writer.set_flags(flags);
    writer.set_answers(answers);

    debug!(
        request_id = ctx.request_id,
        answers,
        rcode = ?flags.rcode,
        "response built"
    );
    Ok(writer.finish())
}
