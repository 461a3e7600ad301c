// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use waypoint_parser::{DnsHeader, MessageWriter, Question, RecordData, HEADER_SIZE};

use pprof::criterion::{Output, PProfProfiler};

mod fixtures;
use fixtures::REQ;

pub fn serialize_response(c: &mut Criterion) {
    let header = DnsHeader::try_from(REQ).unwrap();
    let (first, next) = Question::parse(REQ, HEADER_SIZE).unwrap();
    let (second, _) = Question::parse(REQ, next).unwrap();
    let questions = [first, second];
    c.bench_function("serialize_res", |b| {
        b.iter(|| {
            let mut writer = MessageWriter::new(black_box(&header));
            for q in &questions {
                writer.question(q).unwrap();
            }
            writer
                .answer(&questions[0].name, questions[0].qtype, questions[0].class, 300, RecordData::Raw(&[10, 0, 0, 7]))
                .unwrap();
            writer
                .answer(&questions[1].name, questions[1].qtype, questions[1].class, 300, RecordData::Txt(b"version=3"))
                .unwrap();
            writer.set_answers(2);
            writer.finish()
        })
    });
}

criterion_group!(
    name = serialize;
    config = Criterion::default()
            .with_profiler(
                PProfProfiler::new(100, Output::Flamegraph(None))
            );
    targets = serialize_response
);
criterion_main!(serialize);
