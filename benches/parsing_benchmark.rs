// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use waypoint_parser::{DnsHeader, HeaderPolicy, Question, HEADER_SIZE};

use pprof::criterion::{Output, PProfProfiler};

mod fixtures;
use fixtures::REQ;

pub fn parse_header(c: &mut Criterion) {
    c.bench_function("parse_header", |b| {
        b.iter(|| DnsHeader::parse(black_box(REQ), HeaderPolicy::Strict).unwrap())
    });
}

pub fn parse_questions(c: &mut Criterion) {
    c.bench_function("parse_questions", |b| {
        b.iter(|| {
            let buff = black_box(REQ);
            let (first, next) = Question::parse(buff, HEADER_SIZE).unwrap();
            let (second, _) = Question::parse(buff, next).unwrap();
            (first, second)
        })
    });
}

criterion_group!(
    name = parse;
    config = Criterion::default()
            .with_profiler(
                PProfProfiler::new(100, Output::Flamegraph(None))
            );
    targets = parse_header, parse_questions
);
criterion_main!(parse);
