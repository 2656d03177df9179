// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::batch_join_bench::bench_batch_join;
use crate::pipe_bench::bench_pipe;
use criterion::{criterion_group, criterion_main};


criterion_group!(benches, bench_batch_join, bench_pipe);
criterion_main!(benches);
