// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for per-kernel session overhead.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qnn_core::{TensorView, TensorViewMut};
use qnn_kernels::activation::relu_s8;
use qnn_kernels::convert::RequantParams;
use qnn_runtime::{InferenceSession, RuntimeConfig};

fn bench_invoke(c: &mut Criterion) {
    let x: Vec<i8> = (0..1024).map(|i| (i % 256) as u8 as i8).collect();
    let mut y = vec![0i8; x.len()];
    let params = RequantParams::identity();

    for profiling in [false, true] {
        let mut session = InferenceSession::new(RuntimeConfig {
            enable_profiling: profiling,
            ..Default::default()
        })
        .expect("session");
        let name = if profiling { "relu_pass_profiled" } else { "relu_pass" };
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut pass = session.begin_pass();
                pass.invoke("relu", 0, |_, _| {
                    relu_s8(&params, &TensorView::vector(black_box(&x)), &mut TensorViewMut::vector(&mut y))
                })
                .expect("relu");
                pass.finish()
            })
        });
    }
}

criterion_group!(benches, bench_invoke);
criterion_main!(benches);
