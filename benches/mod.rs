use criterion::{criterion_group, criterion_main};

mod command;

criterion_group!(
    benches,
    command::parser::bench_parse_setpoint,
    command::parser::bench_parse_skipping_unknown,
    command::parser::bench_handle_put,
    command::parser::bench_coap_round_trip
);
criterion_main!(benches);
