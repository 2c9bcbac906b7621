use criterion::{BatchSize, Criterion, Throughput};
use libiot_node::command::parse;
use libiot_node::command::resource::{handle_put, handle_request};
use libiot_node::model::{DeviceKind, Model};
use libiot_node::network::application::coap::{Code, Message, MessageType};
use std::hint::black_box;

const SETPOINT: &[u8] = br#"{"t":21}"#;
const NOISY: &[u8] =
    br#"{"meta":{"src":"bms","tags":["a","b",{"x":1}]},"ts":1712345678,"h":71,"t":"18","c":640}"#;

pub fn bench_parse_setpoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(SETPOINT.len() as u64));
    group.bench_function("setpoint", |b| {
        b.iter(|| parse(black_box(SETPOINT), &["t"]))
    });
    group.finish();
}

pub fn bench_parse_skipping_unknown(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(NOISY.len() as u64));
    group.bench_function("skipping_unknown", |b| {
        b.iter(|| parse(black_box(NOISY), &["t", "h", "c"]))
    });
    group.finish();
}

pub fn bench_handle_put(c: &mut Criterion) {
    c.bench_function("handle_put", |b| {
        b.iter_batched_ref(
            || Model::for_kind(DeviceKind::TemperatureActuator, 0),
            |model| handle_put(model, black_box(SETPOINT)),
            BatchSize::SmallInput,
        )
    });
}

pub fn bench_coap_round_trip(c: &mut Criterion) {
    let mut request = Message::new(MessageType::Confirmable, Code::PUT, 7);
    request.set_token(&[0xa1, 0xb2]).expect("token fits");
    request.set_path("/temperature").expect("path fits");
    request.set_payload(SETPOINT).expect("payload fits");
    let wire = request.encode().expect("request encodes");

    c.bench_function("coap_round_trip", |b| {
        b.iter_batched_ref(
            || Model::for_kind(DeviceKind::TemperatureActuator, 0),
            |model| {
                let request = Message::decode(black_box(&wire)).expect("request decodes");
                handle_request(model, &request, 8).encode()
            },
            BatchSize::SmallInput,
        )
    });
}
