//! Benchmarks for value-type arithmetic and adjustment composition.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;

use winc_core::{
    compose_payment_adjustments, compose_upload_adjustments, AdjustmentExclusivity,
    AdjustmentOperator, DestinationAddressType, PaymentAdjustmentCatalog, PaymentAmount,
    UploadAdjustmentCatalog, UploadSubsidyContext, Winc,
};

fn big_winc() -> Winc {
    "123456789012345678901234567890".parse().unwrap()
}

fn bench_winc_arithmetic(c: &mut Criterion) {
    let w = big_winc();
    let x: Winc = "987654321098765432109876543210".parse().unwrap();

    c.bench_function("winc_plus", |b| b.iter(|| black_box(&w).plus(black_box(&x))));
    c.bench_function("winc_times_decimal", |b| {
        b.iter(|| black_box(&w).times(dec!(0.766)))
    });
    c.bench_function("winc_parse", |b| {
        b.iter(|| "123456789012345678901234567890".parse::<Winc>().unwrap())
    });
}

fn bench_composition(c: &mut Criterion) {
    let start = chrono::Utc::now() - chrono::Duration::days(1);
    let fee = PaymentAdjustmentCatalog {
        catalog_id: "fee".to_string(),
        name: "infra fee".to_string(),
        description: String::new(),
        operator: AdjustmentOperator::Multiply,
        operator_magnitude: dec!(0.766),
        priority: 10,
        start_at: start,
        end_at: None,
        exclusivity: AdjustmentExclusivity::Inclusive,
    };
    let subsidy = UploadAdjustmentCatalog {
        catalog_id: "fwd".to_string(),
        name: "fwd subsidy".to_string(),
        description: String::new(),
        operator: AdjustmentOperator::Multiply,
        operator_magnitude: dec!(0.8),
        priority: 1,
        start_at: start,
        end_at: None,
        byte_count_threshold: Some(1 << 20),
        winc_limitation: None,
    };

    c.bench_function("compose_payment_plan", |b| {
        b.iter(|| {
            compose_payment_adjustments(
                black_box(&PaymentAmount::from(10100u64)),
                black_box(&big_winc()),
                &[],
                std::slice::from_ref(&fee),
                DestinationAddressType::Arweave,
            )
        })
    });
    c.bench_function("compose_upload_plan", |b| {
        b.iter(|| {
            compose_upload_adjustments(
                black_box(&big_winc()),
                1024,
                &[UploadSubsidyContext {
                    catalog: &subsidy,
                    winc_used_in_interval: Winc::zero(),
                }],
            )
        })
    });
}

criterion_group!(benches, bench_winc_arithmetic, bench_composition);
criterion_main!(benches);
