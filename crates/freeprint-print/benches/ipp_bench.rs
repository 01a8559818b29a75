// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for IPP request encoding, response flattening, and
// print-stream generation.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use freeprint_core::SelectedOptions;
use freeprint_driver::{generate, ppd};
use freeprint_print::ipp::{
    IppMessageBuilder, STATUS_OK, TAG_OPERATION_ATTRIBUTES, TAG_PRINTER_ATTRIBUTES,
    build_get_attributes_request, parse_response,
};

const PPD: &str = r#"*PPD-Adobe: "4.3"
*NickName: "Bench Laser"
*OpenUI *PageSize/Media Size: PickOne
*DefaultPageSize: Letter
*PageSize Letter/US Letter: "<</PageSize[612 792]>>setpagedevice"
*PageSize A4/A4: "<</PageSize[595 842]>>setpagedevice"
*CloseUI: *PageSize
*OpenUI *Duplex/Two-Sided: PickOne
*DefaultDuplex: None
*Duplex None/Off: "<</Duplex false>>setpagedevice"
*Duplex DuplexNoTumble/Long Edge: "
<</Duplex true /Tumble false>>setpagedevice"
*End
*CloseUI: *Duplex
"#;

fn printer_response() -> Vec<u8> {
    let mut builder = IppMessageBuilder::new(STATUS_OK, 1);
    builder
        .begin_group(TAG_OPERATION_ATTRIBUTES)
        .charset("attributes-charset", "utf-8")
        .natural_language("attributes-natural-language", "en")
        .begin_group(TAG_PRINTER_ATTRIBUTES)
        .text("printer-make-and-model", "Bench Laser 9000")
        .keyword("printer-state-reasons", "none")
        .uri("printer-uri-supported", "ipp://10.0.0.5:631/ipp/print")
        .keyword("document-format-supported", "application/pdf")
        .keyword_additional("image/jpeg")
        .keyword_additional("application/postscript")
        .integer("queued-job-count", 0)
        .enum_attr("printer-state", 3)
        .boolean("printer-is-accepting-jobs", true);
    builder.build()
}

fn bench_ipp_request(c: &mut Criterion) {
    c.bench_function("build_get_attributes_request", |b| {
        b.iter(|| black_box(build_get_attributes_request(black_box("http://10.0.0.5:631/ipp/print"))));
    });
}

fn bench_ipp_response(c: &mut Criterion) {
    let data = printer_response();
    c.bench_function("parse_response (printer attrs)", |b| {
        b.iter(|| {
            let attrs = parse_response(black_box(&data));
            assert!(!attrs.is_empty());
        });
    });
}

fn bench_print_stream(c: &mut Criterion) {
    c.bench_function("ppd::parse_str", |b| {
        b.iter(|| black_box(ppd::parse_str(black_box(PPD))));
    });

    let options = ppd::with_synthetic_options(ppd::parse_str(PPD));
    let mut selected = SelectedOptions::new();
    selected.insert("PageSize".into(), "A4".into());
    selected.insert("Duplex".into(), "DuplexNoTumble".into());
    let document = "The quick brown fox (jumps) over the lazy dog.\n".repeat(2000);

    c.bench_function("generate (~90 KiB text)", |b| {
        b.iter(|| {
            let stream = generate(
                black_box(&options),
                black_box(&selected),
                "bench.txt",
                "POSTSCRIPT",
                black_box(document.as_bytes()),
            );
            black_box(stream);
        });
    });
}

criterion_group!(benches, bench_ipp_request, bench_ipp_response, bench_print_stream);
criterion_main!(benches);
