//! Parser vector tests against captured `iostat -x` output.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use iostat_core::{IostatError, Metric, Parser};


#[test]
fn parser_vectors() {
    let files = [
        "freebsd_two_disks.json",
        "end_to_end_single.json",
        "field_count_mismatch.json",
        "bad_value_isolated.json",
        "no_matching_devices.json",
        "custom_prefix_da.json",
    ];

    for f in files {
        let v = vector_loader::load(f);
        let parser = match &v.device_prefix {
            Some(prefix) => Parser::new(prefix.as_str(), Metric::ALL.to_vec()).unwrap(),
            None => Parser::default(),
        };
        let raw = v.output.text();

        let mut samples = Vec::new();
        let mut error_lines = Vec::new();
        for row in parser.parse(&raw) {
            match row {
                Ok(s) => samples.push(s),
                Err(IostatError::Parse { line, .. }) => error_lines.push(line),
                Err(other) => panic!("unexpected error {other} (vector={})", v.description),
            }
        }

        assert_eq!(error_lines, v.expect_error_lines, "vector={}", v.description);
        assert_eq!(samples.len(), v.expect.len(), "vector={}", v.description);
        for (got, want) in samples.iter().zip(&v.expect) {
            assert_eq!(got.device, want.device, "vector={}", v.description);
            let values: Vec<f64> = got.values().map(|(_, x)| x).collect();
            assert_eq!(values, want.values.to_vec(), "vector={} device={}", v.description, want.device);
        }
    }
}

#[test]
fn duplicate_devices_are_kept_in_line_order() {
    let raw = "ada0 1 1 1 1 1 1 1 1 1 1\nada0 2 2 2 2 2 2 2 2 2 2\n";
    let samples: Vec<_> = Parser::default().parse(raw).map(Result::unwrap).collect();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].reads_per_sec, 1.0);
    assert_eq!(samples[1].reads_per_sec, 2.0);
}
