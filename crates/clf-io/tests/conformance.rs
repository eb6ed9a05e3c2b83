//! End-to-end conformance tests for the CLF/CTF reader and writer.

use std::fmt::Write as _;
use std::io::Write as _;

use approx::assert_abs_diff_eq;
use half::f16;

use clf_io::cdl::parse_cdl;
use clf_io::{
    is_loadable, parse_process_list, read_clf, write_process_list, Dialect, ErrorKind,
    ParseOptions,
};
use clf_ops::{Op, ProcessList};

fn parse(xml: &str) -> Result<ProcessList, clf_io::Error> {
    parse_process_list(xml.as_bytes(), "conformance.ctf", ParseOptions::default())
}

#[test]
fn minimal_matrix_clf_is_identity_on_pixels() {
    let pl = parse(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ProcessList id="m" compCLFversion="3.0">
    <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 3">
            1 0 0
            0 1 0
            0 0 1
        </Array>
    </Matrix>
</ProcessList>"#,
    )
    .unwrap();

    assert_eq!(pl.ops.len(), 1);
    let mut px = [0.5, 0.25, 0.75, 1.0];
    pl.apply(&mut px);
    assert_eq!(px, [0.5, 0.25, 0.75, 1.0]);
}

#[test]
fn half_domain_raw_halfs_lut_computes_sqrt() {
    // 65536 entries whose bit patterns encode y = sqrt(x) over the half
    // domain.
    let mut values = String::with_capacity(65536 * 8);
    for bits in 0..65536u32 {
        let x = f16::from_bits(bits as u16).to_f32();
        let y = if x.is_finite() && x >= 0.0 { x.sqrt() } else { 0.0 };
        let stored = f16::from_f32(y).to_bits();
        writeln!(values, "{stored}").unwrap();
    }

    let xml = format!(
        r#"<ProcessList id="sqrt" version="1.7">
    <LUT1D inBitDepth="32f" outBitDepth="32f" halfDomain="true" rawHalfs="true">
        <Array dim="65536 1">
{values}
        </Array>
    </LUT1D>
</ProcessList>"#
    );

    let pl = parse(&xml).unwrap();
    let mut px = [0.25, 0.25, 0.25, 1.0];
    pl.apply(&mut px);
    for ch in 0..3 {
        assert_abs_diff_eq!(px[ch], 0.5, epsilon = f32::EPSILON);
    }
    assert_eq!(px[3], 1.0);
}

#[test]
fn index_map_materializes_smpte_range() {
    // A legacy 10-bit LUT with a two-entry IndexMap describing the SMPTE
    // legal range; the reader prepends the equivalent Range.
    let mut ramp = String::new();
    for i in 0..1024 {
        writeln!(ramp, "{i}").unwrap();
    }
    let xml = format!(
        r#"<ProcessList id="legal" version="1.7">
    <LUT1D inBitDepth="10i" outBitDepth="10i">
        <IndexMap dim="2">64@0 940@1023</IndexMap>
        <Array dim="1024 1">
{ramp}
        </Array>
    </LUT1D>
</ProcessList>"#
    );

    let pl = parse(&xml).unwrap();
    assert_eq!(pl.ops.len(), 2);
    match &pl.ops[0] {
        Op::Range(r) => {
            assert_abs_diff_eq!(r.min_in.unwrap(), 64.0 / 1023.0, epsilon = 1e-12);
            assert_abs_diff_eq!(r.max_in.unwrap(), 940.0 / 1023.0, epsilon = 1e-12);
            assert_abs_diff_eq!(r.min_out.unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(r.max_out.unwrap(), 1.0, epsilon = 1e-12);
        }
        other => panic!("expected a Range first, got {other:?}"),
    }
    assert!(matches!(&pl.ops[1], Op::Lut1d(_)));
}

#[test]
fn bit_depth_mismatch_reports_the_range_line() {
    let xml = r#"<ProcessList id="chain" version="1.7">
    <Matrix inBitDepth="32f" outBitDepth="10i">
        <Array dim="3 3">1 0 0 0 1 0 0 0 1</Array>
    </Matrix>
    <Range inBitDepth="12i" outBitDepth="32f">
        <minInValue>0</minInValue>
        <minOutValue>0</minOutValue>
    </Range>
</ProcessList>"#;

    let err = parse(xml).unwrap_err();
    assert_eq!(err.kind, ErrorKind::BitDepthMismatch);
    // The diagnostic points at the Range's opening tag.
    let range_line = xml.lines().position(|l| l.contains("<Range")).unwrap() + 1;
    assert_eq!(err.line as usize, range_line);
}

#[test]
fn clf_dialect_rejects_fixed_function() {
    let err = parse(
        r#"<ProcessList id="d" compCLFversion="3.0">
    <FixedFunction inBitDepth="32f" outBitDepth="32f" style="RedMod03Fwd"/>
</ProcessList>"#,
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedOperator);
}

#[test]
fn ccc_with_duplicate_ids_fails_naming_the_id() {
    let err = parse_cdl(
        br#"<ColorCorrectionCollection>
    <ColorCorrection id="x">
        <SOPNode><Slope>1 1 1</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
    </ColorCorrection>
    <ColorCorrection id="x">
        <SOPNode><Slope>2 2 2</Slope><Offset>0 0 0</Offset><Power>1 1 1</Power></SOPNode>
    </ColorCorrection>
</ColorCorrectionCollection>"#,
        "dups.ccc",
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateId);
    assert!(err.message.contains("'x'"));
}

#[test]
fn round_trip_preserves_the_pipeline() {
    let xml = r#"<ProcessList id="rt" version="2.0" name="round trip">
    <Description>a pipeline touching several operator kinds</Description>
    <InputDescriptor>ACEScct</InputDescriptor>
    <OutputDescriptor>Rec709</OutputDescriptor>
    <Info app="unit-test">
        <Release>2026.1</Release>
    </Info>
    <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 4 3">
            0.5 0.25 0 0.125
            0 0.75 0.125 0
            0.0625 0 1.5 -0.25
        </Array>
    </Matrix>
    <ASC_CDL inBitDepth="32f" outBitDepth="32f" style="Fwd">
        <SOPNode>
            <Slope>1.25 1 0.875</Slope>
            <Offset>0.0625 0 -0.03125</Offset>
            <Power>1 1.5 1</Power>
        </SOPNode>
        <SatNode>
            <Saturation>0.875</Saturation>
        </SatNode>
    </ASC_CDL>
    <Range inBitDepth="32f" outBitDepth="32f">
        <minInValue>0</minInValue>
        <maxInValue>1</maxInValue>
        <minOutValue>0</minOutValue>
        <maxOutValue>0.5</maxOutValue>
    </Range>
    <LUT1D inBitDepth="32f" outBitDepth="32f" interpolation="linear">
        <Array dim="4 3">
            0 0 0
            0.25 0.25 0.25
            0.75 0.75 0.75
            1 1 1
        </Array>
    </LUT1D>
</ProcessList>"#;

    let pl = parse(xml).unwrap();
    let written = write_process_list(&pl, Dialect::Ctf).unwrap();
    let back = parse(&written).unwrap();

    assert_eq!(back.id, pl.id);
    assert_eq!(back.name, pl.name);
    assert_eq!(back.descriptions, pl.descriptions);
    assert_eq!(back.input_descriptor, pl.input_descriptor);
    assert_eq!(back.output_descriptor, pl.output_descriptor);
    assert_eq!(back.info, pl.info);
    assert_eq!(back.ops, pl.ops);
}

#[test]
fn clf_round_trip_keeps_the_dialect() {
    let xml = r#"<ProcessList id="clfrt" compCLFversion="3.0">
    <LUT1D inBitDepth="10i" outBitDepth="10i">
        <Array dim="2 1">0 1023</Array>
    </LUT1D>
</ProcessList>"#;
    let pl = parse_process_list(xml.as_bytes(), "rt.clf", ParseOptions::default()).unwrap();
    assert!(pl.is_clf);

    let written = write_process_list(&pl, Dialect::Clf).unwrap();
    assert!(written.contains("compCLFversion=\"3.0\""));
    let back = parse_process_list(written.as_bytes(), "rt2.clf", ParseOptions::default()).unwrap();
    assert!(back.is_clf);
    assert_eq!(back.ops, pl.ops);
}

#[test]
fn reported_line_matches_newline_count() {
    // A failure injected at a known byte offset: the bad token below.
    let xml = "<ProcessList id=\"l\" version=\"1.7\">\n  <Matrix inBitDepth=\"32f\" outBitDepth=\"32f\">\n    <Array dim=\"3 3\">\n      1 0 0\n      0 oops 0\n      0 0 1\n    </Array>\n  </Matrix>\n</ProcessList>\n";
    let err = parse(xml).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidNumber);

    let offset = xml.find("oops").unwrap();
    let expected = 1 + xml.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count();
    assert_eq!(err.line as usize, expected);
}

#[test]
fn failure_discards_the_whole_list() {
    // The matrix parses fine; the second op fails. The caller observes
    // only the error.
    let result = parse(
        r#"<ProcessList id="atomic" version="1.7">
    <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 3">1 0 0 0 1 0 0 0 1</Array>
    </Matrix>
    <Gamma inBitDepth="32f" outBitDepth="32f" style="sideways">
        <GammaParams gamma="2.2"/>
    </Gamma>
</ProcessList>"#,
    );
    assert_eq!(result.unwrap_err().kind, ErrorKind::UnknownStyle);
}

#[test]
fn loadability_sniff_and_file_reading() {
    let xml = r#"<ProcessList id="file" compCLFversion="3.0">
    <Matrix inBitDepth="32f" outBitDepth="32f">
        <Array dim="3 3">1 0 0 0 1 0 0 0 1</Array>
    </Matrix>
</ProcessList>"#;
    assert!(is_loadable(xml.as_bytes()));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identity.clf");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(xml.as_bytes()).unwrap();
    drop(f);

    let pl = read_clf(&path).unwrap();
    assert_eq!(pl.id, "file");
    assert!(pl.is_clf);
}

#[test]
fn normalization_contract_for_integer_depths() {
    // A 10-bit identity matrix with a half-scale offset column: after
    // reading, the op behaves as if both depths were 32f, so the offset
    // becomes 511.5/1023.
    let pl = parse(
        r#"<ProcessList id="n" version="1.7">
    <Matrix inBitDepth="10i" outBitDepth="10i">
        <Array dim="3 4 3">
            1 0 0 511.5
            0 1 0 0
            0 0 1 0
        </Array>
    </Matrix>
</ProcessList>"#,
    )
    .unwrap();

    let mut px = [0.25, 0.25, 0.25, 1.0];
    pl.apply(&mut px);
    assert_abs_diff_eq!(px[0], 0.25 + 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(px[1], 0.25, epsilon = 1e-6);
}

#[test]
fn inverse_lut_prepares_for_forward_evaluation() {
    // An InverseLUT1D of y = x^2 behaves as sqrt at evaluation time.
    let mut ramp = String::new();
    for i in 0..1024 {
        let x = i as f64 / 1023.0;
        writeln!(ramp, "{}", x * x).unwrap();
    }
    let xml = format!(
        r#"<ProcessList id="inv" version="1.7">
    <InverseLUT1D inBitDepth="32f" outBitDepth="32f">
        <Array dim="1024 1">
{ramp}
        </Array>
    </InverseLUT1D>
</ProcessList>"#
    );
    let pl = parse(&xml).unwrap();
    match &pl.ops[0] {
        Op::Lut1d(l) => assert_eq!(l.direction, clf_ops::Direction::Inverse),
        other => panic!("unexpected {other:?}"),
    }

    let mut px = [0.25, 0.25, 0.25, 1.0];
    pl.apply(&mut px);
    assert_abs_diff_eq!(px[0], 0.5, epsilon = 2e-3);
}
