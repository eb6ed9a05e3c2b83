//! The process list: an ordered operator pipeline plus file metadata.

use clf_core::{Metadata, Version, V1_2};

use crate::op::Op;
use crate::{OpError, OpResult};

/// An ordered sequence of operators read from (or destined for) a
/// CLF/CTF file.
///
/// A list returned by the parser is finished: parameters are normalized
/// to the 32f contract, the bit-depth chain has been checked, and the
/// structure is immutable-by-convention (nothing in this crate mutates a
/// finished list). Lists built programmatically should be passed through
/// [`ProcessList::validate`] before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessList {
    /// Required unique identifier.
    pub id: String,
    /// Optional human-readable name.
    pub name: String,
    /// Id of the transform this one inverts, when authored that way.
    pub inverse_of: String,
    /// Description of the expected input.
    pub input_descriptor: String,
    /// Description of the produced output.
    pub output_descriptor: String,
    /// Description elements, in order.
    pub descriptions: Vec<String>,
    /// The `Info` metadata tree.
    pub info: Metadata,
    /// CTF version governing the feature set.
    pub ctf_version: Version,
    /// CLF version as authored, when the file is CLF.
    pub clf_version: Option<Version>,
    /// True when the file was authored as CLF.
    pub is_clf: bool,
    /// The operators, in application order.
    pub ops: Vec<Op>,
}

impl Default for ProcessList {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            inverse_of: String::new(),
            input_descriptor: String::new(),
            output_descriptor: String::new(),
            descriptions: Vec::new(),
            info: Metadata::new("Info"),
            ctf_version: V1_2,
            clf_version: None,
            is_clf: false,
            ops: Vec::new(),
        }
    }
}

impl ProcessList {
    /// Creates an empty list with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// Validates every operator and the bit-depth chain: each operator's
    /// output depth must equal the next operator's input depth.
    pub fn validate(&self) -> OpResult<()> {
        for op in &self.ops {
            op.validate()?;
        }
        for pair in self.ops.windows(2) {
            let out = pair[0].base().out_depth;
            let next_in = pair[1].base().in_depth;
            if out != next_in {
                return Err(OpError::BitDepthMismatch(
                    format!("{} output '{}'", pair[0].kind(), out),
                    format!("{} input '{}'", pair[1].kind(), next_in),
                ));
            }
        }
        Ok(())
    }

    /// Applies every operator in order to one RGBA sample.
    pub fn apply(&self, rgba: &mut [f32; 4]) {
        for op in &self.ops {
            op.apply(rgba);
        }
    }

    /// Applies the pipeline to an interleaved pixel buffer with
    /// `channels` components per pixel (3 or more; alpha is taken from
    /// the 4th component when present).
    pub fn apply_buffer(&self, data: &mut [f32], channels: usize) {
        assert!(channels >= 3, "need at least 3 channels");
        for pixel in data.chunks_exact_mut(channels) {
            let mut rgba = [pixel[0], pixel[1], pixel[2], if channels > 3 { pixel[3] } else { 1.0 }];
            self.apply(&mut rgba);
            pixel[0] = rgba[0];
            pixel[1] = rgba[1];
            pixel[2] = rgba[2];
            if channels > 3 {
                pixel[3] = rgba[3];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Direction, MatrixOp, RangeOp};
    use clf_core::BitDepth;

    fn matrix_with_depths(in_depth: BitDepth, out_depth: BitDepth) -> Op {
        let mut m = MatrixOp::identity();
        m.base.in_depth = in_depth;
        m.base.out_depth = out_depth;
        Op::Matrix(m)
    }

    #[test]
    fn bit_depth_chain_is_enforced() {
        let mut pl = ProcessList::new("chain");
        pl.ops.push(matrix_with_depths(BitDepth::F32, BitDepth::UInt10));
        let mut range = RangeOp {
            min_in: Some(0.0),
            max_in: Some(1.0),
            min_out: Some(0.0),
            max_out: Some(1.0),
            ..Default::default()
        };
        range.base.in_depth = BitDepth::UInt12;
        range.base.out_depth = BitDepth::F32;
        range.direction = Direction::Forward;
        pl.ops.push(Op::Range(range));

        match pl.validate() {
            Err(OpError::BitDepthMismatch(a, b)) => {
                assert!(a.contains("10i"));
                assert!(b.contains("12i"));
            }
            other => panic!("expected BitDepthMismatch, got {other:?}"),
        }
    }

    #[test]
    fn matching_chain_passes() {
        let mut pl = ProcessList::new("ok");
        pl.ops.push(matrix_with_depths(BitDepth::F32, BitDepth::UInt10));
        pl.ops.push(matrix_with_depths(BitDepth::UInt10, BitDepth::F32));
        pl.validate().unwrap();
    }

    #[test]
    fn apply_runs_ops_in_order() {
        let mut pl = ProcessList::new("order");
        let mut scale = MatrixOp::identity();
        scale.set_rgb(&[2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0]);
        pl.ops.push(Op::Matrix(scale));
        let mut offset = MatrixOp::identity();
        offset.offsets = [0.1, 0.1, 0.1, 0.0];
        pl.ops.push(Op::Matrix(offset));

        let mut px = [0.2, 0.3, 0.4, 1.0];
        pl.apply(&mut px);
        assert!((px[0] - 0.5).abs() < 1e-6);
        assert!((px[1] - 0.7).abs() < 1e-6);
    }

    #[test]
    fn apply_buffer_rgb_and_rgba() {
        let mut pl = ProcessList::new("buffer");
        let mut m = MatrixOp::identity();
        m.offsets = [0.5, 0.0, 0.0, 0.0];
        pl.ops.push(Op::Matrix(m));

        let mut rgb = vec![0.0, 0.0, 0.0, 0.25, 0.0, 0.0];
        pl.apply_buffer(&mut rgb, 3);
        assert_eq!(rgb[0], 0.5);
        assert_eq!(rgb[3], 0.75);

        let mut rgba = vec![0.0, 0.0, 0.0, 1.0];
        pl.apply_buffer(&mut rgba, 4);
        assert_eq!(rgba[0], 0.5);
        assert_eq!(rgba[3], 1.0);
    }
}
