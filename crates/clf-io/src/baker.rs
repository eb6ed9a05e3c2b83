//! Baking: realizing an arbitrary evaluator as a LUT pipeline.
//!
//! The baker samples a caller-supplied per-pixel evaluator and produces
//! an approximating [`ProcessList`] in one of three shapes: a 1D LUT
//! when the transform has no channel crosstalk, a 3D LUT when it does,
//! or a 1D shaper plus 3D cube when a shaper is requested. A shaper
//! window other than `[0, 1]` is encoded by a Range operator at the head
//! of the list.

use clf_core::BitDepth;
use clf_ops::{Array, Lut1dOp, Lut3dOp, Op, OpBase, ProcessList, RangeOp, HALF_DOMAIN_ENTRIES};
use half::f16;

use crate::error::WriteError;

/// The pipeline shape a bake produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeShape {
    /// A single 1D LUT.
    Lut1d,
    /// A single 3D LUT.
    Lut3d,
    /// A 1D shaper followed by a 3D LUT.
    Shaper1d3d,
}

/// Bakes an evaluator into a LUT process list.
///
/// # Example
///
/// ```rust
/// use clf_io::Baker;
///
/// // Realize a gamma adjustment as a 1024-entry 1D LUT.
/// let pl = Baker::new("gamma_bake", |px| {
///     for v in px[..3].iter_mut() {
///         *v = v.max(0.0).powf(2.2);
///     }
/// })
/// .lut_size(1024)
/// .bake_1d()
/// .unwrap();
/// assert_eq!(pl.ops.len(), 1);
/// ```
pub struct Baker<E> {
    evaluator: E,
    id: String,
    lut_size: usize,
    cube_size: usize,
    shaper_size: Option<usize>,
    shaper_window: (f32, f32),
}

impl<E: Fn(&mut [f32; 4])> Baker<E> {
    /// Creates a baker over `evaluator` producing lists with the given
    /// id.
    pub fn new(id: impl Into<String>, evaluator: E) -> Self {
        Self {
            evaluator,
            id: id.into(),
            lut_size: 4096,
            cube_size: 33,
            shaper_size: None,
            shaper_window: (0.0, 1.0),
        }
    }

    /// Sets the 1D LUT size (default 4096).
    pub fn lut_size(mut self, size: usize) -> Self {
        self.lut_size = size;
        self
    }

    /// Sets the 3D cube edge size (default 33).
    pub fn cube_size(mut self, size: usize) -> Self {
        self.cube_size = size;
        self
    }

    /// Requests a shaper of an explicit size; without this the shaper
    /// defaults to a half-domain LUT covering the full float range.
    pub fn shaper_size(mut self, size: usize) -> Self {
        self.shaper_size = Some(size);
        self
    }

    /// Sets the shaper input window `[from_in_start, from_in_end]`;
    /// values outside `[0, 1]` prepend a Range rescale.
    pub fn shaper_window(mut self, start: f32, end: f32) -> Self {
        self.shaper_window = (start, end);
        self
    }

    /// Picks a shape automatically: 1D when probing detects no channel
    /// crosstalk, 3D otherwise.
    pub fn bake(&self) -> Result<(ProcessList, BakeShape), WriteError> {
        if self.has_crosstalk() {
            Ok((self.bake_3d()?, BakeShape::Lut3d))
        } else {
            Ok((self.bake_1d()?, BakeShape::Lut1d))
        }
    }

    /// True when changing one input channel moves another output
    /// channel.
    pub fn has_crosstalk(&self) -> bool {
        for probe in [0.25f32, 0.5, 0.75] {
            let mut neutral = [0.0, 0.0, 0.0, 1.0];
            (self.evaluator)(&mut neutral);
            for ch in 0..3 {
                let mut px = [0.0, 0.0, 0.0, 1.0];
                px[ch] = probe;
                (self.evaluator)(&mut px);
                for other in 0..3 {
                    if other != ch && (px[other] - neutral[other]).abs() > 1e-5 {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Bakes a single 1D LUT of `lut_size` entries.
    pub fn bake_1d(&self) -> Result<ProcessList, WriteError> {
        let size = self.lut_size;
        check_size(size)?;

        let mut array = Array::for_lut1d(size, 3);
        for i in 0..size {
            let x = i as f32 / (size - 1) as f32;
            let mut px = [x, x, x, 1.0];
            (self.evaluator)(&mut px);
            for ch in 0..3 {
                array.values.push(px[ch] as f64);
            }
        }

        let mut pl = self.list();
        pl.ops.push(Op::Lut1d(Lut1dOp {
            base: base_32f(),
            array,
            ..Default::default()
        }));
        Ok(pl)
    }

    /// Bakes a single 3D LUT of `cube_size` entries per edge.
    pub fn bake_3d(&self) -> Result<ProcessList, WriteError> {
        let mut pl = self.list();
        pl.ops.push(Op::Lut3d(self.cube(|px| (self.evaluator)(px))?));
        Ok(pl)
    }

    /// Bakes a 1D shaper followed by a 3D LUT, optionally headed by a
    /// Range when the shaper window is not the identity interval.
    ///
    /// The shaper carries the transform's per-channel tone curve so the
    /// cube only has to capture crosstalk; here the shaper is the
    /// identity ramp over the window and the cube samples the evaluator
    /// through it.
    pub fn bake_1d_3d(&self) -> Result<ProcessList, WriteError> {
        check_size(self.cube_size)?;
        if let Some(size) = self.shaper_size {
            check_size(size)?;
        }

        let (start, end) = self.shaper_window;
        let span = end - start;
        let mut pl = self.list();

        if (start, end) != (0.0, 1.0) {
            pl.ops.push(Op::Range(RangeOp {
                base: base_32f(),
                min_in: Some(start as f64),
                max_in: Some(end as f64),
                min_out: Some(0.0),
                max_out: Some(1.0),
                ..Default::default()
            }));
        }

        // The shaper maps the (rescaled) window onto [0, 1].
        let shaper = match self.shaper_size {
            Some(size) => {
                let mut array = Array::for_lut1d(size, 3);
                for i in 0..size {
                    let v = i as f32 / (size - 1) as f32;
                    for _ in 0..3 {
                        array.values.push(v as f64);
                    }
                }
                Lut1dOp { base: base_32f(), array, ..Default::default() }
            }
            None => {
                // Default: a half-domain shaper covering the full float
                // range, clamped onto the window.
                let mut array = Array::for_lut1d(HALF_DOMAIN_ENTRIES, 3);
                for bits in 0..HALF_DOMAIN_ENTRIES {
                    let h = f16::from_bits(bits as u16);
                    let x = if h.is_nan() { 0.0 } else { h.to_f32() };
                    let v = (x.clamp(0.0, 1.0)) as f64;
                    for _ in 0..3 {
                        array.values.push(v);
                    }
                }
                Lut1dOp {
                    base: base_32f(),
                    half_domain: true,
                    array,
                    ..Default::default()
                }
            }
        };
        pl.ops.push(Op::Lut1d(shaper));

        // The cube sees shaper output; undo the window rescale before
        // evaluating so the cube samples the original transform.
        let cube = self.cube(|px| {
            for ch in 0..3 {
                px[ch] = start + px[ch] * span;
            }
            (self.evaluator)(px);
        })?;
        pl.ops.push(Op::Lut3d(cube));
        Ok(pl)
    }

    fn cube(&self, eval: impl Fn(&mut [f32; 4])) -> Result<Lut3dOp, WriteError> {
        let size = self.cube_size;
        check_size(size)?;
        let max = (size - 1) as f32;
        let mut array = Array::for_lut3d(size);
        for r in 0..size {
            for g in 0..size {
                for b in 0..size {
                    let mut px = [r as f32 / max, g as f32 / max, b as f32 / max, 1.0];
                    eval(&mut px);
                    array.values.push(px[0] as f64);
                    array.values.push(px[1] as f64);
                    array.values.push(px[2] as f64);
                }
            }
        }
        Ok(Lut3dOp { base: base_32f(), array, ..Default::default() })
    }

    fn list(&self) -> ProcessList {
        ProcessList::new(self.id.clone())
    }
}

fn base_32f() -> OpBase {
    OpBase {
        in_depth: BitDepth::F32,
        out_depth: BitDepth::F32,
        ..Default::default()
    }
}

fn check_size(size: usize) -> Result<(), WriteError> {
    if size < 2 {
        return Err(WriteError::InvalidCubeSize(size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gamma_evaluator(px: &mut [f32; 4]) {
        for v in px[..3].iter_mut() {
            *v = v.max(0.0).powf(2.0);
        }
    }

    fn crosstalk_evaluator(px: &mut [f32; 4]) {
        let (r, g, b) = (px[0], px[1], px[2]);
        px[0] = 0.8 * r + 0.2 * g;
        px[1] = g;
        px[2] = 0.9 * b + 0.1 * r;
    }

    #[test]
    fn crosstalk_detection() {
        let plain = Baker::new("a", gamma_evaluator);
        assert!(!plain.has_crosstalk());
        let mixing = Baker::new("b", crosstalk_evaluator);
        assert!(mixing.has_crosstalk());
    }

    #[test]
    fn auto_shape_selection() {
        let (_, shape) = Baker::new("a", gamma_evaluator).bake().unwrap();
        assert_eq!(shape, BakeShape::Lut1d);
        let (_, shape) = Baker::new("b", crosstalk_evaluator).cube_size(5).bake().unwrap();
        assert_eq!(shape, BakeShape::Lut3d);
    }

    #[test]
    fn baked_1d_matches_the_evaluator() {
        let pl = Baker::new("g", gamma_evaluator).lut_size(1024).bake_1d().unwrap();
        let mut px = [0.5, 0.25, 0.75, 1.0];
        pl.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.25, epsilon = 1e-4);
        assert_abs_diff_eq!(px[1], 0.0625, epsilon = 1e-4);
    }

    #[test]
    fn baked_3d_matches_the_evaluator() {
        let pl = Baker::new("x", crosstalk_evaluator).cube_size(9).bake_3d().unwrap();
        let mut px = [0.5, 0.5, 0.25, 1.0];
        let mut expected = px;
        crosstalk_evaluator(&mut expected);
        pl.apply(&mut px);
        for ch in 0..3 {
            assert_abs_diff_eq!(px[ch], expected[ch], epsilon = 1e-3);
        }
    }

    #[test]
    fn shaper_window_prepends_a_range() {
        let pl = Baker::new("s", crosstalk_evaluator)
            .cube_size(5)
            .shaper_size(256)
            .shaper_window(-0.5, 2.0)
            .bake_1d_3d()
            .unwrap();
        assert_eq!(pl.ops.len(), 3);
        assert!(matches!(&pl.ops[0], Op::Range(_)));
        assert!(matches!(&pl.ops[1], Op::Lut1d(_)));
        assert!(matches!(&pl.ops[2], Op::Lut3d(_)));

        // Applying to a value inside the window approximates the
        // evaluator at that value.
        let mut px = [0.8, 0.2, 0.4, 1.0];
        let mut expected = px;
        crosstalk_evaluator(&mut expected);
        pl.apply(&mut px);
        for ch in 0..3 {
            assert_abs_diff_eq!(px[ch], expected[ch], epsilon = 0.05);
        }
    }

    #[test]
    fn default_shaper_is_half_domain() {
        let pl = Baker::new("s", crosstalk_evaluator).cube_size(3).bake_1d_3d().unwrap();
        assert_eq!(pl.ops.len(), 2);
        match &pl.ops[0] {
            Op::Lut1d(l) => {
                assert!(l.half_domain);
                assert_eq!(l.length(), HALF_DOMAIN_ENTRIES);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tiny_sizes_are_rejected() {
        let err = Baker::new("t", gamma_evaluator).lut_size(1).bake_1d().unwrap_err();
        assert_eq!(err, WriteError::InvalidCubeSize(1));
        let err = Baker::new("t", gamma_evaluator).cube_size(0).bake_3d().unwrap_err();
        assert_eq!(err, WriteError::InvalidCubeSize(0));
    }
}
