//! LUT interpolation modes.

/// Interpolation declared on a LUT element.
///
/// `Default` records that the file did not specify a mode; the writer then
/// omits the attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Not specified in the file.
    #[default]
    Default,
    /// Piecewise linear (trilinear for 3D LUTs).
    Linear,
    /// Nearest entry (1D only).
    Nearest,
    /// Cubic (1D only; evaluated as linear by the scalar path).
    Cubic,
    /// Tetrahedral (3D only).
    Tetrahedral,
}

impl Interpolation {
    /// Parses a 1D LUT interpolation attribute value.
    pub fn parse_1d(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Some(Interpolation::Default),
            "linear" => Some(Interpolation::Linear),
            "nearest" => Some(Interpolation::Nearest),
            "cubic" => Some(Interpolation::Cubic),
            _ => None,
        }
    }

    /// Parses a 3D LUT interpolation attribute value.
    pub fn parse_3d(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Some(Interpolation::Default),
            "linear" | "trilinear" => Some(Interpolation::Linear),
            "tetrahedral" => Some(Interpolation::Tetrahedral),
            _ => None,
        }
    }

    /// The attribute spelling written to files.
    pub fn as_str(self) -> &'static str {
        match self {
            Interpolation::Default => "default",
            Interpolation::Linear => "linear",
            Interpolation::Nearest => "nearest",
            Interpolation::Cubic => "cubic",
            Interpolation::Tetrahedral => "tetrahedral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_specific_sets() {
        assert_eq!(Interpolation::parse_1d("nearest"), Some(Interpolation::Nearest));
        assert_eq!(Interpolation::parse_1d("tetrahedral"), None);
        assert_eq!(Interpolation::parse_3d("Tetrahedral"), Some(Interpolation::Tetrahedral));
        assert_eq!(Interpolation::parse_3d("nearest"), None);
    }
}
