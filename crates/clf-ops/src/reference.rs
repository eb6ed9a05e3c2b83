//! Reference operator.

use crate::op::{Direction, OpBase};
use crate::{OpError, OpResult};

/// A cross-file include: the record only carries the location; resolving
/// it to bytes (and detecting cycles) belongs to the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReferenceOp {
    /// Shared operator fields.
    pub base: OpBase,
    /// Apply the referenced transform as authored or inverted.
    pub direction: Direction,
    /// Relative or absolute path to the referenced file.
    pub path: String,
    /// Symbolic alias, resolved by the host environment.
    pub alias: String,
    /// Directory hint recorded at read time, not resolved here.
    pub base_path: String,
}

impl ReferenceOp {
    /// Checks the record is resolvable: exactly one of path or alias.
    pub fn validate(&self) -> OpResult<()> {
        if self.path.is_empty() && self.alias.is_empty() {
            return Err(OpError::validation(
                "Reference requires a 'path' or 'alias' attribute",
            ));
        }
        if !self.path.is_empty() && !self.alias.is_empty() {
            return Err(OpError::validation(
                "Reference cannot have both 'path' and 'alias' attributes",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_location() {
        let mut op = ReferenceOp::default();
        assert!(op.validate().is_err());

        op.path = "looks/shot1.ctf".into();
        assert!(op.validate().is_ok());

        op.alias = "showLut".into();
        assert!(op.validate().is_err());
    }
}
