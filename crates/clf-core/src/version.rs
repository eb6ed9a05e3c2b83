//! CTF/CLF file versions.
//!
//! Two version namespaces exist: CTF (`version=` attribute, currently up
//! to 2.0) and CLF (`compCLFversion=` attribute, currently up to 3.0).
//! All operator-reader selection keys on the CTF version; a CLF file is
//! mapped onto the CTF namespace when its root element is read.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A `(major, minor)` transform file version with total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version number.
    pub major: u32,
    /// Minor version number.
    pub minor: u32,
}

/// CTF 1.2, the version assumed when a CTF file declares none.
pub const V1_2: Version = Version::new(1, 2);
/// CTF 1.3.
pub const V1_3: Version = Version::new(1, 3);
/// CTF 1.4.
pub const V1_4: Version = Version::new(1, 4);
/// CTF 1.5.
pub const V1_5: Version = Version::new(1, 5);
/// CTF 1.6.
pub const V1_6: Version = Version::new(1, 6);
/// CTF 1.7.
pub const V1_7: Version = Version::new(1, 7);
/// CTF 1.8.
pub const V1_8: Version = Version::new(1, 8);
/// CTF 2.0.
pub const V2_0: Version = Version::new(2, 0);

/// Highest CTF version this implementation reads and writes.
pub const CTF_VERSION_MAX: Version = V2_0;
/// Highest CLF version this implementation reads and writes.
pub const CLF_VERSION_MAX: Version = Version::new(3, 0);

/// Failure to parse a version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid version")]
pub struct VersionError(pub String);

impl Version {
    /// Creates a version from its parts.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Maps a CLF version onto the CTF version namespace.
    ///
    /// CLF versions up to 2.0 are read with the CTF 1.7 feature set; CLF
    /// 3.0 with the CTF 2.0 feature set.
    pub fn clf_to_ctf(self) -> Version {
        if self <= Version::new(2, 0) { V1_7 } else { V2_0 }
    }

    /// True when `self <= v`.
    #[inline]
    pub fn at_most(self, v: Version) -> bool {
        self <= v
    }

    /// True when `self >= v`.
    #[inline]
    pub fn at_least(self, v: Version) -> bool {
        self >= v
    }

    /// True when `lo <= self <= hi`.
    #[inline]
    pub fn in_range(self, lo: Version, hi: Version) -> bool {
        self >= lo && self <= hi
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    /// Parses `"M"` or `"M.N"`; the minor part defaults to 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || VersionError(s.to_string());
        let mut parts = s.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|p| p.parse().ok())
            .ok_or_else(bad)?;
        let minor = match parts.next() {
            None => 0,
            Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
                p.parse().map_err(|_| bad())?
            }
            Some(_) => return Err(bad()),
        };
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(Version::new(major, minor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering() {
        assert!(V1_2 < V1_3);
        assert!(V1_8 < V2_0);
        assert!(V2_0 <= CTF_VERSION_MAX);
        assert!(Version::new(1, 10) > V1_8);
    }

    #[test]
    fn parsing() {
        assert_eq!("1.7".parse::<Version>().unwrap(), V1_7);
        assert_eq!("2".parse::<Version>().unwrap(), Version::new(2, 0));
        assert!("".parse::<Version>().is_err());
        assert!("1.".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
        assert!("1.2.3".parse::<Version>().is_err());
        assert!("-1.2".parse::<Version>().is_err());
    }

    #[test]
    fn clf_mapping() {
        assert_eq!(Version::new(1, 0).clf_to_ctf(), V1_7);
        assert_eq!(Version::new(2, 0).clf_to_ctf(), V1_7);
        assert_eq!(Version::new(3, 0).clf_to_ctf(), V2_0);
    }

    #[test]
    fn display_round_trip() {
        let v = Version::new(1, 4);
        assert_eq!(v.to_string().parse::<Version>().unwrap(), v);
    }
}
