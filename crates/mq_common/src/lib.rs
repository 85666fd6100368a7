//! Common definitions shared across the matter-qubit decoding workspace.
//!
//! This module provides the single-qubit Pauli alphabet used by strategies
//! and measurement bases, together with the protocol-wide defaults shared by
//! the core algorithms, the file formats, and the host tools.

#![no_std]

// Protocol-wide defaults.
//
// Values that several crates must agree on: which qubit carries the logical
// information and how a failed evaluation is written into result records.
pub mod defaults {
    /// Label of the input (logical) qubit after relabelling.
    ///
    /// Catalogued graphs list their input last; loaders swap it with node 0
    /// so that every strategy string starts with the logical component.
    pub const INPUT_QUBIT: usize = 0;

    /// Matter-qubit value written for a measurement order that failed.
    ///
    /// Result records keep one entry per evaluated order, so a failure is
    /// encoded as data instead of shortening the arrays.
    pub const FAILED_MATTER_SENTINEL: i64 = -1;

    /// Default number of lightest strategies considered per loss pattern by
    /// the sampled merge.
    pub const SAMPLED_MERGE_TOP: usize = 10;

    /// Default seed for the sampled merge.
    pub const SAMPLED_MERGE_SEED: u64 = 42;
}

/// Single-qubit Pauli operators and measurement bases.
///
/// A strategy prescribes one of these operators for every qubit. The same
/// enumeration doubles as a measurement basis: measuring a qubit in basis
/// `X` is compatible with every strategy that needs `I` or `X` there.
pub mod pauli {
    use core::fmt;

    /// Single-qubit Pauli operator, phase ignored.
    ///
    /// The discriminant packs the symplectic representation as `0bxz`,
    /// so `x()` and `z()` are single bit tests.
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum Pauli {
        /// Identity: the qubit is not needed.
        I = 0b00,

        /// Phase flip; measuring in the computational basis.
        Z = 0b01,

        /// Bit flip; measuring in the Hadamard basis.
        X = 0b10,

        /// Both flips; measuring in the circular basis.
        Y = 0b11,
    }

    impl Pauli {
        /// Builds the operator from its symplectic bits.
        #[inline(always)]
        pub const fn from_bits(x: bool, z: bool) -> Self {
            match (x, z) {
                (false, false) => Pauli::I,
                (false, true) => Pauli::Z,
                (true, false) => Pauli::X,
                (true, true) => Pauli::Y,
            }
        }

        /// X component of the symplectic representation.
        #[inline(always)]
        pub const fn x(self) -> bool {
            (self as u8) & 0b10 != 0
        }

        /// Z component of the symplectic representation.
        #[inline(always)]
        pub const fn z(self) -> bool {
            (self as u8) & 0b01 != 0
        }

        #[inline(always)]
        pub const fn is_identity(self) -> bool {
            matches!(self, Pauli::I)
        }

        /// Whether two single-qubit operators commute.
        ///
        /// Distinct non-identity Paulis anticommute; everything else
        /// commutes. A strategy survives a measurement in basis `b` on a
        /// qubit exactly when its operator there commutes with `b`.
        #[inline(always)]
        pub const fn commutes_with(self, other: Pauli) -> bool {
            let x1 = self.x() as u8;
            let z1 = self.z() as u8;
            let x2 = other.x() as u8;
            let z2 = other.z() as u8;
            (x1 & z2) ^ (z1 & x2) == 0
        }

        /// Text symbol used in persisted strategy strings.
        pub const fn symbol(self) -> char {
            match self {
                Pauli::I => 'I',
                Pauli::X => 'X',
                Pauli::Y => 'Y',
                Pauli::Z => 'Z',
            }
        }

        /// Parses a symbol, accepting lower case.
        pub const fn from_symbol(c: char) -> Option<Self> {
            match c {
                'I' | 'i' => Some(Pauli::I),
                'X' | 'x' => Some(Pauli::X),
                'Y' | 'y' => Some(Pauli::Y),
                'Z' | 'z' => Some(Pauli::Z),
                _ => None,
            }
        }
    }

    impl fmt::Display for Pauli {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.symbol())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn bits_round_trip() {
            for p in [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z] {
                assert_eq!(Pauli::from_bits(p.x(), p.z()), p);
            }
        }

        #[test]
        fn commutation_table() {
            assert!(Pauli::I.commutes_with(Pauli::X));
            assert!(Pauli::Z.commutes_with(Pauli::Z));
            assert!(!Pauli::X.commutes_with(Pauli::Z));
            assert!(!Pauli::Y.commutes_with(Pauli::X));
            assert!(!Pauli::Y.commutes_with(Pauli::Z));
        }

        #[test]
        fn symbols() {
            assert_eq!(Pauli::from_symbol('y'), Some(Pauli::Y));
            assert_eq!(Pauli::from_symbol('Q'), None);
            assert_eq!(Pauli::Z.symbol(), 'Z');
        }
    }
}
