//! Multi-qubit Pauli operators in symplectic form.
//!
//! A Pauli string keeps two registers, one X bit and one Z bit per qubit,
//! and ignores the global phase. Products are register XORs and the
//! commutation of two strings is their symplectic inner product. This is
//! the representation every strategy and stabilizer element uses.

use crate::gf2::{Gf2Row, dot, xor_into, zero_row};
use crate::{CoreError, CoreResult, Pauli};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pauli operator on `len` qubits.
///
/// Persisted as its text form (`"XZIIY"`, qubit 0 first), which is also the
/// format of the strategy files produced by the chunked derivation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PauliString {
    /// X register: bit `q` set when the operator flips qubit `q`.
    x: Gf2Row,

    /// Z register: bit `q` set when the operator applies a phase to `q`.
    z: Gf2Row,
}

impl PauliString {
    pub fn identity(len: usize) -> Self {
        Self {
            x: zero_row(len),
            z: zero_row(len),
        }
    }

    /// Assembles an operator from its two registers.
    ///
    /// # Errors
    ///
    /// `InvalidPauli` if the registers have different lengths.
    pub fn from_parts(x: Gf2Row, z: Gf2Row) -> CoreResult<Self> {
        if x.len() != z.len() {
            return Err(CoreError::InvalidPauli(format!(
                "X register has {} qubits, Z register has {}",
                x.len(),
                z.len()
            )));
        }
        Ok(Self { x, z })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x_bits(&self) -> &Gf2Row {
        &self.x
    }

    pub fn z_bits(&self) -> &Gf2Row {
        &self.z
    }

    #[inline(always)]
    pub fn get(&self, q: usize) -> Pauli {
        Pauli::from_bits(self.x[q], self.z[q])
    }

    pub fn set(&mut self, q: usize, p: Pauli) {
        self.x.set(q, p.x());
        self.z.set(q, p.z());
    }

    /// Qubits on which the operator is not the identity.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&q| self.x[q] || self.z[q])
    }

    /// Number of non-identity positions.
    pub fn weight(&self) -> usize {
        self.support().count()
    }

    /// Symplectic inner product; `true` when the operators anticommute.
    pub fn symplectic_product(&self, other: &PauliString) -> bool {
        dot(&self.x, &other.z) ^ dot(&self.z, &other.x)
    }

    pub fn commutes_with(&self, other: &PauliString) -> bool {
        !self.symplectic_product(other)
    }

    /// Multiplies `other` into `self`, discarding the phase.
    pub fn multiply_assign(&mut self, other: &PauliString) {
        xor_into(&mut self.x, &other.x);
        xor_into(&mut self.z, &other.z);
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for q in 0..self.len() {
            write!(f, "{}", self.get(q).symbol())?;
        }
        Ok(())
    }
}

impl fmt::Debug for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PauliString({self})")
    }
}

impl FromStr for PauliString {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut op = PauliString::identity(s.chars().count());
        for (q, c) in s.chars().enumerate() {
            let p = Pauli::from_symbol(c).ok_or_else(|| {
                CoreError::InvalidPauli(format!("unexpected symbol {c:?} at position {q}"))
            })?;
            op.set(q, p);
        }
        Ok(op)
    }
}

impl From<PauliString> for String {
    fn from(p: PauliString) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for PauliString {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
