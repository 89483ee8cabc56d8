// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Fatal errors of the branch-and-price engine.
//!
//! Almost every condition the engine meets during a search is a status: an
//! infeasible relaxation prunes its node, a pricing call that finds nothing
//! ends the column generation, a tripped time limit ends the search with a
//! non-optimal outcome. Only two things abort a run: the LP oracle rejecting
//! a malformed problem, and an internal consistency check failing.

use fleetlease_lp::error::LpError;
use fleetlease_model::{index::EquipmentIndex, solution::SolutionError};

/// An internal cross-check failed. Carries enough context to replay the
/// failing pricing call or node solve.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyError {
    pub node: usize,
    pub equipment: Option<EquipmentIndex>,
    pub message: String,
    pub duals: Vec<f64>,
}

impl ConsistencyError {
    #[inline]
    pub fn new(node: usize, message: impl Into<String>) -> Self {
        Self {
            node,
            equipment: None,
            message: message.into(),
            duals: Vec::new(),
        }
    }

    #[inline]
    pub fn with_equipment(mut self, equipment: EquipmentIndex) -> Self {
        self.equipment = Some(equipment);
        self
    }

    #[inline]
    pub fn with_duals(mut self, duals: Vec<f64>) -> Self {
        self.duals = duals;
        self
    }
}

impl std::fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "consistency error at node {}", self.node)?;
        if let Some(e) = self.equipment {
            write!(f, " ({})", e)?;
        }
        write!(f, ": {}", self.message)?;
        if !self.duals.is_empty() {
            write!(f, " [{} duals:", self.duals.len())?;
            for d in self.duals.iter().take(16) {
                write!(f, " {:.4}", d)?;
            }
            if self.duals.len() > 16 {
                write!(f, " ...")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConsistencyError {}

#[derive(Debug, Clone, PartialEq)]
pub enum BnpError {
    /// The LP oracle rejected a problem built by the engine.
    Lp(LpError),
    /// Two algorithms disagreed or a supposedly integral plan failed verification.
    Consistency(Box<ConsistencyError>),
    /// The configuration is not usable.
    InvalidConfig(String),
}

impl std::fmt::Display for BnpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BnpError::Lp(e) => write!(f, "LP oracle error: {}", e),
            BnpError::Consistency(e) => write!(f, "{}", e),
            BnpError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for BnpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BnpError::Lp(e) => Some(e),
            BnpError::Consistency(e) => Some(e.as_ref()),
            BnpError::InvalidConfig(_) => None,
        }
    }
}

impl From<LpError> for BnpError {
    fn from(e: LpError) -> Self {
        BnpError::Lp(e)
    }
}

impl From<ConsistencyError> for BnpError {
    fn from(e: ConsistencyError) -> Self {
        BnpError::Consistency(Box::new(e))
    }
}

/// Wraps a failed solution verification into a consistency error.
pub(crate) fn invalid_plan(node: usize, what: &str, error: SolutionError) -> BnpError {
    ConsistencyError::new(node, format!("{} produced an invalid plan: {}", what, error)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency_error_display_carries_context() {
        let e = ConsistencyError::new(7, "label and enumeration disagree")
            .with_equipment(EquipmentIndex::new(2))
            .with_duals(vec![1.0, -0.5]);
        let s = e.to_string();
        assert!(s.contains("node 7"));
        assert!(s.contains("EquipmentIndex(2)"));
        assert!(s.contains("2 duals: 1.0000 -0.5000"));
    }

    #[test]
    fn test_from_conversions() {
        let e: BnpError = LpError::DuplicateName("x".into()).into();
        assert!(matches!(e, BnpError::Lp(_)));
        let e: BnpError = ConsistencyError::new(0, "boom").into();
        assert!(matches!(e, BnpError::Consistency(_)));
        assert!(std::error::Error::source(&e).is_some());
    }
}
