//! Predicate evaluators: bound matching and hex-constraint matching.
//!
//! Everything here is a pure function of one parameter's annotations or
//! realized logic. No oracle access, no shared state; the dispatcher calls
//! these from any worker thread.

use crate::error::{QueryError, Result};
use netquery_env::{Decomposition, NetworkDescription, NodeLogic};
use std::collections::{BTreeMap, BTreeSet};

/// Variable name to inclusive `[lo, hi]` interval.
pub type VariableBoundSet = BTreeMap<String, (i64, i64)>;

/// A bound set translated to positions in one network's variable ordering.
///
/// Positions not listed are wildcards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBounds {
    positions: Vec<(usize, i64, i64)>,
}

impl IndexedBounds {
    /// Translates variable names to canonical positions.
    ///
    /// A bound naming a variable the network does not have is a
    /// configuration error: the query cannot be asked of that network.
    pub fn compile(bounds: &VariableBoundSet, description: &NetworkDescription) -> Result<Self> {
        let positions = bounds
            .iter()
            .map(|(name, &(lo, hi))| {
                description
                    .index_of(name)
                    .map(|pos| (pos, lo, hi))
                    .ok_or_else(|| {
                        QueryError::config(format!(
                            "Bound variable '{}' is not a variable of the network (variables: {})",
                            name,
                            description.variables.join(", ")
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { positions })
    }

    /// Compiles a whole bounds list.
    pub fn compile_all(
        list: &[VariableBoundSet],
        description: &NetworkDescription,
    ) -> Result<Vec<Self>> {
        list.iter().map(|b| Self::compile(b, description)).collect()
    }
}

/// True if the coordinates lie inside every named interval.
pub fn bounds_match(coordinates: &[i64], bounds: &IndexedBounds) -> bool {
    bounds.positions.iter().all(|&(pos, lo, hi)| {
        coordinates
            .get(pos)
            .map_or(false, |&c| c >= lo && c <= hi)
    })
}

/// True if some fixed point satisfies the bound set.
pub fn exists_match(fixed_points: &[&[i64]], bounds: &IndexedBounds) -> bool {
    fixed_points.iter().any(|fp| bounds_match(fp, bounds))
}

/// Every included set is matched by some fixed point and no excluded set is.
///
/// With both lists empty this asks only for the existence of a fixed point.
pub fn have_match(
    fixed_points: &[&[i64]],
    included: &[IndexedBounds],
    excluded: &[IndexedBounds],
) -> bool {
    if included.is_empty() && excluded.is_empty() {
        return !fixed_points.is_empty();
    }
    included.iter().all(|b| exists_match(fixed_points, b))
        && !excluded.iter().any(|b| exists_match(fixed_points, b))
}

/// Coordinates of every stable (leaf) fixed point.
pub fn stable_fixed_points(decomposition: &Decomposition) -> Vec<&[i64]> {
    decomposition
        .leaves()
        .filter_map(|(_, node)| node.annotation.coordinates())
        .collect()
}

/// Poset indices of every stable (leaf) full cycle.
pub fn stable_full_cycles(decomposition: &Decomposition) -> Vec<usize> {
    decomposition
        .leaves()
        .filter(|(_, node)| node.annotation.is_full_cycle())
        .map(|(index, _)| index)
        .collect()
}

/// Poset indices of every stable (leaf) cyclic Morse set, full or not.
pub fn stable_cycle_sets(decomposition: &Decomposition) -> Vec<usize> {
    decomposition
        .leaves()
        .filter(|(_, node)| node.annotation.is_cycle())
        .map(|(index, _)| index)
        .collect()
}

/// Allowed realized-logic hex codes keyed by (in-degree, out-degree).
///
/// Codes are stored upper-case; signatures absent from the map are
/// unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexConstraints {
    allowed: BTreeMap<(u32, u32), BTreeSet<String>>,
}

impl HexConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds allowed codes for a signature.
    pub fn allow<I, S>(mut self, signature: (u32, u32), codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed
            .entry(signature)
            .or_default()
            .extend(codes.into_iter().map(|c| normalize_hex(c.as_ref())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// True if a node with this signature may realize this code.
    pub fn permits(&self, signature: (u32, u32), hex: &str) -> bool {
        match self.allowed.get(&signature) {
            Some(codes) => codes.contains(&normalize_hex(hex)),
            None => true,
        }
    }
}

fn normalize_hex(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// True if every constrained node realizes an allowed code.
pub fn hex_constraint_match(logic: &[NodeLogic], constraints: &HexConstraints) -> bool {
    logic
        .iter()
        .all(|node| constraints.permits(node.signature(), &node.hex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use netquery_env::{Annotation, MorseNode};
    use proptest::prelude::*;

    fn xyz() -> NetworkDescription {
        NetworkDescription {
            variables: vec!["X1".into(), "X2".into(), "X3".into()],
            parameter_count: 1,
        }
    }

    fn bound(pairs: &[(&str, i64, i64)]) -> VariableBoundSet {
        pairs.iter().map(|&(n, lo, hi)| (n.to_string(), (lo, hi))).collect()
    }

    #[test]
    fn test_wildcard_matching() {
        let b = IndexedBounds::compile(&bound(&[("X1", 2, 2), ("X2", 1, 1)]), &xyz()).unwrap();

        assert!(bounds_match(&[2, 1, 0], &b));
        assert!(!bounds_match(&[2, 0, 0], &b));
        // Third coordinate is a wildcard
        for third in 0..5 {
            assert!(bounds_match(&[2, 1, third], &b));
        }
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let err = IndexedBounds::compile(&bound(&[("X9", 0, 1)]), &xyz()).unwrap_err();
        assert!(matches!(err, QueryError::Configuration(_)));
    }

    #[test]
    fn test_short_coordinates_never_match_named_position() {
        let b = IndexedBounds::compile(&bound(&[("X3", 0, 3)]), &xyz()).unwrap();
        assert!(!bounds_match(&[0, 0], &b));
    }

    #[test]
    fn test_have_match_degenerate_case() {
        let fps: Vec<&[i64]> = vec![];
        assert!(!have_match(&fps, &[], &[]));

        let one: Vec<&[i64]> = vec![&[0, 0, 0][..]];
        assert!(have_match(&one, &[], &[]));
    }

    #[test]
    fn test_have_match_included_and_excluded() {
        let desc = xyz();
        let inc = IndexedBounds::compile_all(&[bound(&[("X1", 1, 1)])], &desc).unwrap();
        let exc = IndexedBounds::compile_all(&[bound(&[("X3", 2, 3)])], &desc).unwrap();

        let good: Vec<&[i64]> = vec![&[1, 0, 0][..], &[0, 0, 1][..]];
        assert!(have_match(&good, &inc, &exc));

        // An excluded fixed point anywhere spoils the match
        let spoiled: Vec<&[i64]> = vec![&[1, 0, 0][..], &[0, 0, 3][..]];
        assert!(!have_match(&spoiled, &inc, &exc));

        let missing: Vec<&[i64]> = vec![&[0, 0, 0][..]];
        assert!(!have_match(&missing, &inc, &exc));
    }

    #[test]
    fn test_stable_annotations_only_from_leaves() {
        let d = Decomposition::new(vec![
            MorseNode { annotation: Annotation::FullCycle, children: vec![1] },
            MorseNode { annotation: Annotation::FixedPoint(vec![1, 2, 0]), children: vec![] },
            MorseNode { annotation: Annotation::FixedPoint(vec![0, 0, 0]), children: vec![1] },
            MorseNode { annotation: Annotation::FullCycle, children: vec![] },
        ]);
        assert_eq!(stable_fixed_points(&d), vec![&[1i64, 2, 0][..]]);
        assert_eq!(stable_full_cycles(&d), vec![3]);
    }

    #[test]
    fn test_stable_cycle_sets_include_partial_cycles() {
        let d = Decomposition::new(vec![
            MorseNode { annotation: Annotation::Other("XC { 0, 1 }".into()), children: vec![] },
            MorseNode { annotation: Annotation::FullCycle, children: vec![2] },
            MorseNode { annotation: Annotation::FullCycle, children: vec![] },
            MorseNode { annotation: Annotation::FixedPoint(vec![1, 1]), children: vec![] },
        ]);
        assert_eq!(stable_cycle_sets(&d), vec![0, 2]);
        assert_eq!(stable_full_cycles(&d), vec![2]);
    }

    #[test]
    fn test_hex_constraint_excludes_disallowed_code() {
        let constraints = HexConstraints::new().allow((1, 2), ["C"]);
        let allowed = vec![NodeLogic::new(1, 2, "c"), NodeLogic::new(3, 1, "0")];
        let rejected = vec![NodeLogic::new(1, 2, "8"), NodeLogic::new(3, 1, "0")];

        assert!(hex_constraint_match(&allowed, &constraints));
        assert!(!hex_constraint_match(&rejected, &constraints));
        // Unconstrained signatures always pass
        assert!(hex_constraint_match(&[NodeLogic::new(2, 2, "F")], &constraints));
        assert!(hex_constraint_match(&rejected, &HexConstraints::new()));
    }

    fn arb_fixed_points() -> impl Strategy<Value = Vec<Vec<i64>>> {
        prop::collection::vec(prop::collection::vec(0i64..4, 3), 0..5)
    }

    fn arb_bounds() -> impl Strategy<Value = Vec<VariableBoundSet>> {
        let one = prop::collection::btree_map(
            prop::sample::select(vec!["X1".to_string(), "X2".to_string(), "X3".to_string()]),
            (0i64..4, 0i64..4).prop_map(|(a, b)| (a.min(b), a.max(b))),
            1..3,
        );
        prop::collection::vec(one, 0..3)
    }

    proptest! {
        #[test]
        fn prop_have_match_is_conjunction(
            fps in arb_fixed_points(),
            inc in arb_bounds(),
            exc in arb_bounds(),
        ) {
            prop_assume!(!inc.is_empty() || !exc.is_empty());
            let desc = xyz();
            let views: Vec<&[i64]> = fps.iter().map(|v| v.as_slice()).collect();
            let inc_c = IndexedBounds::compile_all(&inc, &desc).unwrap();
            let exc_c = IndexedBounds::compile_all(&exc, &desc).unwrap();

            let in_range = |fp: &Vec<i64>, b: &VariableBoundSet| {
                b.iter().all(|(name, &(lo, hi))| {
                    let c = fp[desc.index_of(name).unwrap()];
                    c >= lo && c <= hi
                })
            };
            let expected = inc.iter().all(|b| fps.iter().any(|fp| in_range(fp, b)))
                && !exc.iter().any(|b| fps.iter().any(|fp| in_range(fp, b)));

            prop_assert_eq!(have_match(&views, &inc_c, &exc_c), expected);
        }
    }
}
