//! Coarse-graining of micro transition models.
//!
//! A coarse-graining groups each element's micro states into macro states.
//! Grouping induces a macro transition matrix by mass-conserving
//! aggregation: outgoing probability is summed over destination micro
//! states first, then averaged across the grouped source micro states, so
//! every macro row sums to 1 whenever the micro rows do.
//!
//! State-map derivation is only defined for two-element systems, matching
//! the pairwise recordings this pipeline analyzes.

use sp_common::{Error, Matrix, Result};

/// One element's grouping: a partition of its micro states into macro
/// states, e.g. `[[0], [1, 2], [3]]`.
pub type ElementGrouping = Vec<Vec<usize>>;

/// Macro state index → constituent micro state indices, in macro index
/// order (first element's group varies fastest).
pub type StateMap = Vec<Vec<usize>>;

/// A derived coarse-graining: the state map plus per-element macro counts.
#[derive(Debug, Clone)]
pub struct CoarseGraining {
    pub state_map: StateMap,
    pub states_per_element: Vec<usize>,
}

impl CoarseGraining {
    /// Total number of macro states.
    pub fn num_macro_states(&self) -> usize {
        self.state_map.len()
    }
}

/// The canonical catalog of groupings for a 4-state element, from
/// "split off the silent state" to "everything separate".
pub fn canonical_catalog() -> Vec<ElementGrouping> {
    vec![
        vec![vec![0], vec![1, 2, 3]],
        vec![vec![0, 1, 2], vec![3]],
        vec![vec![0], vec![1, 2], vec![3]],
        vec![vec![0], vec![1], vec![2], vec![3]],
    ]
}

fn validate_grouping(grouping: &ElementGrouping, element: usize) -> Result<usize> {
    if grouping.is_empty() {
        return Err(Error::InvalidInput(format!(
            "element {element}: grouping has no groups"
        )));
    }
    let micro_count: usize = grouping.iter().map(|g| g.len()).sum();
    let mut seen = vec![false; micro_count];
    for group in grouping {
        if group.is_empty() {
            return Err(Error::InvalidInput(format!(
                "element {element}: empty group in coarse-graining"
            )));
        }
        for &s in group {
            if s >= micro_count || seen[s] {
                return Err(Error::InvalidInput(format!(
                    "element {element}: groups must partition 0..{micro_count}, \
                     state {s} is missing or repeated"
                )));
            }
            seen[s] = true;
        }
    }
    Ok(micro_count)
}

/// Derive the macro→micro state map for a two-element system.
///
/// Macro cell (p, q) — group `p` of element A with group `q` of element B
/// — gets macro index `p + q·|groups_A|`, and contains every micro system
/// state `a + n_A·b` with `a` in group `p` and `b` in group `q` (element A
/// varies fastest, matching the transition-matrix state ordering).
pub fn derive_state_map(groupings: &[ElementGrouping]) -> Result<CoarseGraining> {
    if groupings.len() != 2 {
        return Err(Error::InvalidInput(format!(
            "coarse-graining state maps require exactly 2 elements, got {}",
            groupings.len()
        )));
    }
    let micro_a = validate_grouping(&groupings[0], 0)?;
    validate_grouping(&groupings[1], 1)?;

    let groups_a = &groupings[0];
    let groups_b = &groupings[1];

    let mut state_map = vec![Vec::new(); groups_a.len() * groups_b.len()];
    for (q, group_b) in groups_b.iter().enumerate() {
        for (p, group_a) in groups_a.iter().enumerate() {
            let macro_index = p + q * groups_a.len();
            let mut members = Vec::with_capacity(group_a.len() * group_b.len());
            for &a in group_a {
                for &b in group_b {
                    members.push(a + micro_a * b);
                }
            }
            state_map[macro_index] = members;
        }
    }

    Ok(CoarseGraining {
        state_map,
        states_per_element: vec![groups_a.len(), groups_b.len()],
    })
}

/// Aggregate a micro transition matrix into the macro state space.
///
/// `macro[i][j] = (Σ_{u ∈ M_i} Σ_{v ∈ M_j} micro[u][v]) / |M_i|`: summing
/// over destination micro states first keeps each source micro state's
/// total outgoing mass intact before averaging across the grouped sources.
pub fn aggregate(micro: &Matrix, state_map: &StateMap) -> Result<Matrix> {
    if !micro.is_square() {
        return Err(Error::InvalidInput(
            "micro transition matrix must be square".to_string(),
        ));
    }
    let num_macro = state_map.len();
    for members in state_map {
        if members.is_empty() {
            return Err(Error::InvalidInput(
                "macro state with no micro members".to_string(),
            ));
        }
        if let Some(&bad) = members.iter().find(|&&u| u >= micro.rows()) {
            return Err(Error::InvalidInput(format!(
                "micro state {bad} outside matrix of size {}",
                micro.rows()
            )));
        }
    }

    let mut out = Matrix::zeros(num_macro, num_macro);
    for (i, sources) in state_map.iter().enumerate() {
        for (j, destinations) in state_map.iter().enumerate() {
            let mut total = 0.0;
            for &u in sources {
                for &v in destinations {
                    total += micro.get(u, v);
                }
            }
            out.set(i, j, total / sources.len() as f64);
        }
    }
    Ok(out)
}

/// Enumerate every ordered pair of catalog groupings for a two-element
/// system, each with its derived state map.
pub fn enumerate_combinations(catalog: &[ElementGrouping]) -> Result<Vec<CoarseGraining>> {
    let mut combinations = Vec::with_capacity(catalog.len() * catalog.len());
    for e1 in catalog {
        for e2 in catalog {
            combinations.push(derive_state_map(&[e1.clone(), e2.clone()])?);
        }
    }
    Ok(combinations)
}
