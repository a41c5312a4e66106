//! Permutation-based marginal contribution of ensemble members.
//!
//! Every ordering of the members is walked in lexicographic order; each
//! member is credited with the score change it causes when it joins the
//! members before it. Credits are averaged over all orderings. A
//! coalition's score is the metric of its members' mean prediction
//! vector; the empty coalition scores 0.

use serde::{Deserialize, Serialize};

use crate::metrics::{auc, log_loss, mean_vector};
use crate::{EnsembleError, Result};

/// Exact enumeration is n! orderings; past this it is not attempted.
pub const MAX_EXACT_MEMBERS: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Per-member AUC credit, in member order.
    pub auc: Vec<f64>,
    /// Per-member log-loss credit, in member order.
    pub log_loss: Vec<f64>,
    pub permutations: u64,
}

#[derive(Clone, Copy, Default)]
struct Score {
    auc: f64,
    log_loss: f64,
}

struct Coalitions<'a> {
    members: &'a [&'a [f64]],
    labels: &'a [f64],
    memo: Vec<Option<Score>>,
}

impl<'a> Coalitions<'a> {
    fn new(members: &'a [&'a [f64]], labels: &'a [f64]) -> Self {
        Self {
            members,
            labels,
            memo: vec![None; 1 << members.len()],
        }
    }

    fn score(&mut self, mask: usize) -> Score {
        if mask == 0 {
            return Score::default();
        }
        if let Some(s) = self.memo[mask] {
            return s;
        }
        let chosen: Vec<&[f64]> = (0..self.members.len())
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| self.members[i])
            .collect();
        let combined = mean_vector(&chosen);
        let s = Score {
            auc: auc(self.labels, &combined),
            log_loss: log_loss(self.labels, &combined),
        };
        self.memo[mask] = Some(s);
        s
    }
}

pub fn attribute(members: &[&[f64]], labels: &[f64]) -> Result<Attribution> {
    let n = members.len();
    if n > MAX_EXACT_MEMBERS {
        return Err(EnsembleError::TooManyMembers { members: n, max: MAX_EXACT_MEMBERS });
    }

    let mut coalitions = Coalitions::new(members, labels);
    if n <= 1 {
        // the sole member takes the whole score
        let full = coalitions.score((1 << n) - 1);
        return Ok(Attribution {
            auc: vec![full.auc; n],
            log_loss: vec![full.log_loss; n],
            permutations: n as u64,
        });
    }

    let mut auc_credit = vec![0.0; n];
    let mut ll_credit = vec![0.0; n];
    let mut order: Vec<usize> = (0..n).collect();
    let mut permutations = 0u64;

    loop {
        let mut mask = 0usize;
        let mut before = Score::default();
        for &member in &order {
            mask |= 1 << member;
            let after = coalitions.score(mask);
            auc_credit[member] += after.auc - before.auc;
            ll_credit[member] += after.log_loss - before.log_loss;
            before = after;
        }
        permutations += 1;

        if !next_permutation(&mut order) {
            break;
        }
    }

    let k = permutations as f64;
    Ok(Attribution {
        auc: auc_credit.into_iter().map(|c| c / k).collect(),
        log_loss: ll_credit.into_iter().map(|c| c / k).collect(),
        permutations,
    })
}

/// Rearranges into the next lexicographic permutation; false after the last.
fn next_permutation(v: &mut [usize]) -> bool {
    let Some(i) = v.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(j) = v.iter().rposition(|&x| x > v[i]) else {
        return false;
    };
    v.swap(i, j);
    v[i + 1..].reverse();
    true
}
