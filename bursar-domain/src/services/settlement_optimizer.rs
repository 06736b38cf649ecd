//! Optimal settlement of a balanced ledger.
//!
//! Terminology used throughout this module:
//!
//! - **creditor / debtor**: a user with a positive / negative status.
//! - **magnitude**: the absolute value of a status, in whole cents, so all
//!   combinatorial work runs on integers.
//! - **component**: a group of users whose internal transfers zero every
//!   member without touching anyone outside. A component is always balanced:
//!   its creditor magnitudes sum to its debtor magnitudes.
//! - **tree settlement**: settling one component of `n` users with exactly
//!   `n - 1` transfers.
//!
//! A partition into `k` components settles with `n - k` transfers in total,
//! so maximizing the component count minimizes the transfer count. The
//! search peels off exact creditor/debtor pairs first, then looks for the
//! partition with the most components by enumerating candidate component
//! values in ascending order.

use std::{cmp::Ordering, collections::VecDeque};

use crate::model::{Ledger, Money, Statement, User};
use crate::services::subset_sum::subsets_with_sum;

/// A user pulled out of the ledger snapshot, with the integer magnitude the
/// search works on and the signed decimal status transfers are cut from.
#[derive(Clone, Debug)]
struct Entrant {
    user: User,
    magnitude: i64,
    status: Money,
}

/// One balanced component of a settlement partition.
#[derive(Clone, Debug)]
struct Component {
    creditors: Vec<Entrant>,
    debtors: Vec<Entrant>,
}

/// Computes minimum-transaction settlements from a ledger snapshot.
///
/// Stateless: every call rebuilds its working structures, and the ledger is
/// never modified.
#[derive(Default)]
pub struct SettlementOptimizer;

impl SettlementOptimizer {
    /// Produces an ordered list of transfers that zeroes every balance,
    /// maximizing the number of independent components (equivalently,
    /// minimizing the number of transfers). An empty ledger yields an empty
    /// list.
    pub fn generate_statements(&self, ledger: &Ledger) -> Vec<Statement> {
        if ledger.is_empty() {
            return Vec::new();
        }

        let mut creditors = Vec::new();
        let mut debtors = Vec::new();
        for (user, status) in ledger.iter() {
            let entrant = Entrant {
                user: user.clone(),
                magnitude: status.abs().cents(),
                status,
            };
            if status > Money::ZERO {
                creditors.push(entrant);
            } else {
                debtors.push(entrant);
            }
        }
        sort_by_magnitude(&mut creditors);
        sort_by_magnitude(&mut debtors);
        let participant_count = creditors.len() + debtors.len();

        let mut statements = Vec::new();
        reduce_exact_pairs(&mut creditors, &mut debtors, &mut statements);
        let peeled_pairs = statements.len();

        let mut components = 0;
        if !creditors.is_empty() {
            let total_sum: i64 = creditors.iter().map(|entrant| entrant.magnitude).sum();
            let target_sum = creditors[0].magnitude.max(debtors[0].magnitude);
            let partition = find_partition(&creditors, &debtors, 2, total_sum, target_sum);
            components = partition.len();
            for component in &partition {
                settle_component_tree(component, &mut statements);
            }
        }

        tracing::debug!(
            participants = participant_count,
            peeled_pairs,
            components,
            transfers = statements.len(),
            "settlement generated"
        );
        statements
    }
}

fn sort_by_magnitude(entrants: &mut [Entrant]) {
    entrants.sort_by(|lhs, rhs| {
        lhs.magnitude
            .cmp(&rhs.magnitude)
            .then_with(|| lhs.user.cmp(&rhs.user))
    });
}

/// Peels off every creditor/debtor pair with identical magnitude as a trivial
/// two-user component. Whenever such a pair exists there is an optimal
/// settlement containing it, so removing it never worsens the result and
/// shrinks the search. Both lists must be sorted ascending.
fn reduce_exact_pairs(
    creditors: &mut Vec<Entrant>,
    debtors: &mut Vec<Entrant>,
    statements: &mut Vec<Statement>,
) {
    let mut creditor_index = 0;
    while creditor_index < creditors.len() && !debtors.is_empty() {
        let credit_magnitude = creditors[creditor_index].magnitude;
        if credit_magnitude > debtors[debtors.len() - 1].magnitude {
            // Every remaining creditor outweighs every debtor: no match left.
            break;
        }
        let mut matched = false;
        for debtor_index in 0..debtors.len() {
            match debtors[debtor_index].magnitude.cmp(&credit_magnitude) {
                Ordering::Greater => break,
                Ordering::Equal => {
                    let creditor = creditors.remove(creditor_index);
                    let debtor = debtors.remove(debtor_index);
                    statements.push(Statement {
                        debtor: debtor.user,
                        creditor: creditor.user,
                        amount: creditor.status,
                    });
                    matched = true;
                    break;
                }
                Ordering::Less => {}
            }
        }
        if !matched {
            creditor_index += 1;
        }
    }
}

/// Finds a partition of the balanced `creditors`/`debtors` lists into the
/// maximum number of components. Candidate component values are tried in
/// ascending order starting at `target_sum`; `min_components` carries the
/// component count any improvement has to beat, which keeps the ceiling
/// `total_sum / min_components` tight as better partitions are found.
fn find_partition(
    creditors: &[Entrant],
    debtors: &[Entrant],
    mut min_components: i64,
    total_sum: i64,
    mut target_sum: i64,
) -> Vec<Component> {
    // The whole input as a single component is always feasible.
    let mut best = vec![Component {
        creditors: creditors.to_vec(),
        debtors: debtors.to_vec(),
    }];

    let creditor_magnitudes: Vec<i64> = creditors.iter().map(|e| e.magnitude).collect();
    let debtor_magnitudes: Vec<i64> = debtors.iter().map(|e| e.magnitude).collect();

    // A partition with `min_components` components must contain one whose
    // value is at most the floor of `total_sum / min_components`.
    while target_sum <= total_sum / min_components {
        let creditor_subsets = subsets_with_sum(&creditor_magnitudes, target_sum);
        let debtor_subsets = subsets_with_sum(&debtor_magnitudes, target_sum);
        for creditor_subset in &creditor_subsets {
            for debtor_subset in &debtor_subsets {
                let component = Component {
                    creditors: take_indices(creditors, creditor_subset),
                    debtors: take_indices(debtors, debtor_subset),
                };
                let rest_creditors = drop_indices(creditors, creditor_subset);
                let rest_debtors = drop_indices(debtors, debtor_subset);

                // The remainder can only split at values at least as large as
                // the component just carved out and the largest of its own
                // smallest members, so the target never moves backwards.
                let rest_floor = rest_creditors[0].magnitude.max(rest_debtors[0].magnitude);
                let candidate = find_partition(
                    &rest_creditors,
                    &rest_debtors,
                    (min_components - 1).max(2),
                    total_sum - target_sum,
                    target_sum.max(rest_floor),
                );

                if candidate.len() + 1 > best.len() {
                    let mut improved = Vec::with_capacity(candidate.len() + 1);
                    improved.push(component);
                    improved.extend(candidate);
                    best = improved;
                    min_components = best.len() as i64 + 1;
                }
            }
        }
        target_sum += 1;
    }
    best
}

fn take_indices(entrants: &[Entrant], indices: &[usize]) -> Vec<Entrant> {
    indices.iter().map(|&index| entrants[index].clone()).collect()
}

fn drop_indices(entrants: &[Entrant], indices: &[usize]) -> Vec<Entrant> {
    let mut kept = Vec::with_capacity(entrants.len() - indices.len());
    let mut drop_iter = indices.iter().peekable();
    for (index, entrant) in entrants.iter().enumerate() {
        if drop_iter.peek() == Some(&&index) {
            drop_iter.next();
        } else {
            kept.push(entrant.clone());
        }
    }
    kept
}

/// Settles one balanced component greedily: repeatedly match the smallest
/// remaining creditor with the smallest remaining debtor and transfer the
/// lesser of the two amounts. Uses at most `n - 1` transfers and minimizes
/// the cash moved within the component.
fn settle_component_tree(component: &Component, statements: &mut Vec<Statement>) {
    let mut creditors: VecDeque<(User, Money)> = component
        .creditors
        .iter()
        .map(|entrant| (entrant.user.clone(), entrant.status))
        .collect();
    let mut debtors: VecDeque<(User, Money)> = component
        .debtors
        .iter()
        .map(|entrant| (entrant.user.clone(), -entrant.status))
        .collect();

    while !creditors.is_empty() && !debtors.is_empty() {
        let credit = creditors[0].1;
        let debit = debtors[0].1;
        match credit.cmp(&debit) {
            Ordering::Greater => {
                statements.push(Statement {
                    debtor: debtors[0].0.clone(),
                    creditor: creditors[0].0.clone(),
                    amount: debit,
                });
                creditors[0].1 = credit - debit;
                debtors.pop_front();
            }
            Ordering::Less => {
                statements.push(Statement {
                    debtor: debtors[0].0.clone(),
                    creditor: creditors[0].0.clone(),
                    amount: credit,
                });
                debtors[0].1 = debit - credit;
                creditors.pop_front();
            }
            Ordering::Equal => {
                statements.push(Statement {
                    debtor: debtors[0].0.clone(),
                    creditor: creditors[0].0.clone(),
                    amount: debit,
                });
                creditors.pop_front();
                debtors.pop_front();
            }
        }
    }
    debug_assert!(creditors.is_empty() && debtors.is_empty());
}
