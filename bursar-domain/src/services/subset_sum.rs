use smallvec::SmallVec;

type IndexStack = SmallVec<[usize; 16]>;

/// Enumerates every subset of `values` summing to exactly `target`, as lists
/// of indices in lexicographic order. `values` must be sorted ascending and
/// strictly positive.
///
/// The walk is a depth-first scan over an explicit index stack: extend with
/// successive indices while the running sum stays below the target, record on
/// an exact hit, backtrack on overshoot. The outer loop stops once the first
/// stacked value already exceeds what is left to place, since every later
/// value is at least as large.
pub(crate) fn subsets_with_sum(values: &[i64], target: i64) -> Vec<Vec<usize>> {
    debug_assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    debug_assert!(values.iter().all(|&value| value > 0));

    let mut results = Vec::new();
    if values.is_empty() || target <= 0 {
        return results;
    }

    let mut stack: IndexStack = SmallVec::new();
    stack.push(0);
    let mut remaining = target;
    loop {
        remaining = extend_greedily(values, &mut stack, remaining);
        if remaining == 0 {
            results.push(stack.to_vec());
        }
        // Whether or not this branch hit the target, resume the scan by
        // returning the deepest element to the pool and advancing its index.
        while let Some(index) = stack.pop() {
            remaining += values[index];
            if index + 1 < values.len() {
                stack.push(index + 1);
                break;
            }
        }
        match stack.first() {
            Some(&first) if values[first] <= remaining => {}
            _ => break,
        }
    }
    results
}

/// Pops the next candidate index and extends the stack while the running sum
/// is below `target`. Returns 0 on an exact hit (candidate kept on the
/// stack), otherwise the amount still missing.
fn extend_greedily(values: &[i64], stack: &mut IndexStack, mut target: i64) -> i64 {
    let Some(mut index) = stack.pop() else {
        return target;
    };
    while index < values.len() {
        let value = values[index];
        match value.cmp(&target) {
            std::cmp::Ordering::Less => {
                stack.push(index);
                target -= value;
                index += 1;
            }
            std::cmp::Ordering::Equal => {
                stack.push(index);
                return 0;
            }
            std::cmp::Ordering::Greater => return target,
        }
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_subset(&[2, 4, 6], 5, &[])]
    #[case::single_element(&[2, 4, 6], 4, &[&[1][..]])]
    #[case::two_ways(&[1, 2, 3, 4], 5, &[&[0, 3][..], &[1, 2][..]])]
    #[case::whole_list(&[1, 2, 3], 6, &[&[0, 1, 2][..]])]
    #[case::duplicated_values(&[5, 5], 5, &[&[0][..], &[1][..]])]
    #[case::target_too_large(&[1, 2], 10, &[])]
    fn enumerates_exact_sum_subsets(
        #[case] values: &[i64],
        #[case] target: i64,
        #[case] expected: &[&[usize]],
    ) {
        let subsets = subsets_with_sum(values, target);
        let expected: Vec<Vec<usize>> = expected.iter().map(|indices| indices.to_vec()).collect();
        assert_eq!(subsets, expected);
    }

    #[test]
    fn enumeration_is_exhaustive_and_duplicate_free() {
        let values = [1, 1, 2, 3, 5, 8];
        let target = 9;
        let subsets = subsets_with_sum(&values, target);

        // Cross-check against a brute-force bitmask scan.
        let mut expected = Vec::new();
        for mask in 1u32..(1 << values.len()) {
            let sum: i64 = (0..values.len())
                .filter(|&bit| mask & (1 << bit) != 0)
                .map(|bit| values[bit])
                .sum();
            if sum == target {
                expected.push(
                    (0..values.len())
                        .filter(|&bit| mask & (1 << bit) != 0)
                        .collect::<Vec<usize>>(),
                );
            }
        }
        expected.sort();

        let mut sorted = subsets.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), subsets.len(), "duplicate subsets produced");
        assert_eq!(sorted, expected);
    }
}
