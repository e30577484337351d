use std::collections::BTreeSet;

/// Changes needed to turn the current member set into the desired one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    /// Desired but not attached, sorted.
    pub to_create: Vec<String>,

    /// Attached but no longer desired, sorted.
    pub to_delete: Vec<String>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

pub fn reconcile(current: &BTreeSet<String>, desired: &BTreeSet<String>) -> MembershipDiff {
    MembershipDiff {
        to_create: desired.difference(current).cloned().collect(),
        to_delete: current.difference(desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlapping_sets() {
        let diff = reconcile(&set(&["B", "C"]), &set(&["A", "B"]));
        assert_eq!(diff.to_create, vec!["A"]);
        assert_eq!(diff.to_delete, vec!["C"]);
    }

    #[test]
    fn identical_sets_need_nothing() {
        let s = set(&["c1", "c2", "c3"]);
        let diff = reconcile(&s, &s);
        assert!(diff.is_empty());
    }

    #[test]
    fn empty_sets() {
        assert!(reconcile(&set(&[]), &set(&[])).is_empty());

        let diff = reconcile(&set(&[]), &set(&["c1"]));
        assert_eq!(diff.to_create, vec!["c1"]);
        assert!(diff.to_delete.is_empty());

        let diff = reconcile(&set(&["c1"]), &set(&[]));
        assert!(diff.to_create.is_empty());
        assert_eq!(diff.to_delete, vec!["c1"]);
    }

    #[test]
    fn disjoint_sets_are_fully_replaced() {
        let diff = reconcile(&set(&["a", "b"]), &set(&["c", "d"]));
        assert_eq!(diff.to_create, vec!["c", "d"]);
        assert_eq!(diff.to_delete, vec!["a", "b"]);
    }

    #[test]
    fn diff_is_a_symmetric_difference() {
        let cases: &[(&[&str], &[&str])] = &[
            (&["a", "b", "c"], &["b", "c", "d", "e"]),
            (&["x"], &["x", "y"]),
            (&["p", "q"], &["q"]),
            (&["m"], &["n"]),
        ];

        for (current, desired) in cases {
            let (current, desired) = (set(current), set(desired));
            let diff = reconcile(&current, &desired);

            let created: BTreeSet<String> = diff.to_create.iter().cloned().collect();
            let deleted: BTreeSet<String> = diff.to_delete.iter().cloned().collect();

            assert!(created.is_disjoint(&deleted));
            assert!(created.iter().all(|m| desired.contains(m) && !current.contains(m)));
            assert!(deleted.iter().all(|m| current.contains(m) && !desired.contains(m)));

            // Applying the diff lands exactly on the desired set.
            let applied: BTreeSet<String> = current
                .difference(&deleted)
                .cloned()
                .chain(created.iter().cloned())
                .collect();
            assert_eq!(applied, desired);
        }
    }
}
