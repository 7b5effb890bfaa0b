// Reconcile learnables that carry identical content under different ids.
//
// The same vocabulary item can show up in several levels with a fresh id
// each time. Grouping is done purely on `Learnable::checksum`, so two
// genuinely different items with identical column and attribute data are
// treated as one. That is accepted policy, not an accident.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::course::Course;
use crate::names::ColumnName;

/// Statistics about a merge pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub learnables: usize,
    /// Groups with more than one member.
    pub duplicate_groups: usize,
    /// Learnables that belong to such a group.
    pub merged_learnables: usize,
}

/// Group learnable ids by content checksum, in course order.
///
/// Learnables without column data have nothing to compare and are left out.
pub fn similar_learnables(course: &Course) -> BTreeMap<String, Vec<u64>> {
    let mut groups: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for learnable in course.learnables().filter(|l| l.has_column_data()) {
        groups.entry(learnable.checksum()).or_default().push(learnable.id);
    }
    groups
}

struct MergedGroup {
    identifiers: BTreeSet<u64>,
    typing_corrects: BTreeMap<ColumnName, Vec<String>>,
}

/// Merge every group of similar learnables.
///
/// Each member ends up with the union of the group's identifiers and, per
/// text column, the union of the group's typing corrects (first-seen order,
/// no duplicates).
pub fn merge_similar_learnables(course: &mut Course) -> MergeStats {
    let groups = similar_learnables(course);
    let mut stats = MergeStats {
        learnables: course.learnable_count(),
        ..MergeStats::default()
    };

    let mut membership: HashMap<u64, usize> = HashMap::new();
    let mut merged: Vec<MergedGroup> = Vec::new();

    for ids in groups.values().filter(|ids| ids.len() > 1) {
        let mut group = MergedGroup {
            identifiers: BTreeSet::new(),
            typing_corrects: BTreeMap::new(),
        };
        for id in ids {
            let Some(learnable) = course.learnable(*id) else {
                continue;
            };
            group.identifiers.extend(learnable.identifiers.iter().copied());
            for (name, data) in learnable.all_column_data() {
                let Some(text) = data.as_text() else {
                    continue;
                };
                let union = group.typing_corrects.entry(name.clone()).or_default();
                for correct in &text.typing_corrects {
                    if !union.contains(correct) {
                        union.push(correct.clone());
                    }
                }
            }
            membership.insert(*id, merged.len());
        }

        tracing::debug!(ids = ?ids, "Merging similar learnables");
        stats.duplicate_groups += 1;
        stats.merged_learnables += ids.len();
        merged.push(group);
    }

    for learnable in course.learnables_mut() {
        let Some(group) = membership.get(&learnable.id).map(|i| &merged[*i]) else {
            continue;
        };
        learnable.identifiers.extend(group.identifiers.iter().copied());
        for (name, corrects) in &group.typing_corrects {
            if let Some(text) = learnable.text_data_mut(name) {
                text.typing_corrects = corrects.clone();
            }
        }
    }

    if stats.duplicate_groups > 0 {
        tracing::info!(
            groups = stats.duplicate_groups,
            learnables = stats.merged_learnables,
            "Merged similar learnables"
        );
    }

    stats
}
