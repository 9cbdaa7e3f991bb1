//! Collection of test cases into groups
//!
//! Cases sharing an `incremental` marker form one group and run in
//! declaration order. A case without the marker is a group of its own.

use super::case::TestCase;

/// An ordered sequence of cases sharing one failure policy
pub struct Group {
    pub id: String,
    /// Whether the group came from an `incremental` marker
    pub incremental: bool,
    cases: Vec<Box<dyn TestCase>>,
}

impl Group {
    pub fn new(id: impl Into<String>, incremental: bool) -> Self {
        Self {
            id: id.into(),
            incremental,
            cases: Vec::new(),
        }
    }

    pub fn push(&mut self, case: Box<dyn TestCase>) {
        self.cases.push(case);
    }

    pub fn cases(&self) -> &[Box<dyn TestCase>] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("incremental", &self.incremental)
            .field(
                "cases",
                &self.cases.iter().map(|c| c.meta().name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Partition cases into groups
///
/// Groups are ordered by the first appearance of one of their cases; cases
/// inside a group keep their declaration index order.
pub fn collect_groups(cases: Vec<Box<dyn TestCase>>) -> Vec<Group> {
    let mut cases = cases;
    cases.sort_by_key(|c| c.meta().index);

    let mut groups: Vec<Group> = Vec::new();
    for case in cases {
        let meta = case.meta();
        match meta.incremental.clone() {
            Some(id) => {
                match groups.iter_mut().find(|g| g.incremental && g.id == id) {
                    Some(group) => group.push(case),
                    None => {
                        let mut group = Group::new(id, true);
                        group.push(case);
                        groups.push(group);
                    }
                }
            }
            None => {
                let mut group = Group::new(meta.name.clone(), false);
                group.push(case);
                groups.push(group);
            }
        }
    }

    tracing::debug!(groups = groups.len(), "collected test groups");
    groups
}
