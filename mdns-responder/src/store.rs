//! The authoritative record store: records grouped by owner name,
//! with the add/find/remove/clean primitives the engine builds
//! queries and announcements out of.

use std::collections::HashMap;

use dns_types::protocol::types::{DomainName, QueryType, RecordTypeWithData, ResourceRecord};

/// All records sharing one owner name.
#[derive(Debug, Clone, Default)]
pub struct RecordGroup {
    pub entries: Vec<ResourceRecord>,
}

impl RecordGroup {
    /// Appends `record` unless an entry already compares equal to it
    /// by [`ResourceRecord::entry_eq`]. Returns whether it was added.
    fn add(&mut self, record: ResourceRecord) -> bool {
        if self.entries.iter().any(|e| e.entry_eq(&record)) {
            false
        } else {
            self.entries.push(record);
            true
        }
    }
}

/// `HashMap<Name, RecordGroup>`, the store's one piece of state.
///
/// PTR payloads reference their target by `Name` (see
/// `RecordTypeWithData::PTR`/`SRV`), not by index or pointer: nothing
/// here ever frees a group while a live entry still conceptually
/// borrows from it, so a name-keyed lookup is enough. See
/// `DESIGN.md` for why this sidesteps the arena-and-stable-index
/// design an unrestricted-reference source would need.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    groups: HashMap<DomainName, RecordGroup>,
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore::default()
    }

    pub fn get(&self, name: &DomainName) -> Option<&RecordGroup> {
        self.groups.get(name)
    }

    /// Creates the group for `record.name` if absent, then appends
    /// the record if no duplicate (by `entry_eq`) is already present.
    /// Returns whether it was added.
    pub fn add(&mut self, record: ResourceRecord) -> bool {
        self.groups.entry(record.name.clone()).or_default().add(record)
    }

    /// Removes the first entry at `name` for which `predicate`
    /// returns true, cleaning up the group if it becomes empty.
    pub fn remove_where(
        &mut self,
        name: &DomainName,
        predicate: impl Fn(&ResourceRecord) -> bool,
    ) -> Option<ResourceRecord> {
        let group = self.groups.get_mut(name)?;
        let index = group.entries.iter().position(predicate)?;
        let removed = group.entries.remove(index);
        if group.entries.is_empty() {
            self.groups.remove(name);
        }
        Some(removed)
    }

    /// Scans the whole store for a PTR entry whose target is
    /// `target_name`, removing and returning the first match.
    ///
    /// Mirrors the source's `entry_remove(store, parent_entry,
    /// RR_PTR)`: used to find the `_services._dns-sd._udp.local`
    /// meta-PTR that points at a service's type-PTR when that service
    /// is removed.
    pub fn remove_ptr_referencing(&mut self, target_name: &DomainName) -> Option<ResourceRecord> {
        let owner = self.groups.iter().find_map(|(owner, group)| {
            group.entries.iter().any(|e| ptr_target(e) == Some(target_name)).then(|| owner.clone())
        })?;

        self.remove_where(&owner, |e| ptr_target(e) == Some(target_name))
    }

    /// Drops any groups left with no entries. Called after a batch
    /// of removals; `remove_where` already does this per-call, so
    /// this is for callers that mutate `entries` directly.
    pub fn clean(&mut self) {
        self.groups.retain(|_, group| !group.entries.is_empty());
    }

    /// All records at `name` matching `qtype`, per RFC 6762 section
    /// 6: a wildcard query matches every type except NSEC.
    pub fn answers_for(&self, name: &DomainName, qtype: &QueryType) -> Vec<ResourceRecord> {
        self.get(name)
            .map(|group| {
                group
                    .entries
                    .iter()
                    .filter(|e| e.rtype_with_data.matches(qtype))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn ptr_target(record: &ResourceRecord) -> Option<&DomainName> {
    match &record.rtype_with_data {
        RecordTypeWithData::PTR { ptrdname } => Some(ptrdname),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_types::protocol::types::test_util::*;
    use dns_types::protocol::types::RecordType;
    use std::net::Ipv4Addr;

    #[test]
    fn add_rejects_duplicate_by_entry_eq() {
        let mut store = RecordStore::new();
        assert!(store.add(a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 120)));
        assert!(!store.add(a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 4500)));
        assert_eq!(store.get(&domain("host.local.")).unwrap().entries.len(), 1);
    }

    #[test]
    fn answers_for_wildcard_excludes_nsec() {
        let mut store = RecordStore::new();
        store.add(a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 120));
        store.add(nsec_record("host.local.", &[RecordType::A], 120));

        let answers = store.answers_for(&domain("host.local."), &QueryType::Wildcard);
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn remove_ptr_referencing_finds_meta_ptr() {
        let mut store = RecordStore::new();
        store.add(ptr_record(
            "_services._dns-sd._udp.local.",
            "_ipp._tcp.local.",
            4500,
        ));

        let removed = store.remove_ptr_referencing(&domain("_ipp._tcp.local."));
        assert!(removed.is_some());
        assert!(store.get(&domain("_services._dns-sd._udp.local.")).is_none());
    }

    #[test]
    fn clean_drops_empty_groups_after_manual_mutation() {
        let mut store = RecordStore::new();
        store.add(a_record("host.local.", Ipv4Addr::new(1, 2, 3, 4), 120));
        store
            .groups
            .get_mut(&domain("host.local."))
            .unwrap()
            .entries
            .clear();
        store.clean();
        assert!(store.get(&domain("host.local.")).is_none());
    }
}
