use crate::ecs::{ComponentId, Phase};

/// Name, phase and declared component access of a system.
///
/// The read/write sets are only enforced when the engine runs with
/// `strict_access`; otherwise they are informational.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemDescriptor {
    name: String,
    phase: Phase,
    reads: Vec<ComponentId>,
    writes: Vec<ComponentId>,
    components: Vec<ComponentId>,
}

/// First overlap found between two descriptors' access sets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessConflict {
    /// Both write the component.
    BothWrite(ComponentId),
    /// `self` writes what the other reads.
    WritesRead(ComponentId),
    /// `self` reads what the other writes.
    ReadsWritten(ComponentId),
}

impl SystemDescriptor {
    /// Create a descriptor with empty access sets.
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
            reads: Vec::new(),
            writes: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Replace the read-only component set for this system.
    pub fn reads<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        self.reads = Self::sanitize(components);
        self.rebuild_components();
        self
    }

    /// Replace the write component set for this system.
    pub fn writes<I>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = ComponentId>,
    {
        self.writes = Self::sanitize(components);
        self.rebuild_components();
        self
    }

    pub fn add_read(&mut self, component: ComponentId) {
        self.reads.push(component);
        self.rebuild_components();
    }

    pub fn add_write(&mut self, component: ComponentId) {
        self.writes.push(component);
        self.rebuild_components();
    }

    /// Unique system name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn read_components(&self) -> &[ComponentId] {
        &self.reads
    }

    pub fn write_components(&self) -> &[ComponentId] {
        &self.writes
    }

    /// Union of read and write component ids.
    pub fn all_components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Whether the descriptor declares any access at all.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Check whether running next to `other` could race on a component.
    /// Reads alone never conflict.
    pub fn conflict_with(&self, other: &SystemDescriptor) -> Option<AccessConflict> {
        if let Some(c) = Self::first_shared(&self.writes, &other.writes) {
            return Some(AccessConflict::BothWrite(c));
        }
        if let Some(c) = Self::first_shared(&self.writes, &other.reads) {
            return Some(AccessConflict::WritesRead(c));
        }
        Self::first_shared(&self.reads, &other.writes).map(AccessConflict::ReadsWritten)
    }

    fn first_shared(a: &[ComponentId], b: &[ComponentId]) -> Option<ComponentId> {
        a.iter().copied().find(|c| b.binary_search(c).is_ok())
    }

    fn rebuild_components(&mut self) {
        self.reads = Self::sanitize(std::mem::take(&mut self.reads));
        self.writes = Self::sanitize(std::mem::take(&mut self.writes));
        self.components.clear();
        self.components.extend(&self.reads);
        self.components.extend(&self.writes);
        self.components.sort_unstable();
        self.components.dedup();
    }

    fn sanitize<I>(components: I) -> Vec<ComponentId>
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut list: Vec<ComponentId> = components.into_iter().collect();
        list.sort_unstable();
        list.dedup();
        list
    }
}
