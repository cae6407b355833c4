use std::collections::BTreeMap;

use blobseer_metadata::{Interval, ObjectId, Position, TicketReply, Version, VersionRoot};

use crate::VersionManagerError;

/// A version that holds a ticket but has not been published yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The range written by the version
    pub interval: Interval,
    /// The root the version will have once published
    pub root: VersionRoot,
    /// Whether the writer has reported its tree as complete
    pub completed: bool,
}

/// Bookkeeping for one blob. Lives only in the version manager's memory.
#[derive(Debug, Clone)]
pub struct ObjectState {
    object_id: ObjectId,
    page_size: u64,
    ft_info: u32,
    /// Next version number to hand out
    current_ticket: Version,
    /// Span of the tree; only ever doubles
    max_size: u64,
    /// Furthest end of any ticketed write
    progress_size: u64,
    /// Published roots, indexed by version
    roots: Vec<VersionRoot>,
    /// Ticketed versions awaiting publication, keyed by version
    in_flight: BTreeMap<Version, Candidate>,
}

impl ObjectState {
    /// State of a freshly created, empty object
    pub fn new(object_id: ObjectId, page_size: u64, ft_info: u32) -> Self {
        Self::from_root(VersionRoot::initial(object_id, page_size, ft_info))
    }

    /// State of an object whose version 0 is `root`
    pub fn from_root(root: VersionRoot) -> Self {
        Self {
            object_id: root.object_id,
            page_size: root.page_size,
            ft_info: root.ft_info,
            current_ticket: 1,
            max_size: root.node.size.max(root.page_size),
            progress_size: root.current_size,
            roots: vec![root],
            in_flight: BTreeMap::new(),
        }
    }

    /// The object this state belongs to
    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    /// Current span of the object's tree
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Furthest end of any write ticketed so far
    pub fn progress_size(&self) -> u64 {
        self.progress_size
    }

    /// Latest published root
    pub fn last_root(&self) -> &VersionRoot {
        // `roots` is seeded with version 0 and never shrinks
        &self.roots[self.roots.len() - 1]
    }

    /// Published root of `version`, if any
    pub fn root(&self, version: Version) -> Option<&VersionRoot> {
        self.roots.get(version as usize)
    }

    /// Versions that hold a ticket but are not published yet
    pub fn in_flight(&self) -> impl Iterator<Item = &Candidate> {
        self.in_flight.values()
    }

    /// Allocate the next version for a write of `size` bytes at `offset`, or
    /// at the current end of the object when `append` is set.
    pub fn issue_ticket(
        &mut self,
        offset: u64,
        size: u64,
        append: bool,
    ) -> Result<TicketReply, VersionManagerError> {
        let offset = if append { self.progress_size } else { offset };

        if size == 0 || size % self.page_size != 0 || offset % self.page_size != 0 {
            return Err(VersionManagerError::BadArgument(format!(
                "[{offset}, +{size}) is not aligned to pages of {} bytes",
                self.page_size
            )));
        }

        let end = offset.checked_add(size).ok_or_else(|| {
            VersionManagerError::ResourceExhausted(format!("write at {offset} overflows"))
        })?;

        let mut max_size = self.max_size;
        while end > max_size {
            max_size = max_size.checked_mul(2).ok_or_else(|| {
                VersionManagerError::ResourceExhausted(format!("tree cannot grow to cover {end}"))
            })?;
        }

        let ticket = self.current_ticket;
        let next_ticket = ticket.checked_add(1).ok_or_else(|| {
            VersionManagerError::ResourceExhausted(format!(
                "object {} ran out of versions",
                self.object_id
            ))
        })?;

        self.current_ticket = next_ticket;
        self.max_size = max_size;
        self.progress_size = self.progress_size.max(end);

        let interval = Interval::new(self.object_id, ticket, offset, size);
        let (left, right) = self.sibling_versions(&interval);

        let root = VersionRoot {
            object_id: self.object_id,
            version: ticket,
            node: Interval::new(self.object_id, ticket, 0, max_size),
            page_size: self.page_size,
            current_size: self.progress_size,
            ft_info: self.ft_info,
        };
        self.in_flight.insert(
            ticket,
            Candidate {
                interval,
                root,
                completed: false,
            },
        );

        Ok(TicketReply {
            ticket,
            interval,
            stable_root: self.last_root().clone(),
            root_size: max_size,
            left,
            right,
        })
    }

    /// Mark the ticket of `interval` as complete, then publish every
    /// completed ticket that no incomplete ticket precedes.
    ///
    /// Returns the versions that became visible, in order.
    pub fn complete(&mut self, interval: &Interval) -> Result<Vec<Version>, VersionManagerError> {
        let candidate = self.in_flight.get_mut(&interval.version).ok_or(
            VersionManagerError::VersionNotFound(self.object_id, interval.version),
        )?;

        if candidate.interval.offset != interval.offset || candidate.interval.size != interval.size
        {
            return Err(VersionManagerError::BadArgument(format!(
                "version {} wrote {}, not {}",
                interval.version, candidate.interval, interval
            )));
        }

        candidate.completed = true;

        let mut published = Vec::new();
        while let Some(entry) = self.in_flight.first_entry() {
            if !entry.get().completed {
                break;
            }
            let candidate = entry.remove();
            published.push(candidate.root.version);
            self.roots.push(candidate.root);
        }

        Ok(published)
    }

    /// Siblings of the write's boundary paths that were written by versions
    /// still in flight, outer side only: left of the leftmost leaf's path and
    /// right of the rightmost leaf's path.
    ///
    /// Every slot is claimed by the most recently ticketed in-flight version
    /// whose write intersects it. Slots no in-flight version wrote are left
    /// out; the builder takes those from the stable tree.
    fn sibling_versions(&self, interval: &Interval) -> (Vec<Interval>, Vec<Interval>) {
        let first = Interval::new(self.object_id, interval.version, interval.offset, self.page_size);
        let last = Interval::new(
            self.object_id,
            interval.version,
            interval.end() - self.page_size,
            self.page_size,
        );

        (
            self.boundary_siblings(first, Position::Right),
            self.boundary_siblings(last, Position::Left),
        )
    }

    /// Walk from `edge` up to the root, collecting the siblings of the nodes
    /// that sit at `outer` under their parent.
    fn boundary_siblings(&self, edge: Interval, outer: Position) -> Vec<Interval> {
        let mut siblings = Vec::new();
        let mut current = edge;

        while current.size < self.max_size {
            let (parent, position) = current.parent();
            if position == outer {
                if let Some(sibling) = self.newest_writer(&current.sibling()) {
                    siblings.push(sibling);
                }
            }
            current = parent;
        }

        siblings
    }

    /// The node standing for `slot` in the newest in-flight version that
    /// wrote inside it.
    ///
    /// A version whose tree is smaller than the slot only wrote inside its
    /// own root, which then sits at the bottom of the slot.
    fn newest_writer(&self, slot: &Interval) -> Option<Interval> {
        self.in_flight
            .values()
            .rev()
            .find(|candidate| candidate.interval.intersects(slot))
            .map(|candidate| {
                Interval::new(
                    self.object_id,
                    candidate.root.version,
                    slot.offset,
                    slot.size.min(candidate.root.node.size),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn it_grows_the_tree_by_doubling() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);

        let reply = state.issue_ticket(0, 24, false)?;
        assert_eq!(reply.root_size, 32);
        assert_eq!(state.max_size(), 32);

        let reply = state.issue_ticket(64, 8, false)?;
        assert_eq!(reply.root_size, 128);

        // Small writes never shrink it
        let reply = state.issue_ticket(0, 8, false)?;
        assert_eq!(reply.root_size, 128);

        Ok(())
    }

    #[test]
    fn it_resolves_appends_to_the_progress_size() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);

        state.issue_ticket(0, 16, false)?;
        let reply = state.issue_ticket(1234, 8, true)?;

        assert_eq!(reply.interval, Interval::new(1, 2, 16, 8));
        assert_eq!(state.progress_size(), 24);

        Ok(())
    }

    #[test]
    fn it_rejects_unaligned_writes() {
        let mut state = ObjectState::new(1, 8, 1);

        assert!(matches!(
            state.issue_ticket(4, 8, false),
            Err(VersionManagerError::BadArgument(_))
        ));
        assert!(matches!(
            state.issue_ticket(0, 0, false),
            Err(VersionManagerError::BadArgument(_))
        ));
        assert!(matches!(
            state.issue_ticket(0, 12, false),
            Err(VersionManagerError::BadArgument(_))
        ));
    }

    #[test]
    fn it_runs_out_of_room_past_the_address_space() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);

        assert!(matches!(
            state.issue_ticket(1 << 63, 8, false),
            Err(VersionManagerError::ResourceExhausted(_))
        ));
        assert!(matches!(
            state.issue_ticket(u64::MAX - 7, 16, false),
            Err(VersionManagerError::ResourceExhausted(_))
        ));

        // Failed requests consume neither a version nor any room
        assert_eq!(state.max_size(), 8);
        assert_eq!(state.progress_size(), 0);
        assert_eq!(state.issue_ticket(0, 8, false)?.ticket, 1);

        Ok(())
    }

    #[test]
    fn it_hands_out_in_flight_siblings() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);

        let first = state.issue_ticket(0, 8, false)?;
        assert!(first.left.is_empty() && first.right.is_empty());

        // The tree is 32 bytes wide after this one
        let second = state.issue_ticket(16, 16, false)?;
        // Version 1 only spans [0, 8) and fills the bottom of the [0, 16) slot
        assert_eq!(second.left, vec![Interval::new(1, 1, 0, 8)]);
        assert!(second.right.is_empty());

        let third = state.issue_ticket(8, 8, false)?;
        assert_eq!(third.left, vec![Interval::new(1, 1, 0, 8)]);
        assert_eq!(third.right, vec![Interval::new(1, 2, 16, 16)]);

        Ok(())
    }

    #[test]
    fn it_prefers_the_newest_in_flight_writer() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);
        state.issue_ticket(0, 32, false)?;
        state.issue_ticket(16, 8, false)?;

        let reply = state.issue_ticket(0, 8, false)?;

        assert_eq!(
            reply.right,
            vec![Interval::new(1, 1, 8, 8), Interval::new(1, 2, 16, 16)]
        );

        Ok(())
    }

    #[test]
    fn it_publishes_completed_prefixes_only() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);
        let first = state.issue_ticket(0, 8, false)?;
        let second = state.issue_ticket(8, 8, false)?;
        let third = state.issue_ticket(16, 8, false)?;

        assert_eq!(state.complete(&third.interval)?, Vec::<Version>::new());
        assert_eq!(state.complete(&second.interval)?, Vec::<Version>::new());
        assert_eq!(state.last_root().version, 0);

        assert_eq!(state.complete(&first.interval)?, vec![1, 2, 3]);
        assert_eq!(state.last_root().version, 3);
        assert_eq!(state.last_root().current_size, 24);
        assert_eq!(state.root(2).map(|root| root.current_size), Some(16));

        Ok(())
    }

    #[test]
    fn it_refuses_to_publish_an_unknown_ticket() -> Result<()> {
        let mut state = ObjectState::new(1, 8, 1);
        let reply = state.issue_ticket(0, 8, false)?;

        assert_eq!(
            state.complete(&Interval::new(1, 5, 0, 8)),
            Err(VersionManagerError::VersionNotFound(1, 5))
        );
        assert!(matches!(
            state.complete(&Interval { size: 16, ..reply.interval }),
            Err(VersionManagerError::BadArgument(_))
        ));

        state.complete(&reply.interval)?;
        assert_eq!(
            state.complete(&reply.interval),
            Err(VersionManagerError::VersionNotFound(1, 1))
        );

        Ok(())
    }
}
