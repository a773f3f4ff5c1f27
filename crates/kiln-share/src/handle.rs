//! OS shared handles and cross-process adoption.
//!
//! A handle value is only meaningful inside the process that exported it.
//! Before the consumer side opens a resource it adopts the handle: same
//! process, pass it through untouched; different process, duplicate it into
//! this process via the OS collaborator, failing closed.

use tracing::{error, warn};

/// An OS-level shared handle value. Zero is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShareHandle(pub u64);

impl ShareHandle {
    pub const NULL: ShareHandle = ShareHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Opaque reference to a native GPU object issued by a device collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeResource(pub u64);

/// Opaque reference to a native device-memory allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceMemory(pub u64);

/// The process that exported a handle, as recorded in the snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerProcess {
    pub pid: u32,
}

impl PeerProcess {
    pub fn is_current(self) -> bool {
        self.pid == std::process::id()
    }
}

/// OS collaborator that duplicates a handle owned by `peer` into the current
/// process.
pub trait HandleDuplicator {
    fn duplicate_from(&self, peer: PeerProcess, handle: ShareHandle) -> Option<ShareHandle>;
}

/// Make a peer-exported handle usable in this process.
///
/// Same-process detection is an explicit branch: duplication only happens
/// when the peer pid differs from ours, and a failed duplication yields no
/// handle at all.
pub fn adopt_peer_handle(
    duplicator: &dyn HandleDuplicator,
    peer: PeerProcess,
    handle: ShareHandle,
) -> Option<ShareHandle> {
    if handle.is_null() {
        error!(peer = peer.pid, "refusing to adopt a null shared handle");
        return None;
    }
    if peer.is_current() {
        return Some(handle);
    }
    match duplicator.duplicate_from(peer, handle) {
        Some(dup) if !dup.is_null() => Some(dup),
        _ => {
            warn!(
                peer = peer.pid,
                handle = handle.0,
                "failed to duplicate shared handle across processes"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OffsetDuplicator;
    impl HandleDuplicator for OffsetDuplicator {
        fn duplicate_from(&self, _peer: PeerProcess, handle: ShareHandle) -> Option<ShareHandle> {
            Some(ShareHandle(handle.0 + 1000))
        }
    }

    struct FailingDuplicator;
    impl HandleDuplicator for FailingDuplicator {
        fn duplicate_from(&self, _peer: PeerProcess, _handle: ShareHandle) -> Option<ShareHandle> {
            None
        }
    }

    #[test]
    fn same_process_passes_the_handle_through() {
        let peer = PeerProcess {
            pid: std::process::id(),
        };
        let adopted = adopt_peer_handle(&OffsetDuplicator, peer, ShareHandle(7)).unwrap();
        // No duplication happened.
        assert_eq!(adopted, ShareHandle(7));
    }

    #[test]
    fn cross_process_goes_through_the_duplicator() {
        let peer = PeerProcess {
            pid: std::process::id().wrapping_add(1),
        };
        let adopted = adopt_peer_handle(&OffsetDuplicator, peer, ShareHandle(7)).unwrap();
        assert_eq!(adopted, ShareHandle(1007));
    }

    #[test]
    fn null_handles_and_failed_duplication_fail_closed() {
        let peer = PeerProcess {
            pid: std::process::id().wrapping_add(1),
        };
        assert!(adopt_peer_handle(&OffsetDuplicator, peer, ShareHandle::NULL).is_none());
        assert!(adopt_peer_handle(&FailingDuplicator, peer, ShareHandle(7)).is_none());
    }
}
