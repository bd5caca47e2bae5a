/// Intent under which a page is requested from the buffer pool. The core
/// does not enforce locking on this (the two-phase lock manager is an
/// anticipated collaborator, out of scope here); it exists so callers can
/// declare intent at the hook the lock manager would occupy.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}
