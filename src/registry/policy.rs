//! Source exclusivity policy

/// What to do when a source registers on a mountpoint that already has one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourcePolicy {
    /// Every source fans out; chunks from concurrent sources interleave
    #[default]
    AllowConcurrent,
    /// The newcomer is refused with `ERROR - Mountpoint already in use`
    RejectSecond,
    /// The newcomer is accepted and the existing sources are cancelled
    ReplaceExisting,
}
