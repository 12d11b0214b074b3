//! Identity for child records that live outside an aggregate's state.

/// A record with its own identity and lifecycle that is persisted on its own.
///
/// `DoseLog` is one: it belongs to a `Medicamento` by id only.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
