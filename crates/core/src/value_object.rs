//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two `DoseHorario`s
/// holding `08:00` are interchangeable, while two `Medicamento`s with the same
/// name are not. To "modify" a value object, build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Dosagem { quantidade: u32, unidade: String }
///
/// impl ValueObject for Dosagem {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
