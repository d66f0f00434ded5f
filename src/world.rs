//! The per-scenario shared context.

/// Mutable state shared by every step, hook and transform of one scenario.
///
/// A fresh world is constructed for each scenario (and each outline example)
/// and dropped when the scenario ends. Construction may fail; the scenario is
/// then reported with all steps skipped.
///
/// ```
/// use stepwright::World;
///
/// #[derive(Default)]
/// struct Calculator {
///     stack: Vec<i64>,
/// }
///
/// impl World for Calculator {
///     fn new() -> eyre::Result<Self> {
///         Ok(Self::default())
///     }
/// }
/// ```
pub trait World: Sized + 'static {
    /// Creates the world for a new scenario.
    ///
    /// # Errors
    ///
    /// Any error aborts the scenario before its first step.
    fn new() -> eyre::Result<Self>;
}
