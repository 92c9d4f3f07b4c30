/// The scalar value type every node in the graph carries.
///
/// The engine is deliberately monomorphic: every input and every compute
/// result is an `f64`. This keeps the values buffer a single contiguous
/// `Vec<Scalar>` (see `flux_engine::graph::CompiledGraph`) with no tagging
/// or branching on the hot path.
pub type Scalar = f64;

/// Compares two scalars the way dirty-tracking needs to: by raw bit
/// pattern, except that `+0.0` and `-0.0` are still considered equal.
///
/// Plain `==` makes `NaN != NaN`, which would mark an input dirty on
/// every single tick once it settles on a NaN, even though nothing
/// "changed" from the caller's point of view. Comparing by bit pattern
/// instead makes a steady-state NaN input compare equal to itself (so it
/// stops re-triggering downstream recomputation) while still treating two
/// *different* NaN payloads as a change. `+0.0` and `-0.0` differ in their
/// sign bit, so a pure `to_bits()` comparison would (surprisingly) report
/// them as different; they are special-cased here so a sign flip at zero
/// is not treated as a dirtying change.
pub fn bits_eq(a: Scalar, b: Scalar) -> bool {
    if a == 0.0 && b == 0.0 {
        return true;
    }
    a.to_bits() == b.to_bits()
}
