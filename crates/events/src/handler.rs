/// Decide and evolve in one step (no IO, no persistence).
///
/// Calls `handle` and then applies every returned event to the aggregate.
/// Persistence-backed execution goes through the assessment engine instead;
/// this is the in-memory form used by domain tests and replay tooling.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: bazaar_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
