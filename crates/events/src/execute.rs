use tillstock_core::Aggregate;

/// Run `command` against `aggregate`: decide, then fold every emitted event
/// back in. A rejected command leaves the aggregate untouched.
pub fn execute<A: Aggregate>(
    aggregate: &mut A,
    command: &A::Command,
) -> Result<Vec<A::Event>, A::Error> {
    let events = aggregate.handle(command)?;
    events.iter().for_each(|event| aggregate.apply(event));
    Ok(events)
}
