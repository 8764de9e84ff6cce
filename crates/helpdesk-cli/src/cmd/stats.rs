use crate::output::{print_fields, print_json};
use helpdesk_core::store::TicketStore;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let stats = super::open_store(root)?.stats()?;
    if json {
        return print_json(&stats);
    }
    print_fields(&[
        ("total", stats.total.to_string()),
        ("open", stats.open.to_string()),
        ("high priority", stats.high_priority.to_string()),
        ("overdue", stats.overdue.to_string()),
        (
            "by tier",
            format!(
                "L1 {}  L2 {}  L3 {}",
                stats.by_tier.l1, stats.by_tier.l2, stats.by_tier.l3
            ),
        ),
    ]);
    Ok(())
}
