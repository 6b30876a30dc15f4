use std::sync::Arc;

use anyhow::Result;

use herald_collections::ObservableList;
use herald_collections::changes::ListChange;

fn main() -> Result<()> {
    env_logger::init();

    let list = ObservableList::from(vec![
        "alpha".to_string(),
        "gamma".to_string(),
        "beta".to_string(),
    ]);

    list.add_change_listener(Arc::new(|change: &ListChange<String>| match change {
        ListChange::Permutation(mapping) => println!("reordered: {mapping:?}"),
        ListChange::Local(changes) => println!("edited: {changes:?}"),
    }));

    // A plain mutation reports a compressed local change.
    list.push("delta".to_string());

    // Replacing an element reports a single update, not remove plus insert.
    list.set(0, "omega".to_string())?;

    // A pure reordering reports a permutation.
    list.sort();

    println!("final: {:?}", list.snapshot());
    Ok(())
}
