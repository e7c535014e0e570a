//! Manual override lists that correct known catalog inaccuracies.
//!
//! Some marketable apps never show up in the catalog feed (a DLC with its own
//! trading cards, for example) and the feed could list apps that are not
//! marketable. Both lists are optional and never written by this tool.
use crate::catalog::AppId;
use crate::store::read_json_optional;
use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;

/// Load a flat JSON array of app IDs; a missing file is an empty list.
pub fn load_override_list(path: &Path) -> Result<BTreeSet<AppId>> {
    let ids: Option<Vec<AppId>> = read_json_optional(path)?;
    Ok(ids.unwrap_or_default().into_iter().collect())
}

/// `(fetched ∪ marketable) − unmarketable`; the unmarketable list wins.
pub fn reconcile(
    fetched: BTreeSet<AppId>,
    marketable: &BTreeSet<AppId>,
    unmarketable: &BTreeSet<AppId>,
) -> BTreeSet<AppId> {
    let mut ids = fetched;
    ids.extend(marketable.iter().copied());
    ids.retain(|id| !unmarketable.contains(id));
    ids
}
