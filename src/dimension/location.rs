//! Location dimension: distinct, case-folded location names from both fact
//! sources, enriched through the country lookup.

use crate::dimension::{LocationDim, LocationEntry};
use crate::error::{Error, Result};
use crate::fact::{ErrorPolicy, Rejection, RejectionReason};
use crate::geo::{GeoError, GeoLookup};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Order in which distinct names receive their LocationIds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationOrder {
    /// Byte order of the case-folded names
    #[default]
    Sorted,
    /// Sales names in source order, then budget names
    FirstSeen,
}

#[derive(Debug, Clone)]
pub struct LocationOptions {
    pub order: LocationOrder,
    /// Lookups in flight at once
    pub concurrency: usize,
    pub policy: ErrorPolicy,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self { order: LocationOrder::Sorted, concurrency: 8, policy: ErrorPolicy::FailFast }
    }
}

/// The built dimension plus the names dropped under [`ErrorPolicy::Collect`].
#[derive(Debug, Clone, Default)]
pub struct LocationBuild {
    pub dimension: LocationDim,
    pub rejections: Vec<Rejection>,
}

/// Case-folds and deduplicates the union of both name sets, in `order`.
/// Blank names are skipped.
pub fn distinct_locations<S1, S2>(sales: S1, budget: S2, order: LocationOrder) -> Vec<String>
where
    S1: IntoIterator,
    S1::Item: AsRef<str>,
    S2: IntoIterator,
    S2::Item: AsRef<str>,
{
    let folded = sales
        .into_iter()
        .map(|n| n.as_ref().to_lowercase())
        .chain(budget.into_iter().map(|n| n.as_ref().to_lowercase()))
        .filter(|name| !name.trim().is_empty());

    match order {
        LocationOrder::Sorted => folded.collect::<BTreeSet<_>>().into_iter().collect(),
        LocationOrder::FirstSeen => {
            let mut seen = HashSet::new();
            folded.filter(|name| seen.insert(name.clone())).collect()
        }
    }
}

/// Builds the location dimension.
///
/// Every distinct case-folded name is looked up exactly once, with at most
/// `options.concurrency` lookups in flight. Results are assembled in
/// enumeration order after all lookups finish, so LocationIds do not depend on
/// completion order. Cancelling `cancel` drops the outstanding lookups.
pub async fn build_location_dimension<L, S1, S2>(
    sales_locations: S1,
    budget_locations: S2,
    lookup: &L,
    options: &LocationOptions,
    cancel: &CancellationToken,
) -> Result<LocationBuild>
where
    L: GeoLookup + ?Sized,
    S1: IntoIterator,
    S1::Item: AsRef<str>,
    S2: IntoIterator,
    S2::Item: AsRef<str>,
{
    let names = distinct_locations(sales_locations, budget_locations, options.order);
    info!(count = names.len(), concurrency = options.concurrency, "resolving distinct locations");

    let mut pending = pin!(stream::iter(names.iter())
        .map(|name| async move { (name, lookup.resolve(name).await) })
        .buffered(options.concurrency.max(1)));

    let mut resolved = Vec::with_capacity(names.len());
    let mut rejections = Vec::new();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            next = pending.next() => next,
        };
        let Some((name, outcome)) = next else { break };

        match outcome {
            Ok(info) => {
                debug!(location = %name, capital = %info.capital, "location resolved");
                resolved.push((name, info));
            }
            Err(GeoError::NotFound(_)) if options.policy == ErrorPolicy::Collect => {
                warn!(location = %name, "no country record, location left out of the dimension");
                rejections.push(Rejection {
                    table: LocationDim::TABLE.to_string(),
                    row: None,
                    reason: RejectionReason::LookupNotFound,
                    value: name.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    let entries = resolved
        .into_iter()
        .enumerate()
        .map(|(position, (name, info))| LocationEntry {
            location_id: position as i64,
            country: name.clone(),
            capital: info.capital,
            latitude: info.latitude,
            longitude: info.longitude,
        })
        .collect();

    Ok(LocationBuild { dimension: LocationDim::from_entries(entries), rejections })
}
