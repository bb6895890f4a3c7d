//! Primary-then-fallback ranking resolution.

use super::provider::{DataError, FetchProgress, RankingOrigin, RankingSource};
use crate::domain::RankingMap;
use tracing::{info, warn};

/// A ranking map together with the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedRanking {
    pub map: RankingMap,
    pub origin: RankingOrigin,
}

/// Resolve the ranking map: try `primary`; if it fails, try `fallback`.
///
/// The fallback only runs when the primary returns an error. An empty map
/// from whichever source answered is `RankingUnavailable`.
pub fn resolve_ranking(
    primary: &dyn RankingSource,
    fallback: Option<&dyn RankingSource>,
    progress: &dyn FetchProgress,
) -> Result<ResolvedRanking, DataError> {
    let (source, result) = match primary.fetch_ranking(progress) {
        Ok(map) => (primary, Ok(map)),
        Err(primary_err) => {
            let Some(fallback) = fallback else {
                return Err(DataError::RankingUnavailable {
                    reason: format!("{}: {primary_err}", primary.name()),
                });
            };
            warn!("{} failed: {primary_err}; trying {}", primary.name(), fallback.name());
            progress.on_fallback(primary.name(), fallback.name(), &primary_err);
            (fallback, fallback.fetch_ranking(progress))
        }
    };

    let map = result.map_err(|e| DataError::RankingUnavailable {
        reason: format!("{}: {e}", source.name()),
    })?;
    if map.is_empty() {
        return Err(DataError::RankingUnavailable {
            reason: format!("{} returned no ranked coins", source.name()),
        });
    }

    info!("resolved {} ranked coins from {}", map.len(), source.origin());
    Ok(ResolvedRanking {
        map,
        origin: source.origin(),
    })
}
