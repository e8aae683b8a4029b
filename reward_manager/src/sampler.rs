//! The sampling pipeline: one weighted draw picks a price band, one
//! uniform draw picks an asset inside it.

use futures::future::join_all;
use rand::Rng;

use crate::{
    broker::{latest_price_cached, list_assets_cached, BrokerAccess},
    types::{DistributionLevel, DistributionRange, RewardConfig, Stock, TradableAsset},
    utils::error::{ManagerError, ManagerResult},
};

/// Draws one band from the distribution with a single uniform draw.
pub fn pick_range<R: Rng>(distribution: &DistributionLevel, rng: &mut R) -> DistributionRange {
    range_for_draw(distribution, rng.gen::<f64>())
}

/// Cumulative walk over the bands in declared order (low, mid, high)
/// with an inclusive upper bound. A draw beyond the covered total
/// (possible when the chances sum below one) resolves to the low band;
/// that is the documented tie-break, not an error.
fn range_for_draw(distribution: &DistributionLevel, draw: f64) -> DistributionRange {
    let mut cumulative = 0.0;
    for band in distribution.bands() {
        cumulative += band.chance;
        if draw <= cumulative {
            return band;
        }
    }
    distribution.low
}

/// Quotes every asset and keeps the ones priced inside the inclusive
/// interval. The lookups are issued together and gathered in input
/// order; nothing depends on their completion order.
pub async fn filter_assets_by_price<B: BrokerAccess>(
    broker: &B,
    assets: &[TradableAsset],
    min: f64,
    max: f64,
) -> ManagerResult<Vec<Stock>> {
    let lookups = assets
        .iter()
        .map(|asset| latest_price_cached(broker, &asset.symbol));
    let quotes = join_all(lookups).await;

    let mut eligible = Vec::new();
    for (asset, quote) in assets.iter().zip(quotes) {
        let price = quote?;
        if price >= min && price <= max {
            eligible.push(Stock {
                symbol: asset.symbol.clone(),
                price,
            });
        }
    }
    Ok(eligible)
}

/// Picks one asset inside the sampled band.
///
/// Two distinct filter stages: the whole catalog is first reduced to the
/// overall configured reward envelope, then that universe is re-quoted
/// against the band's interval. The global stage defines the program's
/// cost envelope independently of which band was sampled, so the stages
/// must not be collapsed into one.
pub async fn select<B: BrokerAccess, R: Rng>(
    broker: &B,
    config: &RewardConfig,
    band: &DistributionRange,
    rng: &mut R,
) -> ManagerResult<Stock> {
    let catalog = list_assets_cached(broker).await?;

    let universe =
        filter_assets_by_price(broker, &catalog, config.min_share_value, config.max_share_value)
            .await?;
    let universe: Vec<TradableAsset> = universe
        .into_iter()
        .map(|stock| TradableAsset {
            symbol: stock.symbol,
        })
        .collect();

    let eligible = filter_assets_by_price(broker, &universe, band.min, band.max).await?;
    if eligible.is_empty() {
        return Err(ManagerError::NoEligibleAssets);
    }

    let index = rng.gen_range(0..eligible.len());
    Ok(eligible[index].clone())
}

/// The full stochastic selection: band draw, then asset draw.
pub async fn select_reward_stock<B: BrokerAccess, R: Rng>(
    broker: &B,
    config: &RewardConfig,
    distribution: &DistributionLevel,
    rng: &mut R,
) -> ManagerResult<Stock> {
    let band = pick_range(distribution, rng);
    select(broker, config, &band, rng).await
}
