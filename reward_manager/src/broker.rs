//! Candid client for the brokerage canister, which carries the asset
//! catalog, the market clock, and order placement behind one principal.
//! The `BrokerAccess` trait fronts the client so the allocation and
//! fulfillment flows can be exercised against a mock.

use candid::Principal;
use ic_exports::ic_cdk::{self, api::call::CallResult};

use crate::{
    state,
    types::{AccountPosition, MarketStatus, OrderDetails, TradableAsset},
    utils::{common::extract_call_result, error::*},
};

/// Capability surface of the brokerage canister
#[cfg_attr(test, mockall::automock)]
#[allow(async_fn_in_trait)]
pub trait BrokerAccess {
    /// Enumerates the symbols the brokerage lists for trading
    async fn list_tradable_assets(&self) -> ManagerResult<Vec<TradableAsset>>;
    /// Latest quote for a symbol; fails with `PriceNotFound` for unknown ones
    async fn latest_price(&self, symbol: &str) -> ManagerResult<f64>;
    /// Whether the venue is open, with the next schedule boundaries
    async fn market_status(&self) -> ManagerResult<MarketStatus>;
    /// Places a buy order on the user's behalf. `dedupe_id` is the
    /// idempotency key: replaying it must not produce a second order.
    async fn place_buy_order(
        &self,
        account_id: u64,
        symbol: &str,
        quantity: u32,
        dedupe_id: u64,
    ) -> ManagerResult<String>;
    /// Positions currently held in the user's account
    async fn account_positions(&self, account_id: u64) -> ManagerResult<Vec<AccountPosition>>;
    /// All orders ever placed for the user's account
    async fn list_orders(&self, account_id: u64) -> ManagerResult<Vec<OrderDetails>>;
}

#[derive(Copy, Clone)]
pub struct BrokerService(pub Principal);

impl Default for BrokerService {
    fn default() -> Self {
        Self(Principal::anonymous())
    }
}

impl BrokerAccess for BrokerService {
    async fn list_tradable_assets(&self) -> ManagerResult<Vec<TradableAsset>> {
        let call_result: CallResult<(Vec<TradableAsset>,)> =
            ic_cdk::call(self.0, "listTradableAssets", ()).await;
        extract_call_result(call_result)
    }

    async fn latest_price(&self, symbol: &str) -> ManagerResult<f64> {
        let call_result: CallResult<(Option<f64>,)> =
            ic_cdk::call(self.0, "getLatestPrice", (symbol,)).await;
        extract_call_result(call_result)?
            .ok_or_else(|| ManagerError::PriceNotFound(symbol.to_string()))
    }

    async fn market_status(&self) -> ManagerResult<MarketStatus> {
        let call_result: CallResult<(MarketStatus,)> =
            ic_cdk::call(self.0, "isMarketOpen", ()).await;
        extract_call_result(call_result)
    }

    async fn place_buy_order(
        &self,
        account_id: u64,
        symbol: &str,
        quantity: u32,
        dedupe_id: u64,
    ) -> ManagerResult<String> {
        let call_result: CallResult<(Result<String, String>,)> = ic_cdk::call(
            self.0,
            "placeBuyOrder",
            (account_id, symbol, quantity, dedupe_id),
        )
        .await;
        extract_call_result(call_result)?.map_err(ManagerError::OrderPlacementFailed)
    }

    async fn account_positions(&self, account_id: u64) -> ManagerResult<Vec<AccountPosition>> {
        let call_result: CallResult<(Vec<AccountPosition>,)> =
            ic_cdk::call(self.0, "getAccountPositions", (account_id,)).await;
        extract_call_result(call_result)
    }

    async fn list_orders(&self, account_id: u64) -> ManagerResult<Vec<OrderDetails>> {
        let call_result: CallResult<(Vec<OrderDetails>,)> =
            ic_cdk::call(self.0, "getAllOrders", (account_id,)).await;
        extract_call_result(call_result)
    }
}

/// Catalog lookup through the daily cache
pub async fn list_assets_cached<B: BrokerAccess>(broker: &B) -> ManagerResult<Vec<TradableAsset>> {
    if let Some(assets) = state::cached_assets() {
        return Ok(assets);
    }
    let assets = broker.list_tradable_assets().await?;
    state::cache_assets(&assets);
    Ok(assets)
}

/// Quote lookup through the short-lived price cache
pub async fn latest_price_cached<B: BrokerAccess>(broker: &B, symbol: &str) -> ManagerResult<f64> {
    if let Some(price) = state::cached_price(symbol) {
        return Ok(price);
    }
    let price = broker.latest_price(symbol).await?;
    state::cache_price(symbol, price);
    Ok(price)
}
