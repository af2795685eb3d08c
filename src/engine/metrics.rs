//! Derived position metrics: fees, PnL before and after fees, net value, leverage.
//!
//! All arithmetic is integer arithmetic on 10^30-scaled amounts, truncating on
//! division, so results match the contracts' own accounting.

use super::{
    bps_divisor, BASIS_POINTS_DIVISOR, FUNDING_RATE_PRECISION, MARGIN_FEE_BASIS_POINTS,
    MAX_RAW_LEVERAGE, USD_DECIMALS,
};
use crate::domain::{Amount, Position};
use serde::{Deserialize, Serialize};

/// Caller-selected display conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    /// Copy the after-fee PnL into `delta_str` and deduct the closing fee from net value.
    pub show_pnl_after_fees: bool,
    /// Fold unrealised PnL into the leverage collateral base.
    pub include_delta: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_pnl_after_fees: true,
            include_delta: false,
        }
    }
}

/// `size * (cumulative - entry) / FUNDING_RATE_PRECISION`, zero if either rate is unknown.
pub fn funding_fee(size: Amount, entry: Option<Amount>, cumulative: Option<Amount>) -> Amount {
    match (entry, cumulative) {
        (Some(entry), Some(cumulative)) => {
            size * (cumulative - entry) / Amount::from_u64(FUNDING_RATE_PRECISION)
        }
        _ => Amount::ZERO,
    }
}

/// Fee charged on closing `size`.
pub fn closing_fee(size: Amount) -> Amount {
    size * Amount::from_u64(MARGIN_FEE_BASIS_POINTS) / bps_divisor()
}

/// PnL net of fees, as a direction flag plus magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnlAfterFees {
    pub has_profit: bool,
    pub delta: Amount,
}

/// Net out `total_fees` from an unsigned PnL.
///
/// A profit larger than the fees stays a profit; a profit that does not cover
/// the fees becomes a loss of the shortfall; a loss always grows by the fees.
pub fn pnl_after_fees(has_profit: bool, pending_delta: Amount, total_fees: Amount) -> PnlAfterFees {
    if has_profit {
        if pending_delta > total_fees {
            PnlAfterFees {
                has_profit: true,
                delta: pending_delta - total_fees,
            }
        } else {
            PnlAfterFees {
                has_profit: false,
                delta: total_fees - pending_delta,
            }
        }
    } else {
        PnlAfterFees {
            has_profit: false,
            delta: pending_delta + total_fees,
        }
    }
}

/// `(deltaStr, deltaPercentageStr)`, e.g. `("+$1,234.50", "+12.34%")`.
///
/// The sign is only shown for a non-zero delta. `delta_percentage` is in basis points.
pub fn delta_strings(delta: Amount, delta_percentage: Amount, has_profit: bool) -> (String, String) {
    let sign = if delta.is_positive() {
        if has_profit {
            "+"
        } else {
            "-"
        }
    } else {
        ""
    };
    (
        format!("{}${}", sign, delta.format_units(USD_DECIMALS, 2, true)),
        format!("{}{}%", sign, delta_percentage.format_units(2, 2, false)),
    )
}

/// Leverage scaled by `BASIS_POINTS_DIVISOR` rendered as `"12.34x"`.
pub fn format_leverage(leverage: Amount) -> String {
    format!("{}x", leverage.format_units(4, 2, true))
}

/// Inputs to the leverage formula. Optional deltas preview an increase or decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeverageInput {
    pub size: Option<Amount>,
    pub size_delta: Option<Amount>,
    pub increase_size: bool,
    pub collateral: Option<Amount>,
    pub collateral_delta: Option<Amount>,
    pub increase_collateral: bool,
    pub entry_funding_rate: Option<Amount>,
    pub cumulative_funding_rate: Option<Amount>,
    pub has_profit: bool,
    pub delta: Option<Amount>,
    pub include_delta: bool,
}

/// Leverage in basis points (`10_000` = 1x), or `None` when not computable.
pub fn leverage(input: &LeverageInput) -> Option<Amount> {
    let unset = |value: Option<Amount>| value.map_or(true, |v| v.is_zero());
    if unset(input.size) && unset(input.size_delta) {
        return None;
    }
    if unset(input.collateral) && unset(input.collateral_delta) {
        return None;
    }

    let size = input.size.unwrap_or(Amount::ZERO);
    let mut next_size = size;
    if let Some(size_delta) = input.size_delta {
        if input.increase_size {
            next_size = size + size_delta;
        } else {
            if size_delta >= size {
                return None;
            }
            next_size = size - size_delta;
        }
    }

    let mut remaining = input.collateral.unwrap_or(Amount::ZERO);
    if let Some(collateral_delta) = input.collateral_delta {
        if input.increase_collateral {
            remaining = remaining + collateral_delta;
        } else {
            if collateral_delta >= remaining {
                return None;
            }
            remaining = remaining - collateral_delta;
        }
    }

    if let (Some(delta), true) = (input.delta, input.include_delta) {
        if input.has_profit {
            remaining = remaining + delta;
        } else {
            if delta > remaining {
                return None;
            }
            remaining = remaining - delta;
        }
    }

    if remaining.is_zero() {
        return None;
    }

    if input.size_delta.is_some() {
        remaining = remaining
            * Amount::from_u64(BASIS_POINTS_DIVISOR - MARGIN_FEE_BASIS_POINTS)
            / bps_divisor();
    }

    remaining = remaining
        - funding_fee(size, input.entry_funding_rate, input.cumulative_funding_rate);

    if !remaining.is_positive() {
        return None;
    }

    Some(next_size * bps_divisor() / remaining)
}

/// Fill in every derived field of a decoded position.
pub fn apply_metrics(position: &mut Position, options: DisplayOptions) {
    position.funding_fee = funding_fee(
        position.size,
        Some(position.entry_funding_rate),
        position.cumulative_funding_rate,
    );
    position.collateral_after_fee = position.collateral - position.funding_fee;
    position.closing_fee = closing_fee(position.size);
    position.position_fee = position.closing_fee * Amount::from_u64(2);
    position.total_fees = position.position_fee + position.funding_fee;
    position.pending_delta = position.delta;

    if position.collateral.is_positive() {
        apply_collateralized_metrics(position, options);
    }

    position.leverage = leverage(&LeverageInput {
        size: Some(position.size),
        collateral: Some(position.collateral),
        entry_funding_rate: Some(position.entry_funding_rate),
        cumulative_funding_rate: position.cumulative_funding_rate,
        has_profit: position.has_profit,
        delta: Some(position.pending_delta),
        include_delta: options.include_delta,
        ..LeverageInput::default()
    });
    position.leverage_str = position.leverage.map(format_leverage);
}

fn apply_collateralized_metrics(position: &mut Position, options: DisplayOptions) {
    position.has_low_collateral = position.collateral_after_fee.is_negative()
        || match position.size.checked_div(position.collateral_after_fee.abs()) {
            Some(raw_leverage) => raw_leverage > Amount::from_u64(MAX_RAW_LEVERAGE),
            None => true,
        };

    if position.delta.is_zero() {
        if let Some(mark_price) = position.mark_price {
            let average_price = position.average_price;
            let price_delta = (average_price - mark_price).abs();
            if let Some(delta) = (position.size * price_delta).checked_div(average_price) {
                position.pending_delta = delta;
                position.delta = delta;
                position.has_profit = if position.is_long {
                    mark_price >= average_price
                } else {
                    mark_price <= average_price
                };
            }
        }
    }

    let collateral = position.collateral;
    let percentage = |value: Amount| value * bps_divisor() / collateral;

    let delta_percentage = percentage(position.pending_delta);
    position.delta_percentage = Some(delta_percentage);
    let (delta_str, delta_percentage_str) =
        delta_strings(position.pending_delta, delta_percentage, position.has_profit);

    let after = pnl_after_fees(position.has_profit, position.pending_delta, position.total_fees);
    let delta_percentage_after_fees = percentage(after.delta);
    position.has_profit_after_fees = Some(after.has_profit);
    position.pending_delta_after_fees = Some(after.delta);
    position.delta_percentage_after_fees = Some(delta_percentage_after_fees);
    let (after_str, after_percentage_str) =
        delta_strings(after.delta, delta_percentage_after_fees, after.has_profit);

    position.delta_before_fees_str = Some(delta_str.clone());
    position.delta_before_fees_percentage_str = Some(delta_percentage_str.clone());
    position.delta_after_fees_str = Some(after_str.clone());
    position.delta_after_fees_percentage_str = Some(after_percentage_str.clone());
    if options.show_pnl_after_fees {
        position.delta_str = Some(after_str);
        position.delta_percentage_str = Some(after_percentage_str);
    } else {
        position.delta_str = Some(delta_str);
        position.delta_percentage_str = Some(delta_percentage_str);
    }

    let mut net_value = if position.has_profit {
        collateral + position.pending_delta
    } else {
        collateral - position.pending_delta
    };
    net_value = net_value - position.funding_fee;
    if options.show_pnl_after_fees {
        net_value = net_value - position.closing_fee;
    }
    position.net_value = Some(net_value);
}
