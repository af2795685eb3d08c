mod common;

use common::*;
use perpsync::domain::{Amount, Position};
use perpsync::engine::{apply_metrics, leverage, DisplayOptions, LeverageInput};

fn eth_long(size: u64, collateral: u64, average_price: u64, mark_price: u64) -> Position {
    let mut position = Position::empty(eth_long_key(), WETH, WETH, true);
    position.size = usd(size);
    position.collateral = usd(collateral);
    position.average_price = usd(average_price);
    position.mark_price = Some(usd(mark_price));
    position.entry_funding_rate = Amount::from_u64(1_000);
    position.cumulative_funding_rate = Some(Amount::from_u64(1_000));
    position
}

#[test]
fn test_after_fee_sign_flip() {
    let mut flipped = Position::empty(eth_long_key(), WETH, WETH, true);
    // closing fee 75, position fee 150, no funding
    flipped.size = Amount::from_u64(75_000);
    flipped.collateral = Amount::from_u64(1_000_000);
    flipped.average_price = Amount::from_u64(1);
    flipped.has_profit = true;
    flipped.delta = Amount::from_u64(100);

    let mut covered = flipped.clone();
    covered.delta = Amount::from_u64(200);

    apply_metrics(&mut flipped, DisplayOptions::default());
    apply_metrics(&mut covered, DisplayOptions::default());

    assert_eq!(flipped.total_fees, Amount::from_u64(150));
    assert_eq!(flipped.has_profit_after_fees, Some(false));
    assert_eq!(flipped.pending_delta_after_fees, Some(Amount::from_u64(50)));

    assert_eq!(covered.has_profit_after_fees, Some(true));
    assert_eq!(covered.pending_delta_after_fees, Some(Amount::from_u64(50)));
}

#[test]
fn test_profitable_long_full_metrics() {
    let mut position = eth_long(10_000, 1_000, 2_000, 2_200);
    apply_metrics(&mut position, DisplayOptions::default());

    assert_eq!(position.funding_fee, Amount::ZERO);
    assert_eq!(position.closing_fee, usd(10));
    assert_eq!(position.position_fee, usd(20));
    assert_eq!(position.total_fees, usd(20));
    assert!(!position.has_low_collateral);

    assert!(position.has_profit);
    assert_eq!(position.pending_delta, usd(1_000));
    assert_eq!(position.delta_percentage, Some(Amount::from_u64(10_000)));
    assert_eq!(position.delta_before_fees_str.as_deref(), Some("+$1,000.00"));
    assert_eq!(position.delta_before_fees_percentage_str.as_deref(), Some("+100.00%"));
    assert_eq!(position.delta_after_fees_str.as_deref(), Some("+$980.00"));
    assert_eq!(position.delta_after_fees_percentage_str.as_deref(), Some("+98.00%"));
    assert_eq!(position.delta_str.as_deref(), Some("+$980.00"));

    assert_eq!(position.net_value, Some(usd(1_990)));
    assert_eq!(position.leverage, Some(Amount::from_u64(100_000)));
    assert_eq!(position.leverage_str.as_deref(), Some("10.00x"));
}

#[test]
fn test_before_fee_display_keeps_both_variants() {
    let mut position = eth_long(10_000, 1_000, 2_000, 2_200);
    apply_metrics(
        &mut position,
        DisplayOptions {
            show_pnl_after_fees: false,
            include_delta: false,
        },
    );

    assert_eq!(position.delta_str.as_deref(), Some("+$1,000.00"));
    assert_eq!(position.delta_after_fees_str.as_deref(), Some("+$980.00"));
    // closing fee only deducted for fee-inclusive display
    assert_eq!(position.net_value, Some(usd(2_000)));
}

#[test]
fn test_losing_long_grows_loss_by_fees() {
    let mut position = eth_long(10_000, 1_000, 2_000, 1_800);
    apply_metrics(&mut position, DisplayOptions::default());

    assert!(!position.has_profit);
    assert_eq!(position.pending_delta, usd(1_000));
    assert_eq!(position.has_profit_after_fees, Some(false));
    assert_eq!(position.pending_delta_after_fees, Some(usd(1_020)));
    assert_eq!(position.delta_str.as_deref(), Some("-$1,020.00"));
    assert_eq!(position.net_value, Some(Amount::ZERO - usd(10)));
}

#[test]
fn test_upstream_delta_is_trusted() {
    let mut position = eth_long(10_000, 1_000, 2_000, 2_200);
    position.delta = usd(42);
    position.has_profit = false;
    apply_metrics(&mut position, DisplayOptions::default());

    assert_eq!(position.pending_delta, usd(42));
    assert!(!position.has_profit);
}

#[test]
fn test_include_delta_changes_leverage_base() {
    let mut position = eth_long(10_000, 1_000, 2_000, 2_200);
    apply_metrics(
        &mut position,
        DisplayOptions {
            show_pnl_after_fees: true,
            include_delta: true,
        },
    );
    assert_eq!(position.leverage_str.as_deref(), Some("5.00x"));
}

#[test]
fn test_low_collateral_threshold() {
    let mut position = eth_long(60_000, 1_000, 2_000, 2_000);
    apply_metrics(&mut position, DisplayOptions::default());
    assert!(position.has_low_collateral);
    assert_eq!(position.leverage_str.as_deref(), Some("60.00x"));

    let mut healthy = eth_long(50_000, 1_000, 2_000, 2_000);
    apply_metrics(&mut healthy, DisplayOptions::default());
    assert!(!healthy.has_low_collateral);
}

#[test]
fn test_funding_exceeding_collateral() {
    let mut position = eth_long(10_000, 1, 2_000, 2_000);
    position.entry_funding_rate = Amount::ZERO;
    position.cumulative_funding_rate = Some(Amount::from_u64(1_000_000));
    apply_metrics(&mut position, DisplayOptions::default());

    assert_eq!(position.funding_fee, usd(10_000));
    assert!(position.collateral_after_fee.is_negative());
    assert!(position.has_low_collateral);
    assert_eq!(position.leverage, None);
    assert_eq!(position.leverage_str, None);
}

#[test]
fn test_zero_collateral_skips_pnl() {
    let mut position = eth_long(0, 0, 0, 2_000);
    apply_metrics(&mut position, DisplayOptions::default());

    assert!(!position.has_low_collateral);
    assert_eq!(position.delta_str, None);
    assert_eq!(position.net_value, None);
    assert_eq!(position.has_profit_after_fees, None);
    assert_eq!(position.leverage, None);
}

#[test]
fn test_leverage_preview_increase() {
    let value = leverage(&LeverageInput {
        size: Some(usd(1_000)),
        size_delta: Some(usd(1_000)),
        increase_size: true,
        collateral: Some(usd(100)),
        ..LeverageInput::default()
    });
    // 2000 / (100 * 0.999)
    assert_eq!(value, Some(Amount::from_u64(200_200)));
}

#[test]
fn test_leverage_preview_full_decrease_is_not_computable() {
    let input = LeverageInput {
        size: Some(usd(1_000)),
        size_delta: Some(usd(1_000)),
        increase_size: false,
        collateral: Some(usd(100)),
        ..LeverageInput::default()
    };
    assert_eq!(leverage(&input), None);

    let withdraw_all = LeverageInput {
        size: Some(usd(1_000)),
        collateral: Some(usd(100)),
        collateral_delta: Some(usd(100)),
        increase_collateral: false,
        ..LeverageInput::default()
    };
    assert_eq!(leverage(&withdraw_all), None);
}

#[test]
fn test_leverage_requires_inputs() {
    assert_eq!(leverage(&LeverageInput::default()), None);
    assert_eq!(
        leverage(&LeverageInput {
            size: Some(usd(1_000)),
            ..LeverageInput::default()
        }),
        None
    );
}

#[test]
fn test_loss_larger_than_collateral_with_delta_is_not_computable() {
    let value = leverage(&LeverageInput {
        size: Some(usd(1_000)),
        collateral: Some(usd(100)),
        has_profit: false,
        delta: Some(usd(150)),
        include_delta: true,
        ..LeverageInput::default()
    });
    assert_eq!(value, None);
}
