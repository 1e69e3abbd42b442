use rust_decimal::Decimal;

use crate::types::{candle, Candle};

/// Support and resistance levels around the current price, closest first.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceLevels {
    pub support: Vec<Decimal>,
    pub resistance: Vec<Decimal>,
}

const MIN_CLUSTER_SIZE: usize = 3;
const MAX_LEVELS_PER_SIDE: usize = 3;

/// Cluster recent highs and lows into horizontal levels.
///
/// Prices within `threshold` relative distance of a cluster's running mean
/// join that cluster; clusters with at least three members become levels.
/// Levels are partitioned by the latest close into up to three supports
/// (below, closest first) and three resistances (above, closest first).
pub fn find_support_resistance(
    candles: &[Candle],
    lookback: usize,
    threshold: Decimal,
) -> PriceLevels {
    let start = candles.len().saturating_sub(lookback);
    let window = &candles[start..];

    let current = match window.last() {
        Some(c) => c.close,
        None => {
            return PriceLevels {
                support: Vec::new(),
                resistance: Vec::new(),
            }
        }
    };

    let mut prices = candle::highs(window);
    prices.extend(candle::lows(window));
    prices.sort();

    // Greedy pass over the sorted prices: a price joins the open cluster
    // while it stays within the threshold of the cluster mean.
    let mut levels: Vec<Decimal> = Vec::new();
    let mut cluster: Vec<Decimal> = Vec::new();
    for price in prices {
        let mean = cluster_mean(&cluster);
        let joins = match mean {
            Some(mean) if !mean.is_zero() => (price - mean).abs() / mean <= threshold,
            Some(mean) => price == mean,
            None => true,
        };

        if joins {
            cluster.push(price);
        } else {
            if cluster.len() >= MIN_CLUSTER_SIZE {
                if let Some(level) = cluster_mean(&cluster) {
                    levels.push(level);
                }
            }
            cluster = vec![price];
        }
    }
    if cluster.len() >= MIN_CLUSTER_SIZE {
        if let Some(level) = cluster_mean(&cluster) {
            levels.push(level);
        }
    }

    let mut support: Vec<Decimal> = levels.iter().copied().filter(|l| *l < current).collect();
    let mut resistance: Vec<Decimal> = levels.into_iter().filter(|l| *l > current).collect();

    // Closest to the current price first.
    support.sort_by(|a, b| b.cmp(a));
    resistance.sort();
    support.truncate(MAX_LEVELS_PER_SIDE);
    resistance.truncate(MAX_LEVELS_PER_SIDE);

    PriceLevels {
        support,
        resistance,
    }
}

fn cluster_mean(cluster: &[Decimal]) -> Option<Decimal> {
    if cluster.is_empty() {
        return None;
    }
    Some(cluster.iter().sum::<Decimal>() / Decimal::from(cluster.len() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(i: u32, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle {
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::hours(i as i64),
            open: close,
            high,
            low,
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn repeated_extremes_form_levels() {
        // Price repeatedly bounces between 90 support and 110 resistance.
        let mut candles = Vec::new();
        for i in 0..12u32 {
            if i % 2 == 0 {
                candles.push(candle(i, dec!(110), dec!(100), dec!(100)));
            } else {
                candles.push(candle(i, dec!(100), dec!(90), dec!(100)));
            }
        }

        let levels = find_support_resistance(&candles, 12, dec!(0.01));
        assert!(!levels.support.is_empty());
        assert!(!levels.resistance.is_empty());
        assert!(levels.support[0] < dec!(100));
        assert!(levels.resistance[0] > dec!(100));
        assert!((levels.support[0] - dec!(90)).abs() < dec!(1));
        assert!((levels.resistance[0] - dec!(110)).abs() < dec!(1));
    }

    #[test]
    fn scattered_prices_make_no_levels() {
        // Every price distinct and far apart: no cluster reaches 3 members.
        let candles: Vec<Candle> = (0..8u32)
            .map(|i| {
                let base = Decimal::from(100 + i * 40);
                candle(i, base + dec!(1), base - dec!(1), base)
            })
            .collect();

        let levels = find_support_resistance(&candles, 8, dec!(0.005));
        assert!(levels.support.is_empty());
        assert!(levels.resistance.is_empty());
    }

    #[test]
    fn at_most_three_levels_per_side_closest_first() {
        let mut candles = Vec::new();
        let mut i = 0u32;
        // Five distinct bands below the final price, each touched 3 times.
        for base in [10, 30, 50, 70, 90] {
            for _ in 0..3 {
                let b = Decimal::from(base);
                candles.push(candle(i, b + dec!(0.01), b, b));
                i += 1;
            }
        }
        candles.push(candle(i, dec!(100), dec!(99.99), dec!(100)));

        let levels = find_support_resistance(&candles, 64, dec!(0.005));
        assert_eq!(levels.support.len(), 3);
        // Closest first: descending below current price.
        assert!(levels.support[0] > levels.support[1]);
        assert!(levels.support[1] > levels.support[2]);
    }
}
