//! Per-portion economics from a recipe's total cost

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Economics {
    pub cost_per_portion: Option<f64>,
    pub margin_per_portion: Option<f64>,
    pub goods_share_percent: Option<f64>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Cost per portion, margin and goods-cost share. Values are not rounded.
pub fn project_economics(
    total_cost: f64,
    target_portions: Option<f64>,
    target_sales_price: Option<f64>,
) -> Economics {
    let cost_per_portion = positive(target_portions).map(|portions| total_cost / portions);

    match (cost_per_portion, positive(target_sales_price)) {
        (Some(cost), Some(price)) => Economics {
            cost_per_portion,
            margin_per_portion: Some(price - cost),
            goods_share_percent: Some(cost / price * 100.0),
        },
        _ => Economics {
            cost_per_portion,
            ..Economics::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_portion_division() {
        let economics = project_economics(12.0, Some(4.0), None);
        assert_eq!(economics.cost_per_portion, Some(3.0));
        assert_eq!(economics.margin_per_portion, None);
        assert_eq!(economics.goods_share_percent, None);

        let economics = project_economics(12.0, Some(4.0), Some(5.0));
        assert_eq!(economics.cost_per_portion, Some(3.0));
        assert_eq!(economics.margin_per_portion, Some(2.0));
        assert_eq!(economics.goods_share_percent, Some(60.0));
    }

    #[test]
    fn test_invalid_targets() {
        assert_eq!(project_economics(12.0, None, Some(5.0)), Economics::default());
        assert_eq!(project_economics(12.0, Some(0.0), Some(5.0)), Economics::default());
        assert_eq!(project_economics(12.0, Some(f64::NAN), None), Economics::default());

        let economics = project_economics(12.0, Some(4.0), Some(-1.0));
        assert_eq!(economics.cost_per_portion, Some(3.0));
        assert_eq!(economics.margin_per_portion, None);
        assert_eq!(economics.goods_share_percent, None);
    }

    #[test]
    fn test_negative_margin_is_kept() {
        let economics = project_economics(30.0, Some(3.0), Some(8.0));
        assert_eq!(economics.margin_per_portion, Some(-2.0));
        assert_eq!(economics.goods_share_percent, Some(125.0));
    }
}
