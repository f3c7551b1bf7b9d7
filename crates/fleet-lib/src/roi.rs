//! Return on investment of a cost optimization

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    pub monthly_savings: f64,
    pub annual_savings: f64,
    pub implementation_cost: f64,
    /// Months until the implementation cost is recovered; infinite when
    /// nothing is saved (serialized as `null`)
    pub payback_months: f64,
    pub roi_percent: f64,
    pub savings_percent: f64,
}

/// Compare monthly costs before and after an optimization
///
/// A zero implementation cost is reported as instant payback with a flat
/// 100% ROI regardless of how much is saved. Existing dashboards depend on
/// that convention even though it says nothing about the savings size.
pub fn calculate_roi(
    baseline_monthly: f64,
    optimized_monthly: f64,
    implementation_cost: f64,
) -> RoiAnalysis {
    let monthly_savings = baseline_monthly - optimized_monthly;
    let annual_savings = monthly_savings * 12.0;

    let (payback_months, roi_percent) = if implementation_cost > 0.0 {
        let payback = if monthly_savings > 0.0 {
            implementation_cost / monthly_savings
        } else {
            f64::INFINITY
        };
        let roi = (annual_savings - implementation_cost) / implementation_cost * 100.0;
        (payback, roi)
    } else {
        (0.0, 100.0)
    };

    let savings_percent = if baseline_monthly != 0.0 {
        monthly_savings / baseline_monthly * 100.0
    } else {
        0.0
    };

    RoiAnalysis {
        monthly_savings,
        annual_savings,
        implementation_cost,
        payback_months,
        roi_percent,
        savings_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_implementation_cost() {
        let roi = calculate_roi(100.0, 40.0, 0.0);
        assert_eq!(roi.monthly_savings, 60.0);
        assert_eq!(roi.annual_savings, 720.0);
        assert_eq!(roi.roi_percent, 100.0);
        assert_eq!(roi.payback_months, 0.0);
        assert_eq!(roi.savings_percent, 60.0);
    }

    #[test]
    fn test_with_implementation_cost() {
        let roi = calculate_roi(100.0, 40.0, 360.0);
        assert_eq!(roi.payback_months, 6.0);
        assert_eq!(roi.roi_percent, 100.0);

        let roi = calculate_roi(1000.0, 900.0, 600.0);
        assert_eq!(roi.payback_months, 6.0);
        assert_eq!(roi.roi_percent, 100.0);

        let roi = calculate_roi(1000.0, 950.0, 1200.0);
        assert_eq!(roi.payback_months, 24.0);
        assert_eq!(roi.roi_percent, -50.0);
    }

    #[test]
    fn test_no_savings_never_pays_back() {
        let roi = calculate_roi(100.0, 100.0, 50.0);
        assert!(roi.payback_months.is_infinite());
        assert_eq!(roi.roi_percent, -100.0);

        let roi = calculate_roi(100.0, 150.0, 50.0);
        assert!(roi.payback_months.is_infinite());
        assert_eq!(roi.savings_percent, -50.0);
    }

    #[test]
    fn test_zero_baseline() {
        let roi = calculate_roi(0.0, 0.0, 0.0);
        assert_eq!(roi.savings_percent, 0.0);
        assert_eq!(roi.monthly_savings, 0.0);
    }

    #[test]
    fn test_infinite_payback_serializes_as_null() {
        let roi = calculate_roi(10.0, 20.0, 5.0);
        let json = serde_json::to_value(roi).unwrap();
        assert!(json["payback_months"].is_null());
    }
}
