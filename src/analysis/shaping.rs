use crate::data::types::{
    AnalysisResult, AnalyzeResponse, ArimaOrder, ForecastResponse, GroupSummary, StatsSummary,
};

/// Maps computed results into response bodies with a fixed rounding policy.
#[derive(Debug, Clone, Copy)]
pub struct ResponseShaper {
    decimal_places: u32,
}

impl ResponseShaper {
    pub fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    /// Rounds half away from zero. Values too large to scale are returned as is.
    pub fn round(&self, val: f64) -> f64 {
        let factor = 10f64.powi(self.decimal_places as i32);
        let scaled = val * factor;
        if !scaled.is_finite() {
            return val;
        }

        let rounded = scaled.round() / factor;
        if rounded == 0.0 {
            0.0
        } else {
            rounded
        }
    }

    pub fn stats(&self, stats: StatsSummary) -> StatsSummary {
        StatsSummary {
            count: stats.count,
            mean: self.round(stats.mean),
            median: self.round(stats.median),
            std_dev: self.round(stats.std_dev),
            min: self.round(stats.min),
            max: self.round(stats.max),
        }
    }

    pub fn analysis(&self, results: AnalysisResult) -> AnalyzeResponse {
        let results = results
            .into_iter()
            .map(|(category, group)| (category, self.group(group)))
            .collect();
        AnalyzeResponse { results }
    }

    pub fn forecast(&self, forecast: Vec<f64>, model_order: ArimaOrder) -> ForecastResponse {
        ForecastResponse {
            forecast: forecast.into_iter().map(|val| self.round(val)).collect(),
            model_order,
        }
    }

    fn group(&self, group: GroupSummary) -> GroupSummary {
        GroupSummary {
            count: group.count,
            sum: self.round(group.sum),
            mean: self.round(group.mean),
            min: self.round(group.min),
            max: self.round(group.max),
            median: self.round(group.median),
            std_dev: self.round(group.std_dev),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round() {
        let shaper = ResponseShaper::new(3);

        assert_eq!(shaper.round(1.58113883), 1.581);
        assert_eq!(shaper.round(2.0006), 2.001);
        assert_eq!(shaper.round(-2.4444), -2.444);
        assert_eq!(shaper.round(7.0), 7.0);
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let shaper = ResponseShaper::new(2);
        let rounded = shaper.round(-0.0001);

        assert_eq!(rounded, 0.0);
        assert!(rounded.is_sign_positive());
    }

    #[test]
    fn test_huge_values_pass_through() {
        let shaper = ResponseShaper::new(6);
        assert_eq!(shaper.round(1e307), 1e307);
    }

    #[test]
    fn test_zero_places_rounds_to_integers() {
        let shaper = ResponseShaper::new(0);
        assert_eq!(shaper.round(2.5), 3.0);
        assert_eq!(shaper.round(-2.5), -3.0);
    }

    #[test]
    fn test_forecast_keeps_order_and_length() {
        let shaper = ResponseShaper::new(2);
        let response = shaper.forecast(vec![1.234, 5.678, 9.0], ArimaOrder(2, 1, 3));

        assert_eq!(response.forecast, vec![1.23, 5.68, 9.0]);
        assert_eq!(response.model_order, ArimaOrder(2, 1, 3));
    }

    #[test]
    fn test_stats_counts_are_untouched() {
        let shaper = ResponseShaper::new(1);
        let stats = shaper.stats(StatsSummary {
            count: 5,
            mean: 3.0,
            median: 3.0,
            std_dev: 1.5811388,
            min: 1.0,
            max: 5.0,
        });

        assert_eq!(stats.count, 5);
        assert_eq!(stats.std_dev, 1.6);
    }
}
