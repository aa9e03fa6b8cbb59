//! Ichimoku Kinko Hyo.
//!
//! Tenkan = midrange(tenkan_period), Kijun = midrange(kijun_period),
//! raw Senkou A = (Tenkan + Kijun) / 2, raw Senkou B = midrange(senkou_period).
//! Both Senkou lines are projected `kijun_period` candles forward, so the
//! cloud reported for the current candle is the raw pair computed
//! `kijun_period` candles earlier. Chikou is the current close (plotted
//! `kijun_period` candles back).

use super::{
    Highest, IchimokuValue, Indicator, IndicatorInput, InputShape, Lowest, RollingWindow,
};

#[derive(Debug, Clone)]
struct Midrange {
    highest: Highest,
    lowest: Lowest,
}

impl Midrange {
    fn new(period: usize) -> Self {
        Self {
            highest: Highest::new(period),
            lowest: Lowest::new(period),
        }
    }

    fn push(&mut self, high: f64, low: f64) -> Option<f64> {
        let h = self.highest.push(high);
        let l = self.lowest.push(low);
        Some((h? + l?) / 2.0)
    }

    fn reset(&mut self) {
        self.highest.reset();
        self.lowest.reset();
    }
}

#[derive(Debug, Clone)]
pub struct Ichimoku {
    tenkan_period: usize,
    kijun_period: usize,
    senkou_period: usize,
    name: String,
    tenkan: Midrange,
    kijun: Midrange,
    senkou_b: Midrange,
    /// Raw (senkou_a, senkou_b) pairs; the oldest is `kijun_period` candles old.
    projected: RollingWindow<(f64, f64)>,
}

impl Ichimoku {
    pub fn new(tenkan_period: usize, kijun_period: usize, senkou_period: usize) -> Self {
        assert!(tenkan_period >= 1, "Ichimoku tenkan period must be >= 1");
        assert!(kijun_period >= 1, "Ichimoku kijun period must be >= 1");
        assert!(senkou_period >= 1, "Ichimoku senkou period must be >= 1");
        Self {
            tenkan_period,
            kijun_period,
            senkou_period,
            name: format!("ichimoku_{tenkan_period}_{kijun_period}_{senkou_period}"),
            tenkan: Midrange::new(tenkan_period),
            kijun: Midrange::new(kijun_period),
            senkou_b: Midrange::new(senkou_period),
            projected: RollingWindow::new(kijun_period + 1),
        }
    }

    /// Classic 9 / 26 / 52.
    pub fn default_params() -> Self {
        Self::new(9, 26, 52)
    }
}

impl Indicator for Ichimoku {
    type Output = IchimokuValue;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_shape(&self) -> InputShape {
        InputShape::Candle
    }

    fn length(&self) -> usize {
        self.kijun_period
    }

    fn warmup_period(&self) -> usize {
        self.tenkan_period.max(self.kijun_period).max(self.senkou_period) + self.kijun_period
    }

    fn next(&mut self, input: &IndicatorInput) -> Option<IchimokuValue> {
        let (high, low) = (input.high(), input.low());
        let tenkan = self.tenkan.push(high, low);
        let kijun = self.kijun.push(high, low);
        let senkou_b = self.senkou_b.push(high, low);
        let (tenkan, kijun, senkou_b) = (tenkan?, kijun?, senkou_b?);

        self.projected.push(((tenkan + kijun) / 2.0, senkou_b));
        if !self.projected.is_full() {
            return None;
        }
        let (senkou_a, senkou_b) = self.projected.first()?;
        Some(IchimokuValue {
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou: input.price(),
        })
    }

    fn reset(&mut self) {
        self.tenkan.reset();
        self.kijun.reset();
        self.senkou_b.reset();
        self.projected.clear();
    }
}
