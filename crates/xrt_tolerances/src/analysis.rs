//! Effective area and resolving power from a traced event batch.

use xrt_core::{EventBatch, Quantity, Unit};

use crate::error::ToleranceError;
use crate::record::MeasurementRecord;

/// FWHM of a Gaussian in units of its standard deviation.
const FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949;

/// Turns a traced batch into one measurement record.
pub trait Analyzer {
    fn analyze(&self, batch: &EventBatch) -> Result<MeasurementRecord, ToleranceError>;
}

/// Effective area per order and resolving power from the spread of the
/// dispersion coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResAeff {
    pub a_geom: Quantity,
    pub dispersion_coord: String,
    pub orders: Vec<i32>,
}

/// Per-order results before they are packed into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderStats {
    pub aeff: Vec<f64>,
    pub res: Vec<f64>,
}

impl CaptureResAeff {
    pub fn new(
        a_geom: Quantity,
        dispersion_coord: impl Into<String>,
        orders: impl IntoIterator<Item = i32>,
    ) -> Result<Self, ToleranceError> {
        let a_geom = a_geom.to(Unit::SquareCentimeter)?;
        Ok(Self {
            a_geom,
            dispersion_coord: dispersion_coord.into(),
            orders: orders.into_iter().collect(),
        })
    }

    /// Effective area (cm²) and resolving power for every configured order.
    pub fn order_stats(&self, batch: &EventBatch) -> Result<OrderStats, ToleranceError> {
        if batch.is_empty() {
            return Err(xrt_core::SimError::EmptyBatch.into());
        }
        let coord = batch.column(&self.dispersion_coord).ok_or_else(|| {
            ToleranceError::InvalidInput(format!(
                "batch has no `{}` column to measure resolution on",
                self.dispersion_coord
            ))
        })?;
        let n_rows = batch.len() as f64;

        let mut aeff = Vec::with_capacity(self.orders.len());
        let mut res = Vec::with_capacity(self.orders.len());
        for &order in &self.orders {
            let mut weight = 0.0;
            let mut moments = WeightedMoments::default();
            for row in 0..batch.len() {
                if batch.order[row] != order {
                    continue;
                }
                let p = batch.probability[row];
                weight += p;
                if p > 0.0 && coord[row].is_finite() {
                    moments.add(coord[row], p);
                }
            }
            aeff.push(self.a_geom.value * weight / n_rows);
            res.push(moments.resolving_power());
        }
        Ok(OrderStats { aeff, res })
    }
}

impl Analyzer for CaptureResAeff {
    fn analyze(&self, batch: &EventBatch) -> Result<MeasurementRecord, ToleranceError> {
        let OrderStats { aeff, res } = self.order_stats(batch)?;

        let mut aeff0 = 0.0;
        let mut aeffgrat = 0.0;
        let mut weighted_res = 0.0;
        let mut res_weight = 0.0;
        for ((&order, &a), &r) in self.orders.iter().zip(&aeff).zip(&res) {
            if order == 0 {
                aeff0 += a;
                continue;
            }
            aeffgrat += a;
            if r.is_finite() && a > 0.0 {
                weighted_res += a * r;
                res_weight += a;
            }
        }
        let resolution = if res_weight > 0.0 {
            weighted_res / res_weight
        } else {
            f64::NAN
        };

        Ok(MeasurementRecord::new()
            .with("aeff0", Quantity::cm2(aeff0))
            .with("aeffgrat", Quantity::cm2(aeffgrat))
            .with("effective_area", Quantity::cm2(aeffgrat))
            .with("resolution", resolution)
            .with("aeff", aeff)
            .with("res", res)
            .with(
                "orders",
                self.orders.iter().map(|&m| m as f64).collect::<Vec<_>>(),
            ))
    }
}

#[derive(Debug, Default)]
struct WeightedMoments {
    count: usize,
    sum_w: f64,
    sum_wx: f64,
    sum_wxx: f64,
}

impl WeightedMoments {
    fn add(&mut self, x: f64, w: f64) {
        self.count += 1;
        self.sum_w += w;
        self.sum_wx += w * x;
        self.sum_wxx += w * x * x;
    }

    /// `|mean| / FWHM`, NaN for fewer than two rows or no spread.
    fn resolving_power(&self) -> f64 {
        if self.count < 2 || self.sum_w <= 0.0 {
            return f64::NAN;
        }
        let mean = self.sum_wx / self.sum_w;
        let var = (self.sum_wxx / self.sum_w - mean * mean).max(0.0);
        let std = var.sqrt();
        if std == 0.0 {
            return f64::NAN;
        }
        mean.abs() / (FWHM_PER_SIGMA * std)
    }
}
