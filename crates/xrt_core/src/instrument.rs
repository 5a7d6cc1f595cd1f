//! Instrument configuration snapshots.
//!
//! An [`InstrumentConfig`] is a plain value: perturbing it produces a new
//! snapshot and the baseline is never touched. Element arrays keep the
//! nominal layout separate from the assembly pose and the per-element
//! poses, so "move the whole assembly" and "move every element" are both
//! small diffs against the nominal geometry.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::geometry::{Pose, Vec3};
use crate::perturb::ParamValue;
use crate::random::{gaussian, stream_rng};
use crate::units::Quantity;

/// Diffraction orders the grating model can produce.
pub const MIN_ORDER: i32 = -12;
pub const MAX_ORDER: i32 = 4;

/// Width (in orders) of the blaze envelope around the blaze peak.
const BLAZE_ENVELOPE_WIDTH: f64 = 0.8;

/// Names a configurable element of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementRef {
    Pointing,
    Aperture,
    Mirror,
    Gratings,
    Detector,
    Microcal,
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementRef::Pointing => "pointing",
            ElementRef::Aperture => "aperture",
            ElementRef::Mirror => "mirror",
            ElementRef::Gratings => "gratings",
            ElementRef::Detector => "detector",
            ElementRef::Microcal => "microcal",
        };
        f.write_str(name)
    }
}

/// Telescope pointing. Jitter is the per-axis Gaussian sigma in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Pointing {
    Fixed,
    Jitter { jitter: f64 },
}

/// Annular entrance aperture at the mirror plane (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aperture {
    pub r_inner: f64,
    pub r_outer: f64,
}

impl Aperture {
    /// Geometric collecting area in cm^2.
    pub fn area(&self) -> Quantity {
        let mm2 = std::f64::consts::PI * (self.r_outer.powi(2) - self.r_inner.powi(2));
        Quantity::cm2(mm2 / 100.0)
    }
}

/// Focusing mirror. Scatter sigmas are in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mirror {
    pub focal_length: f64,
    pub inplanescatter: f64,
    pub perpplanescatter: f64,
    pub reflectivity: f64,
}

/// Distribution of blaze-angle deviations across a grating facet (radians).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderSelector {
    Gaussian { sigma: f64 },
    TopHat { tophatwidth: f64 },
}

impl OrderSelector {
    pub fn gaussian(sigma: Quantity) -> Result<Self, SimError> {
        Ok(OrderSelector::Gaussian {
            sigma: non_negative("sigma", sigma.radians()?)?,
        })
    }

    pub fn top_hat(width: Quantity) -> Result<Self, SimError> {
        Ok(OrderSelector::TopHat {
            tophatwidth: non_negative("tophatwidth", width.radians()?)?,
        })
    }

    /// The scalar attribute that identifies this selector in result tables.
    pub fn named_scalar(&self) -> (&'static str, Quantity) {
        match self {
            OrderSelector::Gaussian { sigma } => ("sigma", Quantity::rad(*sigma)),
            OrderSelector::TopHat { tophatwidth } => ("tophatwidth", Quantity::rad(*tophatwidth)),
        }
    }

    pub fn sample_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            OrderSelector::Gaussian { sigma } => gaussian(rng, *sigma),
            OrderSelector::TopHat { tophatwidth } => (rng.gen::<f64>() - 0.5) * tophatwidth,
        }
    }

    /// Draw a diffraction order for wavelength `wave_mm` on a facet with the
    /// given period and nominal blaze angle.
    pub fn select_order<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        wave_mm: f64,
        period: f64,
        blaze: f64,
    ) -> i32 {
        let beta = blaze + self.sample_offset(rng);
        let peak = -2.0 * period * beta.sin() / wave_mm;
        let weights: Vec<f64> = (MIN_ORDER..=MAX_ORDER)
            .map(|m| (-(m as f64 - peak).powi(2) / (2.0 * BLAZE_ENVELOPE_WIDTH.powi(2))).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        let u = rng.gen::<f64>();
        if total <= 0.0 || !total.is_finite() {
            // blaze peak far outside the modelled orders
            return 0;
        }
        let mut acc = 0.0;
        for (m, w) in (MIN_ORDER..=MAX_ORDER).zip(weights.iter()) {
            acc += w / total;
            if u < acc {
                return m;
            }
        }
        MAX_ORDER
    }
}

/// Something with a nominal position that can be misaligned.
pub trait Element {
    fn nominal_center(&self) -> Vec3;
    fn pose(&self) -> &Pose;
    fn pose_mut(&mut self) -> &mut Pose;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GratingFacet {
    pub center: Vec3,
    pub pose: Pose,
    /// Grating period in mm.
    pub period: f64,
}

impl Element for GratingFacet {
    fn nominal_center(&self) -> Vec3 {
        self.center
    }
    fn pose(&self) -> &Pose {
        &self.pose
    }
    fn pose_mut(&mut self) -> &mut Pose {
        &mut self.pose
    }
}

/// One CCD of the spectroscopy detector strip (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ccd {
    pub center: Vec3,
    pub pose: Pose,
    pub width: f64,
    pub height: f64,
}

impl Element for Ccd {
    fn nominal_center(&self) -> Vec3 {
        self.center
    }
    fn pose(&self) -> &Pose {
        &self.pose
    }
    fn pose_mut(&mut self) -> &mut Pose {
        &mut self.pose
    }
}

/// Actual position and orientation of an element after all moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub center: Vec3,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

/// A set of elements mounted on a common structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementArray<T> {
    pub elements: Vec<T>,
    /// Point about which the whole assembly rotates.
    pub rotation_center: Vec3,
    /// Displacement of the whole assembly.
    pub pose: Pose,
}

impl<T: Element> ElementArray<T> {
    pub fn new(elements: Vec<T>) -> Self {
        let rotation_center = mean_center(&elements);
        Self {
            elements,
            rotation_center,
            pose: Pose::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Move the rotation center used for assembly rotations.
    pub fn move_center(&mut self, center: Vec3) {
        self.rotation_center = center;
    }

    pub fn placement(&self, index: usize) -> Placement {
        let element = &self.elements[index];
        let own = element.pose();
        let nominal = element.nominal_center();
        let local = [
            nominal[0] + own.dx,
            nominal[1] + own.dy,
            nominal[2] + own.dz,
        ];
        Placement {
            center: self.pose.move_point(local, self.rotation_center),
            rx: self.pose.rx + own.rx,
            ry: self.pose.ry + own.ry,
            rz: self.pose.rz + own.rz,
        }
    }

    /// Displace the assembly as a whole.
    pub fn move_global(&mut self, delta: &Pose) {
        self.pose = self.pose.compose(delta);
    }

    /// Displace every element by the same amount about its own center.
    pub fn move_individual(&mut self, delta: &Pose) {
        for element in &mut self.elements {
            let moved = element.pose().compose(delta);
            *element.pose_mut() = moved;
        }
    }

    /// Displace every element by an independent Gaussian draw; `sigma`
    /// holds the per-DOF standard deviations.
    pub fn wiggle(&mut self, sigma: &Pose, seed: u64) {
        for (index, element) in self.elements.iter_mut().enumerate() {
            let mut rng = stream_rng(seed, index as u64);
            let delta = Pose {
                dx: gaussian(&mut rng, sigma.dx),
                dy: gaussian(&mut rng, sigma.dy),
                dz: gaussian(&mut rng, sigma.dz),
                rx: gaussian(&mut rng, sigma.rx),
                ry: gaussian(&mut rng, sigma.ry),
                rz: gaussian(&mut rng, sigma.rz),
            };
            let moved = element.pose().compose(&delta);
            *element.pose_mut() = moved;
        }
    }
}

fn mean_center<T: Element>(elements: &[T]) -> Vec3 {
    if elements.is_empty() {
        return [0.0; 3];
    }
    let n = elements.len() as f64;
    let mut sum = [0.0; 3];
    for element in elements {
        let c = element.nominal_center();
        sum[0] += c[0];
        sum[1] += c[1];
        sum[2] += c[2];
    }
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GratingArray {
    pub facets: ElementArray<GratingFacet>,
    /// Half of the facet side length (mm).
    pub facet_half_size: f64,
    /// Nominal blaze angle (rad).
    pub blaze: f64,
    pub order_selector: OrderSelector,
    /// Fraction of photons a facet diffracts into any order.
    pub efficiency: f64,
}

/// Zeroth-order microcalorimeter at the focus (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Microcal {
    pub half_width: f64,
}

/// Per-DOF sigmas used to draw a misaligned instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentBudget {
    pub grating_assembly: Pose,
    pub facets: Pose,
    pub ccds: Pose,
}

impl Default for AlignmentBudget {
    fn default() -> Self {
        let arcmin = 1f64.to_radians() / 60.0;
        Self {
            grating_assembly: Pose {
                dx: 0.5,
                dy: 0.5,
                dz: 0.5,
                rx: 2.0 * arcmin,
                ry: 2.0 * arcmin,
                rz: 2.0 * arcmin,
            },
            facets: Pose {
                dx: 0.25,
                dy: 0.25,
                dz: 0.25,
                rx: 1.0 * arcmin,
                ry: 1.0 * arcmin,
                rz: 0.5 * arcmin,
            },
            ccds: Pose {
                dx: 0.1,
                dy: 0.1,
                dz: 0.1,
                rx: 2.0 * arcmin,
                ry: 2.0 * arcmin,
                rz: 2.0 * arcmin,
            },
        }
    }
}

/// Full instrument snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub pointing: Pointing,
    pub aperture: Aperture,
    pub mirror: Mirror,
    pub gratings: GratingArray,
    pub detector: ElementArray<Ccd>,
    pub microcal: Microcal,
    pub alignment_budget: AlignmentBudget,
}

/// Nominal layout constants of the default spectrometer (mm).
const FOCAL_LENGTH: f64 = 10_000.0;
const GRATING_Z: f64 = 4_000.0;
const GRATING_TILT: f64 = 0.2;
const GRATING_PERIOD: f64 = 2.0e-4;
const FACET_HALF_SIZE: f64 = 12.5;
const FACET_PITCH: f64 = 27.0;
const CCD_COUNT: usize = 20;
const CCD_PITCH: f64 = 25.0;

impl InstrumentConfig {
    /// Default spectrometer: one grating period for every facet.
    pub fn lynx() -> Self {
        Self::build(false)
    }

    /// Alternate configuration: the grating period scales with each facet's
    /// distance to the focal plane so all facets disperse onto the same spot.
    pub fn lynx_chirp() -> Self {
        Self::build(true)
    }

    fn build(chirp: bool) -> Self {
        let aperture = Aperture {
            r_inner: 300.0,
            r_outer: 900.0,
        };
        let scale = GRATING_Z / FOCAL_LENGTH;
        let (r_min, r_max) = (aperture.r_inner * scale, aperture.r_outer * scale);

        let mut facets = Vec::new();
        let mut y = r_min + FACET_HALF_SIZE;
        while y <= r_max - FACET_HALF_SIZE {
            let mut x = -5.0 * FACET_PITCH;
            while x <= 5.0 * FACET_PITCH + 1e-9 {
                let r = (x * x + y * y).sqrt();
                if r - FACET_HALF_SIZE >= r_min && r + FACET_HALF_SIZE <= r_max {
                    let z = GRATING_Z + GRATING_TILT * x;
                    let period = if chirp {
                        GRATING_PERIOD * z / GRATING_Z
                    } else {
                        GRATING_PERIOD
                    };
                    facets.push(GratingFacet {
                        center: [x, y, z],
                        pose: Pose::default(),
                        period,
                    });
                }
                x += FACET_PITCH;
            }
            y += FACET_PITCH;
        }

        let ccds = (0..CCD_COUNT)
            .map(|i| Ccd {
                center: [-(i as f64 + 1.0) * CCD_PITCH, 0.0, 0.0],
                pose: Pose::default(),
                width: CCD_PITCH - 0.4,
                height: 20.0,
            })
            .collect();

        Self {
            pointing: Pointing::Fixed,
            aperture,
            mirror: Mirror {
                focal_length: FOCAL_LENGTH,
                inplanescatter: 7.0e-6,
                perpplanescatter: 1.5e-6,
                reflectivity: 0.8,
            },
            gratings: GratingArray {
                facets: ElementArray::new(facets),
                facet_half_size: FACET_HALF_SIZE,
                blaze: 1.5f64.to_radians(),
                order_selector: OrderSelector::Gaussian {
                    sigma: 0.1f64.to_radians(),
                },
                efficiency: 0.6,
            },
            detector: ElementArray::new(ccds),
            microcal: Microcal { half_width: 5.0 },
            alignment_budget: AlignmentBudget::default(),
        }
    }

    /// Geometric collecting area used to normalise effective areas.
    pub fn geometric_area(&self) -> Quantity {
        self.aperture.area()
    }

    pub fn with_pointing(mut self, pointing: Pointing) -> Self {
        self.pointing = pointing;
        self
    }

    /// Draw a misaligned instrument from the alignment budget.
    pub fn with_alignment_errors(&self, seed: u64) -> Self {
        let budget = self.alignment_budget;
        let mut out = self.clone();
        let mut rng = stream_rng(seed, u64::MAX);
        let assembly = Pose {
            dx: gaussian(&mut rng, budget.grating_assembly.dx),
            dy: gaussian(&mut rng, budget.grating_assembly.dy),
            dz: gaussian(&mut rng, budget.grating_assembly.dz),
            rx: gaussian(&mut rng, budget.grating_assembly.rx),
            ry: gaussian(&mut rng, budget.grating_assembly.ry),
            rz: gaussian(&mut rng, budget.grating_assembly.rz),
        };
        out.gratings.facets.move_global(&assembly);
        out.gratings.facets.wiggle(&budget.facets, seed);
        out.detector.wiggle(&budget.ccds, seed.wrapping_add(1));
        out
    }

    /// Read an attribute of an element.
    pub fn attribute(&self, element: ElementRef, name: &str) -> Result<ParamValue, SimError> {
        let unknown = || SimError::UnknownAttribute {
            element,
            name: name.to_string(),
        };
        let value = match (element, name) {
            (ElementRef::Pointing, "jitter") => match self.pointing {
                Pointing::Fixed => ParamValue::Quantity(Quantity::rad(0.0)),
                Pointing::Jitter { jitter } => ParamValue::Quantity(Quantity::rad(jitter)),
            },
            (ElementRef::Aperture, "r_inner") => {
                ParamValue::Quantity(Quantity::mm(self.aperture.r_inner))
            }
            (ElementRef::Aperture, "r_outer") => {
                ParamValue::Quantity(Quantity::mm(self.aperture.r_outer))
            }
            (ElementRef::Mirror, "focal_length") => {
                ParamValue::Quantity(Quantity::mm(self.mirror.focal_length))
            }
            (ElementRef::Mirror, "inplanescatter") => {
                ParamValue::Quantity(Quantity::rad(self.mirror.inplanescatter))
            }
            (ElementRef::Mirror, "perpplanescatter") => {
                ParamValue::Quantity(Quantity::rad(self.mirror.perpplanescatter))
            }
            (ElementRef::Mirror, "reflectivity") => ParamValue::Scalar(self.mirror.reflectivity),
            (ElementRef::Gratings, "order_selector") => {
                ParamValue::Selector(self.gratings.order_selector)
            }
            (ElementRef::Gratings, "blaze") => {
                ParamValue::Quantity(Quantity::rad(self.gratings.blaze))
            }
            (ElementRef::Gratings, "efficiency") => ParamValue::Scalar(self.gratings.efficiency),
            (ElementRef::Microcal, "half_width") => {
                ParamValue::Quantity(Quantity::mm(self.microcal.half_width))
            }
            _ => return Err(unknown()),
        };
        Ok(value)
    }

    /// Return a copy with one attribute replaced.
    pub fn with_attribute(
        &self,
        element: ElementRef,
        name: &str,
        value: &ParamValue,
    ) -> Result<InstrumentConfig, SimError> {
        // reading first rejects unknown names with the right error
        self.attribute(element, name)?;
        let mut out = self.clone();
        match (element, name) {
            (ElementRef::Pointing, "jitter") => {
                let jitter = non_negative(name, value.as_quantity(name)?.radians()?)?;
                out.pointing = Pointing::Jitter { jitter };
            }
            (ElementRef::Aperture, "r_inner") => {
                out.aperture.r_inner = non_negative(name, value.as_quantity(name)?.millimeters()?)?;
            }
            (ElementRef::Aperture, "r_outer") => {
                out.aperture.r_outer = non_negative(name, value.as_quantity(name)?.millimeters()?)?;
            }
            (ElementRef::Mirror, "focal_length") => {
                let f = value.as_quantity(name)?.millimeters()?;
                if f <= 0.0 {
                    return Err(SimError::invalid_value(name, "focal length must be positive"));
                }
                out.mirror.focal_length = f;
            }
            (ElementRef::Mirror, "inplanescatter") => {
                out.mirror.inplanescatter =
                    non_negative(name, value.as_quantity(name)?.radians()?)?;
            }
            (ElementRef::Mirror, "perpplanescatter") => {
                out.mirror.perpplanescatter =
                    non_negative(name, value.as_quantity(name)?.radians()?)?;
            }
            (ElementRef::Mirror, "reflectivity") => {
                out.mirror.reflectivity = fraction(name, value.as_scalar(name)?)?;
            }
            (ElementRef::Gratings, "order_selector") => match value {
                ParamValue::Selector(selector) => out.gratings.order_selector = *selector,
                _ => return Err(SimError::invalid_value(name, "expected an order selector")),
            },
            (ElementRef::Gratings, "blaze") => {
                out.gratings.blaze = value.as_quantity(name)?.radians()?;
            }
            (ElementRef::Gratings, "efficiency") => {
                out.gratings.efficiency = fraction(name, value.as_scalar(name)?)?;
            }
            (ElementRef::Microcal, "half_width") => {
                out.microcal.half_width =
                    non_negative(name, value.as_quantity(name)?.millimeters()?)?;
            }
            _ => {
                return Err(SimError::UnknownAttribute {
                    element,
                    name: name.to_string(),
                })
            }
        }
        Ok(out)
    }

    /// The assembly pose of a movable element array.
    pub fn assembly_pose(&self, element: ElementRef) -> Result<Pose, SimError> {
        match element {
            ElementRef::Gratings => Ok(self.gratings.facets.pose),
            ElementRef::Detector => Ok(self.detector.pose),
            other => Err(SimError::NotMovable(other)),
        }
    }

    /// Apply `f` to the facet or CCD array named by `element`.
    pub fn with_array<F>(&self, element: ElementRef, f: F) -> Result<InstrumentConfig, SimError>
    where
        F: FnOnce(&mut dyn ArrayMoves),
    {
        let mut out = self.clone();
        match element {
            ElementRef::Gratings => f(&mut out.gratings.facets),
            ElementRef::Detector => f(&mut out.detector),
            other => return Err(SimError::NotMovable(other)),
        }
        Ok(out)
    }
}

/// Object-safe view of the moves an element array supports.
pub trait ArrayMoves {
    fn move_global(&mut self, delta: &Pose);
    fn move_individual(&mut self, delta: &Pose);
    fn wiggle(&mut self, sigma: &Pose, seed: u64);
    fn move_center(&mut self, center: Vec3);
}

impl<T: Element> ArrayMoves for ElementArray<T> {
    fn move_global(&mut self, delta: &Pose) {
        ElementArray::move_global(self, delta)
    }
    fn move_individual(&mut self, delta: &Pose) {
        ElementArray::move_individual(self, delta)
    }
    fn wiggle(&mut self, sigma: &Pose, seed: u64) {
        ElementArray::wiggle(self, sigma, seed)
    }
    fn move_center(&mut self, center: Vec3) {
        ElementArray::move_center(self, center)
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64, SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SimError::invalid_value(name, format!("{value} is not a non-negative number")))
    }
}

fn fraction(name: &str, value: f64) -> Result<f64, SimError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SimError::invalid_value(name, format!("{value} is outside [0, 1]")))
    }
}
