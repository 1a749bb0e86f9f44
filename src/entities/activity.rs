//! Activity entity - one unit of paving work and its cost primitives
//!
//! An activity carries the user-entered quantity, production rate, crew and
//! optional equipment, materials, mobilization and trucking inputs. Every
//! cost and duration figure is derived from these on demand; nothing derived
//! is stored on the activity itself.

use serde::{Deserialize, Serialize};

/// Kind of paving work
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Excavation,
    FineGrading,
    AggregateBase,
    Milling,
    AsphaltBase,
    AsphaltSurface,
    TackCoat,
    Striping,
}

/// Denominator used when comparing an activity's unit cost to benchmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkBasis {
    /// Cost per cubic yard
    Volume,
    /// Cost per square yard
    Area,
}

impl ActivityType {
    pub const ALL: [ActivityType; 8] = [
        ActivityType::Excavation,
        ActivityType::FineGrading,
        ActivityType::AggregateBase,
        ActivityType::Milling,
        ActivityType::AsphaltBase,
        ActivityType::AsphaltSurface,
        ActivityType::TackCoat,
        ActivityType::Striping,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Excavation => "Excavation",
            ActivityType::FineGrading => "Fine Grading",
            ActivityType::AggregateBase => "Aggregate Base",
            ActivityType::Milling => "Milling",
            ActivityType::AsphaltBase => "Asphalt Base Course",
            ActivityType::AsphaltSurface => "Asphalt Surface Course",
            ActivityType::TackCoat => "Tack Coat",
            ActivityType::Striping => "Striping",
        }
    }

    /// Benchmarks for excavation and aggregate base are volume-based,
    /// everything else is area-based.
    pub fn benchmark_basis(&self) -> BenchmarkBasis {
        match self {
            ActivityType::Excavation | ActivityType::AggregateBase => BenchmarkBasis::Volume,
            _ => BenchmarkBasis::Area,
        }
    }

    /// Hot-mix paving work that runs off an asphalt plant
    pub fn is_asphalt(&self) -> bool {
        matches!(self, ActivityType::AsphaltBase | ActivityType::AsphaltSurface)
    }

    /// Work performed by the paving crew family
    pub fn is_paving_family(&self) -> bool {
        matches!(
            self,
            ActivityType::AsphaltBase | ActivityType::AsphaltSurface | ActivityType::TackCoat
        )
    }

    /// Work that moves material on or off site by truck
    pub fn requires_hauling(&self) -> bool {
        matches!(
            self,
            ActivityType::Excavation
                | ActivityType::AggregateBase
                | ActivityType::Milling
                | ActivityType::AsphaltBase
                | ActivityType::AsphaltSurface
        )
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityType::Excavation => "excavation",
            ActivityType::FineGrading => "fine_grading",
            ActivityType::AggregateBase => "aggregate_base",
            ActivityType::Milling => "milling",
            ActivityType::AsphaltBase => "asphalt_base",
            ActivityType::AsphaltSurface => "asphalt_surface",
            ActivityType::TackCoat => "tack_coat",
            ActivityType::Striping => "striping",
        };
        write!(f, "{}", s)
    }
}

/// Unit of measure for a quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Square yards
    #[default]
    Sy,
    /// Square feet
    Sf,
    /// Cubic yards
    Cy,
    /// Tons
    Ton,
    /// Linear feet
    Lf,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unit::Sy => write!(f, "SY"),
            Unit::Sf => write!(f, "SF"),
            Unit::Cy => write!(f, "CY"),
            Unit::Ton => write!(f, "TON"),
            Unit::Lf => write!(f, "LF"),
        }
    }
}

/// A measured quantity with waste allowance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    /// Net (take-off) quantity
    pub net: f64,

    /// Unit of measure
    #[serde(default)]
    pub unit: Unit,

    /// Waste/overrun allowance as a percentage of net
    #[serde(default)]
    pub waste_percent: f64,
}

impl Quantity {
    pub fn new(net: f64, unit: Unit) -> Self {
        Self {
            net,
            unit,
            waste_percent: 0.0,
        }
    }

    /// Net quantity grossed up by the waste allowance
    pub fn gross(&self) -> f64 {
        if self.net <= 0.0 {
            return 0.0;
        }
        self.net * (1.0 + self.waste_percent.max(0.0) / 100.0)
    }
}

/// Output per standard shift, in the activity's quantity unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProductionRate(pub f64);

impl ProductionRate {
    pub fn per_shift(&self) -> f64 {
        self.0
    }

    pub fn is_usable(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

/// A named site condition that scales production (e.g. "hand work", 0.85)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionFactor {
    pub name: String,
    pub multiplier: f64,
}

/// Composite productivity multiplier built from condition factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Productivity(pub Vec<ConditionFactor>);

impl Productivity {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Product of all factor multipliers, 1.0 when there are none
    pub fn composite(&self) -> f64 {
        self.0.iter().map(|f| f.multiplier).product()
    }
}

/// Crew assigned to an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crew {
    /// Crew name (matches the reference roster when auto-selected)
    #[serde(default)]
    pub name: String,

    /// Number of workers
    pub headcount: u32,

    /// Blended hourly cost per worker
    pub hourly_rate: f64,
}

impl Crew {
    /// Hourly cost of the whole crew
    pub fn hourly_cost(&self) -> f64 {
        self.headcount as f64 * self.hourly_rate.max(0.0)
    }
}

/// Owned or rented equipment working with the crew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub name: String,

    pub hourly_rate: f64,

    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

/// Material consumed per unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUse {
    pub name: String,

    /// Material units consumed per unit of gross quantity
    pub per_unit: f64,

    /// Price per material unit
    pub unit_price: f64,
}

impl MaterialUse {
    pub fn cost(&self, gross_quantity: f64) -> f64 {
        (gross_quantity * self.per_unit * self.unit_price).max(0.0)
    }
}

/// Hauling inputs for an activity that moves material by truck
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruckingParams {
    /// Round-trip cycle time per truck load, in minutes
    pub cycle_minutes: f64,

    /// Payload per truck, in tons
    pub truck_capacity_tons: f64,

    /// Fraction of each hour a truck is productively hauling
    #[serde(default = "default_efficiency")]
    pub efficiency: f64,

    /// Tons hauled per unit of gross quantity (derived from the activity
    /// type's conversion when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tons_per_unit: Option<f64>,

    /// Hauled tonnage measured independently of the work quantity, e.g.
    /// reclaimed millings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_override_tons: Option<f64>,
}

fn default_efficiency() -> f64 {
    0.85
}

/// Precedence relation between two activities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Precedence {
    /// Successor starts after predecessor finishes
    #[default]
    #[serde(rename = "FS", alias = "fs", alias = "finish_start")]
    FinishStart,
    /// Successor starts after predecessor starts
    #[serde(rename = "SS", alias = "ss", alias = "start_start")]
    StartStart,
    /// Successor finishes after predecessor finishes
    #[serde(rename = "FF", alias = "ff", alias = "finish_finish")]
    FinishFinish,
    /// Successor finishes after predecessor starts
    #[serde(rename = "SF", alias = "sf", alias = "start_finish")]
    StartFinish,
}

impl std::fmt::Display for Precedence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precedence::FinishStart => write!(f, "FS"),
            Precedence::StartStart => write!(f, "SS"),
            Precedence::FinishFinish => write!(f, "FF"),
            Precedence::StartFinish => write!(f, "SF"),
        }
    }
}

/// Edge from a predecessor activity to the owning activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Predecessor activity id
    pub predecessor: String,

    #[serde(default)]
    pub kind: Precedence,

    /// Signed offset in working days
    #[serde(default)]
    pub lag: f64,
}

impl Dependency {
    pub fn finish_start(predecessor: impl Into<String>) -> Self {
        Self {
            predecessor: predecessor.into(),
            kind: Precedence::FinishStart,
            lag: 0.0,
        }
    }
}

/// One unit of work in an estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Unique id within the estimate
    pub id: String,

    /// Display name (falls back to the type label)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(rename = "type")]
    pub activity_type: ActivityType,

    pub quantity: Quantity,

    /// Lift/course thickness in inches, used for area/volume/tonnage conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_inches: Option<f64>,

    pub production_rate: ProductionRate,

    #[serde(default, skip_serializing_if = "Productivity::is_empty")]
    pub productivity: Productivity,

    pub crew: Crew,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equipment: Vec<EquipmentItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialUse>,

    /// Stand-alone mobilization cost when not covered by a cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobilization_cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trucking: Option<TruckingParams>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<Dependency>,

    /// Minimum number of billed days for this activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_days: Option<u32>,
}

impl Activity {
    /// Create an activity with the required fields; optional inputs start empty
    pub fn new(
        id: impl Into<String>,
        activity_type: ActivityType,
        quantity: Quantity,
        production_rate: f64,
        crew: Crew,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            activity_type,
            quantity,
            thickness_inches: None,
            production_rate: ProductionRate(production_rate),
            productivity: Productivity::default(),
            crew,
            equipment: Vec::new(),
            materials: Vec::new(),
            mobilization_cost: None,
            trucking: None,
            depends_on: Vec::new(),
            min_days: None,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.activity_type.label()
        } else {
            &self.name
        }
    }

    pub fn gross_quantity(&self) -> f64 {
        self.quantity.gross()
    }

    /// Composite productivity multiplier
    pub fn productivity(&self) -> f64 {
        self.productivity.composite()
    }

    /// Effective production per standard shift after condition factors
    pub fn effective_rate(&self) -> f64 {
        if !self.production_rate.is_usable() {
            return 0.0;
        }
        (self.production_rate.per_shift() * self.productivity()).max(0.0)
    }

    /// Working days, rounded up to the nearest half day
    pub fn duration_days(&self) -> f64 {
        let rate = self.effective_rate();
        let gross = self.gross_quantity();
        if rate <= 0.0 || gross <= 0.0 {
            return 0.0;
        }
        (gross / rate * 2.0).ceil() / 2.0
    }

    /// An activity contributes to the estimate only when it has quantity
    pub fn is_active(&self) -> bool {
        self.gross_quantity() > 0.0
    }

    pub fn labor_hourly_cost(&self) -> f64 {
        self.crew.hourly_cost()
    }

    pub fn equipment_hourly_cost(&self) -> f64 {
        self.equipment
            .iter()
            .map(|e| e.count as f64 * e.hourly_rate.max(0.0))
            .sum()
    }

    pub fn labor_cost(&self, billed_hours: f64) -> f64 {
        self.labor_hourly_cost() * billed_hours.max(0.0)
    }

    pub fn equipment_cost(&self, billed_hours: f64) -> f64 {
        self.equipment_hourly_cost() * billed_hours.max(0.0)
    }

    pub fn material_cost(&self) -> f64 {
        let gross = self.gross_quantity();
        self.materials.iter().map(|m| m.cost(gross)).sum()
    }
}
