//! # Roof Truss Synthesis
//!
//! Generates the member list of a symmetric pitched truss from its span, rise,
//! and type, then sizes connector plates and totals the steel weight.
//!
//! ## Geometry
//!
//! ```text
//!                     apex
//!                    /|\
//!        top chord  / | \  top chord
//!                  /  |  \
//!   overhang ___heel__|__heel___ overhang
//!                 bottom chord
//! ```
//!
//! - `half_span = span / 2`
//! - `pitch = atan(rise / half_span)`
//! - `top chord = sqrt(half_span² + rise²) + overhang / cos(pitch)`
//!
//! ## Member patterns
//!
//! - **Kingpost**: two top chords, two bottom-chord halves, one king post.
//! - **Fink**: two top chords, three bottom-chord panels, a W of four webs.
//! - **Howe**: two top chords, two bottom-chord halves, `N` side verticals
//!   (evenly spaced, symmetric) plus the centre vertical, and one diagonal per
//!   side vertical sloping up toward the centre.
//!
//! All inputs are millimetres; outputs are metres and kilograms.
//!
//! ## Example
//!
//! ```rust
//! use takeoff_core::calculations::truss::{synthesize, MemberMaterial, TrussParameters, TrussType};
//!
//! let params = TrussParameters {
//!     truss_type: TrussType::Kingpost,
//!     span_mm: 8000.0,
//!     rise_mm: 1600.0,
//!     overhang_mm: 0.0,
//!     spacing_mm: 1000.0,
//!     vertical_webs: None,
//!     plate_thickness_mm: 1.0,
//!     top_chord: MemberMaterial::new("C75x40x0.75", 1.2),
//!     bottom_chord: MemberMaterial::new("C75x40x0.75", 1.2),
//!     web: MemberMaterial::new("C75x40x0.75", 1.2),
//! };
//! let result = synthesize(&params).unwrap();
//! assert!((result.geometry.pitch_deg - 21.80).abs() < 0.01);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::materials::STEEL_DENSITY_KG_M3;
use crate::units::{Meters, Millimeters};

/// Default number of Howe side verticals when none is given
pub const DEFAULT_HOWE_VERTICALS: u32 = 2;

/// Narrowest Howe panel a vertical count may imply (mm of span per vertical)
pub const MIN_HOWE_PANEL_MM: f64 = 100.0;

/// Truss configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrussType {
    Howe,
    Fink,
    Kingpost,
}

impl TrussType {
    pub fn display_name(&self) -> &'static str {
        match self {
            TrussType::Howe => "Howe",
            TrussType::Fink => "Fink",
            TrussType::Kingpost => "Kingpost",
        }
    }
}

/// Section used for a member group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberMaterial {
    /// Section designation, e.g. "C75x40x0.75"
    pub section: String,
    /// Mass per metre (kg/m)
    pub weight_kg_per_m: f64,
}

impl MemberMaterial {
    pub fn new(section: impl Into<String>, weight_kg_per_m: f64) -> Self {
        MemberMaterial {
            section: section.into(),
            weight_kg_per_m,
        }
    }
}

fn default_plate_thickness() -> f64 {
    1.0
}

/// Truss inputs (millimetres)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussParameters {
    pub truss_type: TrussType,
    pub span_mm: f64,
    pub rise_mm: f64,
    #[serde(default)]
    pub overhang_mm: f64,
    /// Centre-to-centre truss spacing along the building
    pub spacing_mm: f64,
    /// Howe only: side verticals, excluding the centre vertical
    #[serde(default)]
    pub vertical_webs: Option<u32>,
    #[serde(default = "default_plate_thickness")]
    pub plate_thickness_mm: f64,
    pub top_chord: MemberMaterial,
    pub bottom_chord: MemberMaterial,
    pub web: MemberMaterial,
}

/// Which material a member draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberGroup {
    TopChord,
    BottomChord,
    Web,
}

/// Member function within the truss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberSubtype {
    Rafter,
    ChordPanel,
    KingPost,
    CenterVertical,
    Vertical,
    Diagonal,
    Strut,
    Tie,
}

/// One row of the member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussMember {
    pub name: String,
    pub group: MemberGroup,
    pub subtype: MemberSubtype,
    /// Length of one piece (m)
    pub length_m: f64,
    pub quantity: u32,
    pub section: String,
    pub weight_kg_per_m: f64,
    /// Weight of all pieces in this row (kg)
    pub weight_kg: f64,
}

/// Joint classification for plate sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointKind {
    Heel,
    Apex,
    Web,
}

/// Plate thickness class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlateClass {
    Light,
    Standard,
    Heavy,
}

impl PlateClass {
    pub fn from_thickness(thickness_mm: f64) -> Self {
        if thickness_mm <= 1.0 {
            PlateClass::Light
        } else if thickness_mm <= 1.5 {
            PlateClass::Standard
        } else {
            PlateClass::Heavy
        }
    }

    /// Plate size (width, height) in mm for a joint kind
    pub fn plate_size_mm(&self, joint: JointKind) -> (f64, f64) {
        match (self, joint) {
            (PlateClass::Light, JointKind::Heel | JointKind::Apex) => (150.0, 100.0),
            (PlateClass::Light, JointKind::Web) => (100.0, 75.0),
            (PlateClass::Standard, JointKind::Heel | JointKind::Apex) => (200.0, 150.0),
            (PlateClass::Standard, JointKind::Web) => (125.0, 100.0),
            (PlateClass::Heavy, JointKind::Heel | JointKind::Apex) => (250.0, 200.0),
            (PlateClass::Heavy, JointKind::Web) => (150.0, 125.0),
        }
    }
}

/// Connector plates for one joint kind (two per joint, one each face)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorPlate {
    pub joint: JointKind,
    pub joints: u32,
    pub quantity: u32,
    pub class: PlateClass,
    pub width_mm: f64,
    pub height_mm: f64,
    pub thickness_mm: f64,
    /// Weight of all plates in this row (kg)
    pub weight_kg: f64,
}

/// Plates per joint
pub const PLATES_PER_JOINT: u32 = 2;

/// Geometry summary (metres / radians / degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussGeometry {
    pub span_m: f64,
    pub rise_m: f64,
    pub half_span_m: f64,
    pub overhang_m: f64,
    pub pitch_rad: f64,
    pub pitch_deg: f64,
    /// One top chord including overhang
    pub top_chord_length_m: f64,
    pub joint_count: u32,
    pub member_count: u32,
    pub total_member_length_m: f64,
}

/// Weight summary for a single truss (kg)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussWeights {
    pub top_chord_kg: f64,
    pub bottom_chord_kg: f64,
    pub web_kg: f64,
    pub members_kg: f64,
    pub plates_kg: f64,
    pub total_kg: f64,
}

/// Synthesized truss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussResult {
    pub truss_type: TrussType,
    pub members: Vec<TrussMember>,
    pub plates: Vec<ConnectorPlate>,
    pub geometry: TrussGeometry,
    pub weights: TrussWeights,
    pub warnings: Vec<String>,
}

impl TrussResult {
    /// Total pieces in a member group
    pub fn pieces(&self, group: MemberGroup) -> u32 {
        self.members
            .iter()
            .filter(|m| m.group == group)
            .map(|m| m.quantity)
            .sum()
    }

    /// Total pieces of a subtype
    pub fn pieces_of(&self, subtype: MemberSubtype) -> u32 {
        self.members
            .iter()
            .filter(|m| m.subtype == subtype)
            .map(|m| m.quantity)
            .sum()
    }
}

/// Totals for every truss along a building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingTrussTotals {
    pub truss_count: u32,
    pub total_member_length_m: f64,
    pub total_plates: u32,
    pub total_weight_kg: f64,
    pub total_steel_volume_m3: f64,
}

/// A truss design placed over a building in the project snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrussDesign {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub level: Option<String>,
    pub parameters: TrussParameters,
    /// Building length the trusses repeat along (mm)
    pub building_length_mm: f64,
    #[serde(default)]
    pub pay_item: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn require_positive(field: &str, value: f64) -> CalcResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(CalcError::invalid_input(field, value.to_string(), "Must be positive"));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> CalcResult<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(CalcError::invalid_input(field, value.to_string(), "Cannot be negative"));
    }
    Ok(())
}

impl TrussParameters {
    pub fn validate(&self) -> CalcResult<()> {
        require_positive("span_mm", self.span_mm)?;
        require_positive("rise_mm", self.rise_mm)?;
        require_positive("spacing_mm", self.spacing_mm)?;
        require_positive("plate_thickness_mm", self.plate_thickness_mm)?;
        require_non_negative("overhang_mm", self.overhang_mm)?;
        require_non_negative("top_chord.weight_kg_per_m", self.top_chord.weight_kg_per_m)?;
        require_non_negative("bottom_chord.weight_kg_per_m", self.bottom_chord.weight_kg_per_m)?;
        require_non_negative("web.weight_kg_per_m", self.web.weight_kg_per_m)?;
        if let (TrussType::Howe, Some(count)) = (self.truss_type, self.vertical_webs) {
            let max = (self.span_mm / MIN_HOWE_PANEL_MM).floor();
            if f64::from(count) > max {
                return Err(CalcError::invalid_input(
                    "vertical_webs",
                    count.to_string(),
                    format!("At most {} verticals fit a {:.0} mm span", max, self.span_mm),
                ));
            }
        }
        Ok(())
    }

    fn material(&self, group: MemberGroup) -> &MemberMaterial {
        match group {
            MemberGroup::TopChord => &self.top_chord,
            MemberGroup::BottomChord => &self.bottom_chord,
            MemberGroup::Web => &self.web,
        }
    }

    /// Non-fatal plausibility checks.
    pub fn plausibility_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let ratio = self.rise_mm / self.span_mm;
        if ratio < 0.1 {
            warnings.push(format!(
                "Rise/span ratio {:.3} is below 0.10; roof may be too flat to drain",
                ratio
            ));
        } else if ratio > 0.5 {
            warnings.push(format!(
                "Rise/span ratio {:.3} is above 0.50; check rise against span",
                ratio
            ));
        }
        if self.overhang_mm > self.span_mm / 4.0 {
            warnings.push(format!(
                "Overhang {:.0} mm exceeds a quarter of the span ({:.0} mm)",
                self.overhang_mm,
                self.span_mm / 4.0
            ));
        }
        if self.spacing_mm > 1200.0 {
            warnings.push(format!(
                "Truss spacing {:.0} mm exceeds 1200 mm; purlins may be overstressed",
                self.spacing_mm
            ));
        }
        if self.truss_type == TrussType::Fink && self.span_mm < 6000.0 {
            warnings.push(format!(
                "Fink truss over a {:.0} mm span; a kingpost is usually enough below 6000 mm",
                self.span_mm
            ));
        }
        if self.truss_type != TrussType::Howe && self.vertical_webs.is_some() {
            warnings.push(format!(
                "vertical_webs only applies to Howe trusses; ignored for {}",
                self.truss_type.display_name()
            ));
        }
        warnings
    }
}

struct MemberList<'a> {
    params: &'a TrussParameters,
    members: Vec<TrussMember>,
}

impl<'a> MemberList<'a> {
    fn push(&mut self, name: impl Into<String>, group: MemberGroup, subtype: MemberSubtype, length_m: f64, quantity: u32) {
        let material = self.params.material(group);
        self.members.push(TrussMember {
            name: name.into(),
            group,
            subtype,
            length_m,
            quantity,
            section: material.section.clone(),
            weight_kg_per_m: material.weight_kg_per_m,
            weight_kg: length_m * quantity as f64 * material.weight_kg_per_m,
        });
    }
}

/// Joint counts (heel, apex, web) for a member pattern
struct JointCounts {
    heel: u32,
    apex: u32,
    web: u32,
}

impl JointCounts {
    fn total(&self) -> u32 {
        self.heel + self.apex + self.web
    }
}

fn kingpost_members(list: &mut MemberList, half: f64, rise: f64) -> JointCounts {
    list.push("King post", MemberGroup::Web, MemberSubtype::KingPost, rise, 1);
    list.push("Bottom chord half", MemberGroup::BottomChord, MemberSubtype::ChordPanel, half, 2);
    JointCounts { heel: 2, apex: 1, web: 1 }
}

fn fink_members(list: &mut MemberList, span: f64, rise: f64) -> JointCounts {
    let panel = span / 3.0;
    list.push("Bottom chord end panel", MemberGroup::BottomChord, MemberSubtype::ChordPanel, panel, 2);
    list.push("Bottom chord centre panel", MemberGroup::BottomChord, MemberSubtype::ChordPanel, panel, 1);

    // Strut: top-chord midpoint (S/4, R/2) down to bottom third point (S/3, 0)
    let strut = (span / 12.0).hypot(rise / 2.0);
    // Tie: apex (S/2, R) down to bottom third point (S/3, 0)
    let tie = (span / 6.0).hypot(rise);
    list.push("Web strut", MemberGroup::Web, MemberSubtype::Strut, strut, 2);
    list.push("Web tie", MemberGroup::Web, MemberSubtype::Tie, tie, 2);
    JointCounts { heel: 2, apex: 1, web: 4 }
}

fn howe_members(list: &mut MemberList, half: f64, rise: f64, per_side: u32) -> JointCounts {
    list.push("Bottom chord half", MemberGroup::BottomChord, MemberSubtype::ChordPanel, half, 2);
    list.push("Centre vertical", MemberGroup::Web, MemberSubtype::CenterVertical, rise, 1);

    let panel = half / (per_side + 1) as f64;
    let height_at = |i: u32| rise * (i as f64 * panel) / half;
    for i in 1..=per_side {
        list.push(format!("Vertical V{}", i), MemberGroup::Web, MemberSubtype::Vertical, height_at(i), 2);
    }
    // Diagonal i runs from the foot of vertical i up to the top of vertical i+1
    for i in 1..=per_side {
        let length = panel.hypot(height_at(i + 1));
        list.push(format!("Diagonal D{}", i), MemberGroup::Web, MemberSubtype::Diagonal, length, 2);
    }
    JointCounts {
        heel: 2,
        apex: 1,
        web: 1 + 4 * per_side,
    }
}

fn connector_plates(joints: &JointCounts, thickness_mm: f64) -> Vec<ConnectorPlate> {
    let class = PlateClass::from_thickness(thickness_mm);
    [
        (JointKind::Heel, joints.heel),
        (JointKind::Apex, joints.apex),
        (JointKind::Web, joints.web),
    ]
    .into_iter()
    .filter(|(_, count)| *count > 0)
    .map(|(joint, count)| {
        let (width_mm, height_mm) = class.plate_size_mm(joint);
        let quantity = count * PLATES_PER_JOINT;
        let each_kg = (width_mm / 1000.0) * (height_mm / 1000.0) * (thickness_mm / 1000.0) * STEEL_DENSITY_KG_M3;
        ConnectorPlate {
            joint,
            joints: count,
            quantity,
            class,
            width_mm,
            height_mm,
            thickness_mm,
            weight_kg: each_kg * quantity as f64,
        }
    })
    .collect()
}

/// Generate the member list, plates, and weights for one truss.
pub fn synthesize(params: &TrussParameters) -> CalcResult<TrussResult> {
    params.validate()?;
    let mut warnings = params.plausibility_warnings();

    let span = Meters::from(Millimeters(params.span_mm)).value();
    let rise = Meters::from(Millimeters(params.rise_mm)).value();
    let overhang = Meters::from(Millimeters(params.overhang_mm)).value();
    let half = span / 2.0;
    let pitch = (rise / half).atan();
    let top_chord = half.hypot(rise) + overhang / pitch.cos();

    let mut list = MemberList {
        params,
        members: Vec::new(),
    };
    list.push("Top chord", MemberGroup::TopChord, MemberSubtype::Rafter, top_chord, 2);

    let joints = match params.truss_type {
        TrussType::Kingpost => kingpost_members(&mut list, half, rise),
        TrussType::Fink => fink_members(&mut list, span, rise),
        TrussType::Howe => {
            let requested = params.vertical_webs.unwrap_or(DEFAULT_HOWE_VERTICALS);
            let verticals = if requested % 2 == 1 {
                warnings.push(format!(
                    "Howe vertical web count {} is odd; rounded up to {} for symmetry",
                    requested,
                    requested.saturating_add(1)
                ));
                requested.saturating_add(1)
            } else {
                requested
            };
            howe_members(&mut list, half, rise, verticals / 2)
        }
    };
    let members = list.members;

    let plates = connector_plates(&joints, params.plate_thickness_mm);

    let group_weight = |group: MemberGroup| -> f64 {
        members
            .iter()
            .filter(|m| m.group == group)
            .map(|m| m.weight_kg)
            .sum()
    };
    let top_chord_kg = group_weight(MemberGroup::TopChord);
    let bottom_chord_kg = group_weight(MemberGroup::BottomChord);
    let web_kg = group_weight(MemberGroup::Web);
    let members_kg = top_chord_kg + bottom_chord_kg + web_kg;
    let plates_kg: f64 = plates.iter().map(|p| p.weight_kg).sum();

    let geometry = TrussGeometry {
        span_m: span,
        rise_m: rise,
        half_span_m: half,
        overhang_m: overhang,
        pitch_rad: pitch,
        pitch_deg: pitch.to_degrees(),
        top_chord_length_m: top_chord,
        joint_count: joints.total(),
        member_count: members.iter().map(|m| m.quantity).sum(),
        total_member_length_m: members.iter().map(|m| m.length_m * m.quantity as f64).sum(),
    };

    tracing::debug!(
        "synthesized {} truss: span {:.3} m, {} members, {:.2} kg",
        params.truss_type.display_name(),
        span,
        geometry.member_count,
        members_kg + plates_kg
    );

    Ok(TrussResult {
        truss_type: params.truss_type,
        members,
        plates,
        geometry,
        weights: TrussWeights {
            top_chord_kg,
            bottom_chord_kg,
            web_kg,
            members_kg,
            plates_kg,
            total_kg: members_kg + plates_kg,
        },
        warnings,
    })
}

/// Trusses along a building: `ceil(length / spacing) + 1`, at least one.
pub fn trusses_per_building(building_length_mm: f64, spacing_mm: f64) -> u32 {
    if !(spacing_mm > 0.0) || !(building_length_mm > 0.0) {
        return 1;
    }
    let count = (building_length_mm / spacing_mm - 1e-9).ceil() + 1.0;
    count.max(1.0) as u32
}

/// Scale a single truss up to the whole building.
pub fn building_totals(result: &TrussResult, truss_count: u32) -> BuildingTrussTotals {
    let n = truss_count as f64;
    let total_weight_kg = result.weights.total_kg * n;
    BuildingTrussTotals {
        truss_count,
        total_member_length_m: result.geometry.total_member_length_m * n,
        total_plates: result
            .plates
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.quantity))
            .saturating_mul(truss_count),
        total_weight_kg,
        total_steel_volume_m3: total_weight_kg / STEEL_DENSITY_KG_M3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(truss_type: TrussType) -> TrussParameters {
        TrussParameters {
            truss_type,
            span_mm: 8000.0,
            rise_mm: 1600.0,
            overhang_mm: 0.0,
            spacing_mm: 1000.0,
            vertical_webs: None,
            plate_thickness_mm: 1.0,
            top_chord: MemberMaterial::new("C100x50x1.0", 2.0),
            bottom_chord: MemberMaterial::new("C75x40x0.75", 1.5),
            web: MemberMaterial::new("C75x40x0.75", 1.0),
        }
    }

    #[test]
    fn test_kingpost_members() {
        let result = synthesize(&params(TrussType::Kingpost)).unwrap();
        assert_eq!(result.pieces_of(MemberSubtype::KingPost), 1);
        assert_eq!(result.pieces(MemberGroup::TopChord), 2);
        assert_eq!(result.pieces(MemberGroup::BottomChord), 2);
        assert_eq!(result.geometry.joint_count, 4);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_pitch_angle() {
        let result = synthesize(&params(TrussType::Kingpost)).unwrap();
        assert_abs_diff_eq!(result.geometry.pitch_rad, (1.6f64 / 4.0).atan(), epsilon = 1e-12);
        assert_abs_diff_eq!(result.geometry.top_chord_length_m, 4.0f64.hypot(1.6), epsilon = 1e-12);
    }

    #[test]
    fn test_overhang_extends_top_chord() {
        let mut p = params(TrussType::Kingpost);
        p.overhang_mm = 600.0;
        let result = synthesize(&p).unwrap();
        let pitch = (1.6f64 / 4.0).atan();
        assert_abs_diff_eq!(
            result.geometry.top_chord_length_m,
            4.0f64.hypot(1.6) + 0.6 / pitch.cos(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_fink_w_webs() {
        let result = synthesize(&params(TrussType::Fink)).unwrap();
        assert_eq!(result.pieces(MemberGroup::Web), 4);
        assert_eq!(result.pieces(MemberGroup::BottomChord), 3);
        assert_eq!(result.geometry.joint_count, 7);
    }

    #[test]
    fn test_howe_verticals() {
        let mut p = params(TrussType::Howe);
        p.vertical_webs = Some(4);
        let result = synthesize(&p).unwrap();
        assert_eq!(result.pieces_of(MemberSubtype::CenterVertical), 1);
        assert_eq!(result.pieces_of(MemberSubtype::Vertical), 4);
        assert_eq!(result.pieces_of(MemberSubtype::Diagonal), 4);
        // Panel 4.0 / 3; first vertical at 1.333 m is 1.6 / 3 tall
        let v1 = result.members.iter().find(|m| m.name == "Vertical V1").unwrap();
        assert_abs_diff_eq!(v1.length_m, 1.6 / 3.0, epsilon = 1e-12);
        // Last diagonal reaches the apex
        let d2 = result.members.iter().find(|m| m.name == "Diagonal D2").unwrap();
        assert_abs_diff_eq!(d2.length_m, (4.0f64 / 3.0).hypot(1.6), epsilon = 1e-12);
    }

    #[test]
    fn test_howe_odd_count_warns() {
        let mut p = params(TrussType::Howe);
        p.vertical_webs = Some(3);
        let result = synthesize(&p).unwrap();
        assert_eq!(result.pieces_of(MemberSubtype::Vertical), 4);
        assert!(result.warnings.iter().any(|w| w.contains("odd")));
    }

    #[test]
    fn test_howe_vertical_count_bounded_by_span() {
        let mut p = params(TrussType::Howe);
        p.vertical_webs = Some(u32::MAX);
        let err = synthesize(&p).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");

        // 8000 mm span holds 80 verticals at the 100 mm panel minimum
        p.vertical_webs = Some(80);
        assert!(synthesize(&p).is_ok());
        p.vertical_webs = Some(81);
        assert!(synthesize(&p).is_err());
    }

    #[test]
    fn test_building_totals_saturate() {
        let result = synthesize(&params(TrussType::Kingpost)).unwrap();
        let totals = building_totals(&result, u32::MAX);
        assert_eq!(totals.total_plates, u32::MAX);
    }

    #[test]
    fn test_plausibility_warnings() {
        let mut p = params(TrussType::Fink);
        p.span_mm = 5000.0;
        p.rise_mm = 300.0;
        p.spacing_mm = 1500.0;
        let result = synthesize(&p).unwrap();
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn test_invalid_span_is_error() {
        let mut p = params(TrussType::Howe);
        p.span_mm = 0.0;
        assert!(synthesize(&p).is_err());
    }

    #[test]
    fn test_weights() {
        let result = synthesize(&params(TrussType::Kingpost)).unwrap();
        let chord = 4.0f64.hypot(1.6);
        assert_abs_diff_eq!(result.weights.top_chord_kg, 2.0 * chord * 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.weights.bottom_chord_kg, 2.0 * 4.0 * 1.5, epsilon = 1e-9);
        assert_abs_diff_eq!(result.weights.web_kg, 1.6, epsilon = 1e-9);
        // Light plates: heel/apex 150x100, web 100x75, 1 mm, two per joint
        let heel = 0.15 * 0.10 * 0.001 * 7850.0;
        let web = 0.10 * 0.075 * 0.001 * 7850.0;
        assert_abs_diff_eq!(result.weights.plates_kg, heel * 6.0 + web * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trusses_per_building() {
        assert_eq!(trusses_per_building(12000.0, 1000.0), 13);
        assert_eq!(trusses_per_building(12500.0, 1000.0), 14);
        assert_eq!(trusses_per_building(0.0, 1000.0), 1);
    }

    #[test]
    fn test_building_totals_scale() {
        let result = synthesize(&params(TrussType::Kingpost)).unwrap();
        let totals = building_totals(&result, 13);
        assert_abs_diff_eq!(totals.total_weight_kg, result.weights.total_kg * 13.0, epsilon = 1e-9);
        assert_eq!(totals.total_plates, 8 * 13);
    }
}
