use crate::compare::Row;
use crate::config::Config;
use tracing::debug;

/// Measurement unit of a scoring function's per-row contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Counts frames (each row contributes -1, 0 or +1).
    Frame,
    /// Counts bee pixels (background-difference counts).
    BeePixel,
    /// Ratio of moving bee pixels over bee pixels.
    Percentage,
}

/// The closed set of scoring functions.
///
/// Each kind maps `(config, active ROI, row)` to a signed per-row
/// contribution; [`compute`] sums the contributions over a whole video.
/// "Active" is the CASU currently under test; "passive" is the paired CASU
/// (ROI `1 - active`, two-ROI arenas only). A ROI "has bees" when its
/// background-difference count exceeds
/// `pixel_count_background_threshold`, and has "no movement" when its
/// previous-frame-difference count is below
/// `pixel_count_previous_frame_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKind {
    /// `F_m_a`: +1 per frame with no movement in the active ROI.
    FramesNoMovementActive,
    /// `F_m_ap`: +1 if the active ROI has no movement, -1 if the passive
    /// ROI has no movement.
    FramesNoMovementActivePassive,
    /// `F_bm_ap`: like `F_m_ap`, but each term additionally requires bees
    /// in its ROI.
    FramesBeesNoMovementActivePassive,
    /// `B_bm_a`: adds the active ROI's bee-pixel count when it has bees
    /// and no movement.
    BeePixelsBeesNoMovementActive,
    /// `B_bm_ap`: adds the active ROI's bee-pixel count and subtracts the
    /// passive ROI's, each term gated on bees and no movement in its ROI.
    BeePixelsBeesNoMovementActivePassive,
    /// `%B_m_a`: ratio of the active ROI's moving-bee pixels over its bee
    /// pixels, when it has bees.
    PercentageBeesActive,
}

pub const ALL_KINDS: [ScoreKind; 6] = [
    ScoreKind::FramesNoMovementActive,
    ScoreKind::FramesNoMovementActivePassive,
    ScoreKind::FramesBeesNoMovementActivePassive,
    ScoreKind::BeePixelsBeesNoMovementActive,
    ScoreKind::BeePixelsBeesNoMovementActivePassive,
    ScoreKind::PercentageBeesActive,
];

/// Every name accepted for `image_processing_function`: short codes plus
/// the descriptive and legacy names found in old experiment run files.
pub const ALIASES: &[(&str, ScoreKind)] = &[
    ("F_m_a", ScoreKind::FramesNoMovementActive),
    ("frames_IF_no_movement_ONLY_IN_active", ScoreKind::FramesNoMovementActive),
    ("frames_with_no_movement_active_casu_roi", ScoreKind::FramesNoMovementActive),
    ("F_m_ap", ScoreKind::FramesNoMovementActivePassive),
    ("frames_IF_no_movement_IN_active_passive", ScoreKind::FramesNoMovementActivePassive),
    (
        "frames_with_no_movement_active_passive_casu_rois",
        ScoreKind::FramesNoMovementActivePassive,
    ),
    ("F_bm_ap", ScoreKind::FramesBeesNoMovementActivePassive),
    (
        "frames_IF_bees_AND_no_movement_IN_active_passive",
        ScoreKind::FramesBeesNoMovementActivePassive,
    ),
    ("B_bm_a", ScoreKind::BeePixelsBeesNoMovementActive),
    (
        "bee_pixels_IF_bees_AND_no_movement_ONLY_IN_active",
        ScoreKind::BeePixelsBeesNoMovementActive,
    ),
    ("B_bm_ap", ScoreKind::BeePixelsBeesNoMovementActivePassive),
    (
        "bee_pixels_IF_bees_AND_no_movement_IN_active_passive",
        ScoreKind::BeePixelsBeesNoMovementActivePassive,
    ),
    ("penalize_passive_casu", ScoreKind::BeePixelsBeesNoMovementActivePassive),
    ("%B_m_a", ScoreKind::PercentageBeesActive),
    ("percentage_bees_IF_bees_ONLY_IN_active", ScoreKind::PercentageBeesActive),
];

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("unknown image processing function {0:?}")]
    UnknownFunctionKind(String),
}

fn has_bees(config: &Config, row: &[i64], roi_index: usize) -> bool {
    row[2 * roi_index] > config.pixel_count_background_threshold
}

fn no_movement(config: &Config, row: &[i64], roi_index: usize) -> bool {
    row[2 * roi_index + 1] < config.pixel_count_previous_frame_threshold
}

impl ScoreKind {
    /// Resolves an alias to its kind, or fails with
    /// [`ScoreError::UnknownFunctionKind`].
    pub fn from_key(key: &str) -> Result<Self, ScoreError> {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| ScoreError::UnknownFunctionKind(key.to_string()))
    }

    /// Canonical short code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FramesNoMovementActive => "F_m_a",
            Self::FramesNoMovementActivePassive => "F_m_ap",
            Self::FramesBeesNoMovementActivePassive => "F_bm_ap",
            Self::BeePixelsBeesNoMovementActive => "B_bm_a",
            Self::BeePixelsBeesNoMovementActivePassive => "B_bm_ap",
            Self::PercentageBeesActive => "%B_m_a",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FramesNoMovementActive => {
                "counts the frames with no movement in the active CASU region of interest"
            }
            Self::FramesNoMovementActivePassive => {
                "adds one per frame with no movement in the active CASU region of interest, \
                 subtracts one per frame with no movement in the passive one"
            }
            Self::FramesBeesNoMovementActivePassive => {
                "adds one per frame with bees and no movement in the active CASU region of \
                 interest, subtracts one per frame with bees and no movement in the passive one"
            }
            Self::BeePixelsBeesNoMovementActive => {
                "adds the bee pixels of the active CASU region of interest in frames where it \
                 has bees and no movement"
            }
            Self::BeePixelsBeesNoMovementActivePassive => {
                "adds the bee pixels of the active CASU region of interest and subtracts those \
                 of the passive one, in frames where the respective region has bees and no \
                 movement"
            }
            Self::PercentageBeesActive => {
                "in frames where the active CASU region of interest has bees, the ratio of \
                 pixels differing from the previous frame over pixels differing from the \
                 background frame"
            }
        }
    }

    /// Minimum number of ROIs the arena must have for this kind to be
    /// meaningful. Callers must check this before [`compute`]; the
    /// active/passive functions index the passive columns unconditionally.
    pub fn minimum_number_rois(&self) -> usize {
        match self {
            Self::FramesNoMovementActive
            | Self::BeePixelsBeesNoMovementActive
            | Self::PercentageBeesActive => 1,
            Self::FramesNoMovementActivePassive
            | Self::FramesBeesNoMovementActivePassive
            | Self::BeePixelsBeesNoMovementActivePassive => 2,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Self::FramesNoMovementActive
            | Self::FramesNoMovementActivePassive
            | Self::FramesBeesNoMovementActivePassive => Unit::Frame,
            Self::BeePixelsBeesNoMovementActive | Self::BeePixelsBeesNoMovementActivePassive => {
                Unit::BeePixel
            }
            Self::PercentageBeesActive => Unit::Percentage,
        }
    }

    /// Declared theoretical per-row bounds, in units of [`Self::unit`].
    /// Documentation for analysis tools, not enforced at runtime.
    pub fn range_minmax(&self) -> (f64, f64) {
        match self {
            Self::FramesNoMovementActive
            | Self::BeePixelsBeesNoMovementActive
            | Self::PercentageBeesActive => (0.0, 1.0),
            Self::FramesNoMovementActivePassive
            | Self::FramesBeesNoMovementActivePassive
            | Self::BeePixelsBeesNoMovementActivePassive => (-1.0, 1.0),
        }
    }

    /// Per-row contribution of this kind.
    ///
    /// The active/passive kinds are two independently gated terms summed,
    /// so the contributions cancel to zero when both gates hold.
    ///
    /// Panics if `active_roi_index` (or, for two-ROI kinds, the passive
    /// index `1 - active_roi_index`) is out of the row's bounds.
    pub fn evaluate(&self, config: &Config, active_roi_index: usize, row: &[i64]) -> f64 {
        let active = active_roi_index;
        match self {
            Self::FramesNoMovementActive => {
                if no_movement(config, row, active) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::FramesNoMovementActivePassive => {
                let passive = 1 - active;
                let gained = if no_movement(config, row, active) { 1.0 } else { 0.0 };
                let lost = if no_movement(config, row, passive) { 1.0 } else { 0.0 };
                gained - lost
            }
            Self::FramesBeesNoMovementActivePassive => {
                let passive = 1 - active;
                let gained = if has_bees(config, row, active) && no_movement(config, row, active) {
                    1.0
                } else {
                    0.0
                };
                let lost = if has_bees(config, row, passive) && no_movement(config, row, passive) {
                    1.0
                } else {
                    0.0
                };
                gained - lost
            }
            Self::BeePixelsBeesNoMovementActive => {
                if has_bees(config, row, active) && no_movement(config, row, active) {
                    row[2 * active] as f64
                } else {
                    0.0
                }
            }
            Self::BeePixelsBeesNoMovementActivePassive => {
                let passive = 1 - active;
                let gained = if has_bees(config, row, active) && no_movement(config, row, active) {
                    row[2 * active] as f64
                } else {
                    0.0
                };
                let lost = if has_bees(config, row, passive) && no_movement(config, row, passive) {
                    row[2 * passive] as f64
                } else {
                    0.0
                };
                gained - lost
            }
            Self::PercentageBeesActive => {
                // the bees gate also guarantees a nonzero denominator
                if has_bees(config, row, active) {
                    row[2 * active + 1] as f64 / row[2 * active] as f64
                } else {
                    0.0
                }
            }
        }
    }
}

/// Reduces a video's rows into one score.
///
/// Resolves the scoring function from `config.image_processing_function`,
/// sums its per-row contributions over `rows` in one pass, and truncates
/// the floating-point total toward zero once at the end. Truncating per
/// row instead would change results for [`Unit::Percentage`] functions.
pub fn compute<I>(config: &Config, active_roi_index: usize, rows: I) -> Result<i64, ScoreError>
where
    I: IntoIterator<Item = Row>,
{
    let kind = ScoreKind::from_key(&config.image_processing_function)?;
    let mut total = 0.0f64;
    let mut frames = 0usize;
    for row in rows {
        total += kind.evaluate(config, active_roi_index, &row);
        frames += 1;
    }
    debug!(code = kind.code(), frames, total, "score computed");
    Ok(total.trunc() as i64)
}
